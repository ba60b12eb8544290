//! `--player NAME[=ARRIVAL-DEPARTURE][@CHANNEL]`
//!
//! Either side of the range may be left empty (`Ana=19-` stays until the
//! end, `Beto=-19.5` arrives at the start). Times are kept as text and
//! validated together with the rest of the session.

use psplit_core::{PaymentChannel, PlayerEntry};

pub fn parse_player_spec(raw: &str) -> Result<PlayerEntry, String> {
    let trimmed = raw.trim();
    let (body, channel) = match trimmed.rsplit_once('@') {
        Some((body, channel)) => (body, Some(channel.parse::<PaymentChannel>()?)),
        None => (trimmed, None),
    };

    let (name, range) = match body.split_once('=') {
        Some((name, range)) => (name.trim(), Some(range.trim())),
        None => (body.trim(), None),
    };
    if name.is_empty() {
        return Err(format!("player '{trimmed}' has no name"));
    }

    let (arrival, departure) = match range {
        None => (None, None),
        Some(range) => {
            let (arrival, departure) = range.split_once('-').ok_or_else(|| {
                format!("player '{trimmed}' needs a range like {name}=18-19.5")
            })?;
            (non_empty(arrival), non_empty(departure))
        }
    };

    Ok(PlayerEntry {
        name: name.to_string(),
        arrival,
        departure,
        channel,
    })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

//! Roster validation: turns loosely written session input into engine types.
//!
//! The engine itself is lenient (presence outside the window is clamped, odd
//! names are fine). This layer is where user input gets rejected or flagged.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RosterPreferences;
use crate::error::SplitError;
use crate::model::{ChannelMap, Participant, PaymentChannel, Window, name_key};
use crate::time::{ClockTime, TimeParseError, format_time, parse_time, roll_past_midnight};

/// One court booking as written by a person: times are still text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start: String,
    pub end: String,
    pub total: Decimal,
    #[serde(default)]
    pub players: Vec<PlayerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    /// Defaults to the window start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,
    /// Defaults to the window end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<PaymentChannel>,
}

impl PlayerEntry {
    /// A player present for the whole window.
    pub fn full_window(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arrival: None,
            departure: None,
            channel: None,
        }
    }
}

/// Validated input, ready for [`crate::Allocator::split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub window: Window,
    pub total: Decimal,
    pub participants: Vec<Participant>,
    /// Present only when at least one player named a channel.
    pub channels: Option<ChannelMap>,
    pub notices: Vec<ClampNotice>,
}

/// Non-fatal adjustments the engine will make to a player's presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClampNotice {
    ArrivalRaised {
        name: String,
        from: ClockTime,
        to: ClockTime,
    },
    DepartureLowered {
        name: String,
        from: ClockTime,
        to: ClockTime,
    },
    /// Presence lies entirely outside the window.
    NoPresence { name: String },
}

impl fmt::Display for ClampNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClampNotice::ArrivalRaised { name, from, to } => write!(
                f,
                "{name} arrives at {} before the court opens; counting from {}",
                format_time(*from),
                format_time(*to)
            ),
            ClampNotice::DepartureLowered { name, from, to } => write!(
                f,
                "{name} leaves at {} after the court closes; counting until {}",
                format_time(*from),
                format_time(*to)
            ),
            ClampNotice::NoPresence { name } => {
                write!(f, "{name} is never on court during the booking and pays nothing")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse session file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {field}: {source}")]
    Time {
        field: String,
        #[source]
        source: TimeParseError,
    },
    #[error("court window {start}-{end} has no duration")]
    EmptyWindow { start: String, end: String },
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("player #{position} has a blank name")]
    BlankName { position: usize },
    #[error("duplicate player names: {}", .0.join(", "))]
    DuplicateNames(Vec<String>),
    #[error("at least {min} player(s) required, got {got}")]
    TooFewPlayers { min: usize, got: usize },
    #[error("at most {max} players allowed, got {got}")]
    TooManyPlayers { max: usize, got: usize },
    #[error("{name} must arrive before leaving ({arrival} >= {departure})")]
    InvertedPresence {
        name: String,
        arrival: String,
        departure: String,
    },
}

/// Read a [`Session`] from a TOML file.
pub fn load_session(path: &Path) -> Result<Session, RosterError> {
    let raw = fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| RosterError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_field(field: impl Into<String>, value: &str) -> Result<ClockTime, RosterError> {
    parse_time(value).map_err(|source| RosterError::Time {
        field: field.into(),
        source,
    })
}

impl Session {
    /// Validate the session and convert it into engine input.
    ///
    /// Players without a channel get `default_channel` when a channel map is
    /// built at all.
    pub fn resolve(
        &self,
        roster: &RosterPreferences,
        default_channel: PaymentChannel,
    ) -> Result<ResolvedSession, RosterError> {
        let start = parse_field("start", &self.start)?;
        let end = roll_past_midnight(start, parse_field("end", &self.end)?);
        let overnight = end.is_next_day();
        let window = Window::new(start, end);
        window.validate()?;
        if start == end {
            return Err(RosterError::EmptyWindow {
                start: self.start.trim().to_string(),
                end: self.end.trim().to_string(),
            });
        }
        if self.total < Decimal::ZERO {
            return Err(SplitError::InvalidTotal(self.total).into());
        }

        let count = self.players.len();
        if count < roster.min_participants {
            return Err(RosterError::TooFewPlayers {
                min: roster.min_participants,
                got: count,
            });
        }
        if count > roster.max_participants {
            return Err(RosterError::TooManyPlayers {
                max: roster.max_participants,
                got: count,
            });
        }

        self.check_names()?;

        let mut participants = Vec::with_capacity(count);
        let mut notices = Vec::new();
        for entry in &self.players {
            let name = entry.name.trim().to_string();
            let arrival = match &entry.arrival {
                Some(raw) => parse_field(format!("arrival for {name}"), raw)?,
                None => start,
            };
            let arrival = if overnight {
                roll_past_midnight(start, arrival)
            } else {
                arrival
            };
            let departure = match &entry.departure {
                Some(raw) => parse_field(format!("departure for {name}"), raw)?,
                None => end,
            };
            let departure = if overnight {
                roll_past_midnight(start, departure)
            } else {
                departure
            };
            if arrival >= departure {
                return Err(RosterError::InvertedPresence {
                    name,
                    arrival: format_time(arrival),
                    departure: format_time(departure),
                });
            }

            let participant = Participant::new(name, arrival, departure);
            notices.extend(clamp_notices(&participant, &window));
            participants.push(participant);
        }

        let channels = if self.players.iter().any(|entry| entry.channel.is_some()) {
            let mut map = ChannelMap::new(default_channel);
            for entry in &self.players {
                map.insert(
                    &entry.name,
                    entry.channel.unwrap_or(default_channel),
                );
            }
            Some(map)
        } else {
            None
        };

        for notice in &notices {
            warn!(%notice, "Presence adjusted to the court window");
        }
        debug!(
            players = participants.len(),
            overnight,
            channels = channels.is_some(),
            "Resolved session"
        );

        Ok(ResolvedSession {
            window,
            total: self.total,
            participants,
            channels,
            notices,
        })
    }

    fn check_names(&self) -> Result<(), RosterError> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for (position, entry) in self.players.iter().enumerate() {
            let trimmed = entry.name.trim();
            if trimmed.is_empty() {
                return Err(RosterError::BlankName {
                    position: position + 1,
                });
            }
            let hits = seen.entry(name_key(trimmed)).or_insert(0);
            *hits += 1;
            if *hits == 2 {
                duplicates.push(trimmed.to_string());
            }
        }
        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(RosterError::DuplicateNames(duplicates))
        }
    }
}

fn clamp_notices(participant: &Participant, window: &Window) -> Vec<ClampNotice> {
    let (arrival, departure) = participant.clamped(window);
    if arrival == departure {
        return vec![ClampNotice::NoPresence {
            name: participant.name.clone(),
        }];
    }

    let mut notices = Vec::new();
    if arrival != participant.arrival {
        notices.push(ClampNotice::ArrivalRaised {
            name: participant.name.clone(),
            from: participant.arrival,
            to: arrival,
        });
    }
    if departure != participant.departure {
        notices.push(ClampNotice::DepartureLowered {
            name: participant.name.clone(),
            from: participant.departure,
            to: departure,
        });
    }
    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn hm(hour: u32, minute: u32) -> ClockTime {
        ClockTime::from_hm(hour, minute).unwrap()
    }

    fn player(name: &str, arrival: &str, departure: &str) -> PlayerEntry {
        PlayerEntry {
            name: name.to_string(),
            arrival: Some(arrival.to_string()),
            departure: Some(departure.to_string()),
            channel: None,
        }
    }

    fn session(players: Vec<PlayerEntry>) -> Session {
        Session {
            start: "18".to_string(),
            end: "20".to_string(),
            total: dec!(1000),
            players,
        }
    }

    fn resolve(session: &Session) -> Result<ResolvedSession, RosterError> {
        session.resolve(&RosterPreferences::default(), PaymentChannel::Cash)
    }

    #[test]
    fn test_missing_times_default_to_window() {
        let resolved = resolve(&session(vec![
            PlayerEntry::full_window("Ana"),
            player("Beto", "19", "20"),
        ]))
        .unwrap();

        assert_eq!(resolved.window, Window::new(hm(18, 0), hm(20, 0)));
        assert_eq!(resolved.participants[0].arrival, hm(18, 0));
        assert_eq!(resolved.participants[0].departure, hm(20, 0));
        assert_eq!(resolved.participants[1].arrival, hm(19, 0));
        assert!(resolved.channels.is_none());
        assert!(resolved.notices.is_empty());
    }

    #[test]
    fn test_names_are_trimmed() {
        let resolved = resolve(&session(vec![PlayerEntry::full_window("  Ana ")])).unwrap();
        assert_eq!(resolved.participants[0].name, "Ana");
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let result = resolve(&session(vec![
            PlayerEntry::full_window("Ana"),
            PlayerEntry::full_window("   "),
        ]));
        assert!(matches!(result, Err(RosterError::BlankName { position: 2 })));
    }

    #[test]
    fn test_duplicates_are_listed_once_each() {
        let result = resolve(&session(vec![
            PlayerEntry::full_window("Ana"),
            PlayerEntry::full_window("ana"),
            PlayerEntry::full_window("Beto"),
            PlayerEntry::full_window("BETO"),
            PlayerEntry::full_window("Ana "),
        ]));
        match result {
            Err(RosterError::DuplicateNames(names)) => {
                assert_eq!(names, vec!["ana".to_string(), "BETO".to_string()]);
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_participant_limits() {
        let roster = RosterPreferences {
            min_participants: 2,
            max_participants: 3,
        };
        let too_few = session(vec![PlayerEntry::full_window("Ana")]);
        assert!(matches!(
            too_few.resolve(&roster, PaymentChannel::Cash),
            Err(RosterError::TooFewPlayers { min: 2, got: 1 })
        ));

        let too_many = session(
            ["A", "B", "C", "D"]
                .into_iter()
                .map(PlayerEntry::full_window)
                .collect(),
        );
        assert!(matches!(
            too_many.resolve(&roster, PaymentChannel::Cash),
            Err(RosterError::TooManyPlayers { max: 3, got: 4 })
        ));
    }

    #[test]
    fn test_inverted_presence_is_rejected() {
        let result = resolve(&session(vec![player("Ana", "19", "19")]));
        assert!(matches!(result, Err(RosterError::InvertedPresence { .. })));
    }

    #[test]
    fn test_window_errors() {
        let mut inverted = session(vec![PlayerEntry::full_window("Ana")]);
        inverted.end = "17".to_string();
        assert!(matches!(
            resolve(&inverted),
            Err(RosterError::Split(SplitError::InvalidWindow { .. }))
        ));

        let mut empty = session(vec![PlayerEntry::full_window("Ana")]);
        empty.end = "18:00".to_string();
        assert!(matches!(
            resolve(&empty),
            Err(RosterError::EmptyWindow { .. })
        ));

        let mut off_quarter = session(vec![PlayerEntry::full_window("Ana")]);
        off_quarter.start = "18:10".to_string();
        match resolve(&off_quarter) {
            Err(RosterError::Time { field, source }) => {
                assert_eq!(field, "start");
                assert!(matches!(source, TimeParseError::OffQuarterHour { .. }));
            }
            other => panic!("expected time error, got {other:?}"),
        }

        let mut decimal_minutes = session(vec![PlayerEntry::full_window("Ana")]);
        decimal_minutes.end = "19.30".to_string();
        match resolve(&decimal_minutes) {
            Err(err @ RosterError::Time { .. }) => {
                assert!(err.to_string().contains("19:30"));
            }
            other => panic!("expected time error, got {other:?}"),
        }
    }

    #[test]
    fn test_booking_that_closes_at_midnight() {
        let mut late = session(vec![
            PlayerEntry::full_window("Ana"),
            player("Beto", "23", "24:00"),
        ]);
        late.start = "22".to_string();
        late.end = "24".to_string();

        let resolved = resolve(&late).unwrap();
        assert_eq!(resolved.window, Window::new(hm(22, 0), hm(24, 0)));
        assert_eq!(resolved.window.hours(), dec!(2));
        assert_eq!(resolved.participants[1].departure, hm(24, 0));
        assert!(resolved.notices.is_empty());
    }

    #[test]
    fn test_booking_that_runs_past_midnight() {
        let mut overnight = session(vec![
            PlayerEntry::full_window("Ana"),
            player("Beto", "23:30", "0:30"),
            player("Carla", "22:30", "23:30"),
        ]);
        overnight.start = "23".to_string();
        overnight.end = "0:30".to_string();

        let resolved = resolve(&overnight).unwrap();
        assert_eq!(resolved.window, Window::new(hm(23, 0), hm(24, 30)));
        assert_eq!(resolved.participants[0].departure, hm(24, 30));
        assert_eq!(resolved.participants[1].arrival, hm(23, 30));
        assert_eq!(resolved.participants[1].departure, hm(24, 30));
        assert_eq!(
            resolved.notices,
            vec![ClampNotice::ArrivalRaised {
                name: "Carla".to_string(),
                from: hm(22, 30),
                to: hm(23, 0)
            }]
        );
    }

    #[test]
    fn test_negative_total_is_rejected() {
        let mut refund = session(vec![PlayerEntry::full_window("Ana")]);
        refund.total = dec!(-1);
        assert!(matches!(
            resolve(&refund),
            Err(RosterError::Split(SplitError::InvalidTotal(_)))
        ));
    }

    #[test]
    fn test_clamping_is_reported_not_rejected() {
        let resolved = resolve(&session(vec![
            player("Early", "17", "18"),
            player("Wide", "17.5", "21"),
            player("Inside", "18.25", "19.75"),
        ]))
        .unwrap();

        assert_eq!(
            resolved.notices,
            vec![
                ClampNotice::NoPresence {
                    name: "Early".to_string()
                },
                ClampNotice::ArrivalRaised {
                    name: "Wide".to_string(),
                    from: hm(17, 30),
                    to: hm(18, 0)
                },
                ClampNotice::DepartureLowered {
                    name: "Wide".to_string(),
                    from: hm(21, 0),
                    to: hm(20, 0)
                },
            ]
        );
        // The raw presence is handed to the engine untouched.
        assert_eq!(resolved.participants[1].arrival, hm(17, 30));
        assert!(resolved.notices[1].to_string().contains("17:30"));
    }

    #[test]
    fn test_channel_map_built_only_when_named() {
        let mut entries = vec![
            PlayerEntry::full_window("Ana"),
            PlayerEntry::full_window("Beto"),
        ];
        entries[1].channel = Some(PaymentChannel::Digital);

        let resolved = session(entries)
            .resolve(&RosterPreferences::default(), PaymentChannel::Digital)
            .unwrap();
        let channels = resolved.channels.expect("channel map");
        assert_eq!(channels.channel_for("ana"), PaymentChannel::Digital);
        assert_eq!(channels.channel_for("Beto"), PaymentChannel::Digital);
        assert_eq!(channels.channel_for("Carla"), PaymentChannel::Digital);
    }

    #[test]
    fn test_load_session_from_toml() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("tuesday.toml");
        fs::write(
            &path,
            r#"
start = "18"
end = "20"
total = 1000

[[players]]
name = "Ana"
channel = "cash"

[[players]]
name = "Beto"
arrival = "19"
channel = "digital"
"#,
        )
        .expect("write fixture");

        let loaded = load_session(&path).unwrap();
        assert_eq!(loaded.players.len(), 2);
        assert_eq!(loaded.players[1].arrival.as_deref(), Some("19"));
        assert_eq!(loaded.players[1].channel, Some(PaymentChannel::Digital));

        let resolved = resolve(&loaded).unwrap();
        assert_eq!(resolved.participants[1].departure, hm(20, 0));
    }

    #[test]
    fn test_load_session_errors() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing.toml");
        assert!(matches!(load_session(&missing), Err(RosterError::Io { .. })));

        let broken = temp.path().join("broken.toml");
        fs::write(&broken, "start = ").expect("write fixture");
        assert!(matches!(load_session(&broken), Err(RosterError::Parse { .. })));
    }
}

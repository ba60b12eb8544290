//! Plain-text rendering of an [`Allocation`].

use psplit_core::{
    Allocation, DisplayPreferences, PaymentChannel, format_duration, format_time, round_half_even,
};
use rust_decimal::Decimal;

/// Format `value` with `decimals` places, grouping thousands and using the
/// configured currency symbol and separators.
pub fn format_amount(value: Decimal, decimals: u32, display: &DisplayPreferences) -> String {
    let rounded = round_half_even(value, decimals);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.*}", decimals as usize, rounded.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::new();
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push_str(&display.thousands_separator);
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push_str(&display.decimal_separator);
        grouped.push_str(fraction);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{}{grouped}", display.currency_symbol)
}

/// One row per share, in input order. The longest and shortest stays are
/// marked unless everybody stayed equally long.
pub fn render_table(allocation: &Allocation, decimals: u32, display: &DisplayPreferences) -> String {
    let extremes = allocation.presence_extremes();
    let with_channels = allocation.has_channels();

    let rows: Vec<[String; 5]> = allocation
        .shares
        .iter()
        .map(|share| {
            let marker = match extremes {
                Some((_, longest)) if share.presence == longest => "longest",
                Some((shortest, _)) if share.presence == shortest => "shortest",
                _ => "",
            };
            [
                share.name.clone(),
                format_amount(share.rounded_amount, decimals, display),
                format_duration(share.presence),
                share.channel.map(|c| c.to_string()).unwrap_or_default(),
                marker.to_string(),
            ]
        })
        .collect();

    let header = ["Player", "Amount", "Presence", "Channel", ""];
    let mut widths = header.map(|title| title.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let line = |cells: [&str; 5]| {
        let mut text = format!(
            "{:<w0$}  {:>w1$}  {:>w2$}",
            cells[0],
            cells[1],
            cells[2],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        );
        if with_channels {
            text.push_str(&format!("  {:<w3$}", cells[3], w3 = widths[3]));
        }
        if !cells[4].is_empty() {
            text.push_str("  ");
            text.push_str(cells[4]);
        }
        text.trim_end().to_string()
    };

    out.push_str(&line(header));
    out.push('\n');
    for row in &rows {
        out.push_str(&line([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
            row[4].as_str(),
        ]));
        out.push('\n');
    }
    out
}

pub fn render_summary(
    allocation: &Allocation,
    decimals: u32,
    display: &DisplayPreferences,
) -> String {
    let amount = |value| format_amount(value, decimals, display);
    let mut lines = vec![
        format!(
            "Court: {}-{} ({})",
            format_time(allocation.window.start),
            format_time(allocation.window.end),
            format_duration(allocation.window.duration())
        ),
        format!("Cost per hour: {}", amount(allocation.cost_per_hour())),
        format!(
            "Collected: {} of {}",
            amount(allocation.collected()),
            amount(allocation.total_cost)
        ),
    ];
    if allocation.has_channels() {
        lines.push(format!(
            "Cash: {}  Digital: {}",
            amount(allocation.channel_total(PaymentChannel::Cash)),
            amount(allocation.channel_total(PaymentChannel::Digital))
        ));
    }
    lines.push(format!(
        "Model: {}, rounding: {}",
        allocation.cost_model, allocation.rounding
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Problems worth surfacing on stderr after a split.
pub fn allocation_warnings(
    allocation: &Allocation,
    decimals: u32,
    display: &DisplayPreferences,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if !allocation.unrecovered_remainder.is_zero() {
        warnings.push(format!(
            "{} of cash rounding has no digital payer to cover it",
            format_amount(allocation.unrecovered_remainder, decimals, display)
        ));
    }
    if !allocation.is_reconciled() {
        warnings.push(format!(
            "Collected {} but the booking costs {}",
            format_amount(allocation.collected(), decimals, display),
            format_amount(allocation.total_cost, decimals, display)
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use psplit_core::{ChannelMap, Participant, Window, parse_time, split};
    use rust_decimal_macros::dec;

    fn display() -> DisplayPreferences {
        DisplayPreferences::default()
    }

    fn sample() -> Allocation {
        let at = |raw| parse_time(raw).unwrap();
        let players = [
            Participant::new("Ana", at("18"), at("20")),
            Participant::new("Beto", at("19"), at("20")),
            Participant::new("Carla", at("18"), at("20")),
        ];
        split(&Window::new(at("18"), at("20")), dec!(9000), &players, None).unwrap()
    }

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(dec!(1234567), 0, &display()), "$1.234.567");
        assert_eq!(format_amount(dec!(999), 0, &display()), "$999");
        assert_eq!(format_amount(dec!(1000.5), 2, &display()), "$1.000,50");
        assert_eq!(format_amount(dec!(-1500), 0, &display()), "-$1.500");
        assert_eq!(format_amount(dec!(2.5), 0, &display()), "$2");
    }

    #[test]
    fn test_format_amount_custom_separators() {
        let display = DisplayPreferences {
            currency_symbol: "€".to_string(),
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
        };
        assert_eq!(format_amount(dec!(12345.678), 2, &display), "€12,345.68");
    }

    #[test]
    fn test_table_marks_extremes() {
        let table = render_table(&sample(), 0, &display());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Player"));
        assert!(lines[1].starts_with("Ana") && lines[1].ends_with("longest"));
        assert!(lines[2].starts_with("Beto") && lines[2].ends_with("shortest"));
        assert!(lines[3].ends_with("longest"));
        assert!(!lines[0].contains("Channel"));
    }

    #[test]
    fn test_table_without_extremes_has_no_markers() {
        let at = |raw| parse_time(raw).unwrap();
        let players = [
            Participant::new("Ana", at("18"), at("20")),
            Participant::new("Beto", at("18"), at("20")),
        ];
        let allocation =
            split(&Window::new(at("18"), at("20")), dec!(1000), &players, None).unwrap();
        let table = render_table(&allocation, 0, &display());
        assert!(!table.contains("longest"));
        assert!(!table.contains("shortest"));
    }

    #[test]
    fn test_summary_lists_channel_totals() {
        let at = |raw| parse_time(raw).unwrap();
        let players = [
            Participant::new("Ana", at("18"), at("20")),
            Participant::new("Beto", at("18"), at("20")),
            Participant::new("Carla", at("18"), at("20")),
        ];
        let channels =
            ChannelMap::new(PaymentChannel::Cash).with("Carla", PaymentChannel::Digital);
        let allocation = split(
            &Window::new(at("18"), at("20")),
            dec!(1000),
            &players,
            Some(&channels),
        )
        .unwrap();

        let summary = render_summary(&allocation, 2, &display());
        assert!(summary.contains("Court: 18:00-20:00 (2h 00m)"));
        assert!(summary.contains("Cost per hour: $500,00"));
        assert!(summary.contains("Cash: $600,00  Digital: $400,00"));
        assert!(allocation_warnings(&allocation, 2, &display()).is_empty());
    }

    #[test]
    fn test_unrecovered_cash_is_warned() {
        let at = |raw| parse_time(raw).unwrap();
        let players = [
            Participant::new("Ana", at("18"), at("20")),
            Participant::new("Beto", at("18"), at("20")),
            Participant::new("Carla", at("18"), at("20")),
        ];
        let channels = ChannelMap::new(PaymentChannel::Cash).with("Ana", PaymentChannel::Cash);
        let allocation = split(
            &Window::new(at("18"), at("20")),
            dec!(1000),
            &players,
            Some(&channels),
        )
        .unwrap();

        let warnings = allocation_warnings(&allocation, 0, &display());
        assert_eq!(warnings.len(), 2);
        assert!(warnings[1].contains("$900"));
    }
}

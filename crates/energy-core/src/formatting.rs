//! Display helpers shared by report renderers.

use chrono::Datelike;

use crate::time_utils::{BucketWindow, Timestamp};

/// Format a number with thousands separators and fixed decimals.
///
/// ```
/// use energy_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 2), "1,234.50");
/// assert_eq!(format_number(-9876.0, 0), "-9,876");
/// assert_eq!(format_number(0.0, 1), "0.0");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    // A value that rounds to zero never gets a minus sign.
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Energy amount with two decimals and a `kWh` unit.
///
/// ```
/// use energy_core::formatting::format_kwh;
///
/// assert_eq!(format_kwh(15234.456), "15,234.46 kWh");
/// ```
pub fn format_kwh(value: f64) -> String {
    format!("{} kWh", format_number(value, 2))
}

/// Share of `part` in `whole` as a percentage, `0.0` when `whole` is zero.
pub fn share_percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Short label for the bucket starting at `start`.
///
/// * daily → `2024-01-15`
/// * weekly → ISO week, `2024-W03`
/// * hourly and fixed → `2024-01-15 09:00`
pub fn format_period(start: Timestamp, window: BucketWindow) -> String {
    match window {
        BucketWindow::Day => start.format("%Y-%m-%d").to_string(),
        BucketWindow::Week => {
            let week = start.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        BucketWindow::Hour | BucketWindow::Fixed(_) => start.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

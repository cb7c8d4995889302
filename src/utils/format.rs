//! Number rendering for response bodies, following the en-US convention:
//! `,` groups thousands, `.` separates at most two fraction digits and trailing
//! zeros are dropped.

use num_format::{Locale, ToFormattedString};

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let rounded = format!("{:.2}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(rounded.len() + rounded.len() / 3 + 1);
    // -0.001 rounds to zero and must not render as "-0"
    if value < 0.0 && rounded != "0.00" {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Groups an all-digit integer string. Values beyond `u128` are left ungrouped.
fn group_thousands(digits: &str) -> String {
    digits
        .parse::<u128>()
        .map(|n| n.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| digits.to_string())
}

//! Text forms used by reports and the CLI table.

/// `$10,000.00`, `-$200.00`. Amounts are rounded to cents.
pub fn format_currency(amount: f64) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = amount < 0.0 && fixed != "0.00";
    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Always two decimals followed by `%`.
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.2}%")
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

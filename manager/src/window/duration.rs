//! Maximum-wait and recurrence duration strings.

/// Parse a duration into minutes.
///
/// Accepts a plain integer (`"10"`, `"-1"`) or compound components such as
/// `"1d1h30m"` or `"2h 10m"`, each unit at most once. Returns `-1` when the
/// input cannot be parsed.
pub fn parse_duration(input: &str) -> i64 {
    let trimmed = input.trim();
    if let Ok(minutes) = trimmed.parse::<i64>() {
        return minutes;
    }
    parse_components(trimmed).unwrap_or(-1)
}

fn parse_components(input: &str) -> Option<i64> {
    if input.is_empty() {
        return None;
    }

    // days, hours, minutes
    let mut seen = [false; 3];
    let mut total: i64 = 0;
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut value: i64 = 0;
        let mut digits = 0;
        while let Some(digit) = chars.next_if(char::is_ascii_digit) {
            value = value
                .checked_mul(10)?
                .checked_add(i64::from(digit.to_digit(10)?))?;
            digits += 1;
        }
        if digits == 0 {
            return None;
        }

        let (slot, factor) = match chars.next()?.to_ascii_lowercase() {
            'd' => (0, 24 * 60),
            'h' => (1, 60),
            'm' => (2, 1),
            _ => return None,
        };
        if seen[slot] {
            return None;
        }
        seen[slot] = true;
        total = total.checked_add(value.checked_mul(factor)?)?;
    }

    Some(total)
}

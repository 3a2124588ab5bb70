//! Formatting helpers for text reports.

/// Format a currency amount (e.g., "$1.25").
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

/// Format a 0-100 percentage (e.g., "42.5%").
pub fn format_percent(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{}%", trimmed)
}

/// Format a call duration in seconds (e.g., "2m 05s", "45s", "1h 02m").
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Pad or truncate to a fixed column width.
pub fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{:<width$}", text, width = width)
    } else if width == 0 {
        String::new()
    } else {
        let mut truncated: String = text.chars().take(width - 1).collect();
        truncated.push('…');
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1.25), "$1.25");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-0.5), "-$0.50");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(42.5), "42.5%");
        assert_eq!(format_percent(100.0), "100%");
        assert_eq!(format_percent(33.333), "33.33%");
        assert_eq!(format_percent(0.0), "0%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45.0), "45s");
        assert_eq!(format_duration(125.4), "2m 05s");
        assert_eq!(format_duration(3720.0), "1h 02m");
        assert_eq!(format_duration(-3.0), "0s");
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("gpt-4", 8), "gpt-4   ");
        assert_eq!(fit("elevenlabs/turbo-v2", 10), "elevenlab…");
    }
}

//! Utility functions.
//!
//! Collection of helper functions used across the bot.

use teloxide::types::UserId;

/// Escape text for Telegram HTML parse mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Format a username for display.
///
/// Returns `@username` when there is one, `N/A` otherwise.
pub fn format_username(username: Option<&str>) -> String {
    match username {
        Some(u) if !u.is_empty() => format!("@{}", u),
        _ => "N/A".to_string(),
    }
}

/// Ten-segment bar for `current` out of `target`, with a percentage.
pub fn progress_bar(current: i64, target: i64) -> String {
    let percent = if target <= 0 {
        100
    } else {
        (current.max(0) * 100 / target).min(100)
    };
    let filled = (percent / 10) as usize;
    format!("{}{} {}%", "▰".repeat(filled), "▱".repeat(10 - filled), percent)
}

/// Split command arguments into the first word and the rest.
pub fn split_first_arg(args: &str) -> Option<(&str, &str)> {
    let args = args.trim();
    if args.is_empty() {
        return None;
    }
    match args.split_once(char::is_whitespace) {
        Some((first, rest)) => Some((first, rest.trim())),
        None => Some((args, "")),
    }
}

/// Parse a numeric Telegram user id.
pub fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.trim().parse::<u64>().ok().filter(|id| *id > 0).map(UserId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        assert_eq!(html_escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress_bar(0, 5), "▱▱▱▱▱▱▱▱▱▱ 0%");
        assert_eq!(progress_bar(2, 5), "▰▰▰▰▱▱▱▱▱▱ 40%");
        assert_eq!(progress_bar(9, 5), "▰▰▰▰▰▰▰▰▰▰ 100%");
    }

    #[test]
    fn first_arg_split() {
        assert_eq!(split_first_arg("  123   hello there "), Some(("123", "hello there")));
        assert_eq!(split_first_arg("123"), Some(("123", "")));
        assert_eq!(split_first_arg("   "), None);
    }

    #[test]
    fn user_ids() {
        assert_eq!(parse_user_id(" 42 "), Some(UserId(42)));
        assert_eq!(parse_user_id("0"), None);
        assert_eq!(parse_user_id("-3"), None);
        assert_eq!(parse_user_id("abc"), None);
    }

    #[test]
    fn usernames() {
        assert_eq!(format_username(Some("ana")), "@ana");
        assert_eq!(format_username(Some("")), "N/A");
        assert_eq!(format_username(None), "N/A");
    }
}

/// A recognized chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the button menu.
    Menu,
    /// Full speed test, run on a background task.
    Speedtest,
    /// Reduced-accuracy speed test (single transfer stream).
    Quick,
    /// Latency check, answered inline.
    Ping,
}

impl Command {
    /// Parse free-form message text. Case-insensitive; surrounding
    /// whitespace and one leading slash are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();
        let normalized = normalized.strip_prefix('/').unwrap_or(&normalized);
        match normalized {
            "menu" => Some(Self::Menu),
            "speedtest" => Some(Self::Speedtest),
            "quick" => Some(Self::Quick),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }

    /// Map a button-reply ID from a previously sent menu. The menu has no
    /// quick button.
    pub fn from_button_id(id: &str) -> Option<Self> {
        match id {
            "speedtest" => Some(Self::Speedtest),
            "ping" => Some(Self::Ping),
            "menu" => Some(Self::Menu),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognized_commands() {
        assert_eq!(Command::parse("menu"), Some(Command::Menu));
        assert_eq!(Command::parse("speedtest"), Some(Command::Speedtest));
        assert_eq!(Command::parse("quick"), Some(Command::Quick));
        assert_eq!(Command::parse("ping"), Some(Command::Ping));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Command::parse("MENU"), Some(Command::Menu));
        assert_eq!(Command::parse("SpeedTest"), Some(Command::Speedtest));
    }

    #[test]
    fn test_parse_accepts_leading_slash_and_whitespace() {
        assert_eq!(Command::parse("/menu"), Some(Command::Menu));
        assert_eq!(Command::parse("  /Quick  "), Some(Command::Quick));
        assert_eq!(Command::parse("\nping\n"), Some(Command::Ping));
    }

    #[test]
    fn test_parse_rejects_everything_else() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("/"), None);
        assert_eq!(Command::parse("help"), None);
        assert_eq!(Command::parse("menu please"), None);
        assert_eq!(Command::parse("//menu"), None);
    }

    #[test]
    fn test_button_ids() {
        assert_eq!(Command::from_button_id("speedtest"), Some(Command::Speedtest));
        assert_eq!(Command::from_button_id("ping"), Some(Command::Ping));
        assert_eq!(Command::from_button_id("menu"), Some(Command::Menu));
        assert_eq!(Command::from_button_id("quick"), None);
        assert_eq!(Command::from_button_id("SPEEDTEST"), None);
    }
}

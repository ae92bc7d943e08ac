use trainpixels_core::TrackId;

/// Requests accepted by the scheduler at tick boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch to the track with the given id.
    Select(TrackId),
    /// Switch to the track with the given 1-based number.
    SelectNumber(usize),
    /// Stop the current track and stay idle.
    Deselect,
    /// Stop the engine.
    Stop,
}

impl Command {
    /// Parses a keypad style input line.
    ///
    /// - `0` deselects the current track;
    /// - any other number selects the track with that number;
    /// - `*` stops the engine;
    /// - everything else is treated as a track id.
    ///
    /// Returns `None` for an empty input.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let command = if input == "*" {
            Self::Stop
        } else if input.bytes().all(|byte| byte.is_ascii_digit()) {
            match input.parse::<usize>() {
                Ok(0) => Self::Deselect,
                Ok(number) => Self::SelectNumber(number),
                // Too long to be a track number.
                Err(_) => Self::Select(TrackId::from(input)),
            }
        } else {
            Self::Select(TrackId::from(input))
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("  \n"), None);
        assert_eq!(Command::parse("0"), Some(Command::Deselect));
        assert_eq!(Command::parse("00"), Some(Command::Deselect));
        assert_eq!(Command::parse("3\n"), Some(Command::SelectNumber(3)));
        assert_eq!(Command::parse("*"), Some(Command::Stop));
        assert_eq!(
            Command::parse("main_line"),
            Some(Command::Select(TrackId::from("main_line")))
        );
        assert_eq!(
            Command::parse("1+2"),
            Some(Command::Select(TrackId::from("1+2")))
        );
    }
}

//! Host command parsing.

use crate::error::CommandError;
use crate::levels::Level;

/// A brightness command issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Step one supported level up (`raise` / `increase`).
    Raise,
    /// Step one supported level down (`lower` / `decrease`).
    Lower,
    /// Move to the supported level nearest the argument (`set <level>`).
    Set(Level),
    /// Restore the level observed at the last reload (`revert`).
    Revert,
}

impl Command {
    /// Parse a command name and optional argument.
    ///
    /// Names are matched case-insensitively. `set` requires an integer
    /// argument in 0-255.
    ///
    /// # Example
    ///
    /// ```
    /// use screen_brightness::{Command, CommandError};
    ///
    /// assert_eq!(Command::parse("Increase", None), Ok(Command::Raise));
    /// assert_eq!(Command::parse("set", Some("40")), Ok(Command::Set(40)));
    /// assert!(matches!(
    ///     Command::parse("set", Some("abc")),
    ///     Err(CommandError::InvalidArgument { .. })
    /// ));
    /// ```
    pub fn parse(name: &str, arg: Option<&str>) -> Result<Self, CommandError> {
        let name = name.trim();
        let command = match name.to_ascii_lowercase().as_str() {
            "raise" | "increase" => Self::Raise,
            "lower" | "decrease" => Self::Lower,
            "revert" => Self::Revert,
            "set" => {
                let arg = arg
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .ok_or(CommandError::MissingArgument("set"))?;
                let level = arg.parse::<Level>().map_err(|_| CommandError::InvalidArgument {
                    command: "set",
                    arg: arg.to_string(),
                })?;
                Self::Set(level)
            }
            _ => return Err(CommandError::UnknownCommand(name.to_string())),
        };
        Ok(command)
    }

    /// Parse a raw command line such as `"set 40"`.
    pub fn parse_line(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        match line.split_once(char::is_whitespace) {
            Some((name, arg)) => Self::parse(name, Some(arg)),
            None => Self::parse(line, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Command::parse("raise", None), Ok(Command::Raise));
        assert_eq!(Command::parse("increase", None), Ok(Command::Raise));
        assert_eq!(Command::parse("LOWER", None), Ok(Command::Lower));
        assert_eq!(Command::parse("Decrease", None), Ok(Command::Lower));
        assert_eq!(Command::parse(" revert ", None), Ok(Command::Revert));
    }

    #[test]
    fn test_parse_set_range() {
        assert_eq!(Command::parse("set", Some("0")), Ok(Command::Set(0)));
        assert_eq!(Command::parse("set", Some(" 255 ")), Ok(Command::Set(255)));
        assert_eq!(
            Command::parse("set", Some("256")),
            Err(CommandError::InvalidArgument {
                command: "set",
                arg: "256".into()
            })
        );
        assert_eq!(
            Command::parse("set", Some("-1")),
            Err(CommandError::InvalidArgument {
                command: "set",
                arg: "-1".into()
            })
        );
    }

    #[test]
    fn test_parse_set_requires_argument() {
        assert_eq!(Command::parse("set", None), Err(CommandError::MissingArgument("set")));
        assert_eq!(Command::parse("set", Some("  ")), Err(CommandError::MissingArgument("set")));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            Command::parse("brighter", None),
            Err(CommandError::UnknownCommand("brighter".into()))
        );
        assert_eq!(Command::parse("", None), Err(CommandError::UnknownCommand(String::new())));
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(Command::parse_line("set 40"), Ok(Command::Set(40)));
        assert_eq!(Command::parse_line("  set   75  "), Ok(Command::Set(75)));
        assert_eq!(Command::parse_line("raise"), Ok(Command::Raise));
        assert_eq!(
            Command::parse_line("set abc"),
            Err(CommandError::InvalidArgument {
                command: "set",
                arg: "abc".into()
            })
        );
    }
}

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Top-level request named by the first frame on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Submit,
    Clone,
    List,
    Auth,
}

impl Command {
    pub const ALL: [Command; 4] = [Self::Submit, Self::Clone, Self::List, Self::Auth];

    /// Canonical wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "SUBMIT",
            Self::Clone => "CLONE",
            Self::List => "LIST",
            Self::Auth => "AUTH",
        }
    }

    /// Parse a command name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-command of `AUTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthCommand {
    Signup,
    Login,
}

impl AuthCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "SIGNUP",
            Self::Login => "LOGIN",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        [Self::Signup, Self::Login]
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

impl FromStr for AuthCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for AuthCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Command::parse("SUBMIT"), Some(Command::Submit));
        assert_eq!(Command::parse("clone"), Some(Command::Clone));
        assert_eq!(Command::parse("LiSt"), Some(Command::List));
        assert_eq!(Command::parse("auth"), Some(Command::Auth));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(Command::parse("PUSH"), None);
        assert_eq!(Command::parse(""), None);
        assert!(matches!(
            "DELETE".parse::<Command>(),
            Err(ProtocolError::UnknownCommand(name)) if name == "DELETE"
        ));
    }

    #[test]
    fn display_matches_wire_spelling() {
        for cmd in Command::ALL {
            assert_eq!(cmd.to_string().parse::<Command>().unwrap(), cmd);
        }
    }

    #[test]
    fn auth_subcommands() {
        assert_eq!(AuthCommand::parse("signup"), Some(AuthCommand::Signup));
        assert_eq!(AuthCommand::parse("Login"), Some(AuthCommand::Login));
        assert!("LOGOUT".parse::<AuthCommand>().is_err());
    }
}

//! POP3 command lines

use std::fmt;

/// A parsed client command.
///
/// Arguments are kept as sent; numeric ones are validated by the session
/// so that a bad number can be answered without ending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(String),
    Pass(String),
    Auth,
    Capa,
    Stat,
    List(Option<String>),
    Uidl(Option<String>),
    Retr(String),
    Top(String),
    Dele(String),
    Quit,
    /// Anything else, keyword upper-cased.
    Unknown(String),
}

impl Command {
    /// Parse one line without its terminator. Keywords are
    /// case-insensitive.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let (keyword, args) = line.split_once(' ').unwrap_or((line, ""));
        let keyword = keyword.trim().to_ascii_uppercase();
        let args = args.trim().to_string();

        match keyword.as_str() {
            "USER" => Self::User(args),
            "PASS" => Self::Pass(args),
            "AUTH" => Self::Auth,
            "CAPA" => Self::Capa,
            "STAT" => Self::Stat,
            "LIST" => Self::List(non_empty(args)),
            "UIDL" => Self::Uidl(non_empty(args)),
            "RETR" => Self::Retr(args),
            "TOP" => Self::Top(args),
            "DELE" => Self::Dele(args),
            "QUIT" => Self::Quit,
            _ => Self::Unknown(keyword),
        }
    }

    /// The command keyword.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(_) => "USER",
            Self::Pass(_) => "PASS",
            Self::Auth => "AUTH",
            Self::Capa => "CAPA",
            Self::Stat => "STAT",
            Self::List(_) => "LIST",
            Self::Uidl(_) => "UIDL",
            Self::Retr(_) => "RETR",
            Self::Top(_) => "TOP",
            Self::Dele(_) => "DELE",
            Self::Quit => "QUIT",
            Self::Unknown(keyword) => keyword,
        }
    }

    /// Only valid before authentication.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::User(_) | Self::Pass(_) | Self::Auth | Self::Capa)
    }

    /// Only valid after authentication.
    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        matches!(
            self,
            Self::Stat | Self::List(_) | Self::Uidl(_) | Self::Retr(_) | Self::Top(_) | Self::Dele(_)
        )
    }
}

/// Never shows the `PASS` argument.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(_) => f.write_str("PASS ****"),
            Self::User(arg) | Self::Retr(arg) | Self::Top(arg) | Self::Dele(arg) => {
                write!(f, "{} {arg}", self.name())
            }
            Self::List(Some(arg)) | Self::Uidl(Some(arg)) => write!(f, "{} {arg}", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// The 1-based message number at the start of `args`. Anything after it
/// (the line count of `TOP`) is ignored.
#[must_use]
pub fn message_number(args: &str) -> Option<usize> {
    args.split_whitespace().next()?.parse().ok()
}

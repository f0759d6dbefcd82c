use crate::protocol::MessageError;
use std::fmt;
use std::str::FromStr;

/// HTTP protocol versions accepted by this message implementation.
///
/// The accepted set is fixed; anything else fails at the parsing boundary
/// with [`MessageError::UnsupportedVersion`], so a constructed message can
/// never carry an unknown version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
    Http20,
}

impl Version {
    /// The version as it appears in a status line, without the `HTTP/` prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "1.0",
            Version::Http11 => "1.1",
            Version::Http20 => "2.0",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Version {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(Version::Http10),
            "1.1" => Ok(Version::Http11),
            "2.0" => Ok(Version::Http20),
            other => Err(MessageError::unsupported_version(other)),
        }
    }
}

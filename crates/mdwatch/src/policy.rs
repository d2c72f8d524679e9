//! Response-length policy: the named output budget for each completion.

use std::fmt;
use std::str::FromStr;

use crate::error::WatchError;

/// How long the rewritten Markdown may be.
///
/// Parsing (via [`FromStr`] or the CLI) is the only place an unknown name
/// can appear, so it is rejected there rather than at request time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ResponseLength {
    Summary,
    #[default]
    Regular,
    Long,
}

impl ResponseLength {
    /// Maximum output tokens requested from the completion endpoint.
    pub fn max_tokens(self) -> u32 {
        match self {
            ResponseLength::Summary => 50,
            ResponseLength::Regular => 150,
            ResponseLength::Long => 300,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseLength::Summary => "summary",
            ResponseLength::Regular => "regular",
            ResponseLength::Long => "long",
        }
    }
}

impl fmt::Display for ResponseLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseLength {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(ResponseLength::Summary),
            "regular" => Ok(ResponseLength::Regular),
            "long" => Ok(ResponseLength::Long),
            other => Err(WatchError::Configuration(format!(
                "invalid response_length '{other}', choose from 'summary', 'regular', or 'long'"
            ))),
        }
    }
}

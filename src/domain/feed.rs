use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two remote feeds the client keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    Timeline,
    DirectMessages,
}

impl Feed {
    pub const ALL: [Feed; 2] = [Feed::Timeline, Feed::DirectMessages];

    /// Stable key used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Feed::Timeline => "timeline",
            Feed::DirectMessages => "direct_messages",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Feed::Timeline => "Timeline",
            Feed::DirectMessages => "Direct messages",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timeline" | "home" => Ok(Feed::Timeline),
            "direct_messages" | "dm" | "dms" => Ok(Feed::DirectMessages),
            other => Err(format!(
                "Unknown feed: {}. Use 'timeline' or 'dm'",
                other
            )),
        }
    }
}

//! Account model

use serde::{Deserialize, Serialize};

/// A server account owning a subtree of boards.
///
/// Carries the per-account sync watermark: the pull-start instant of the last
/// fully successful pull, in epoch milliseconds. `None` means never synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Local primary key
    pub id: i64,
    /// Unique display name of the account entry
    pub name: String,
    /// Login name on the server
    pub user_name: String,
    /// Server base URL, e.g. `https://cloud.example.com`
    pub url: String,
    /// Last successful pull-start time (epoch ms)
    pub last_sync: Option<i64>,
}

impl Account {
    /// Server base URL without a trailing slash
    pub fn normalized_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_url_strips_trailing_slash() {
        let account = Account {
            id: 1,
            name: "work".to_string(),
            user_name: "jane".to_string(),
            url: "https://cloud.example.com/".to_string(),
            last_sync: None,
        };
        assert_eq!(account.normalized_url(), "https://cloud.example.com");
    }
}

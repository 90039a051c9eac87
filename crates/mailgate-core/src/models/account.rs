//! Account and identity data structures

use serde::{Deserialize, Serialize};

/// A sending identity attached to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable identity key (e.g. "id1")
    pub id: String,

    /// Email address of the identity
    pub email: String,

    /// Full display name
    pub name: String,

    /// True for the account's default identity
    pub is_default: bool,
}

/// A mail account and its identities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Stable account key
    pub id: String,

    /// Human-readable account name
    pub name: String,

    /// Server type (e.g. "imap", "pop3", "none")
    #[serde(rename = "type")]
    pub kind: String,

    /// Identities owned by this account
    pub identities: Vec<Identity>,
}

impl AccountInfo {
    /// The account's default identity, falling back to the first one
    pub fn default_identity(&self) -> Option<&Identity> {
        self.identities
            .iter()
            .find(|i| i.is_default)
            .or_else(|| self.identities.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_identity_prefers_flagged_entry() {
        let account = AccountInfo {
            id: "acct1".to_string(),
            name: "Work".to_string(),
            kind: "imap".to_string(),
            identities: vec![
                Identity {
                    id: "id1".to_string(),
                    email: "a@example.com".to_string(),
                    name: "A".to_string(),
                    is_default: false,
                },
                Identity {
                    id: "id2".to_string(),
                    email: "b@example.com".to_string(),
                    name: "B".to_string(),
                    is_default: true,
                },
            ],
        };
        assert_eq!(account.default_identity().unwrap().id, "id2");
    }

    #[test]
    fn serializes_kind_as_type() {
        let account = AccountInfo {
            id: "acct1".to_string(),
            name: "Work".to_string(),
            kind: "imap".to_string(),
            identities: vec![],
        };
        let v = serde_json::to_value(&account).unwrap();
        assert_eq!(v["type"], "imap");
    }
}

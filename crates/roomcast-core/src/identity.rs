//! Identity attached to a session.

use serde::{Deserialize, Serialize};

/// Who a connected session belongs to.
///
/// Established and validated upstream before a session is registered. The
/// hub only copies it into presence messages and online-user snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id.
    #[serde(rename = "user_id")]
    pub id: i64,
    /// Display name chosen at connect time.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Role within the service (e.g. `host`, `participant`).
    pub role: String,
}

impl Identity {
    /// Build an identity.
    pub fn new(id: i64, display_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role: role.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names() {
        let id = Identity::new(7, "Juan", "participant");
        let v = serde_json::to_value(&id).unwrap();
        assert_eq!(v["user_id"], 7);
        assert_eq!(v["name"], "Juan");
        assert_eq!(v["role"], "participant");
        assert!(v.get("display_name").is_none());
    }

    #[test]
    fn deserialize_from_wire() {
        let json = r#"{"user_id":3,"name":"Ana","role":"host"}"#;
        let id: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(id, Identity::new(3, "Ana", "host"));
    }
}

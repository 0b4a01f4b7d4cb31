use serde::{Deserialize, Serialize};

/// Locally persisted record of the signed-in administrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorIdentity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "nome")]
    pub name: Option<String>,
}

impl ActorIdentity {
    /// Create an ActorIdentity with just an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
        }
    }

    /// Create an ActorIdentity with full user information
    pub fn with_details(id: impl Into<String>, email: Option<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
            name,
        }
    }

    /// Best label for notices: name, then email, then the raw id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Row of the backend user table, as read by the lookup cache and the
/// pre-flight existence check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "nome")]
    pub name: Option<String>,
}

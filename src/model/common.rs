use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub type Id = String;

/// The three catalog entity kinds that share the registration modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Handle,
    Rail,
    Glass,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind '{0}'")]
pub struct UnknownKind(pub String);

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Handle, EntityKind::Rail, EntityKind::Glass];

    /// Backend table holding rows of this kind
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Handle => "puxadores",
            EntityKind::Rail => "trilhos",
            EntityKind::Glass => "vidros",
        }
    }

    /// Column listings are ordered by
    pub fn natural_key(self) -> &'static str {
        match self {
            EntityKind::Handle => "modelo",
            EntityKind::Rail => "nome",
            EntityKind::Glass => "tipo",
        }
    }

    /// Whether rows carry the creating actor's id
    pub fn is_owned(self) -> bool {
        matches!(self, EntityKind::Handle | EntityKind::Rail)
    }

    /// Glass rows are deactivated instead of removed
    pub fn soft_deletes(self) -> bool {
        matches!(self, EntityKind::Glass)
    }

    /// Human-readable label used in notices and modal titles
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Handle => "Handle",
            EntityKind::Rail => "Rail",
            EntityKind::Glass => "Glass",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Handle => "handle",
            EntityKind::Rail => "rail",
            EntityKind::Glass => "glass",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "handle" | "puxador" => Ok(EntityKind::Handle),
            "rail" | "trilho" => Ok(EntityKind::Rail),
            "glass" | "vidro" => Ok(EntityKind::Glass),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Severity of an inline notice shown next to the modal or list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

use crate::model::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "medida")]
    pub size: String,
    #[serde(rename = "fabricante", default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "cor", default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "foto", default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(rename = "id_usuario", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Id>,
    #[serde(rename = "criado_em", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(rename = "nome")]
    pub name: String,
    /// Mounting style, `Embutir` or `Sobrepor`
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub mounting: Option<String>,
    #[serde(rename = "fabricante", default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "cor", default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "foto", default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(rename = "id_usuario", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Id>,
    #[serde(rename = "criado_em", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(rename = "tipo")]
    pub glass_type: String,
    /// `r,g,b[,a]` color specification consumed by the renderer
    #[serde(rename = "rgb", default, skip_serializing_if = "Option::is_none")]
    pub color_spec: Option<String>,
    #[serde(rename = "ativo", default = "default_active")]
    pub active: bool,
    #[serde(rename = "criado_em", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Handle {
    pub fn is_new(&self) -> bool {
        self.id.as_deref().map_or(true, str::is_empty)
    }
}

impl Rail {
    pub fn is_new(&self) -> bool {
        self.id.as_deref().map_or(true, str::is_empty)
    }
}

impl Glass {
    pub fn is_new(&self) -> bool {
        self.id.as_deref().map_or(true, str::is_empty)
    }
}

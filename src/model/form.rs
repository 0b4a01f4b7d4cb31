use crate::logic::color_spec::Swatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifiers of the fields hosted by the shared registration modal
pub mod field_ids {
    pub const ID: &str = "entity-id";
    pub const NAME: &str = "name";
    pub const SIZE: &str = "size";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const COLOR: &str = "color";
    pub const PHOTO: &str = "photo";
    pub const COLOR_SPEC: &str = "color-spec";
}

/// Flat key/value record exchanged between the form and the repositories.
/// Keys are backend column names (`modelo`, `tipo`, `rgb`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRecord(BTreeMap<String, String>);

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key`, trimmed, or `None` when absent or blank
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Present, non-blank `id` marks an existing record
    pub fn id(&self) -> Option<&str> {
        self.non_empty("id")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten a backend row. Nulls, arrays and objects are dropped;
    /// numbers and booleans are stringified.
    pub fn from_row(row: &serde_json::Value) -> Self {
        let mut record = Self::new();
        if let Some(object) = row.as_object() {
            for (key, value) in object {
                let text = match value {
                    serde_json::Value::String(text) => text.clone(),
                    serde_json::Value::Number(number) => number.to_string(),
                    serde_json::Value::Bool(flag) => flag.to_string(),
                    _ => continue,
                };
                record.insert(key.clone(), text);
            }
        }
        record
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Widget a field is rendered with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetKind {
    Text,
    Choice { options: Vec<String> },
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub label: String,
    pub widget: WidgetKind,
    pub required: bool,
    pub visible: bool,
}

impl FieldDescriptor {
    fn hidden_text(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            widget: WidgetKind::Text,
            required: false,
            visible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub descriptor: FieldDescriptor,
    pub value: String,
}

/// Binary picked through the photo field, uploaded on save
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Live swatch bound to a color-spec field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPreview {
    pub bound_field: String,
    pub swatch: Swatch,
    pub valid: bool,
}

/// Declarative model of the registration modal's form. The UI layer renders
/// it; nothing here touches a live widget tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    fields: Vec<FormField>,
    attachment: Option<Attachment>,
    preview: Option<ColorPreview>,
}

impl Default for FormState {
    fn default() -> Self {
        Self::blank()
    }
}

impl FormState {
    /// Base layout: the name field is always shown, everything else starts hidden
    pub fn blank() -> Self {
        let mut name = FieldDescriptor::hidden_text(field_ids::NAME, "Name");
        name.visible = true;
        name.required = true;

        let descriptors = vec![
            FieldDescriptor::hidden_text(field_ids::ID, "Id"),
            name,
            FieldDescriptor::hidden_text(field_ids::SIZE, "Size"),
            FieldDescriptor::hidden_text(field_ids::MANUFACTURER, "Manufacturer"),
            FieldDescriptor::hidden_text(field_ids::COLOR, "Color"),
            FieldDescriptor {
                widget: WidgetKind::File,
                ..FieldDescriptor::hidden_text(field_ids::PHOTO, "Photo")
            },
            FieldDescriptor::hidden_text(field_ids::COLOR_SPEC, "Color (r,g,b,a)"),
        ];

        Self {
            fields: descriptors
                .into_iter()
                .map(|descriptor| FormField {
                    descriptor,
                    value: String::new(),
                })
                .collect(),
            attachment: None,
            preview: None,
        }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.descriptor.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|field| field.descriptor.id == id)
    }

    /// Current value of `id`, empty for unknown fields
    pub fn value(&self, id: &str) -> &str {
        self.field(id).map(|field| field.value.as_str()).unwrap_or("")
    }

    /// Returns false when no field has this id
    pub fn set_value(&mut self, id: &str, value: impl Into<String>) -> bool {
        match self.field_mut(id) {
            Some(field) => {
                field.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn clear_values(&mut self) {
        for field in &mut self.fields {
            field.value.clear();
        }
        self.attachment = None;
    }

    /// Back to the blank layout, dropping values, attachment and preview
    pub fn reset(&mut self) {
        *self = Self::blank();
    }

    pub fn is_cleared(&self) -> bool {
        self.attachment.is_none() && self.fields.iter().all(|field| field.value.is_empty())
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|field| field.descriptor.visible)
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn set_attachment(&mut self, attachment: Option<Attachment>) {
        self.attachment = attachment;
    }

    pub fn preview(&self) -> Option<&ColorPreview> {
        self.preview.as_ref()
    }

    pub fn set_preview(&mut self, preview: Option<ColorPreview>) {
        self.preview = preview;
    }

    pub fn preview_mut(&mut self) -> Option<&mut ColorPreview> {
        self.preview.as_mut()
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::color_spec;
use crate::model::{EntityKind, FieldRecord};

/// Mounting styles a rail can be registered with
pub const RAIL_MOUNTINGS: [&str; 2] = ["Embutir", "Sobrepor"];

const MAX_TEXT_LEN: usize = 120;

/// Local, per-field failure. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn required(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} is required", label))
    }
}

/// Kind-specific checks on an extracted record. Collects every failure
/// instead of stopping at the first one.
pub fn validate_record(kind: EntityKind, record: &FieldRecord) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match kind {
        EntityKind::Handle => {
            require(record, "modelo", "Model", &mut errors);
            require(record, "medida", "Size", &mut errors);
        }
        EntityKind::Rail => {
            require(record, "nome", "Name", &mut errors);
            if let Some(mounting) = record.non_empty("tipo") {
                if !RAIL_MOUNTINGS.contains(&mounting) {
                    errors.push(ValidationError::new(
                        "tipo",
                        format!("Type must be one of {}", RAIL_MOUNTINGS.join(", ")),
                    ));
                }
            }
        }
        EntityKind::Glass => {
            require(record, "tipo", "Glass type", &mut errors);
            if let Some(spec) = record.non_empty("rgb") {
                if !color_spec::is_valid(spec) {
                    errors.push(ValidationError::new(
                        "rgb",
                        "Color must be r,g,b or r,g,b,a (e.g. 255,255,255,0.3)",
                    ));
                }
            }
        }
    }

    for (field, value) in record.iter() {
        if value.chars().count() > MAX_TEXT_LEN && field != "foto" {
            errors.push(ValidationError::new(
                field,
                format!("{} must be at most {} characters", field, MAX_TEXT_LEN),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Local check for operations addressing an existing row
pub fn require_id(id: Option<&str>) -> Result<&str, ValidationError> {
    id.map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ValidationError::required("id", "Record id"))
}

fn require(record: &FieldRecord, field: &str, label: &str, errors: &mut Vec<ValidationError>) {
    if record.non_empty(field).is_none() {
        errors.push(ValidationError::required(field, label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> FieldRecord {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_handle_requires_model_and_size() {
        let errors = validate_record(EntityKind::Handle, &record(&[("medida", "")])).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["modelo", "medida"]);
        assert_eq!(errors[0].to_string(), "modelo: Model is required");
    }

    #[test]
    fn test_rail_mounting_must_be_known() {
        assert!(validate_record(EntityKind::Rail, &record(&[("nome", "T1"), ("tipo", "Sobrepor")])).is_ok());
        assert!(validate_record(EntityKind::Rail, &record(&[("nome", "T1")])).is_ok());

        let errors =
            validate_record(EntityKind::Rail, &record(&[("nome", "T1"), ("tipo", "Colado")])).unwrap_err();
        assert_eq!(errors[0].field, "tipo");
    }

    #[test]
    fn test_glass_color_spec_is_checked() {
        assert!(validate_record(
            EntityKind::Glass,
            &record(&[("tipo", "Incolor"), ("rgb", "999,0,0,0.5")])
        )
        .is_ok());

        let errors =
            validate_record(EntityKind::Glass, &record(&[("tipo", "Incolor"), ("rgb", "red")])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "rgb");
    }

    #[test]
    fn test_overlong_text_is_rejected() {
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        let errors =
            validate_record(EntityKind::Rail, &record(&[("nome", long.as_str())])).unwrap_err();
        assert_eq!(errors[0].field, "nome");
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(Some(" abc ")), Ok("abc"));
        assert_eq!(require_id(Some("")).unwrap_err().field, "id");
        assert!(require_id(None).is_err());
    }
}

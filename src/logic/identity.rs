use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::model::ActorIdentity;

/// Prefix the auth layer gives identities that are not yet persisted server-side
pub const PROVISIONAL_ID_PREFIX: &str = "temp-";

static CANONICAL_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("canonical uuid pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("no signed-in user; please sign in again")]
    NotAuthenticated,
    #[error("signed-in user has no id; please sign in again")]
    MissingId,
    #[error("signed-in user '{0}' is provisional; please sign in again")]
    ProvisionalId(String),
    #[error("signed-in user id '{0}' is malformed; please sign in again")]
    MalformedId(String),
}

impl IdentityError {
    /// Every identity failure has the same remediation
    pub fn user_message(&self) -> &'static str {
        "Your session is no longer valid. Please re-authenticate and try again."
    }
}

/// Checks the current actor before any create/update/delete reaches the backend
pub struct IdentityValidator;

impl IdentityValidator {
    pub fn validate(actor: Option<&ActorIdentity>) -> Result<ActorIdentity, IdentityError> {
        let actor = actor.ok_or(IdentityError::NotAuthenticated)?;

        let id = actor.id.trim();
        if id.is_empty() {
            return Err(IdentityError::MissingId);
        }
        if id.starts_with(PROVISIONAL_ID_PREFIX) {
            return Err(IdentityError::ProvisionalId(id.to_string()));
        }
        if !CANONICAL_UUID.is_match(id) {
            return Err(IdentityError::MalformedId(id.to_string()));
        }

        Ok(ActorIdentity {
            id: id.to_ascii_lowercase(),
            email: normalize_optional(actor.email.as_deref()),
            name: normalize_optional(actor.name.as_deref()),
        })
    }
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_every_invalid_actor() {
        assert_eq!(
            IdentityValidator::validate(None),
            Err(IdentityError::NotAuthenticated)
        );
        assert_eq!(
            IdentityValidator::validate(Some(&ActorIdentity::new(""))),
            Err(IdentityError::MissingId)
        );
        assert_eq!(
            IdentityValidator::validate(Some(&ActorIdentity::new("   "))),
            Err(IdentityError::MissingId)
        );
        assert_eq!(
            IdentityValidator::validate(Some(&ActorIdentity::new("temp-abc"))),
            Err(IdentityError::ProvisionalId("temp-abc".to_string()))
        );
        assert_eq!(
            IdentityValidator::validate(Some(&ActorIdentity::new("not-a-uuid"))),
            Err(IdentityError::MalformedId("not-a-uuid".to_string()))
        );
    }

    #[test]
    fn test_accepts_canonical_uuid_and_normalizes() {
        let actor = ActorIdentity::with_details(
            " 0000000A-0000-0000-0000-000000000007 ",
            Some(" ana@example.com ".to_string()),
            Some("   ".to_string()),
        );

        let validated = IdentityValidator::validate(Some(&actor)).unwrap();
        assert_eq!(validated.id, "0000000a-0000-0000-0000-000000000007");
        assert_eq!(validated.email.as_deref(), Some("ana@example.com"));
        assert_eq!(validated.name, None);

        let plain = ActorIdentity::new("00000000-0000-0000-0000-000000000007");
        assert!(IdentityValidator::validate(Some(&plain)).is_ok());
    }

    #[test]
    fn test_uuid_without_hyphens_is_malformed() {
        let actor = ActorIdentity::new("00000000000000000000000000000007");
        assert!(matches!(
            IdentityValidator::validate(Some(&actor)),
            Err(IdentityError::MalformedId(_))
        ));
    }

    #[test]
    fn test_all_failures_share_remediation() {
        let message = IdentityError::NotAuthenticated.user_message();
        assert!(message.contains("re-authenticate"));
        assert_eq!(IdentityError::MissingId.user_message(), message);
    }
}

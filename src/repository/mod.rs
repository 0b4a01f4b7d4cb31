//! Uniform list/create/update/delete over the remote data service, one
//! repository per catalog kind. Each kind brings its columns and an embedded
//! fallback dataset served when the backend table is not provisioned.

pub mod glass;
pub mod handle;
pub mod rail;
pub mod registry;
pub mod upload;

pub use glass::GlassRepository;
pub use handle::HandleRepository;
pub use rail::RailRepository;
pub use registry::*;
pub use upload::*;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

use crate::logic::identity::{IdentityError, IdentityValidator};
use crate::logic::validation::{require_id, validate_record, ValidationError};
use crate::model::{generate_id, ActorIdentity, Attachment, EntityKind, FieldRecord};
use crate::store::{BackendError, DataService, ListQuery, Row, UserDirectory};

/// Column holding the public URL of an entity photo
pub const PHOTO_COLUMN: &str = "foto";

const REAUTHENTICATE: &str = "Your session is no longer valid. Please re-authenticate and try again.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("validation failed: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("signed-in user is not registered in the backend")]
    ActorNotRegistered,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ValidationError> for RepositoryError {
    fn from(err: ValidationError) -> Self {
        RepositoryError::Validation(vec![err])
    }
}

impl RepositoryError {
    /// One user-facing line per problem
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            RepositoryError::Validation(errors) => {
                errors.iter().map(|err| err.message.clone()).collect()
            }
            other => vec![other.user_message()],
        }
    }

    /// Translated message for the notice area. Unrecognized backend errors
    /// pass their raw message through.
    pub fn user_message(&self) -> String {
        match self {
            RepositoryError::Validation(_) => self.user_messages().join("; "),
            RepositoryError::Identity(err) => err.user_message().to_string(),
            RepositoryError::ActorNotRegistered => REAUTHENTICATE.to_string(),
            RepositoryError::Upload(UploadError::Backend(err)) => translate_backend(err),
            RepositoryError::Upload(UploadError::StorageUnavailable(_)) => {
                "Photo storage is unavailable, so the record was not saved. Please try again later."
                    .to_string()
            }
            RepositoryError::Upload(err) => err.to_string(),
            RepositoryError::Backend(err) => translate_backend(err),
        }
    }

    /// Local failures never reached the network
    pub fn is_local(&self) -> bool {
        match self {
            RepositoryError::Validation(_) | RepositoryError::Identity(_) => true,
            RepositoryError::Upload(err) => err.is_local(),
            _ => false,
        }
    }
}

fn translate_backend(err: &BackendError) -> String {
    match err {
        BackendError::ForeignKeyViolation { .. } => REAUTHENTICATE.to_string(),
        BackendError::UniquenessViolation { .. } => {
            "A record with this name already exists. Please choose another name.".to_string()
        }
        BackendError::Timeout => "Connection error while contacting the server. Please retry.".to_string(),
        BackendError::NotFound => "The record no longer exists.".to_string(),
        BackendError::RelationMissing { .. } | BackendError::Unknown { .. } => err.to_string(),
    }
}

/// Per-kind storage rules for [`EntityRepository`]
pub trait CatalogEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;
    /// Columns the form may write, excluding id, owner and flags
    const COLUMNS: &'static [&'static str];

    /// Rows shown while the backend table is missing
    fn fallback() -> Vec<Self>;

    fn list_query() -> ListQuery {
        ListQuery::new().order_by(Self::KIND.natural_key())
    }

    /// Values applied when the record leaves a column blank
    fn defaults() -> &'static [(&'static str, &'static str)] {
        &[]
    }

    fn normalize_column(_column: &str, value: &str) -> String {
        value.to_string()
    }

    fn takes_photo() -> bool {
        Self::COLUMNS.contains(&PHOTO_COLUMN)
    }
}

enum WriteMode {
    Create,
    Update,
}

pub struct EntityRepository<E> {
    data: Arc<dyn DataService>,
    uploads: Arc<UploadRepository>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: CatalogEntity> EntityRepository<E> {
    pub fn new(data: Arc<dyn DataService>, uploads: Arc<UploadRepository>) -> Self {
        Self {
            data,
            uploads,
            _entity: PhantomData,
        }
    }

    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    pub async fn list(&self) -> Result<Vec<E>, RepositoryError> {
        let table = E::KIND.table();
        match self.data.list(table, &E::list_query()).await {
            Ok(rows) => rows.into_iter().map(parse_row).collect(),
            Err(BackendError::RelationMissing { .. }) => {
                warn!("Table {} is missing; serving fallback {} data", table, E::KIND);
                Ok(E::fallback())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn create(
        &self,
        record: &FieldRecord,
        attachment: Option<&Attachment>,
        actor: Option<&ActorIdentity>,
    ) -> Result<E, RepositoryError> {
        validate_record(E::KIND, record).map_err(RepositoryError::Validation)?;
        check_attachment::<E>(attachment)?;
        let actor = IdentityValidator::validate(actor)?;

        if E::KIND.is_owned() {
            self.ensure_actor_registered(&actor).await?;
        }

        let photo = self.upload_photo(attachment).await?;
        let mut row = build_row::<E>(record, WriteMode::Create);
        if let Some(url) = photo {
            row.insert(PHOTO_COLUMN.to_string(), Value::String(url));
        }
        if E::KIND.is_owned() {
            row.insert("id_usuario".to_string(), Value::String(actor.id.clone()));
        }
        if E::KIND.soft_deletes() {
            row.insert("ativo".to_string(), Value::Bool(true));
        }

        let table = E::KIND.table();
        let stored = match self.data.insert(table, Value::Object(row.clone())).await {
            Ok(stored) => stored,
            Err(BackendError::RelationMissing { .. }) => {
                warn!("Table {} is missing; accepting {} create in demo mode", table, E::KIND);
                row.insert("id".to_string(), Value::String(generate_id()));
                row.insert(
                    "criado_em".to_string(),
                    Value::String(chrono::Utc::now().to_rfc3339()),
                );
                Value::Object(row)
            }
            Err(err) => return Err(err.into()),
        };

        info!("Created {} by {}", E::KIND, actor.id);
        parse_row(stored)
    }

    pub async fn update(
        &self,
        id: Option<&str>,
        record: &FieldRecord,
        attachment: Option<&Attachment>,
        actor: Option<&ActorIdentity>,
    ) -> Result<E, RepositoryError> {
        let id = require_id(id)?;
        validate_record(E::KIND, record).map_err(RepositoryError::Validation)?;
        check_attachment::<E>(attachment)?;
        let actor = IdentityValidator::validate(actor)?;

        let photo = self.upload_photo(attachment).await?;
        let mut row = build_row::<E>(record, WriteMode::Update);
        if let Some(url) = photo {
            row.insert(PHOTO_COLUMN.to_string(), Value::String(url));
        }

        let table = E::KIND.table();
        let stored = match self.data.update(table, Value::Object(row.clone()), id).await {
            Ok(stored) => stored,
            Err(BackendError::RelationMissing { .. }) => {
                warn!("Table {} is missing; accepting {} update in demo mode", table, E::KIND);
                row.insert("id".to_string(), Value::String(id.to_string()));
                Value::Object(row)
            }
            Err(err) => return Err(err.into()),
        };

        info!("Updated {} {} by {}", E::KIND, id, actor.id);
        parse_row(stored)
    }

    /// Hard delete, or deactivation for kinds that soft-delete
    pub async fn delete(&self, id: Option<&str>, actor: Option<&ActorIdentity>) -> Result<(), RepositoryError> {
        let id = require_id(id)?;
        let actor = IdentityValidator::validate(actor)?;
        let table = E::KIND.table();

        let outcome = if E::KIND.soft_deletes() {
            self.data
                .update(table, serde_json::json!({ "ativo": false }), id)
                .await
                .map(|_| ())
        } else {
            self.data.delete(table, id).await
        };

        match outcome {
            Ok(()) => {}
            Err(BackendError::RelationMissing { .. }) => {
                warn!("Table {} is missing; accepting {} delete in demo mode", table, E::KIND);
            }
            Err(err) => return Err(err.into()),
        }

        info!("Deleted {} {} by {}", E::KIND, id, actor.id);
        Ok(())
    }

    /// Pre-flight check that the actor exists server-side, so the owner
    /// foreign key cannot fail after the fact. Skipped without a user table.
    async fn ensure_actor_registered(&self, actor: &ActorIdentity) -> Result<(), RepositoryError> {
        let query = ListQuery::new().eq("id", actor.id.clone()).limit(1);
        match self.data.list(UserDirectory::TABLE, &query).await {
            Ok(rows) if rows.is_empty() => Err(RepositoryError::ActorNotRegistered),
            Ok(_) => Ok(()),
            Err(BackendError::RelationMissing { .. }) => {
                info!("User table missing; skipping actor check (demo mode)");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn upload_photo(&self, attachment: Option<&Attachment>) -> Result<Option<String>, RepositoryError> {
        match attachment {
            Some(file) if E::takes_photo() => Ok(Some(self.uploads.upload(file, E::KIND.table()).await?)),
            _ => Ok(None),
        }
    }
}

/// Local attachment rules: the kind must have a photo column and the file
/// must pass the upload checks
fn check_attachment<E: CatalogEntity>(attachment: Option<&Attachment>) -> Result<(), RepositoryError> {
    let Some(file) = attachment else {
        return Ok(());
    };
    if !E::takes_photo() {
        return Err(ValidationError::new(
            PHOTO_COLUMN,
            format!("{} records do not take a photo", E::KIND.label()),
        )
        .into());
    }
    UploadRepository::check(file)?;
    Ok(())
}

fn build_row<E: CatalogEntity>(record: &FieldRecord, mode: WriteMode) -> Map<String, Value> {
    let mut row = Map::new();
    for column in E::COLUMNS {
        match record.non_empty(column) {
            Some(value) => {
                row.insert(column.to_string(), Value::String(E::normalize_column(column, value)));
            }
            None => {
                let default = E::defaults().iter().find(|(c, _)| c == column);
                match (default, &mode) {
                    (Some((_, value)), _) => {
                        row.insert(column.to_string(), Value::String(value.to_string()));
                    }
                    // a blank field on edit clears the stored value
                    (None, WriteMode::Update) => {
                        row.insert(column.to_string(), Value::Null);
                    }
                    (None, WriteMode::Create) => {}
                }
            }
        }
    }
    row
}

fn parse_row<E: CatalogEntity>(row: Row) -> Result<E, RepositoryError> {
    serde_json::from_value(row).map_err(|err| {
        RepositoryError::Backend(BackendError::unknown(format!(
            "unexpected {} row: {}",
            E::KIND,
            err
        )))
    })
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::logic::field_mapper::FieldMapper;
use crate::logic::validation::{validate_record, ValidationError};
use crate::model::{ActorIdentity, Attachment, EntityKind, FieldRecord, FormState};
use crate::repository::{
    CatalogEntity, EntityRepository, GlassRepository, HandleRepository, RailRepository,
    RepositoryError, UploadRepository,
};
use crate::store::DataService;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a handler for {0} is already registered")]
    AlreadyRegistered(EntityKind),
    #[error("no handler registered for {0}")]
    UnknownKind(EntityKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecord {
    pub kind: EntityKind,
    pub action: SaveAction,
    pub row: Value,
}

/// Per-kind handler set. Closed over the three catalog kinds so dispatch is
/// a match rather than a lookup by string.
pub enum KindHandler {
    Handle(HandleRepository),
    Rail(RailRepository),
    Glass(GlassRepository),
}

impl KindHandler {
    pub fn for_kind(kind: EntityKind, data: Arc<dyn DataService>, uploads: Arc<UploadRepository>) -> Self {
        match kind {
            EntityKind::Handle => KindHandler::Handle(EntityRepository::new(data, uploads)),
            EntityKind::Rail => KindHandler::Rail(EntityRepository::new(data, uploads)),
            EntityKind::Glass => KindHandler::Glass(EntityRepository::new(data, uploads)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            KindHandler::Handle(_) => EntityKind::Handle,
            KindHandler::Rail(_) => EntityKind::Rail,
            KindHandler::Glass(_) => EntityKind::Glass,
        }
    }

    /// Lay the form out for this kind, then fill it from `record` or with
    /// the kind's blank defaults
    pub fn open(&self, mapper: &FieldMapper, form: &mut FormState, record: Option<&FieldRecord>) {
        let kind = self.kind();
        form.reset();
        mapper.configure_fields_for(kind, form);
        match record {
            Some(existing) => mapper.populate(kind, form, existing),
            None => mapper.clear(kind, form),
        }
    }

    pub fn close(&self, form: &mut FormState) {
        form.reset();
    }

    pub fn validate(&self, record: &FieldRecord) -> Result<(), Vec<ValidationError>> {
        validate_record(self.kind(), record)
    }

    /// Rows in wire form, for populating the form or rendering a table
    pub async fn list(&self) -> Result<Vec<Value>, RepositoryError> {
        match self {
            KindHandler::Handle(repo) => to_rows(repo.list().await?),
            KindHandler::Rail(repo) => to_rows(repo.list().await?),
            KindHandler::Glass(repo) => to_rows(repo.list().await?),
        }
    }

    /// Create when the record has no id, update otherwise
    pub async fn save(
        &self,
        record: &FieldRecord,
        attachment: Option<&Attachment>,
        actor: Option<&ActorIdentity>,
    ) -> Result<SavedRecord, RepositoryError> {
        match self {
            KindHandler::Handle(repo) => save_with(repo, record, attachment, actor).await,
            KindHandler::Rail(repo) => save_with(repo, record, attachment, actor).await,
            KindHandler::Glass(repo) => save_with(repo, record, attachment, actor).await,
        }
    }

    pub async fn delete(&self, id: Option<&str>, actor: Option<&ActorIdentity>) -> Result<(), RepositoryError> {
        match self {
            KindHandler::Handle(repo) => repo.delete(id, actor).await,
            KindHandler::Rail(repo) => repo.delete(id, actor).await,
            KindHandler::Glass(repo) => repo.delete(id, actor).await,
        }
    }
}

async fn save_with<E: CatalogEntity>(
    repo: &EntityRepository<E>,
    record: &FieldRecord,
    attachment: Option<&Attachment>,
    actor: Option<&ActorIdentity>,
) -> Result<SavedRecord, RepositoryError> {
    let (action, saved) = match record.id() {
        Some(id) => (SaveAction::Updated, repo.update(Some(id), record, attachment, actor).await?),
        None => (SaveAction::Created, repo.create(record, attachment, actor).await?),
    };
    let row = serde_json::to_value(saved).map_err(|err| {
        RepositoryError::Backend(crate::store::BackendError::unknown(err.to_string()))
    })?;
    Ok(SavedRecord {
        kind: E::KIND,
        action,
        row,
    })
}

fn to_rows<E: CatalogEntity>(entities: Vec<E>) -> Result<Vec<Value>, RepositoryError> {
    entities
        .into_iter()
        .map(|entity| {
            serde_json::to_value(entity).map_err(|err| {
                RepositoryError::Backend(crate::store::BackendError::unknown(err.to_string()))
            })
        })
        .collect()
}

/// One handler per kind, registered once
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EntityKind, KindHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a handler for every catalog kind
    pub fn with_all_kinds(data: Arc<dyn DataService>, uploads: Arc<UploadRepository>) -> Self {
        let mut registry = Self::new();
        for kind in EntityKind::ALL {
            registry
                .handlers
                .insert(kind, KindHandler::for_kind(kind, data.clone(), uploads.clone()));
        }
        registry
    }

    pub fn register(&mut self, handler: KindHandler) -> Result<(), RegistryError> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: EntityKind) -> Result<&KindHandler, RegistryError> {
        self.handlers.get(&kind).ok_or(RegistryError::UnknownKind(kind))
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.handlers.contains_key(kind))
            .collect()
    }
}

//! The single registration modal shared by every catalog kind.
//!
//! The coordinator owns the form and the session. The lock around them is
//! only held for synchronous bookkeeping; repository calls happen outside it,
//! and a generation counter keeps a save that finishes after a forced close
//! from touching whatever session exists by then.

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::logic::field_mapper::FieldMapper;
use crate::logic::modal_state::{transition, ModalEvent, ModalState, TransitionError};
use crate::logic::notifier::ChangeNotifier;
use crate::logic::validation::ValidationError;
use crate::model::field_ids::PHOTO;
use crate::model::{Attachment, ColorPreview, EntityKind, FieldRecord, FormField, FormState, Severity};
use crate::repository::{HandlerRegistry, RegistryError, RepositoryError, SavedRecord, UploadRepository};
use crate::store::ActorSource;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("unknown entity kind '{0}'")]
    UnknownKind(String),
    #[error("no registration modal is open")]
    NoActiveSession,
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error("the registration modal is not open")]
    NotOpen,
    #[error("validation failed")]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<RegistryError> for CoordinatorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownKind(kind) | RegistryError::AlreadyRegistered(kind) => {
                CoordinatorError::UnknownKind(kind.to_string())
            }
        }
    }
}

impl CoordinatorError {
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            CoordinatorError::Validation(errors) => errors.iter().map(|err| err.message.clone()).collect(),
            CoordinatorError::Repository(err) => err.user_messages(),
            other => vec![other.to_string()],
        }
    }
}

/// Kind and record the modal was opened with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalSession {
    pub kind: EntityKind,
    pub record: Option<FieldRecord>,
}

/// UI event that triggered a save. The coordinator suppresses the default
/// browser submit.
#[derive(Debug, Default)]
pub struct SaveEvent {
    default_prevented: bool,
}

impl SaveEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Point-in-time view of the modal, as rendered by the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalSnapshot {
    pub state: ModalState,
    pub session: Option<ModalSession>,
    pub fields: Vec<FormField>,
    pub preview: Option<ColorPreview>,
    pub attachment: Option<String>,
    pub errors: Vec<String>,
}

struct ModalInner {
    state: ModalState,
    session: Option<ModalSession>,
    form: FormState,
    errors: Vec<String>,
    generation: u64,
}

impl ModalInner {
    fn snapshot(&self) -> ModalSnapshot {
        ModalSnapshot {
            state: self.state,
            session: self.session.clone(),
            fields: self.form.fields().to_vec(),
            preview: self.form.preview().cloned(),
            attachment: self.form.attachment().map(|file| file.file_name.clone()),
            errors: self.errors.clone(),
        }
    }

    fn require_editable(&self) -> Result<(), CoordinatorError> {
        match self.state {
            ModalState::OpenFor(_) => Ok(()),
            ModalState::Saving(_) => Err(CoordinatorError::SaveInFlight),
            ModalState::Closed => Err(CoordinatorError::NotOpen),
        }
    }
}

pub struct ModalCoordinator {
    registry: Arc<HandlerRegistry>,
    mapper: FieldMapper,
    actors: Arc<dyn ActorSource>,
    notifier: Arc<dyn ChangeNotifier>,
    inner: Mutex<ModalInner>,
}

impl ModalCoordinator {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        actors: Arc<dyn ActorSource>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            registry,
            mapper: FieldMapper::new(),
            actors,
            notifier,
            inner: Mutex::new(ModalInner {
                state: ModalState::Closed,
                session: None,
                form: FormState::blank(),
                errors: Vec::new(),
                generation: 0,
            }),
        }
    }

    pub fn state(&self) -> ModalState {
        self.inner.lock().state
    }

    pub fn session(&self) -> Option<ModalSession> {
        self.inner.lock().session.clone()
    }

    pub fn snapshot(&self) -> ModalSnapshot {
        self.inner.lock().snapshot()
    }

    /// Show the modal for `kind`, editing `record` when given. Replaces any
    /// session that is open but not saving.
    pub fn open(&self, kind: EntityKind, record: Option<FieldRecord>) -> Result<ModalSnapshot, CoordinatorError> {
        let handler = self.registry.get(kind)?;

        let mut inner = self.inner.lock();
        let next = transition(inner.state, ModalEvent::Open(kind)).map_err(|err| match err {
            TransitionError::SaveInFlight => CoordinatorError::SaveInFlight,
            _ => CoordinatorError::NotOpen,
        })?;

        handler.open(&self.mapper, &mut inner.form, record.as_ref());

        inner.state = next;
        inner.session = Some(ModalSession { kind, record });
        inner.errors.clear();
        inner.generation += 1;

        debug!("Opened registration modal for {}", kind);
        Ok(inner.snapshot())
    }

    /// Extract, validate and persist the open form. On success the modal
    /// closes and listings of the kind are signalled stale; on failure it
    /// stays open with the translated messages.
    pub async fn save(&self, event: &mut SaveEvent) -> Result<SavedRecord, CoordinatorError> {
        let (kind, record, attachment, generation) = {
            let mut inner = self.inner.lock();
            let Some(kind) = inner.session.as_ref().map(|session| session.kind) else {
                warn!("Save requested with no registration modal open");
                return Err(CoordinatorError::NoActiveSession);
            };
            let next = transition(inner.state, ModalEvent::BeginSave).map_err(|err| match err {
                TransitionError::SaveInFlight => CoordinatorError::SaveInFlight,
                _ => CoordinatorError::NoActiveSession,
            })?;

            event.prevent_default();

            let mut record = self.mapper.extract(kind, &inner.form);
            if record.id().is_none() {
                if let Some(id) = inner
                    .session
                    .as_ref()
                    .and_then(|session| session.record.as_ref())
                    .and_then(|existing| existing.id())
                {
                    record.insert("id", id);
                }
            }

            if let Err(errors) = self.registry.get(kind)?.validate(&record) {
                inner.errors = errors.iter().map(|err| err.message.clone()).collect();
                let message = inner.errors.join("; ");
                drop(inner);
                self.notifier.notify(&message, Severity::Warning);
                return Err(CoordinatorError::Validation(errors));
            }

            inner.state = next;
            inner.errors.clear();
            (kind, record, inner.form.attachment().cloned(), inner.generation)
        };

        let actor = self.actors.current_actor();
        let outcome = self
            .registry
            .get(kind)?
            .save(&record, attachment.as_ref(), actor.as_ref())
            .await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            drop(inner);
            info!("Save for {} finished after the modal was force-closed", kind);
            if outcome.is_ok() {
                self.notifier.kind_changed(kind);
            }
            return outcome.map_err(CoordinatorError::from);
        }

        match outcome {
            Ok(saved) => {
                // Saving -> Closed cannot fail here
                inner.state = transition(inner.state, ModalEvent::SaveSucceeded).unwrap_or(ModalState::Closed);
                self.teardown(&mut inner);
                drop(inner);

                info!("Saved {} ({:?})", kind, saved.action);
                self.notifier.kind_changed(kind);
                self.notifier
                    .notify(&format!("{} saved", kind.label()), Severity::Success);
                self.notifier.modal_closed();
                Ok(saved)
            }
            Err(err) => {
                inner.state = transition(inner.state, ModalEvent::SaveFailed).unwrap_or(ModalState::OpenFor(kind));
                inner.errors = err.user_messages();
                drop(inner);

                warn!("Saving {} failed: {}", kind, err);
                self.notifier.notify(&err.user_message(), Severity::Error);
                Err(err.into())
            }
        }
    }

    /// Cancel an open modal. Rejected while a save is in flight.
    pub fn close(&self) -> Result<(), CoordinatorError> {
        let mut inner = self.inner.lock();
        inner.state = transition(inner.state, ModalEvent::Close).map_err(|err| match err {
            TransitionError::SaveInFlight => CoordinatorError::SaveInFlight,
            _ => CoordinatorError::NotOpen,
        })?;
        self.teardown(&mut inner);
        drop(inner);

        self.notifier.modal_closed();
        Ok(())
    }

    /// Close from any state. Calling it on a closed modal does nothing.
    pub fn force_close(&self) {
        let mut inner = self.inner.lock();
        if inner.state == ModalState::Closed && inner.session.is_none() {
            return;
        }
        let was_saving = matches!(inner.state, ModalState::Saving(_));
        // ForceClose is accepted from every state
        inner.state = transition(inner.state, ModalEvent::ForceClose).unwrap_or(ModalState::Closed);
        self.teardown(&mut inner);
        drop(inner);

        if was_saving {
            warn!("Registration modal force-closed while saving");
        }
        self.notifier.modal_closed();
    }

    /// Back to an empty form with no session. The caller has already moved
    /// the state to `Closed`.
    fn teardown(&self, inner: &mut ModalInner) {
        let handler = inner
            .session
            .take()
            .and_then(|session| self.registry.get(session.kind).ok());
        match handler {
            Some(handler) => handler.close(&mut inner.form),
            None => inner.form.reset(),
        }
        inner.errors.clear();
        inner.generation += 1;
    }

    pub async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), CoordinatorError> {
        let handler = self.registry.get(kind)?;
        let actor = self.actors.current_actor();

        match handler.delete(Some(id), actor.as_ref()).await {
            Ok(()) => {
                self.notifier.kind_changed(kind);
                self.notifier
                    .notify(&format!("{} removed", kind.label()), Severity::Success);
                Ok(())
            }
            Err(err) => {
                warn!("Deleting {} {} failed: {}", kind, id, err);
                self.notifier.notify(&err.user_message(), Severity::Error);
                Err(err.into())
            }
        }
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Value>, CoordinatorError> {
        Ok(self.registry.get(kind)?.list().await?)
    }

    /// Field-change event from the UI
    pub fn update_field(&self, field_id: &str, value: &str) -> Result<ModalSnapshot, CoordinatorError> {
        let mut inner = self.inner.lock();
        inner.require_editable()?;
        if !self.mapper.apply_change(&mut inner.form, field_id, value) {
            return Err(CoordinatorError::Validation(vec![ValidationError::new(
                field_id,
                format!("Unknown field '{}'", field_id),
            )]));
        }
        Ok(inner.snapshot())
    }

    /// Stage a photo for the next save. Only kinds with a photo field take
    /// one, and the file must pass the upload checks.
    pub fn attach(&self, file: Attachment) -> Result<ModalSnapshot, CoordinatorError> {
        let mut inner = self.inner.lock();
        inner.require_editable()?;
        let Some(kind) = inner.session.as_ref().map(|session| session.kind) else {
            return Err(CoordinatorError::NotOpen);
        };
        if !self.mapper.descriptors(kind).iter().any(|field| field.id == PHOTO) {
            return Err(CoordinatorError::Validation(vec![ValidationError::new(
                PHOTO,
                format!("{} records do not take a photo", kind.label()),
            )]));
        }
        UploadRepository::check(&file).map_err(RepositoryError::from)?;
        debug!("Attached {} ({} bytes)", file.file_name, file.bytes.len());
        inner.form.set_attachment(Some(file));
        Ok(inner.snapshot())
    }
}

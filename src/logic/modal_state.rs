use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::EntityKind;

/// Lifecycle of the single registration modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "kind", rename_all = "snake_case")]
pub enum ModalState {
    Closed,
    OpenFor(EntityKind),
    Saving(EntityKind),
}

impl ModalState {
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            ModalState::Closed => None,
            ModalState::OpenFor(kind) | ModalState::Saving(kind) => Some(*kind),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, ModalState::Closed)
    }
}

impl Default for ModalState {
    fn default() -> Self {
        ModalState::Closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalEvent {
    Open(EntityKind),
    BeginSave,
    SaveSucceeded,
    SaveFailed,
    Close,
    ForceClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("no registration modal is open")]
    NoActiveSession,
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error("no save is in progress")]
    NoSaveInFlight,
}

/// Apply `event` to `state`. `ForceClose` is accepted from every state.
pub fn transition(state: ModalState, event: ModalEvent) -> Result<ModalState, TransitionError> {
    use ModalEvent::*;
    use ModalState::*;

    match (state, event) {
        (_, ForceClose) => Ok(Closed),

        (Saving(_), Open(_)) => Err(TransitionError::SaveInFlight),
        (Closed | OpenFor(_), Open(kind)) => Ok(OpenFor(kind)),

        (OpenFor(kind), BeginSave) => Ok(Saving(kind)),
        (Saving(_), BeginSave) => Err(TransitionError::SaveInFlight),
        (Closed, BeginSave) => Err(TransitionError::NoActiveSession),

        (Saving(_), SaveSucceeded) => Ok(Closed),
        (Saving(kind), SaveFailed) => Ok(OpenFor(kind)),
        (Closed | OpenFor(_), SaveSucceeded | SaveFailed) => Err(TransitionError::NoSaveInFlight),

        (OpenFor(_), Close) => Ok(Closed),
        (Saving(_), Close) => Err(TransitionError::SaveInFlight),
        (Closed, Close) => Err(TransitionError::NoActiveSession),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ModalEvent::*;
    use ModalState::*;

    #[test]
    fn test_happy_path() {
        let state = transition(Closed, Open(EntityKind::Glass)).unwrap();
        assert_eq!(state, OpenFor(EntityKind::Glass));
        let state = transition(state, BeginSave).unwrap();
        assert_eq!(state, Saving(EntityKind::Glass));
        assert_eq!(transition(state, SaveSucceeded), Ok(Closed));
    }

    #[test]
    fn test_failed_save_returns_to_open() {
        assert_eq!(
            transition(Saving(EntityKind::Rail), SaveFailed),
            Ok(OpenFor(EntityKind::Rail))
        );
    }

    #[test]
    fn test_saving_blocks_reentry() {
        let saving = Saving(EntityKind::Handle);
        assert_eq!(transition(saving, BeginSave), Err(TransitionError::SaveInFlight));
        assert_eq!(
            transition(saving, Open(EntityKind::Rail)),
            Err(TransitionError::SaveInFlight)
        );
        assert_eq!(transition(saving, Close), Err(TransitionError::SaveInFlight));
    }

    #[test]
    fn test_closed_rejects_save_and_close() {
        assert_eq!(transition(Closed, BeginSave), Err(TransitionError::NoActiveSession));
        assert_eq!(transition(Closed, Close), Err(TransitionError::NoActiveSession));
        assert_eq!(transition(Closed, SaveFailed), Err(TransitionError::NoSaveInFlight));
    }

    #[test]
    fn test_reopen_switches_kind() {
        assert_eq!(
            transition(OpenFor(EntityKind::Handle), Open(EntityKind::Glass)),
            Ok(OpenFor(EntityKind::Glass))
        );
    }

    #[test]
    fn test_force_close_from_any_state() {
        for state in [
            Closed,
            OpenFor(EntityKind::Handle),
            Saving(EntityKind::Glass),
        ] {
            assert_eq!(transition(state, ForceClose), Ok(Closed));
        }
    }
}

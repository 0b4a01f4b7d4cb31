use log::warn;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

use crate::model::ActorIdentity;
use crate::store::traits::ActorSource;

/// Reads the actor record the auth layer persists as JSON on disk.
/// The file is re-read on every call so sign-in/sign-out is picked up live.
#[derive(Debug, Clone)]
pub struct LocalActorStore {
    path: PathBuf,
}

impl LocalActorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActorSource for LocalActorStore {
    fn current_actor(&self) -> Option<ActorIdentity> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Failed to read actor record {}: {}", self.path.display(), err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(actor) => Some(actor),
            Err(err) => {
                warn!("Ignoring unreadable actor record {}: {}", self.path.display(), err);
                None
            }
        }
    }
}

/// Actor held in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct SessionActor {
    actor: RwLock<Option<ActorIdentity>>,
}

impl SessionActor {
    pub fn new(actor: Option<ActorIdentity>) -> Self {
        Self {
            actor: RwLock::new(actor),
        }
    }

    pub fn set(&self, actor: Option<ActorIdentity>) {
        *self.actor.write() = actor;
    }
}

impl ActorSource for SessionActor {
    fn current_actor(&self) -> Option<ActorIdentity> {
        self.actor.read().clone()
    }
}

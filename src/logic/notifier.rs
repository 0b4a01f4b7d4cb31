use serde::{Deserialize, Serialize};

use crate::model::{EntityKind, Severity};

/// Signal produced for the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// Listings of this kind are stale and should be reloaded
    KindChanged { kind: EntityKind },
    Notice { message: String, severity: Severity },
    ModalClosed,
}

/// Sink for the signals the coordinator produces. Implementations must not
/// call back into the coordinator.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, signal: Signal);

    fn kind_changed(&self, kind: EntityKind) {
        self.publish(Signal::KindChanged { kind });
    }

    fn notify(&self, message: &str, severity: Severity) {
        self.publish(Signal::Notice {
            message: message.to_string(),
            severity,
        });
    }

    fn modal_closed(&self) {
        self.publish(Signal::ModalClosed);
    }
}

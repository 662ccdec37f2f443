use serde::{Deserialize, Serialize};

/// Host application lifecycle signals the controller reacts to.
///
/// Both signals force a full teardown of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    DidEnterBackground,
    WillTerminate,
}

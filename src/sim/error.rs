use thiserror::Error;

/// Errors raised at the simulator control boundary.
///
/// Every control-API call is fallible: the simulator is an external
/// collaborator and may reject a command or drop the session at any time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("No simulation session is running")]
    NotRunning,

    #[error("A simulation session is already running")]
    AlreadyRunning,

    #[error("Unknown edge id: {0}")]
    UnknownEdge(String),

    #[error("Unknown lane id: {0}")]
    UnknownLane(String),

    #[error("Unknown traffic signal id: {0}")]
    UnknownSignal(String),

    #[error("Simulator protocol error: {0}")]
    Protocol(String),
}

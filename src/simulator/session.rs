use thiserror::Error;

use crate::shared_data::SignalPhase;

/// Errors crossing the simulator boundary. Everything here is treated as an
/// integration defect by the control loop: propagated, never retried.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("simulator i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to launch simulator: {0}")]
    Launch(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("simulator rejected command {command:#04x}: {description}")]
    Rejected { command: u8, description: String },
    #[error("session is closed")]
    Closed,
    #[error("simulator reported unknown phase index {0}")]
    UnknownPhase(i32),
}

/// The operations the control loop needs from a running simulation.
///
/// One session is exclusively owned by one run; every call is a synchronous
/// round-trip to the simulator. `close` must be idempotent, and after it
/// succeeds every other operation fails with [`SessionError::Closed`].
pub trait SimulatorSession {
    /// Current simulated time. Monotonic; increases by the base step length
    /// on every [`advance_step`](Self::advance_step).
    fn simulated_time(&mut self) -> Result<f64, SessionError>;

    fn current_phase(&mut self, tls_id: &str) -> Result<SignalPhase, SessionError>;

    /// Commands an immediate phase change, observed on the next state read.
    fn set_phase(&mut self, tls_id: &str, phase: SignalPhase) -> Result<(), SessionError>;

    /// Vehicles halted on the named edge during the last step.
    fn halting_count(&mut self, edge_id: &str) -> Result<u32, SessionError>;

    /// Vehicles present on the named edge during the last step.
    fn vehicle_count(&mut self, edge_id: &str) -> Result<u32, SessionError>;

    /// Advances simulated time by one base step.
    fn advance_step(&mut self) -> Result<(), SessionError>;

    fn close(&mut self) -> Result<(), SessionError>;
}

use crate::shared_data::SignalPhase;
use crate::simulator::session::{SessionError, SimulatorSession};

/// Where the controller believes the signal is between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Stable(SignalPhase),
    Clearing {
        from: SignalPhase,
        to: SignalPhase,
        remaining: u32,
    },
}

/// Enforces the clearance protocol around every phase change: a stable
/// phase is never swapped for another stable phase directly, the signal
/// always passes through the current phase's yellow for a fixed number of
/// steps first.
#[derive(Debug, Clone)]
pub struct SafeTransitionController {
    tls_id: String,
    clearance_steps: u32,
    state: ControllerState,
}

impl SafeTransitionController {
    /// Attaches to the signal, reading the phase the simulator actually
    /// reports rather than assuming one.
    pub fn attach<S: SimulatorSession>(
        session: &mut S,
        tls_id: impl Into<String>,
        clearance_steps: u32,
    ) -> Result<Self, SessionError> {
        let tls_id = tls_id.into();
        let phase = session.current_phase(&tls_id)?;
        Ok(Self {
            tls_id,
            clearance_steps,
            state: ControllerState::Stable(phase),
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Moves the signal to `target`, inserting the mandatory clearance
    /// phase. Requesting the already-active phase is always free. Returns
    /// the number of extra simulation steps consumed.
    ///
    /// The current phase is re-read from the simulator on every request;
    /// its report is the sole source of truth, including after a reattach.
    pub fn request<S: SimulatorSession>(
        &mut self,
        session: &mut S,
        target: SignalPhase,
    ) -> Result<u32, SessionError> {
        let current = session.current_phase(&self.tls_id)?;
        if current == target {
            self.state = ControllerState::Stable(current);
            return Ok(0);
        }

        session.set_phase(&self.tls_id, current.clearance())?;
        for elapsed in 0..self.clearance_steps {
            self.state = ControllerState::Clearing {
                from: current,
                to: target,
                remaining: self.clearance_steps - elapsed,
            };
            session.advance_step()?;
        }
        session.set_phase(&self.tls_id, target)?;
        self.state = ControllerState::Stable(target);
        Ok(self.clearance_steps)
    }
}

//! In-memory stand-in for a live simulator connection. Backs the
//! integration tests and benches: metrics come from per-step scripts, and
//! every phase command and step advance is recorded for inspection.

use std::collections::HashMap;

use crate::shared_data::SignalPhase;

use super::session::{SessionError, SimulatorSession};

/// A fixed-duration signal plan that advances on its own, approximating the
/// simulator-native program that runs when no policy intervenes. Durations
/// are in base steps, indexed by phase.
#[derive(Debug, Clone)]
pub struct NativePlan {
    pub durations: [u32; 4],
}

impl NativePlan {
    fn duration_of(&self, phase: SignalPhase) -> u32 {
        self.durations[phase.index() as usize]
    }
}

/// The phase cycle of the native program.
fn next_in_cycle(phase: SignalPhase) -> SignalPhase {
    match phase {
        SignalPhase::NorthSouthGreen => SignalPhase::NorthSouthYellow,
        SignalPhase::NorthSouthYellow => SignalPhase::EastWestGreen,
        SignalPhase::EastWestGreen => SignalPhase::EastWestYellow,
        SignalPhase::EastWestYellow => SignalPhase::NorthSouthGreen,
    }
}

/// Scripted session: time starts at zero and moves in unit steps, per-edge
/// metric series are indexed by step (the last entry repeats), and the
/// signal either holds its phase or follows an optional [`NativePlan`].
#[derive(Debug)]
pub struct ScriptedSession {
    time: f64,
    step: usize,
    phase: SignalPhase,
    remaining_in_phase: u32,
    plan: Option<NativePlan>,
    halting: HashMap<String, Vec<u32>>,
    vehicles: HashMap<String, Vec<u32>>,
    /// Every phase commanded through `set_phase`, in order.
    pub phase_commands: Vec<SignalPhase>,
    pub advance_calls: u64,
    pub closed: bool,
    /// When set, `advance_step` fails once this many advances have run.
    pub fail_advance_after: Option<u64>,
}

impl ScriptedSession {
    pub fn new(initial_phase: SignalPhase) -> Self {
        Self {
            time: 0.0,
            step: 0,
            phase: initial_phase,
            remaining_in_phase: 0,
            plan: None,
            halting: HashMap::new(),
            vehicles: HashMap::new(),
            phase_commands: Vec::new(),
            advance_calls: 0,
            closed: false,
            fail_advance_after: None,
        }
    }

    pub fn with_plan(mut self, plan: NativePlan) -> Self {
        self.remaining_in_phase = plan.duration_of(self.phase);
        self.plan = Some(plan);
        self
    }

    /// Scripts the halting count series for an edge. Steps beyond the end of
    /// the series repeat the last value.
    pub fn set_halting_series(&mut self, edge_id: &str, series: Vec<u32>) {
        self.halting.insert(edge_id.to_string(), series);
    }

    pub fn set_vehicle_series(&mut self, edge_id: &str, series: Vec<u32>) {
        self.vehicles.insert(edge_id.to_string(), series);
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn sample(map: &HashMap<String, Vec<u32>>, edge_id: &str, step: usize) -> u32 {
        map.get(edge_id)
            .and_then(|series| series.get(step).or_else(|| series.last()))
            .copied()
            .unwrap_or(0)
    }
}

impl SimulatorSession for ScriptedSession {
    fn simulated_time(&mut self) -> Result<f64, SessionError> {
        self.ensure_open()?;
        Ok(self.time)
    }

    fn current_phase(&mut self, _tls_id: &str) -> Result<SignalPhase, SessionError> {
        self.ensure_open()?;
        Ok(self.phase)
    }

    fn set_phase(&mut self, _tls_id: &str, phase: SignalPhase) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.phase_commands.push(phase);
        self.phase = phase;
        if let Some(plan) = &self.plan {
            self.remaining_in_phase = plan.duration_of(phase);
        }
        Ok(())
    }

    fn halting_count(&mut self, edge_id: &str) -> Result<u32, SessionError> {
        self.ensure_open()?;
        Ok(Self::sample(&self.halting, edge_id, self.step))
    }

    fn vehicle_count(&mut self, edge_id: &str) -> Result<u32, SessionError> {
        self.ensure_open()?;
        Ok(Self::sample(&self.vehicles, edge_id, self.step))
    }

    fn advance_step(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if let Some(limit) = self.fail_advance_after {
            if self.advance_calls >= limit {
                return Err(SessionError::Protocol(
                    "scripted advance failure".to_string(),
                ));
            }
        }
        self.time += 1.0;
        self.step += 1;
        self.advance_calls += 1;
        if let Some(plan) = &self.plan {
            self.remaining_in_phase = self.remaining_in_phase.saturating_sub(1);
            if self.remaining_in_phase == 0 {
                self.phase = next_in_cycle(self.phase);
                self.remaining_in_phase = plan.duration_of(self.phase);
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        Ok(())
    }
}

//! The per-step control loop and the sequential comparison harness.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control_system::policy::SignalPolicy;
use crate::control_system::safe_transition::SafeTransitionController;
use crate::flow_analyzer::phase_classifier::{ModelError, TrafficBrain};
use crate::global_variables::{
    MODEL_PATH, QUEUE_SATURATION, SCENARIO_CONFIG, SIM_DURATION, SUMO_BINARY, TRACI_PORT,
    TRAFFIC_LIGHT_ID, TRIPINFO_AI, TRIPINFO_MAX_PRESSURE, TRIPINFO_NORMAL, YELLOW_DURATION,
};
use crate::shared_data::{ApproachLayout, RunMode, RunSummary};
use crate::simulator::session::{SessionError, SimulatorSession};
use crate::simulator::traci::{SumoLaunch, TraciSession};

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Everything a comparison run needs, with defaults matching
/// `global_variables`. Passed in explicitly so nothing control-relevant
/// lives in ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub sumo_binary: String,
    pub scenario: String,
    pub traci_port: u16,
    pub traffic_light_id: String,
    pub layout: ApproachLayout,
    /// Simulated-time horizon of one run.
    pub horizon: f64,
    /// Steps spent in yellow before committing a phase change.
    pub clearance_steps: u32,
    /// Queue normalization constant for the learned policy.
    pub saturation: f64,
    pub model_path: PathBuf,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            sumo_binary: SUMO_BINARY.to_string(),
            scenario: SCENARIO_CONFIG.to_string(),
            traci_port: TRACI_PORT,
            traffic_light_id: TRAFFIC_LIGHT_ID.to_string(),
            layout: ApproachLayout::default(),
            horizon: SIM_DURATION,
            clearance_steps: YELLOW_DURATION,
            saturation: QUEUE_SATURATION,
            model_path: PathBuf::from(MODEL_PATH),
        }
    }
}

/// One scheduled run of the comparison harness.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub mode: RunMode,
    pub tripinfo_output: String,
}

/// The three modes of the comparison, in their fixed execution order.
pub fn default_runs() -> Vec<RunSpec> {
    vec![
        RunSpec {
            mode: RunMode::Normal,
            tripinfo_output: TRIPINFO_NORMAL.to_string(),
        },
        RunSpec {
            mode: RunMode::MaxPressure,
            tripinfo_output: TRIPINFO_MAX_PRESSURE.to_string(),
        },
        RunSpec {
            mode: RunMode::Ai,
            tripinfo_output: TRIPINFO_AI.to_string(),
        },
    ]
}

/// Builds the policy for a mode. The learned policy loads its parameters
/// here, before any session exists: a missing artifact aborts the run
/// without a simulator ever starting, and there is no untrained fallback.
pub fn build_policy(config: &ControlConfig, mode: RunMode) -> Result<SignalPolicy, ControlError> {
    match mode {
        RunMode::Normal => Ok(SignalPolicy::Fixed),
        RunMode::MaxPressure => Ok(SignalPolicy::MaxPressure),
        RunMode::Ai => {
            let brain = TrafficBrain::load(&config.model_path)?;
            Ok(SignalPolicy::Learned {
                classifier: Box::new(brain),
                saturation: config.saturation,
            })
        }
    }
}

/// Drives one policy against an open session until the horizon, then closes
/// the session. The close runs on the error path as well; a close failure
/// is logged rather than masking the run's own outcome.
pub fn run_policy<S: SimulatorSession>(
    session: &mut S,
    policy: &SignalPolicy,
    config: &ControlConfig,
    spec: &RunSpec,
) -> Result<RunSummary, ControlError> {
    let outcome = drive(session, policy, config, spec);
    if let Err(e) = session.close() {
        log::warn!("failed to close simulator session: {}", e);
    }
    outcome
}

fn drive<S: SimulatorSession>(
    session: &mut S,
    policy: &SignalPolicy,
    config: &ControlConfig,
    spec: &RunSpec,
) -> Result<RunSummary, ControlError> {
    let mut controller = SafeTransitionController::attach(
        session,
        config.traffic_light_id.clone(),
        config.clearance_steps,
    )?;

    let mut summary = RunSummary {
        mode: spec.mode.label().to_string(),
        horizon: config.horizon,
        steps: 0,
        decisions: 0,
        phase_switches: 0,
        clearance_steps: 0,
        tripinfo_output: spec.tripinfo_output.clone(),
    };

    while session.simulated_time()? < config.horizon {
        if let Some(target) = policy.decide(session, &config.layout)? {
            summary.decisions += 1;
            let consumed = controller.request(session, target)?;
            if consumed > 0 {
                summary.phase_switches += 1;
                summary.clearance_steps += consumed as u64;
            }
        }
        session.advance_step()?;
        summary.steps += 1;
    }

    Ok(summary)
}

/// Runs every spec in order with per-run isolation: a failed run is logged
/// and the harness moves on to the next mode. Sessions come from `open`,
/// one per spec, so runs never share simulator state.
pub fn run_all<S, F>(
    config: &ControlConfig,
    specs: &[RunSpec],
    mut open: F,
) -> Vec<(RunMode, Result<RunSummary, ControlError>)>
where
    S: SimulatorSession,
    F: FnMut(&RunSpec) -> Result<S, SessionError>,
{
    specs
        .iter()
        .map(|spec| {
            log::info!("running simulation in {} mode", spec.mode.label());
            let result = run_spec(config, spec, &mut open);
            match &result {
                Ok(summary) => log::info!(
                    "finished {} after {} steps ({} switches); trip data in {}",
                    spec.mode.label(),
                    summary.steps,
                    summary.phase_switches,
                    summary.tripinfo_output
                ),
                Err(e) => log::error!("{} run aborted: {}", spec.mode.label(), e),
            }
            (spec.mode, result)
        })
        .collect()
}

fn run_spec<S, F>(
    config: &ControlConfig,
    spec: &RunSpec,
    open: &mut F,
) -> Result<RunSummary, ControlError>
where
    S: SimulatorSession,
    F: FnMut(&RunSpec) -> Result<S, SessionError>,
{
    // Policy first: a configuration failure must abort before a simulator
    // process is ever spawned.
    let policy = build_policy(config, spec.mode)?;
    let mut session = open(spec)?;
    run_policy(&mut session, &policy, config, spec)
}

/// TraCI-backed comparison across the default three modes, each with its
/// own simulator session and trip output.
pub fn run_comparison(config: &ControlConfig) -> Vec<(RunMode, Result<RunSummary, ControlError>)> {
    let specs = default_runs();
    run_all(config, &specs, |spec| {
        TraciSession::start(&SumoLaunch {
            binary: config.sumo_binary.clone(),
            scenario: config.scenario.clone(),
            tripinfo_output: spec.tripinfo_output.clone(),
            port: config.traci_port,
        })
    })
}

// src/shared_data.rs

use serde::{Deserialize, Serialize};

/// The four approaches of the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Approach {
    North,
    South,
    East,
    West,
}

impl Approach {
    /// Fixed N, S, E, W ordering used by every per-approach 4-tuple in the
    /// crate.
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::South,
        Approach::East,
        Approach::West,
    ];
}

/// Edge ids for one approach: the inbound edge queues toward the junction,
/// the outbound edge carries departing vehicles away from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachLanes {
    pub inbound: String,
    pub outbound: String,
}

/// Static edge naming for the whole intersection, defined by the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachLayout {
    pub north: ApproachLanes,
    pub south: ApproachLanes,
    pub east: ApproachLanes,
    pub west: ApproachLanes,
}

impl ApproachLayout {
    pub fn lanes(&self, approach: Approach) -> &ApproachLanes {
        match approach {
            Approach::North => &self.north,
            Approach::South => &self.south,
            Approach::East => &self.east,
            Approach::West => &self.west,
        }
    }
}

impl Default for ApproachLayout {
    fn default() -> Self {
        let lanes = |prefix: &str| ApproachLanes {
            inbound: format!("{}_in", prefix),
            outbound: format!("{}_out", prefix),
        };
        Self {
            north: lanes("n"),
            south: lanes("s"),
            east: lanes("e"),
            west: lanes("w"),
        }
    }
}

/// Halting-vehicle counts on the four inbound edges, sampled fresh each
/// simulation step and discarded after the decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueState {
    pub north: u32,
    pub south: u32,
    pub east: u32,
    pub west: u32,
}

impl QueueState {
    /// Counts in `Approach::ALL` order.
    pub fn as_array(&self) -> [u32; 4] {
        [self.north, self.south, self.east, self.west]
    }
}

/// Vehicle counts on the four outbound edges, sampled alongside
/// [`QueueState`] when a pressure decision is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowState {
    pub north: u32,
    pub south: u32,
    pub east: u32,
    pub west: u32,
}

impl FlowState {
    pub fn as_array(&self) -> [u32; 4] {
        [self.north, self.south, self.east, self.west]
    }
}

/// Signal phases of the two-axis program. The indices match the signal plan
/// of the scenario: each stable green phase is followed by its yellow
/// clearance phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalPhase {
    NorthSouthGreen,
    NorthSouthYellow,
    EastWestGreen,
    EastWestYellow,
}

impl SignalPhase {
    /// Phase index as reported and consumed by the simulator.
    pub fn index(self) -> i32 {
        match self {
            SignalPhase::NorthSouthGreen => 0,
            SignalPhase::NorthSouthYellow => 1,
            SignalPhase::EastWestGreen => 2,
            SignalPhase::EastWestYellow => 3,
        }
    }

    pub fn from_index(index: i32) -> Option<SignalPhase> {
        match index {
            0 => Some(SignalPhase::NorthSouthGreen),
            1 => Some(SignalPhase::NorthSouthYellow),
            2 => Some(SignalPhase::EastWestGreen),
            3 => Some(SignalPhase::EastWestYellow),
            _ => None,
        }
    }

    /// Whether this is a stable green phase (a phase a policy may target).
    pub fn is_stable(self) -> bool {
        matches!(
            self,
            SignalPhase::NorthSouthGreen | SignalPhase::EastWestGreen
        )
    }

    /// The clearance phase commanded before leaving this phase. Kept as an
    /// explicit lookup so the mapping survives renumbering of the signal
    /// plan. A transitional phase clears through itself.
    pub fn clearance(self) -> SignalPhase {
        match self {
            SignalPhase::NorthSouthGreen => SignalPhase::NorthSouthYellow,
            SignalPhase::NorthSouthYellow => SignalPhase::NorthSouthYellow,
            SignalPhase::EastWestGreen => SignalPhase::EastWestYellow,
            SignalPhase::EastWestYellow => SignalPhase::EastWestYellow,
        }
    }
}

/// Which control strategy a comparison run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Simulator-native fixed schedule, no active control.
    Normal,
    /// Reactive max-pressure heuristic.
    MaxPressure,
    /// Pretrained classifier.
    Ai,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Normal => "Normal",
            RunMode::MaxPressure => "MaxPressure",
            RunMode::Ai => "AI",
        }
    }
}

/// One completed run, as appended to the summary CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: String,
    pub horizon: f64,
    /// Base steps advanced by the control loop itself.
    pub steps: u64,
    /// Decisions that produced a target phase (abstentions excluded).
    pub decisions: u64,
    /// Transitions that actually changed the phase.
    pub phase_switches: u64,
    /// Extra steps consumed inside yellow clearances.
    pub clearance_steps: u64,
    pub tripinfo_output: String,
}

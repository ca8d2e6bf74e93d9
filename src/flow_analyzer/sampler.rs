use crate::shared_data::{Approach, ApproachLayout, FlowState, QueueState};
use crate::simulator::session::{SessionError, SimulatorSession};

/// Point-in-time halting counts for the four inbound edges. No caching or
/// smoothing; the snapshot is only valid for the current step.
pub fn collect_queue_state<S: SimulatorSession>(
    session: &mut S,
    layout: &ApproachLayout,
) -> Result<QueueState, SessionError> {
    let mut counts = [0u32; 4];
    for (slot, approach) in counts.iter_mut().zip(Approach::ALL) {
        *slot = session.halting_count(&layout.lanes(approach).inbound)?;
    }
    Ok(QueueState {
        north: counts[0],
        south: counts[1],
        east: counts[2],
        west: counts[3],
    })
}

/// Point-in-time vehicle counts for the four outbound edges, read alongside
/// the queue snapshot when a pressure decision is needed.
pub fn collect_flow_state<S: SimulatorSession>(
    session: &mut S,
    layout: &ApproachLayout,
) -> Result<FlowState, SessionError> {
    let mut counts = [0u32; 4];
    for (slot, approach) in counts.iter_mut().zip(Approach::ALL) {
        *slot = session.vehicle_count(&layout.lanes(approach).outbound)?;
    }
    Ok(FlowState {
        north: counts[0],
        south: counts[1],
        east: counts[2],
        west: counts[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::SignalPhase;
    use crate::simulator::mock::ScriptedSession;

    #[test]
    fn queue_snapshot_reads_the_inbound_edges_in_approach_order() {
        let mut session = ScriptedSession::new(SignalPhase::NorthSouthGreen);
        session.set_halting_series("n_in", vec![1]);
        session.set_halting_series("s_in", vec![2]);
        session.set_halting_series("e_in", vec![3]);
        session.set_halting_series("w_in", vec![4]);

        let layout = ApproachLayout::default();
        let queues = collect_queue_state(&mut session, &layout).unwrap();
        assert_eq!(queues.as_array(), [1, 2, 3, 4]);
    }

    #[test]
    fn flow_snapshot_reads_the_outbound_edges() {
        let mut session = ScriptedSession::new(SignalPhase::NorthSouthGreen);
        session.set_vehicle_series("n_out", vec![5]);
        session.set_vehicle_series("w_out", vec![9]);

        let layout = ApproachLayout::default();
        let flows = collect_flow_state(&mut session, &layout).unwrap();
        assert_eq!(flows.as_array(), [5, 0, 0, 9]);
    }

    #[test]
    fn sampling_a_closed_session_is_an_error() {
        let mut session = ScriptedSession::new(SignalPhase::NorthSouthGreen);
        session.close().unwrap();
        let layout = ApproachLayout::default();
        assert!(collect_queue_state(&mut session, &layout).is_err());
    }
}

pub mod phase_classifier;
pub mod sampler;

// Re-export the sampling surface used by the policies.
pub use sampler::{collect_flow_state, collect_queue_state};

pub mod mock;
pub mod session;
pub mod traci;

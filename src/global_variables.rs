// Default simulator invocation. The scenario file and network are assumed
// given; only the binary and remote port are expected to vary per machine.
pub const SUMO_BINARY: &str = "sumo";
pub const SCENARIO_CONFIG: &str = "intersection.sumocfg";
pub const TRACI_PORT: u16 = 8813;

// Control defaults.
pub const TRAFFIC_LIGHT_ID: &str = "C";
pub const YELLOW_DURATION: u32 = 3;
pub const SIM_DURATION: f64 = 3000.0;
pub const QUEUE_SATURATION: f64 = 50.0;
pub const MODEL_PATH: &str = "models/phase_policy.json";

// Per-mode trip output artifacts and the shared run-summary log.
pub const TRIPINFO_NORMAL: &str = "tripinfo_normal.xml";
pub const TRIPINFO_MAX_PRESSURE: &str = "tripinfo_maxpressure.xml";
pub const TRIPINFO_AI: &str = "tripinfo_ai.xml";
pub const RUN_SUMMARY_CSV: &str = "run_summaries.csv";

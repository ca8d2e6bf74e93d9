// run_comparison.rs
use signal_control::control_system::runner::{run_comparison, ControlConfig};
use signal_control::global_variables::RUN_SUMMARY_CSV;
use signal_control::monitoring::run_log::log_run_summary;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let config = ControlConfig::default();
    let outcomes = run_comparison(&config);

    let mut failures = 0;
    for (mode, outcome) in &outcomes {
        match outcome {
            Ok(summary) => {
                println!(
                    "Finished {}. Saved to {}",
                    mode.label(),
                    summary.tripinfo_output
                );
                log_run_summary(Path::new(RUN_SUMMARY_CSV), summary);
            }
            Err(e) => {
                eprintln!("{} run failed: {}", mode.label(), e);
                failures += 1;
            }
        }
    }

    if failures == outcomes.len() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

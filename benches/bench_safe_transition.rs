// benches/bench_safe_transition.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use std::time::Duration;

use signal_control::control_system::safe_transition::SafeTransitionController;
use signal_control::shared_data::SignalPhase;
use signal_control::simulator::mock::ScriptedSession;

fn bench_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("safe_transition_request");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    // Benchmark for clearance durations of 3, 5 and 10 steps.
    for &clearance in [3u32, 5, 10].iter() {
        group.bench_function(format!("switch_clearance_{}", clearance), |b| {
            let mut session = ScriptedSession::new(SignalPhase::NorthSouthGreen);
            let mut controller =
                SafeTransitionController::attach(&mut session, "C", clearance).unwrap();
            let mut target = SignalPhase::EastWestGreen;
            b.iter(|| {
                // Alternate targets so every request pays a full clearance.
                black_box(controller.request(&mut session, target).unwrap());
                target = if target == SignalPhase::EastWestGreen {
                    SignalPhase::NorthSouthGreen
                } else {
                    SignalPhase::EastWestGreen
                };
            });
        });
    }

    group.bench_function("idempotent_request", |b| {
        let mut session = ScriptedSession::new(SignalPhase::NorthSouthGreen);
        let mut controller = SafeTransitionController::attach(&mut session, "C", 3).unwrap();
        b.iter(|| {
            black_box(
                controller
                    .request(&mut session, SignalPhase::NorthSouthGreen)
                    .unwrap(),
            );
        });
    });

    group.finish();
}

criterion_group!(benches, bench_request);
criterion_main!(benches);

// benches/bench_max_pressure.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use std::time::Duration;

use signal_control::control_system::policy::{learned_target, max_pressure_target};
use signal_control::flow_analyzer::phase_classifier::{DenseLayer, PhaseClassifier, TrafficBrain};
use signal_control::shared_data::{FlowState, QueueState};

// A deterministic stand-in for a trained artifact: weights follow a fixed
// wave pattern so the forward pass does realistic work without file I/O.
fn patterned_brain() -> TrafficBrain {
    let weight1: Vec<Vec<f32>> = (0..32)
        .map(|row| {
            (0..4)
                .map(|col| ((row * 4 + col) as f32 * 0.37).sin() * 0.5)
                .collect()
        })
        .collect();
    let weight2: Vec<Vec<f32>> = (0..2)
        .map(|row| {
            (0..32)
                .map(|col| ((row * 32 + col) as f32 * 0.21).cos() * 0.5)
                .collect()
        })
        .collect();
    TrafficBrain {
        layer1: DenseLayer {
            weight: weight1,
            bias: vec![0.05; 32],
        },
        layer2: DenseLayer {
            weight: weight2,
            bias: vec![0.0; 2],
        },
    }
}

fn bench_decisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_decisions");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    let states: Vec<(QueueState, FlowState)> = (0..64u32)
        .map(|i| {
            (
                QueueState {
                    north: i % 13,
                    south: (i * 7) % 11,
                    east: (i * 3) % 17,
                    west: (i * 5) % 7,
                },
                FlowState {
                    north: i % 5,
                    south: (i * 2) % 9,
                    east: (i * 4) % 6,
                    west: (i * 6) % 8,
                },
            )
        })
        .collect();

    group.bench_function("max_pressure", |b| {
        b.iter(|| {
            for (queues, flows) in &states {
                black_box(max_pressure_target(queues, flows));
            }
        });
    });

    let brain = patterned_brain();
    group.bench_function("learned_forward_pass", |b| {
        b.iter(|| {
            for (queues, _) in &states {
                black_box(learned_target(&brain, queues, 50.0));
            }
        });
    });

    group.bench_function("classifier_predict_only", |b| {
        b.iter(|| {
            black_box(brain.predict(black_box([0.2, 0.14, 0.6, 0.08])));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decisions);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use motion::planner::{AxisConfig, Toolhead, ToolheadConfig};
use motion::solver::StepSink;

struct NullSink;

impl StepSink for NullSink {
    fn emit_step(&mut self, _axis: usize, _time_s: f64, _dir: i8) {}
}

fn config() -> ToolheadConfig {
    ToolheadConfig {
        axes: [
            AxisConfig { steps_per_mm: 80.0, soft_min: Some(0.0), soft_max: Some(300.0) },
            AxisConfig { steps_per_mm: 80.0, soft_min: Some(0.0), soft_max: Some(300.0) },
            AxisConfig { steps_per_mm: 400.0, soft_min: Some(0.0), soft_max: Some(300.0) },
            AxisConfig::unlimited(400.0),
        ],
        max_velocity: 300.0,
        max_accel: 3000.0,
        max_accel_to_decel: 1500.0,
        square_corner_velocity: 5.0,
    }
}

fn bench_queue_and_flush_zigzag(c: &mut Criterion) {
    c.bench_function("queue_move_zigzag_32_moves", |b| {
        b.iter(|| {
            let mut toolhead: Toolhead<64, 256> = Toolhead::new(config());
            let mut sink = NullSink;
            let mut x = 0.0;
            for i in 0..32 {
                let y = if i % 2 == 0 { 10.0 } else { 0.0 };
                x += 5.0;
                toolhead
                    .queue_move(black_box([x, y, 0.0, 0.0]), black_box(150.0), &mut sink)
                    .unwrap();
            }
            toolhead.flush(&mut sink).unwrap();
        })
    });
}

fn bench_single_long_move(c: &mut Criterion) {
    c.bench_function("queue_and_flush_single_long_move", |b| {
        b.iter(|| {
            let mut toolhead: Toolhead<64, 256> = Toolhead::new(config());
            let mut sink = NullSink;
            toolhead
                .queue_move(black_box([150.0, 50.0, 0.0, 0.0]), black_box(100.0), &mut sink)
                .unwrap();
            toolhead.flush(&mut sink).unwrap();
        })
    });
}

criterion_group!(benches, bench_queue_and_flush_zigzag, bench_single_long_move);
criterion_main!(benches);

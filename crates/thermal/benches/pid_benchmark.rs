use criterion::{black_box, criterion_group, criterion_main, Criterion};
use thermal::pid::Pid;

fn bench_pid_update(c: &mut Criterion) {
    c.bench_function("pid_update_steady_state", |b| {
        b.iter(|| {
            let mut pid: Pid<f64> = Pid::new(20.0, 2.0, 0.0, 0.0, 1.0, 50.0);
            pid.set_target(200.0);
            let mut temp = 25.0;
            for _ in 0..200 {
                let output = pid.update(black_box(temp), black_box(0.1));
                temp += output * 2.0 - (temp - 25.0) * 0.05;
            }
            temp
        })
    });
}

criterion_group!(benches, bench_pid_update);
criterion_main!(benches);

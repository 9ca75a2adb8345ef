use rust_nn::{Labeled, Metric, MlpConfig, MlpRegressor, Optimizer, Unlabeled};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn line(n: usize) -> Labeled<f32> {
    let rows: Vec<[f32; 1]> = (0..n).map(|i| [i as f32 / n as f32]).collect();
    let targets = rows.iter().map(|r| 2.0 * r[0] + 1.0).collect();
    Labeled::from_continuous(&rows, targets).unwrap()
}

#[test]
fn fits_a_line() {
    init_logging();
    let mut model = MlpRegressor::new(MlpConfig {
        batch_size: 10,
        optimizer: Optimizer::Adam {
            rate: 0.01,
            momentum_decay: 0.9,
            rms_decay: 0.999,
            epsilon: 1e-8,
        },
        alpha: 0.0,
        min_change: 0.0,
        holdout: 0.2,
        window: 50,
        seed: Some(3),
        ..MlpConfig::default()
    })
    .unwrap();
    model.train(&line(100)).unwrap();

    let best = model
        .scores()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    assert!(best > 0.95, "best R^2 = {best}");

    let out = model
        .predict(&Unlabeled::from_continuous(&[[0.5_f32]]).unwrap())
        .unwrap();
    assert!((out[0] - 2.0).abs() < 0.15, "f(0.5) = {}", out[0]);
}

#[test]
fn negated_error_metrics_stay_non_positive() {
    let mut model = MlpRegressor::new(MlpConfig {
        metric: Some(Metric::MeanAbsoluteError),
        epochs: 5,
        holdout: 0.2,
        seed: Some(4),
        ..MlpConfig::default()
    })
    .unwrap();
    model.train(&line(50)).unwrap();
    assert!(model.scores().iter().all(|s| *s <= 0.0));
}

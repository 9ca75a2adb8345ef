use rust_nn::{Activation, HiddenSpec, Labeled, Metric, MlpConfig, MlpRegressor, Unlabeled};

fn main() -> rust_nn::Result<()> {
    // y = 2x + 1 on [0, 1].
    let rows: Vec<[f32; 1]> = (0..200).map(|i| [i as f32 / 200.0]).collect();
    let targets: Vec<f32> = rows.iter().map(|r| 2.0 * r[0] + 1.0).collect();
    let dataset = Labeled::from_continuous(&rows, targets)?;

    let mut model = MlpRegressor::new(MlpConfig {
        hidden: vec![HiddenSpec::new(8, Activation::HyperbolicTangent)],
        batch_size: 20,
        min_change: 1e-6,
        metric: Some(Metric::RSquared),
        window: 10,
        seed: Some(0),
        ..MlpConfig::default()
    })?;
    model.train(&dataset)?;

    println!(
        "epochs={} last_score={:?}",
        model.steps().len(),
        model.scores().last()
    );

    let queries = Unlabeled::from_continuous(&[[0.25_f32], [0.75]])?;
    for (x, y) in [0.25_f32, 0.75].iter().zip(model.predict(&queries)?) {
        println!("f({x}) = {y:.4} (expected {:.4})", 2.0 * x + 1.0);
    }

    Ok(())
}

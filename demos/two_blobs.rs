use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rust_nn::{Activation, HiddenSpec, Labeled, MlpClassifier, MlpConfig, Optimizer, Unlabeled};

fn main() -> rust_nn::Result<()> {
    // Two noisy 2D clusters.
    let mut rng = StdRng::seed_from_u64(0);
    let centers = [("A", [2.0_f32, 2.0]), ("B", [8.0, 3.0])];

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (label, center) in centers {
        for _ in 0..100 {
            rows.push([
                center[0] + rng.gen_range(-1.0..1.0),
                center[1] + rng.gen_range(-1.0..1.0),
            ]);
            labels.push(label.to_owned());
        }
    }
    let dataset = Labeled::from_continuous(&rows, labels)?;

    let mut model = MlpClassifier::new(MlpConfig {
        hidden: vec![HiddenSpec::new(4, Activation::LeakyReLU { alpha: 0.1 })],
        batch_size: 20,
        optimizer: Optimizer::Adam {
            rate: 0.01,
            momentum_decay: 0.9,
            rms_decay: 0.999,
            epsilon: 1e-8,
        },
        holdout: 0.2,
        seed: Some(0),
        ..MlpConfig::default()
    })?;
    model.train(&dataset)?;

    println!(
        "epochs={} last_cost={:?} best_score={:?}",
        model.steps().len(),
        model.steps().last(),
        model.scores().iter().copied().fold(f32::NEG_INFINITY, f32::max)
    );

    let queries = Unlabeled::from_continuous(&[[2.5_f32, 1.5], [7.5, 3.5]])?;
    let predictions = model.predict(&queries)?;
    let proba = model.proba(&queries)?;
    for (prediction, p) in predictions.iter().zip(&proba) {
        println!("predicted {prediction} with {p:?}");
    }

    Ok(())
}

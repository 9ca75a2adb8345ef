#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> rust_nn::Result<()> {
    use rust_nn::{FeedForward, Labeled, Matrix, MlpClassifier, MlpConfig};

    let rows = [[0.0_f32, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let labels = ["low", "high", "high", "high"].map(String::from).to_vec();
    let dataset = Labeled::from_continuous(&rows, labels)?;

    let mut model = MlpClassifier::new(MlpConfig {
        holdout: 0.5,
        epochs: 200,
        seed: Some(0),
        ..MlpConfig::default()
    })?;
    model.train(&dataset)?;

    let network = model.network().ok_or(rust_nn::Error::NotTrained)?;
    let path = "target/tmp_network.json";
    network.save_json(path)?;

    let loaded = FeedForward::load_json(path)?;
    let x = Matrix::from_rows(&[[1.0_f32], [1.0]])?;
    println!(
        "saved {path}; original={:?} loaded={:?}",
        network.infer(&x)?.as_slice(),
        loaded.infer(&x)?.as_slice()
    );

    Ok(())
}

// ml_examples/src/main.rs
//! Demo experiments. No logger is installed, so the library's `log` records
//! stay silent; progress is printed through `ConsoleReporter`.
use anyhow::{bail, Context, Result};
use ml_tutorial::datasets::{cubic_clusters, noisy_sine, quadratic_trend};
use ml_tutorial::{
    fit, polynomial_features, ConsoleReporter, CsvSource, DataSource, Dataset, Ensemble, LinearTrainer, Regressor,
    ShallowTrainer, TrainingConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
    println!("{}", banner());
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return run_csv(&args);
    }

    let mut rng = StdRng::seed_from_u64(42);

    #[cfg(feature = "linear")]
    {
        println!("=== Linear model, online SGD ===");
        let data = quadratic_trend(100, &mut rng);
        let model = LinearTrainer::new(0.01, 50)
            .train(&data, &mut ConsoleReporter::new(10))
            .context("training linear model")?;
        println!("weights (bias first): {}", model.weights());
        let x = ml_tutorial::Matrix::column_vector(&[0.0, 5.0, 10.0]);
        println!("predictions at 0, 5, 10:\n{}", model.predict(&x)?);
    }

    #[cfg(feature = "polynomial")]
    {
        println!("\n=== Bootstrap ensemble on cubic features ===");
        let raw = cubic_clusters(20, &mut rng);
        let data = Dataset::new(polynomial_features(raw.x(), 3)?, raw.t().clone())?;
        let (train, test) = data.split(0.8, &mut rng)?;
        let ensemble = Ensemble::build(&train, 10, &LinearTrainer::new(0.01, 100), 7, &mut ConsoleReporter::new(50))
            .context("training ensemble")?;
        let test_rmse = ml_tutorial::rmse(&ensemble.predict(test.x())?, test.t())?;
        println!("ensemble test RMSE: {}", ml_tutorial::utils::format_row(&test_rmse));

        let grid: Vec<f64> = (0..=10).map(f64::from).collect();
        let query = polynomial_features(&ml_tutorial::Matrix::column_vector(&grid), 3)?;
        let spread = ensemble.predict_spread(&query)?;
        println!("   x      mean       std       min       max");
        for (i, x) in grid.iter().enumerate() {
            println!(
                "{:>4.1} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
                x,
                spread.mean.get(i, 0),
                spread.std.get(i, 0),
                spread.min.get(i, 0),
                spread.max.get(i, 0)
            );
        }
    }

    #[cfg(feature = "network")]
    {
        println!("\n=== Shallow tanh network on a noisy sine ===");
        let train = noisy_sine(20, 0.0, &mut rng);
        let test = noisy_sine(20, 0.5, &mut rng);
        let trainer = ShallowTrainer::full_batch(20, 0.01, 0.01, 5000).with_standardized_targets(true);
        let model = trainer
            .train(&train, 1, &mut ConsoleReporter::new(500))
            .context("training shallow network")?;
        println!("{}", model.network());
        let test_rmse = ml_tutorial::rmse(&model.predict(test.x())?, test.t())?;
        println!("network test RMSE: {}", ml_tutorial::utils::format_row(&test_rmse));
    }

    Ok(())
}

/// Startup line naming the demos compiled in.
fn banner() -> String {
    let demos: Vec<&str> = [
        (cfg!(feature = "linear"), "linear"),
        (cfg!(feature = "polynomial"), "polynomial"),
        (cfg!(feature = "network"), "network"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    format!(
        "Initializing ml_examples {} (demos: {})",
        env!("CARGO_PKG_VERSION"),
        if demos.is_empty() { "none".to_owned() } else { demos.join(", ") }
    )
}

/// `ml_examples <data.csv> <first column> <last column> [config.json]`
///
/// The last column of the range is the target, the rest are inputs.
fn run_csv(args: &[String]) -> Result<()> {
    let [path, first, last, rest @ ..] = args else {
        bail!("usage: ml_examples <data.csv> <first column> <last column> [config.json]");
    };
    let first: usize = first.parse().context("first column")?;
    let last: usize = last.parse().context("last column")?;
    if last <= first {
        bail!("need at least one input column and one target column");
    }
    let config = match rest.first() {
        Some(cfg) => TrainingConfig::from_json_file(cfg).with_context(|| format!("loading {cfg}"))?,
        None => TrainingConfig::default(),
    };

    let table = CsvSource::new(path, first, last)
        .load()
        .with_context(|| format!("reading {path}"))?;
    let data = Dataset::from_columns(&table, &[last - first])?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (train, test) = data.split(0.8, &mut rng)?;
    println!("{} training rows, {} test rows", train.len(), test.len());

    let model = fit(&train, &config, &mut ConsoleReporter::new(config.epoch_count.div_ceil(10)))?;
    println!(
        "{} ({} models), {} outputs",
        model.kind(),
        model.model_count(),
        model.output_dim()
    );
    if !test.is_empty() {
        let test_rmse = model.evaluate(&test)?;
        println!("test RMSE: {}", ml_tutorial::utils::format_row(&test_rmse));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_enabled_demos() {
        let line = banner();
        assert!(line.starts_with("Initializing ml_examples"));
        assert_eq!(line.contains("network"), cfg!(feature = "network"));
        assert_eq!(line.contains("linear"), cfg!(feature = "linear"));
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;

use cutoff::gradient_descent::GradientDescentSettings;
use cutoff::pipeline::ExperimentReport;
use cutoff::regularization_path::{CrossValidatedLogistic, PathFit, SelectionRule};
use cutoff::{parse, pipeline, plot, threshold_sweep, ExperimentConfig, LoaderConfig};

#[derive(Parser)]
#[command(name = "cutoff")]
#[command(about = "Fit a lasso logistic classifier and trade precision against recall")]
#[command(version)]
struct Cli {
    /// Path to the labeled CSV table
    #[arg(long, default_value = "data/breast-cancer.csv")]
    data: PathBuf,

    /// Column holding the binary label
    #[arg(long, default_value = "diagnosis")]
    label_column: String,

    /// Label value meaning positive (malignant)
    #[arg(long, default_value = "M")]
    positive: String,

    /// Label value meaning negative (benign)
    #[arg(long, default_value = "B")]
    negative: String,

    /// Columns to ignore besides the label
    #[arg(long, value_delimiter = ',', default_value = "id")]
    ignore: Vec<String>,

    /// Share of each class placed in the training set
    #[arg(long, default_value_t = 0.7)]
    train_fraction: f64,

    /// RNG seed for the split and the CV folds
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = 5)]
    folds: usize,

    /// Number of lambdas on the regularization path
    #[arg(long, default_value_t = 30)]
    lambdas: usize,

    /// Smallest lambda as a fraction of the largest
    #[arg(long, default_value_t = 1e-3)]
    min_ratio: f64,

    /// Elastic-net mixing: 1 = lasso, 0 = ridge
    #[arg(long, default_value_t = 1.0)]
    alpha: f64,

    /// Which lambda to keep from the CV curve
    #[arg(long, value_enum, default_value_t = Selection::OneSe)]
    selection: Selection,

    /// Gradient descent step size
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,

    /// Maximum gradient descent epochs per lambda
    #[arg(long, default_value_t = 500)]
    epochs: usize,

    /// Thresholds to report
    #[arg(long, value_delimiter = ',', default_value = "0.1,0.5,0.9")]
    thresholds: Vec<f64>,

    /// Number of evenly spaced thresholds for the curve
    #[arg(long, default_value_t = 101)]
    sweep_steps: usize,

    /// Output directory for the sweep CSV and plot
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Draw precision_recall.png
    #[arg(long, default_value_t = false)]
    plot: bool,

    /// Print a JSON summary instead of tables
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Selection {
    Min,
    #[value(name = "1se")]
    OneSe,
}

#[derive(Serialize)]
struct CoefficientOutput<'a> {
    feature: &'a str,
    weight: f64,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    data: String,
    n_records: usize,
    path: &'a PathFit,
    intercept: f64,
    coefficients: Vec<CoefficientOutput<'a>>,
    report: &'a ExperimentReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let loader = LoaderConfig {
        label_column: cli.label_column.clone(),
        positive_value: cli.positive.clone(),
        negative_value: cli.negative.clone(),
        ignored_columns: cli.ignore.clone(),
        ..LoaderConfig::default()
    };
    let dataset = parse::load(&cli.data, &loader)
        .with_context(|| format!("failed to load {}", cli.data.display()))?;

    let config = ExperimentConfig::new()
        .with_train_fraction(cli.train_fraction)?
        .with_seed(cli.seed)
        .with_thresholds(cli.thresholds.clone())?
        .with_sweep_steps(cli.sweep_steps)?
        .with_folds(cli.folds)
        .with_lambdas(cli.lambdas, cli.min_ratio)
        .with_alpha(cli.alpha)
        .with_selection_rule(match cli.selection {
            Selection::Min => SelectionRule::Minimum,
            Selection::OneSe => SelectionRule::OneStandardError,
        })
        .with_descent(GradientDescentSettings {
            learning_rate: cli.learning_rate,
            max_epochs: cli.epochs,
            ..GradientDescentSettings::default()
        });

    let trainer = CrossValidatedLogistic::new(*config.path()).context("invalid model settings")?;
    let experiment = pipeline::run(&dataset, &config, &trainer).context("experiment failed")?;
    let report = &experiment.report;

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("cannot create {}", cli.output_dir.display()))?;
    threshold_sweep::write_csv(&cli.output_dir.join("threshold_sweep.csv"), &report.curve)?;
    if cli.plot {
        plot::draw_precision_recall(&cli.output_dir.join("precision_recall.png"), &report.curve)?;
    }

    let (weights, intercept) = experiment.model.model.coefficients();
    if cli.json {
        let output = RunOutput {
            data: cli.data.display().to_string(),
            n_records: dataset.len(),
            path: &experiment.model.path,
            intercept,
            coefficients: dataset
                .feature_names()
                .iter()
                .zip(&weights)
                .filter(|(_, w)| **w != 0.0)
                .map(|(name, &weight)| CoefficientOutput {
                    feature: name,
                    weight,
                })
                .collect(),
            report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    info!(
        lambda = experiment.model.path.selected_lambda,
        nonzero = experiment.model.model.nonzero_weights(),
        "selected model"
    );
    println!(
        "train: {} records ({} positive), holdout: {} records ({} positive)",
        report.train.records, report.train.positives, report.holdout.records, report.holdout.positives
    );
    for entry in &report.thresholds {
        println!("\nthreshold {}", entry.threshold);
        print!("{}", entry.matrix);
        println!("precision: {}", format_rate(entry.precision));
        println!("recall:    {}", format_rate(entry.recall));
    }

    Ok(())
}

fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "undefined".to_string(), |r| format!("{r:.3}"))
}

//! unsupclass Command Line Interface
//!
//! Fits one of the unsupervised-model classifiers on a CSV training file
//! and reports its metrics on the training data and an optional test file.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use unsupclass::api::{evaluate, EvaluationMetrics};
use unsupclass::core::{BinaryClassifier, ClassifierError, Label, Matrix, Result};
use unsupclass::utils::scaling::{ScalingMethod, ScalingParams};
use unsupclass::utils::validation::check_label_balance;
use unsupclass::{
    CSVDataset, ClusterRatioClassifier, ClusterRatioConfig, CovarianceType,
    DensityRatioClassifier, DensityRatioConfig,
};

#[derive(Parser)]
#[command(name = "unsupclass")]
#[command(about = "Binary classifiers built on Gaussian mixtures and self-organizing maps")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare per-class Gaussian mixture likelihoods
    Density(DensityArgs),
    /// Flag class-enriched clusters of a self-organizing map
    Cluster(ClusterArgs),
}

/// Options shared by every classifier
#[derive(Args)]
struct DataArgs {
    /// Training data file (CSV, last column is the 0/1 label)
    #[arg(long)]
    train: PathBuf,

    /// Test data file evaluated with the fitted classifier
    #[arg(long)]
    test: Option<PathBuf>,

    /// Write predictions for the test file (or the training file) here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Feature scaling method, fitted on the training data
    #[arg(long)]
    feature_scaling: Option<CliScalingMethod>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print configuration and metrics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DensityArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Mixture components for the class-0 model
    #[arg(long, default_value = "1")]
    components0: usize,

    /// Mixture components for the class-1 model
    #[arg(long, default_value = "1")]
    components1: usize,

    /// Covariance family of both models
    #[arg(long, default_value = "full")]
    covariance: CliCovarianceType,

    /// Maximum EM iterations
    #[arg(short, long, default_value = "100")]
    max_iterations: usize,

    /// EM convergence tolerance
    #[arg(long, default_value = "0.001")]
    tol: f64,
}

#[derive(Args)]
struct ClusterArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Map grid width
    #[arg(long, default_value = "10")]
    xdim: usize,

    /// Map grid height
    #[arg(long, default_value = "10")]
    ydim: usize,

    /// Flag clusters whose enrichment ratio exceeds this value
    #[arg(long, default_value = "2.0")]
    ratio_threshold: f64,

    /// Passes over the training data
    #[arg(long, default_value = "10")]
    rlen: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliCovarianceType {
    #[value(name = "full")]
    Full,
    #[value(name = "tied")]
    Tied,
    #[value(name = "diag")]
    Diagonal,
    #[value(name = "spherical")]
    Spherical,
}

impl From<CliCovarianceType> for CovarianceType {
    fn from(cli_type: CliCovarianceType) -> Self {
        match cli_type {
            CliCovarianceType::Full => CovarianceType::Full,
            CliCovarianceType::Tied => CovarianceType::Tied,
            CliCovarianceType::Diagonal => CovarianceType::Diagonal,
            CliCovarianceType::Spherical => CovarianceType::Spherical,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliScalingMethod {
    /// Min-Max scaling to [-1, 1] range
    #[value(name = "minmax")]
    MinMax,
    /// Standard score (Z-score) normalization
    #[value(name = "standard")]
    StandardScore,
    /// Unit scaling by maximum absolute value
    #[value(name = "unit")]
    UnitScale,
}

impl From<CliScalingMethod> for ScalingMethod {
    fn from(cli_method: CliScalingMethod) -> Self {
        match cli_method {
            CliScalingMethod::MinMax => ScalingMethod::MinMax {
                min_val: -1.0,
                max_val: 1.0,
            },
            CliScalingMethod::StandardScore => ScalingMethod::StandardScore,
            CliScalingMethod::UnitScale => ScalingMethod::UnitScale,
        }
    }
}

/// Loaded and optionally scaled train/test data
struct Prepared {
    train_x: Matrix,
    train_y: Vec<Label>,
    test: Option<(Matrix, Vec<Label>)>,
    scaling: Option<ScalingMethod>,
}

#[derive(Serialize)]
struct Report<'a, C: Serialize> {
    classifier: &'a str,
    config: &'a C,
    scaling: Option<ScalingMethod>,
    train: MetricsReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    test: Option<MetricsReport>,
}

#[derive(Serialize)]
struct MetricsReport {
    #[serde(flatten)]
    counts: EvaluationMetrics,
    accuracy: f64,
    precision: f64,
    recall: f64,
    f1_score: f64,
    specificity: f64,
}

impl From<EvaluationMetrics> for MetricsReport {
    fn from(counts: EvaluationMetrics) -> Self {
        Self {
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1_score: counts.f1_score(),
            specificity: counts.specificity(),
            counts,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Density(args) => density_command(args),
        Commands::Cluster(args) => cluster_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn density_command(args: DensityArgs) -> Result<()> {
    let mut config = DensityRatioConfig::default()
        .with_components(args.components0, args.components1)
        .with_covariance_type(args.covariance.into());
    config.max_iter = args.max_iterations;
    config.tol = args.tol;
    if let Some(seed) = args.data.seed {
        config = config.with_random_state(seed);
    }
    info!("Density ratio configuration: {config:?}");

    let data = prepare(&args.data)?;
    let mut classifier = DensityRatioClassifier::with_config(config.clone());
    classifier.fit(&data.train_x, &data.train_y)?;

    let fitted = classifier.fitted()?;
    for (label, model) in [(0, fitted.model0()), (1, fitted.model1())] {
        info!(
            "Class {label} mixture: {} components, converged={}, iterations={}",
            model.n_components(),
            model.converged(),
            model.n_iter()
        );
    }

    report(&classifier, "density", &config, &args.data, &data)
}

fn cluster_command(args: ClusterArgs) -> Result<()> {
    let mut config = ClusterRatioConfig::default()
        .with_grid(args.xdim, args.ydim)
        .with_ratio_threshold(args.ratio_threshold);
    config.rlen = args.rlen;
    if let Some(seed) = args.data.seed {
        config = config.with_random_state(seed);
    }
    info!("Cluster ratio configuration: {config:?}");

    let data = prepare(&args.data)?;
    let mut classifier = ClusterRatioClassifier::with_config(config.clone());
    classifier.fit(&data.train_x, &data.train_y)?;

    let fitted = classifier.fitted()?;
    info!(
        "Populated clusters: {}, flagged clusters: {:?}",
        fitted.contingency().n_clusters(),
        fitted.flagged_clusters()
    );

    report(&classifier, "cluster", &config, &args.data, &data)
}

fn prepare(args: &DataArgs) -> Result<Prepared> {
    info!("Loading training data from: {:?}", args.train);
    let train = CSVDataset::from_file(&args.train)?;
    info!(
        "Loaded {} samples with {} dimensions",
        train.len(),
        train.dim()
    );
    let (mut train_x, train_y) = train.into_parts();
    let (positives, negatives, balance) = check_label_balance(&train_y);
    info!("Class balance: {positives} positive, {negatives} negative (ratio {balance:.3})");

    let mut test = match &args.test {
        Some(path) => {
            info!("Loading test data from: {path:?}");
            Some(CSVDataset::from_file(path)?.into_parts())
        }
        None => None,
    };

    let scaling = args.feature_scaling.map(ScalingMethod::from);
    if let Some(method) = scaling {
        info!("Using feature scaling: {method:?}");
        let params = ScalingParams::fit(&train_x, method);
        train_x = params.transform(&train_x)?;
        if let Some((test_x, _)) = test.as_mut() {
            *test_x = params.transform(test_x)?;
        }
    }

    Ok(Prepared {
        train_x,
        train_y,
        test,
        scaling,
    })
}

fn report<C: BinaryClassifier, S: Serialize>(
    classifier: &C,
    name: &str,
    config: &S,
    args: &DataArgs,
    data: &Prepared,
) -> Result<()> {
    let train_metrics = evaluate(classifier, &data.train_x, &data.train_y)?;
    let test_metrics = match &data.test {
        Some((x, y)) => Some(evaluate(classifier, x, y)?),
        None => None,
    };

    if let Some(path) = &args.output {
        let x = data.test.as_ref().map_or(&data.train_x, |(x, _)| x);
        write_predictions(path, &classifier.predict(x)?)?;
        info!("Predictions saved to: {path:?}");
    }

    if args.json {
        let report = Report {
            classifier: name,
            config,
            scaling: data.scaling,
            train: train_metrics.into(),
            test: test_metrics.map(MetricsReport::from),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| ClassifierError::SerializationError(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    println!("=== {} ===", classifier.name());
    print_metrics("Training", &train_metrics);
    if let Some(metrics) = &test_metrics {
        println!();
        print_metrics("Test", metrics);
    }

    Ok(())
}

fn print_metrics(title: &str, metrics: &EvaluationMetrics) {
    println!("{title} Results ({} samples):", metrics.total());
    println!("  Accuracy:        {:.2}%", metrics.accuracy() * 100.0);
    println!("  True Positives:  {}", metrics.true_positives);
    println!("  True Negatives:  {}", metrics.true_negatives);
    println!("  False Positives: {}", metrics.false_positives);
    println!("  False Negatives: {}", metrics.false_negatives);
    println!("  Precision:       {:.4}", metrics.precision());
    println!("  Recall:          {:.4}", metrics.recall());
    println!("  F1 Score:        {:.4}", metrics.f1_score());
    println!("  Specificity:     {:.4}", metrics.specificity());
}

fn write_predictions(path: &Path, predictions: &[Label]) -> Result<()> {
    let file = File::create(path).map_err(ClassifierError::IoError)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# Predictions for {} samples", predictions.len())?;
    writeln!(writer, "# Format: sample_index predicted_label")?;
    for (i, label) in predictions.iter().enumerate() {
        writeln!(writer, "{i} {label}")?;
    }
    writer.flush()?;

    Ok(())
}

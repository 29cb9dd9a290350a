//! Face-Mask CNN CLI
//!
//! Entry point for downloading the Kaggle face-mask dataset, inspecting its
//! labels and running the train/evaluate/predict pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, info};

use facemask_cnn::backend::{backend_name, default_device, TrainingBackend};
use facemask_cnn::dataset::download::{fetch_dataset, DatasetRef, KaggleCredentials};
use facemask_cnn::dataset::labels::{labels_for, preview, ClassListing, ExpectedCounts};
use facemask_cnn::dataset::loader::DatasetLayout;
use facemask_cnn::pipeline::{run_pipeline, PipelineConfig, PipelineReport};
use facemask_cnn::utils::logging::{init_logging, LogConfig, LogLevel};
use facemask_cnn::utils::{format_duration, format_number};
use facemask_cnn::DATASET_REF;

/// Face-Mask Presence Classification
///
/// Downloads the Kaggle face-mask dataset and trains a small CNN with Burn
/// to tell whether a person wears a mask.
#[derive(Parser, Debug)]
#[command(name = "facemask_cnn")]
#[command(version)]
#[command(about = "Face-mask presence classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging (same as --log-level debug, plus targets)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// Minimum log level: trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download and extract the dataset from Kaggle
    Download {
        /// Kaggle dataset reference
        #[arg(long, default_value = DATASET_REF)]
        dataset: String,

        /// Directory the archive is downloaded and extracted into
        #[arg(short, long, default_value = "data")]
        output_dir: PathBuf,

        /// Path to kaggle.json (defaults to $KAGGLE_CONFIG_DIR or ~/.kaggle)
        #[arg(long)]
        credentials: Option<PathBuf>,
    },

    /// List both class directories and preview filenames and labels
    Stats {
        /// Path to the extracted dataset
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Label, preprocess, train, evaluate and optionally classify one image
    Run {
        /// Path to the extracted dataset
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Image to classify after training
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory the loss and accuracy charts are written to
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Override the train/test split seed
        #[arg(long)]
        seed: Option<u64>,

        /// Download the dataset first
        #[arg(long, default_value = "false")]
        download: bool,

        /// Path to kaggle.json used with --download
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Fail when the class sizes differ from the published dataset
        #[arg(long, default_value = "false")]
        strict_counts: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = log_config(&cli);
    let _ = init_logging(&log_config);
    debug!("Logging at {}", log_config.level);

    print_banner();

    match cli.command {
        Commands::Download {
            dataset,
            output_dir,
            credentials,
        } => {
            cmd_download(&dataset, &output_dir, credentials.as_deref())?;
        }

        Commands::Stats { data_dir } => {
            let (positive, negative) = show_labels(&data_dir)?;
            ExpectedCounts::new().check_all(&positive, &negative)?;
        }

        Commands::Run {
            data_dir,
            input,
            output_dir,
            config,
            epochs,
            seed,
            download,
            credentials,
            strict_counts,
        } => {
            if download {
                cmd_download(DATASET_REF, &data_dir, credentials.as_deref())?;
            }

            let mut pipeline_config = match config {
                Some(path) => PipelineConfig::from_file(&path)?,
                None => PipelineConfig::new(),
            };
            if let Some(epochs) = epochs {
                pipeline_config.training.epochs = epochs;
            }
            if let Some(seed) = seed {
                pipeline_config.split.seed = seed;
            }
            if strict_counts {
                pipeline_config.expected_counts.strict = true;
            }

            cmd_run(&pipeline_config, &data_dir, input.as_deref(), &output_dir)?;
        }
    }

    Ok(())
}

/// `--verbose` wins over `--log-level`
fn log_config(cli: &Cli) -> LogConfig {
    if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig {
            level: LogLevel::parse(&cli.log_level),
            ..LogConfig::default()
        }
    }
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +--------------------------------------------------------------+
 |   Face-Mask Detection                                        |
 |   CNN training and inference with Burn + Rust                |
 +--------------------------------------------------------------+
  "#
        .green()
    );
}

fn cmd_download(dataset: &str, output_dir: &Path, credentials: Option<&Path>) -> Result<()> {
    println!("{}", "Stage 1: Acquisition".cyan().bold());

    let dataset: DatasetRef = dataset.parse()?;
    let credentials = match credentials {
        Some(path) => KaggleCredentials::load(path)?,
        None => KaggleCredentials::from_default_location()?,
    };

    info!("Fetching {} into {:?}", dataset, output_dir);
    let root = fetch_dataset(&dataset, &credentials, output_dir)
        .with_context(|| format!("failed to fetch {}", dataset))?;

    println!("  Dataset ready at {:?}", root);
    println!();
    Ok(())
}

fn print_listing(listing: &ClassListing) {
    let (head, tail) = listing.preview();
    println!(
        "  {} ({} images, label {})",
        listing.class_name.yellow(),
        format_number(listing.len()),
        listing.label
    );
    println!("    first: {:?}", head);
    println!("    last:  {:?}", tail);
}

/// Print both class listings and the label preview
///
/// Counts are not checked here; `stats` checks them itself and `run` leaves
/// that to the pipeline.
fn show_labels(data_dir: &Path) -> Result<(ClassListing, ClassListing)> {
    println!("{}", "Stage 2: Labeling".cyan().bold());

    let layout = DatasetLayout::locate(data_dir)?;
    let (positive, negative) = layout.listings()?;

    print_listing(&positive);
    print_listing(&negative);

    let labels = labels_for(&positive, &negative);
    let (head, tail) = preview(&labels);
    println!();
    println!("  Total labels: {}", format_number(labels.len()));
    println!("  First labels: {:?}", head);
    println!("  Last labels:  {:?}", tail);
    println!();

    Ok((positive, negative))
}

fn cmd_run(
    config: &PipelineConfig,
    data_dir: &Path,
    input: Option<&Path>,
    output_dir: &Path,
) -> Result<()> {
    let device = default_device();

    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Backend:         {}", backend_name());
    println!("  Epochs:          {}", config.training.epochs);
    println!("  Batch size:      {}", config.training.batch_size);
    println!("  Learning rate:   {}", config.training.learning_rate);
    println!("  Test fraction:   {}", config.split.test_fraction);
    println!("  Split seed:      {}", config.split.seed);
    println!();

    show_labels(data_dir)?;

    println!("{}", "Stages 3-5: Preprocessing, training, evaluation".cyan().bold());
    let report = run_pipeline::<TrainingBackend>(config, data_dir, input, output_dir, &device)?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!();
    println!("{}", "Results:".green().bold());
    println!(
        "  Images:          {} with mask, {} without",
        format_number(report.positive_count),
        format_number(report.negative_count)
    );
    println!(
        "  Split:           {} train / {} test",
        format_number(report.train_size),
        format_number(report.test_size)
    );

    if let Some(last) = report.history.last() {
        println!(
            "  Final epoch:     loss {:.4} | acc {:.4} | val_loss {:.4} | val_acc {:.4}",
            last.loss, last.accuracy, last.val_loss, last.val_accuracy
        );
    }

    println!("  Test loss:       {:.4}", report.evaluation.loss);
    println!(
        "  Test accuracy:   {:.2}%",
        report.evaluation.accuracy * 100.0
    );
    println!("  Charts:          {:?}, {:?}", report.charts.0, report.charts.1);

    if let Some(prediction) = &report.prediction {
        println!();
        println!("{}", "Prediction:".cyan().bold());
        println!("  Scores:          {:?}", prediction.scores);
        println!("  Predicted class: {}", prediction.class_index);
        println!("  {}", prediction.verdict.to_string().bold());
    }

    println!();
    println!(
        "{} in {} (started {})",
        "Done".green().bold(),
        format_duration(report.elapsed_secs),
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_run_download_takes_credentials() {
        let cli = Cli::try_parse_from([
            "facemask_cnn",
            "run",
            "--download",
            "--credentials",
            "keys/kaggle.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                download,
                credentials,
                ..
            } => {
                assert!(download);
                assert_eq!(credentials, Some(PathBuf::from("keys/kaggle.json")));
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from(["facemask_cnn", "--log-level", "warn", "stats"]).unwrap();
        assert_eq!(log_config(&cli).level, LogLevel::Warn);
        assert_eq!(log_config(&cli).level.to_string(), "WARN");

        let cli = Cli::try_parse_from(["facemask_cnn", "stats"]).unwrap();
        assert_eq!(log_config(&cli).level, LogLevel::Info);

        let cli =
            Cli::try_parse_from(["facemask_cnn", "stats", "--log-level", "error", "-v"]).unwrap();
        assert_eq!(log_config(&cli).level, LogLevel::Debug);
    }

    #[test]
    fn test_show_labels_leaves_counts_unchecked() {
        let dir = tempfile::tempdir().unwrap();
        let classes = [
            ("with_mask", ["a.jpg", "b.png"]),
            ("without_mask", ["c.jpg", "d.jpg"]),
        ];
        for (class, files) in classes {
            let class_dir = dir.path().join(class);
            fs::create_dir_all(&class_dir).unwrap();
            for file in files {
                fs::write(class_dir.join(file), b"").unwrap();
            }
        }

        // Two images per class is far from the published sizes
        let (positive, negative) = show_labels(dir.path()).unwrap();
        assert_eq!((positive.len(), negative.len()), (2, 2));
        assert!(ExpectedCounts::new()
            .with_strict(true)
            .check_all(&positive, &negative)
            .is_err());
    }
}

//! CLI entry point for `spamsift`.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use spamsift::classify::{split_labelled_and_inbox, ModelKind, ModelPipeline};
use spamsift::config::{Config, KNOWN_DATASETS};
use spamsift::corpus;
use spamsift::explain::{explain_record, prediction_summary, render_waterfall};
use spamsift::labels::{apply_judgments, run_labelling_session, JudgmentStore};
use spamsift::model::MessageRecord;
use spamsift::store;

#[derive(Parser)]
#[command(name = "spamsift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy an external public corpus into the common raw layout
    Organise {
        /// Dataset to organise (trec, spamassassin); both when omitted
        dataset: Option<String>,
    },
    /// Parse raw .eml folders into processed table files
    Parse {
        /// Dataset to parse; all known datasets when omitted
        dataset: Option<String>,
    },
    /// Interactively label messages, saving judgments incrementally
    Label {
        /// Dataset whose processed messages to label
        #[arg(default_value = "personal")]
        dataset: String,
    },
    /// Train on labelled messages and score the inbox
    Train {
        /// Dataset to train and predict on
        #[arg(default_value = "personal")]
        dataset: String,
        /// How many top features to print per direction
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Print learned feature weights, most spam-indicative first
    Weights {
        /// Dataset to train on
        #[arg(default_value = "personal")]
        dataset: String,
        /// Limit output to the first N weights
        #[arg(long)]
        top: Option<usize>,
    },
    /// Explain one prediction as per-feature log-odds contributions
    Explain {
        /// Record id to explain
        id: u64,
        /// Dataset holding the record
        #[arg(default_value = "personal")]
        dataset: String,
        /// How many features to display
        #[arg(long, default_value_t = 20)]
        max_display: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = spamsift::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    match cli.command {
        Commands::Organise { dataset } => cmd_organise(&config, dataset.as_deref()),
        Commands::Parse { dataset } => cmd_parse(&config, dataset.as_deref()),
        Commands::Label { dataset } => cmd_label(&config, &dataset),
        Commands::Train { dataset, top } => cmd_train(&config, &dataset, top),
        Commands::Weights { dataset, top } => cmd_weights(&config, &dataset, top),
        Commands::Explain {
            id,
            dataset,
            max_display,
        } => cmd_explain(&config, &dataset, id, max_display),
    }
}

/// Set up tracing with stderr output, honouring `RUST_LOG` overrides.
fn setup_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Copy external corpora into the `raw/<dataset>_<label>` layout.
fn cmd_organise(config: &Config, dataset: Option<&str>) -> anyhow::Result<()> {
    let selected: Vec<&str> = match dataset {
        Some(name) => vec![name],
        None => vec!["trec", "spamassassin"],
    };

    for name in selected {
        let paths = config.dataset_paths(name);
        let (external, ham, spam) = match (&paths.raw_external, &paths.raw_ham, &paths.raw_spam)
        {
            (Some(e), Some(h), Some(s)) => (e, h, s),
            _ => anyhow::bail!("Dataset '{name}' has no external corpus to organise"),
        };

        let summary = match name {
            "trec" => corpus::organise_trec(external, ham, spam)?,
            "spamassassin" => corpus::organise_spamassassin(external, ham, spam)?,
            other => anyhow::bail!("Unknown external dataset '{other}'"),
        };
        println!(
            "{name}: {} ham, {} spam copied ({} skipped)",
            summary.ham, summary.spam, summary.skipped
        );
    }
    Ok(())
}

/// Parse raw folders into processed table files.
fn cmd_parse(config: &Config, dataset: Option<&str>) -> anyhow::Result<()> {
    let selected: Vec<&str> = match dataset {
        Some(name) => vec![name],
        None => KNOWN_DATASETS.to_vec(),
    };

    for name in selected {
        println!("Processing dataset: {name}");
        let paths = config.dataset_paths(name);
        if paths.raw_folders().iter().all(|f| !f.is_dir()) {
            println!("  Skipped: no raw folders found.");
            continue;
        }

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Parsing [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        let records = corpus::process_dataset(
            &paths,
            Some(&|done, total| {
                pb.set_length(total);
                pb.set_position(done);
            }),
        )?;
        pb.finish_and_clear();

        if let Some(processed) = &paths.processed {
            println!("  {} record(s) written to {}", records.len(), processed.display());
        }
    }
    Ok(())
}

/// Load a dataset's processed records, with judgments applied when a
/// labels file exists.
fn load_records(config: &Config, dataset: &str) -> anyhow::Result<Vec<MessageRecord>> {
    let paths = config.dataset_paths(dataset);
    let processed = paths
        .processed
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Dataset '{dataset}' has no processed table"))?;
    let records = store::deserialize_records(processed)?;

    match &paths.labels {
        Some(labels_path) if labels_path.exists() => {
            let judgments = JudgmentStore::load(labels_path)?;
            Ok(apply_judgments(&records, &judgments))
        }
        _ => Ok(records),
    }
}

/// Run the interactive labelling session for a dataset.
fn cmd_label(config: &Config, dataset: &str) -> anyhow::Result<()> {
    let paths = config.dataset_paths(dataset);
    let processed = paths
        .processed
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Dataset '{dataset}' has no processed table"))?;
    let labels_path = paths
        .labels
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Dataset '{dataset}' has no labels file"))?;

    let records = store::deserialize_records(processed)?;
    let mut judgments = JudgmentStore::load(labels_path)?;
    run_labelling_session(&records, &mut judgments, config.general.snippet_chars)?;
    Ok(())
}

/// Train a fresh pipeline on a dataset's labelled records.
fn train_pipeline(config: &Config, records: &[MessageRecord]) -> anyhow::Result<ModelPipeline> {
    let (labelled, _) = split_labelled_and_inbox(records);
    let mut pipeline = ModelKind::LogisticRegression.pipeline(&config.model);
    pipeline.train(&labelled)?;
    Ok(pipeline)
}

/// Train, predict the inbox, and report features and extremes.
fn cmd_train(config: &Config, dataset: &str, top: usize) -> anyhow::Result<()> {
    let records = load_records(config, dataset)?;
    let pipeline = train_pipeline(config, &records)?;
    let (_, inbox) = split_labelled_and_inbox(&records);

    let weights = pipeline.learned_weights()?;
    println!("\nTop {top} spam-indicative features:");
    for (name, weight) in weights.iter().take(top) {
        println!("  {name}: {weight:.3}");
    }
    println!("\nTop {top} ham-indicative features:");
    for (name, weight) in weights.iter().rev().take(top) {
        println!("  {name}: {weight:.3}");
    }

    if inbox.is_empty() {
        println!("\nNo inbox records to score.");
        return Ok(());
    }
    let predictions = pipeline.predict(&inbox)?;

    let most_spam = predictions
        .iter()
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
        .expect("inbox is non-empty");
    let most_ham = predictions
        .iter()
        .min_by(|a, b| a.probability.total_cmp(&b.probability))
        .expect("inbox is non-empty");

    for (title, prediction) in [("Most likely SPAM", most_spam), ("Most likely HAM", most_ham)]
    {
        if let Some(record) = inbox.iter().copied().find(|r| r.id == prediction.id) {
            println!("\n{title}:");
            println!(
                "{}",
                prediction_summary(record, prediction.probability, config.general.snippet_chars)
            );
        }
    }
    Ok(())
}

/// Print learned weights, most spam-indicative first.
fn cmd_weights(config: &Config, dataset: &str, top: Option<usize>) -> anyhow::Result<()> {
    let records = load_records(config, dataset)?;
    let pipeline = train_pipeline(config, &records)?;

    let weights = pipeline.learned_weights()?;
    let limit = top.unwrap_or(weights.len());
    for (name, weight) in weights.iter().take(limit) {
        println!("{weight:+.4}  {name}");
    }
    Ok(())
}

/// Explain one record's prediction against the labelled training set.
fn cmd_explain(config: &Config, dataset: &str, id: u64, max_display: usize) -> anyhow::Result<()> {
    let records = load_records(config, dataset)?;
    let target = records
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow::anyhow!("No record with id {id} in dataset '{dataset}'"))?;

    let pipeline = train_pipeline(config, &records)?;
    let (labelled, _) = split_labelled_and_inbox(&records);

    let explanation = explain_record(&pipeline, target, &labelled)?;
    print!("{}", render_waterfall(&explanation, max_display));
    Ok(())
}

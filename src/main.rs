use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sponsorcraft::llm::format_currency;
use sponsorcraft::{
    EvidenceSet, GeminiClient, GeminiConfig, IllustrationConfig, Phase, ProposalDraft,
    ProposalSession, SelectionOutcome, SessionSnapshot, SpendRecord, parse_spend_file,
};

#[derive(Parser)]
#[command(name = "sponsorcraft")]
#[command(author, version, about = "Sponsorship proposal generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a spend file and list businesses by total spend
    Records {
        /// Spend data (comma-delimited, header row first)
        #[arg(short, long)]
        csv: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Draft and illustrate a proposal for one business, printed as JSON
    Propose {
        /// Spend data (comma-delimited, header row first)
        #[arg(short, long)]
        csv: PathBuf,

        /// Business to propose to (defaults to the top spender)
        #[arg(short, long)]
        business: Option<String>,

        /// Evidence upload batch, comma-separated paths; repeat for more batches
        #[arg(short, long)]
        evidence: Vec<String>,

        /// Skip illustration
        #[arg(long)]
        no_images: bool,

        /// Override the drafting model
        #[arg(long)]
        text_model: Option<String>,

        /// Override the illustration model
        #[arg(long)]
        image_model: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Finished proposal as printed to stdout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposalReport {
    business_name: String,
    total_spend: f64,
    generated_at: DateTime<Utc>,
    proposal: ProposalDraft,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Records { csv, verbose } => {
            setup_logging(verbose);
            list_records(csv)
        }
        Commands::Propose {
            csv,
            business,
            evidence,
            no_images,
            text_model,
            image_model,
            verbose,
        } => {
            setup_logging(verbose);
            propose(csv, business, evidence, no_images, text_model, image_model).await
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON proposal.
/// RUST_LOG, when set, overrides --verbose.
fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn list_records(csv: PathBuf) -> Result<()> {
    info!("Loading spend data from {:?}", csv);
    let records = parse_spend_file(&csv).context("Failed to parse spend data")?;

    println!("Businesses by Total Spend");
    println!("=========================");
    for (rank, record) in records.iter().enumerate() {
        println!(
            "{:>3}. {} - {} across {} products",
            rank + 1,
            record.business_name(),
            format_currency(record.total_spend()),
            record.product_count()
        );
        for (product, amount) in record.products() {
            println!("       {}: {}", product, format_currency(*amount));
        }
    }

    Ok(())
}

async fn propose(
    csv: PathBuf,
    business: Option<String>,
    evidence_batches: Vec<String>,
    no_images: bool,
    text_model: Option<String>,
    image_model: Option<String>,
) -> Result<()> {
    info!("Loading spend data from {:?}", csv);
    let records = parse_spend_file(&csv).context("Failed to parse spend data")?;
    let record = pick_record(&records, business.as_deref())?;

    info!(
        "Selected {} ({} total spend)",
        record.business_name(),
        format_currency(record.total_spend())
    );

    let mut evidence = EvidenceSet::new();
    for batch in &evidence_batches {
        let paths: Vec<PathBuf> = batch
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        // A rejected batch is reported and the rest of the uploads still count
        if let Err(e) = evidence.ingest_batch(&paths).await {
            warn!("Skipping evidence batch {:?}: {}", batch, e);
        }
    }

    let mut config = GeminiConfig::from_env()?;
    if let Some(model) = text_model {
        config = config.with_text_model(model);
    }
    if let Some(model) = image_model {
        config = config.with_image_model(model);
    }
    let client = GeminiClient::new(config);

    let session = ProposalSession::new(client.clone(), client)
        .with_illustration(IllustrationConfig { enabled: !no_images });

    let (outcome, _) = tokio::join!(
        session.select(record, evidence.documents()),
        log_progress(session.subscribe())
    );

    let draft = match outcome.context("Proposal generation failed")? {
        SelectionOutcome::Completed(draft) => draft,
        SelectionOutcome::Superseded => bail!("Proposal attempt was superseded"),
    };

    let report = ProposalReport {
        business_name: record.business_name().to_string(),
        total_spend: record.total_spend(),
        generated_at: Utc::now(),
        proposal: draft,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize proposal")?
    );

    Ok(())
}

fn pick_record<'a>(records: &'a [SpendRecord], business: Option<&str>) -> Result<&'a SpendRecord> {
    match business {
        Some(name) => records
            .iter()
            .find(|r| r.business_name() == name)
            .with_context(|| format!("No spend records for business {:?}", name)),
        None => records.first().context("Spend data has no businesses"),
    }
}

/// Log phase changes until the attempt settles
async fn log_progress(mut updates: watch::Receiver<SessionSnapshot>) {
    let mut last = Phase::Idle;
    while updates.changed().await.is_ok() {
        let (phase, items) = {
            let snapshot = updates.borrow_and_update();
            (
                snapshot.phase,
                snapshot.draft.as_ref().map(ProposalDraft::item_count),
            )
        };
        if phase != last {
            match (phase, items) {
                (Phase::Illustrating, Some(items)) => {
                    info!("Draft ready, illustrating {} items", items)
                }
                _ => info!("Phase: {:?}", phase),
            }
            last = phase;
        }
        if matches!(phase, Phase::Done | Phase::Failed) {
            break;
        }
    }
}

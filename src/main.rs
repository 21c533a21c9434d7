use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use newgoods_finder::collector::{CollectOutcome, DEFAULT_MIN_PRODUCTS, NewGoodsCollector};
use newgoods_finder::config::ExtractorConfig;
use newgoods_finder::download::ImageDownloader;
use newgoods_finder::extractor::{Extraction, Extractor};
use newgoods_finder::notify::{FanoutNotifier, LogNotifier, WebhookNotifier};
use newgoods_finder::page::PageFetcher;
use newgoods_finder::scrapers::famima::{self, FamimaSource};
use newgoods_finder::traits::{ProductSource, StatusNotifier};

#[derive(Parser)]
#[command(name = "newgoods-finder", version, about = "Detect and download new product images")]
struct Cli {
    /// Page to read products from
    #[arg(long, global = true, env = "NEWGOODS_PAGE_URL", default_value = famima::DEFAULT_PAGE_URL)]
    page_url: String,

    /// JSON file overriding the built-in extractor tables
    #[arg(long, global = true, env = "NEWGOODS_EXTRACTOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print detected products as JSON
    Detect {
        /// Read a saved HTML snapshot instead of fetching the page
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        download_args: DownloadArgs,
    },
    /// Detect products and download their images
    Download(DownloadArgs),
    /// Re-check the page on a schedule
    Watch {
        /// Six-field cron expression
        #[arg(long, env = "NEWGOODS_WATCH_CRON", default_value = "0 */30 * * * *")]
        schedule: String,

        /// Also download when enough products are found
        #[arg(long)]
        download: bool,

        #[command(flatten)]
        download_args: DownloadArgs,
    },
}

#[derive(Args, Clone)]
struct DownloadArgs {
    /// Directory receiving the images
    #[arg(long, env = "NEWGOODS_DOWNLOAD_DIR", default_value = "famima_images")]
    output_dir: PathBuf,

    /// Pause between two downloads, in milliseconds
    #[arg(long, env = "NEWGOODS_DOWNLOAD_DELAY_MS", default_value_t = 500)]
    delay_ms: u64,

    /// Products required before anything is downloaded
    #[arg(long, env = "NEWGOODS_MIN_PRODUCTS", default_value_t = DEFAULT_MIN_PRODUCTS)]
    min_products: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let extractor = Extractor::new(load_config(cli.config.as_deref())?);
    let fetcher = PageFetcher::new()?;
    let source = FamimaSource::new(fetcher.clone(), extractor, &cli.page_url)?;

    match cli.command {
        Command::Detect {
            file: Some(path), ..
        } => {
            let html = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            print_products(source.extract_html(&html))?;
        }
        Command::Detect {
            file: None,
            download_args,
        } => {
            let collector = build_collector(source, &fetcher, &download_args);
            print_products(collector.scan().await?)?;
        }
        Command::Download(args) => {
            let collector = build_collector(source, &fetcher, &args);
            report(collector.collect().await?);
        }
        Command::Watch {
            schedule,
            download,
            download_args,
        } => {
            let collector = build_collector(source, &fetcher, &download_args);
            watch(collector, &schedule, download).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ExtractorConfig> {
    match path {
        Some(path) => {
            info!("Loading extractor config from {}", path.display());
            ExtractorConfig::from_json_file(path)
        }
        None => Ok(ExtractorConfig::default()),
    }
}

fn notifier(threshold: usize) -> Arc<dyn StatusNotifier> {
    let receivers: Vec<Box<dyn StatusNotifier>> = vec![
        Box::new(LogNotifier::new(threshold)),
        Box::new(WebhookNotifier::from_env(threshold)),
    ];
    Arc::new(FanoutNotifier::new(receivers))
}

fn build_collector(source: FamimaSource, fetcher: &PageFetcher, args: &DownloadArgs) -> NewGoodsCollector {
    let downloader = ImageDownloader::new(
        fetcher.client().clone(),
        args.output_dir.clone(),
        Duration::from_millis(args.delay_ms),
    )
    .with_referer(source.page_url());

    NewGoodsCollector::new(
        Arc::new(source),
        notifier(args.min_products),
        downloader,
        args.min_products,
    )
}

fn print_products(extraction: Extraction) -> Result<()> {
    let json = serde_json::to_string_pretty(&extraction.into_response())?;
    println!("{json}");
    Ok(())
}

fn report(outcome: CollectOutcome) {
    match outcome {
        CollectOutcome::Downloaded(summary) if summary.failed == 0 => {
            info!("Downloaded {} images", summary.succeeded);
        }
        CollectOutcome::Downloaded(summary) => {
            error!(
                "{} images downloaded, {} failed",
                summary.succeeded, summary.failed
            );
        }
        CollectOutcome::BelowMinimum { found, required } => {
            info!(
                "Found {} products, fewer than the {} required; nothing downloaded",
                found, required
            );
        }
    }
}

async fn run_once(collector: &NewGoodsCollector, download: bool) -> Result<()> {
    if download {
        report(collector.collect().await?);
    } else {
        collector.scan().await?;
    }
    Ok(())
}

async fn watch(collector: NewGoodsCollector, schedule: &str, download: bool) -> Result<()> {
    // Run once immediately
    if let Err(e) = run_once(&collector, download).await {
        error!("Error during initial check: {}", e);
    }

    let sched = JobScheduler::new().await?;

    let job_collector = collector.clone();
    sched
        .add(Job::new_async(schedule, move |_uuid, _l| {
            let collector = job_collector.clone();
            Box::pin(async move {
                if let Err(e) = run_once(&collector, download).await {
                    error!("Error checking for new products: {}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started with schedule '{}'", schedule);
    sched.start().await?;

    // Keep the program running
    loop {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
}

mod config;
mod error;
mod extract;
mod fetch;
mod model;
mod pipeline;
mod render;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::error;

use config::Config;
use fetch::{BrowserLoader, BrowserOptions, HttpLoader, PageLoader};
use pipeline::Pipeline;
use render::Template;

#[derive(Parser)]
#[command(
    name = "hot_boards",
    about = "Scrape popular movie/series boards and render them into one static page"
)]
struct Cli {
    /// JSON file overriding sources, extraction contracts and pacing
    #[arg(short, long, env = "HOT_BOARDS_CONFIG")]
    config: Option<PathBuf>,

    /// Where the rendered page goes (overwritten)
    #[arg(short, long, default_value = "index.html")]
    output: PathBuf,

    /// Page template to use instead of the built-in one
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Fetch boards with plain HTTP instead of a headless browser
    #[arg(long)]
    static_boards: bool,

    /// Chrome/Chromium binary (default: auto-detect)
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// Seconds to let a board's scripts run after navigation
    #[arg(long)]
    settle_secs: Option<f64>,

    /// Pause between detail-page requests, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Ceiling for a single detail-page request, in seconds
    #[arg(long)]
    detail_timeout_secs: Option<f64>,
}

impl Cli {
    /// File (or built-in) config with command-line overrides applied.
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(secs) = self.settle_secs {
            config.pacing.settle_ms = secs_to_ms(secs)?;
        }
        if let Some(ms) = self.delay_ms {
            config.pacing.politeness_ms = ms;
        }
        if let Some(secs) = self.detail_timeout_secs {
            config.pacing.detail_timeout_ms = secs_to_ms(secs)?;
        }
        Ok(config)
    }
}

fn secs_to_ms(secs: f64) -> anyhow::Result<u64> {
    let d = Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid duration: {}s", secs))?;
    u64::try_from(d.as_millis()).with_context(|| format!("Duration out of range: {}s", secs))
}

fn build_pipeline(cli: &Cli, config: &Config) -> anyhow::Result<Pipeline> {
    let pacing = &config.pacing;
    let boards: Box<dyn PageLoader> = if cli.static_boards {
        Box::new(HttpLoader::new(pacing.board_timeout())?)
    } else {
        Box::new(BrowserLoader::new(BrowserOptions {
            chrome: cli.chrome.clone(),
            settle: pacing.settle(),
            page_timeout: pacing.board_timeout(),
        }))
    };
    let details = Box::new(HttpLoader::new(pacing.detail_timeout())?);

    Ok(Pipeline::new(
        boards,
        details,
        &config.board,
        &config.detail,
        pacing.pipeline_pacing(),
    )?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let template = match Template::load(cli.template.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            error!("{}", e);
            println!("Template unusable, nothing fetched: {}", e);
            return Ok(());
        }
    };

    let pipeline = build_pipeline(&cli, &config)?;

    println!("Fetching popular listings from {} boards...", config.sources.len());
    let result = pipeline.aggregate(&config.sources).await;

    if result.has_records() {
        println!(
            "Collected {} records across {} boards.",
            result.total_records(),
            result.len()
        );
        let html = render::render(&result, chrono::Local::now().naive_local(), &template);
        match render::write_output(&cli.output, &html) {
            Ok(()) => println!("Page written to {}", cli.output.display()),
            Err(e) => {
                error!("{}", e);
                println!("Rendering failed: {}", e);
            }
        }
    } else {
        println!("Nothing collected from any board. Check the network connection and the extraction contract.");
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

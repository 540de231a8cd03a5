mod ui;

use std::{
    env,
    io::Write,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
};

use anyhow::Result;
use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand};
use pagespeed_analysis::{render_iteration, render_run_report};
use pagespeed_client::HttpMeasurementClient;
use pagespeed_ops::{ensure_export_dir, export_run, init_tracing, write_report};
use pagespeed_orchestrator::{
    BatchOrchestrator, ChannelObserver, CompositeObserver, ProgressObserver, TracingObserver,
};
use pagespeed_proxy::ProxySettings;
use pagespeed_types::{
    config::{BatchConfig, ClientMode},
    events::{ProgressEvent, ProgressStage},
    run::BatchRun,
};
use tracing::{info, warn};

const CONFIG_ENV: &str = "PAGESPEED_BATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "pagespeed.toml";

#[derive(Parser, Debug)]
#[command(name = "pagespeed-batch", author, version, about = "Batch PageSpeed Insights tester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure a URL several times and print averaged results.
    Run(RunArgs),
    /// Serve the provider proxy so the API key stays server-side.
    Proxy(ProxyArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Page to measure (http:// or https://).
    #[arg(long)]
    url: String,

    /// Number of iterations (1-20).
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    count: i64,

    /// Config file (defaults to $PAGESPEED_BATCH_CONFIG, then pagespeed.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait between iterations.
    #[arg(long)]
    interval: Option<u64>,

    /// Wait with a single sleep instead of a per-second countdown.
    #[arg(long, action = ArgAction::SetTrue)]
    no_countdown: bool,

    /// Extra seconds to wait after a failed iteration.
    #[arg(long)]
    failure_delay: Option<u64>,

    /// Call the provider API directly instead of going through the proxy.
    #[arg(long, action = ArgAction::SetTrue)]
    direct: bool,

    /// Proxy endpoint to call.
    #[arg(long)]
    proxy_url: Option<String>,

    /// Show the terminal dashboard while the batch runs.
    #[arg(long, action = ArgAction::SetTrue)]
    tui: bool,

    /// Also write the report to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Export the run as JSON and text into the configured export dir.
    #[arg(long, action = ArgAction::SetTrue)]
    export: bool,

    /// Increase logging verbosity.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut BatchConfig) {
        if let Some(interval) = self.interval {
            config.pacing.interval_secs = interval;
        }
        if self.no_countdown {
            config.pacing.countdown = false;
        }
        if let Some(delay) = self.failure_delay {
            config.pacing.failure_delay_secs = delay;
        }
        if self.direct {
            config.client.mode = ClientMode::Direct;
        }
        if let Some(proxy_url) = &self.proxy_url {
            config.client.mode = ClientMode::Proxy;
            config.client.proxy_url = proxy_url.clone();
        }
        if self.verbose {
            config.ops.log_level = "debug".into();
        } else if self.tui {
            // Keep log lines from drawing over the dashboard.
            config.ops.log_level = "warn".into();
        }
    }
}

#[derive(Args, Debug)]
struct ProxyArgs {
    /// Address to listen on (overrides proxy.bind_addr).
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Config file (defaults to $PAGESPEED_BATCH_CONFIG, then pagespeed.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Proxy(args) => proxy(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref());
    args.apply(&mut config);
    config.validate()?;
    init_tracing(&config.ops)?;

    let client = HttpMeasurementClient::new(&config.client)?;
    let request_timeout = client.timeout();
    let orchestrator = BatchOrchestrator::new(client, config.pacing, request_timeout);
    info!(url = %args.url, count = args.count, mode = ?config.client.mode, "starting batch");

    let run = if args.tui {
        run_with_dashboard(&orchestrator, &args).await?
    } else {
        let tracing_observer = TracingObserver;
        let printer = LinePrinter::default();
        let observer = CompositeObserver::new()
            .with(&tracing_observer)
            .with(&printer);
        orchestrator.start(&args.url, args.count, &observer).await?
    };

    let report = render_run_report(&run, Local::now().date_naive());
    println!("{report}");

    if let Some(path) = &args.output {
        write_report(path, &report)?;
        info!(path = %path.display(), "Report written");
    }
    if args.export {
        let dir = ensure_export_dir(&config.ops.export_dir)?;
        let exported = export_run(&dir, &run, &report)?;
        eprintln!(
            "Exported {} and {}",
            exported.json_path.display(),
            exported.text_path.display()
        );
    }
    Ok(())
}

async fn run_with_dashboard(
    orchestrator: &BatchOrchestrator<HttpMeasurementClient>,
    args: &RunArgs,
) -> Result<BatchRun> {
    let (tx, rx) = mpsc::channel();
    let summary = format!("{} x{}", args.url.trim(), args.count);
    let dashboard = tokio::task::spawn_blocking(move || ui::run(rx, summary));

    let outcome = {
        let tracing_observer = TracingObserver;
        let channel = ChannelObserver::new(tx);
        let observer = CompositeObserver::new()
            .with(&tracing_observer)
            .with(&channel);
        orchestrator.start(&args.url, args.count, &observer).await
    };

    // The channel observer is gone, so the dashboard sees a closed receiver and exits.
    match dashboard.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "terminal dashboard failed"),
        Err(err) => warn!(error = %err, "terminal dashboard task aborted"),
    }
    Ok(outcome?)
}

async fn proxy(args: ProxyArgs) -> Result<()> {
    let config = load_config(args.config.as_deref());
    config.validate()?;
    init_tracing(&config.ops)?;

    let addr = match args.listen {
        Some(addr) => addr,
        None => config.proxy_bind_addr()?,
    };
    if config.client.resolved_api_key().is_none() {
        warn!("no API key configured; provider requests will be unauthenticated");
    }
    pagespeed_proxy::serve(addr, ProxySettings::from_config(&config.client)).await?;
    Ok(())
}

/// Prints iteration blocks and the pacing countdown to stderr.
#[derive(Default)]
struct LinePrinter {
    counting_down: AtomicBool,
}

impl ProgressObserver for LinePrinter {
    fn on_progress(&self, event: &ProgressEvent) {
        let mut stderr = std::io::stderr().lock();
        if let ProgressStage::Waiting { .. } = event.stage {
            self.counting_down.store(true, Ordering::Relaxed);
            let _ = write!(stderr, "\r{:<60}", event.message);
            let _ = stderr.flush();
            return;
        }
        if self.counting_down.swap(false, Ordering::Relaxed) {
            let _ = writeln!(stderr);
        }
        if let Some(iteration) = &event.iteration {
            let _ = write!(stderr, "{}", render_iteration(iteration));
        }
    }
}

fn load_config(explicit: Option<&Path>) -> BatchConfig {
    let from_env = env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let (path, required) = match explicit.map(Path::to_path_buf).or(from_env) {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    if !required && !path.exists() {
        return BatchConfig::default();
    }

    match BatchConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                BatchConfig::default()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            BatchConfig::default()
        }
    }
}

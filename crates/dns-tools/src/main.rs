// # dns-tools
//
// Thin integration layer: parses flags and env vars, builds the
// collaborators from the library crates and hands them to the core.
// No DNS or change-detection logic lives here.
//
// ## Subcommands
//
// - `gip`: poll the global address, persist it, notify sinks and
//   reconcile the zone when it changes (runs until SIGINT/SIGTERM)
// - `flare <NEW_IP>`: one reconciliation pass with a given address
// - `slack <TEXT>`: post a message to the chat webhook
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export DNS_DOMAIN=example.com
// export FQDN_IGNORE_FILTERS=vpn
// export K_SINK=http://broker-ingress.knative-eventing.svc.cluster.local/default/default
//
// dns-tools gip --interval 30s
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Command, FlareArgs, GipArgs, SlackArgs};
use dns_tools_core::traits::StateStore;
use dns_tools_core::{
    Error, FileStateStore, MemoryStateStore, PollEngine, RecordReconciler, StateStoreConfig,
};
use dns_tools_ip_http::{HttpAddressSource, IpVersion};
use dns_tools_notify::{CloudEventsSink, SlackWebhook};
use dns_tools_provider_cloudflare::CloudflareProvider;
use dns_tools_state_kube::ConfigMapStateStore;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown / success
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsToolsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DnsToolsExitCode> for ExitCode {
    fn from(code: DnsToolsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Map a failure to its exit code
///
/// Configuration errors are startup failures; everything else happened
/// while doing the work.
fn exit_code_for(err: &anyhow::Error) -> DnsToolsExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::Configuration(_)) => DnsToolsExitCode::ConfigError,
        _ => DnsToolsExitCode::RuntimeError,
    }
}

fn log_level(raw: &str) -> Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNS_TOOLS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                DnsToolsExitCode::ConfigError.into()
            } else {
                // --help / --version
                DnsToolsExitCode::CleanShutdown.into()
            };
        }
    };

    let level = match log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DnsToolsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsToolsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsToolsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Command::Gip(args) => run_gip(args).await,
            Command::Flare(args) => run_flare(args).await,
            Command::Slack(args) => run_slack(args).await,
        }
    });

    match result {
        Ok(()) => DnsToolsExitCode::CleanShutdown.into(),
        Err(e) => {
            let code = exit_code_for(&e);
            error!("{:#}", e);
            code.into()
        }
    }
}

/// Build the configured state store
async fn build_state_store(config: &StateStoreConfig) -> Result<Box<dyn StateStore>> {
    let store: Box<dyn StateStore> = match config {
        StateStoreConfig::Kube => Box::new(ConfigMapStateStore::try_default().await?),
        StateStoreConfig::File { path } => Box::new(FileStateStore::new(path).await?),
        StateStoreConfig::Memory => {
            warn!("Using in-memory state store; the last address is lost on restart");
            Box::new(MemoryStateStore::new())
        }
    };
    Ok(store)
}

fn build_reconciler(token: String, dry_run: bool) -> Result<RecordReconciler> {
    if dry_run {
        warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
    }
    let provider = CloudflareProvider::new(token, dry_run)?;
    Ok(RecordReconciler::new(Box::new(provider)))
}

/// `gip`: run the poll loop until a shutdown signal
async fn run_gip(args: GipArgs) -> Result<()> {
    let settings = args.watch_settings()?;
    let store = build_state_store(&args.state_store()?).await?;
    let source = HttpAddressSource::new(&args.ip_url, IpVersion::V4)?;

    let mut engine = PollEngine::new(settings, Box::new(source), store)?;

    if let Some(url) = args.slack_webhook_url() {
        engine = engine.with_notifier(Box::new(SlackWebhook::new(url)?));
    }
    if let Some(target) = args.k_sink() {
        info!("CloudEvents target: {}", target);
        engine = engine.with_notifier(Box::new(CloudEventsSink::new(target)?));
    }
    if args.slack_webhook_url().is_none() && args.k_sink().is_none() {
        warn!("Neither SLACK_WEBHOOK_URL nor K_SINK is set; changes will not be announced");
    }

    match args.dns.reconcile()? {
        Some((token, reconcile)) => {
            info!(domain = %reconcile.domain, "DNS reconciliation enabled");
            let reconciler = build_reconciler(token, args.dns.dry_run())?;
            engine = engine.with_reconciler(reconciler, reconcile)?;
        }
        None => info!("CLOUDFLARE_API_TOKEN / DNS_DOMAIN not set; DNS reconciliation disabled"),
    }

    info!("Starting dns-tools gip");
    engine.run_until(shutdown_signal()).await;
    info!("Shutting down dns-tools gip");
    Ok(())
}

/// `flare`: one reconciliation pass
async fn run_flare(args: FlareArgs) -> Result<()> {
    let target = args.target().map_err(|e| Error::config(e.to_string()))?;
    let (token, settings) = args.dns.require_reconcile()?;
    let reconciler = build_reconciler(token, args.dns.dry_run())?;

    info!(
        include = ?settings.filters.include,
        exclude = ?settings.filters.exclude,
        "Reconciling {} against {}",
        settings.domain,
        target
    );

    let report = reconciler
        .reconcile_domain(target, &settings.domain, &settings.filters)
        .await
        .context("Reconciliation pass failed")?;

    for failure in &report.failures {
        error!("{}", failure);
    }
    if !report.is_clean() {
        anyhow::bail!(
            "{} of {} record update(s) failed",
            report.failures.len(),
            report.attempted()
        );
    }

    info!(
        "Updated {} record(s), skipped {}",
        report.updated.len(),
        report.skipped.len()
    );
    Ok(())
}

/// `slack`: post one message
async fn run_slack(args: SlackArgs) -> Result<()> {
    let url = args
        .slack_webhook_url
        .as_deref()
        .ok_or_else(|| Error::config("environment not set SLACK_WEBHOOK_URL"))?;

    SlackWebhook::new(url)?
        .post_message(&args.text)
        .await
        .context("Failed to post message")?;
    Ok(())
}

/// Resolve when SIGTERM or SIGINT arrives
#[cfg(unix)]
async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to setup signal handlers: {}", e);
            // Fall back to Ctrl-C only
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received shutdown signal: {}", received);
}

/// Resolve when Ctrl-C arrives
#[cfg(not(unix))]
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal: SIGINT"),
        Err(e) => {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use rsu_api::Sc2ReplayStatsClient;
use rsu_config::{LoggingSettings, UploaderConfig};
use rsu_events::{Event, EventBus, EventEnvelope, EventId, EventStream};
use rsu_pipeline::{PathResolver, PipelineDeps, ReplayPipeline, Resolution};
use rsu_telemetry::{GlobalContextGuard, LoggingConfig, init_logging, record_app_mode};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::CliContext;
use crate::error::{CliError, CliResult};

pub(crate) async fn handle_run(ctx: &CliContext) -> CliResult<()> {
    let mut config = ctx.store.load()?;
    let api_key = config.require_api_key()?.to_string();

    let logging = effective_logging(&config, ctx);
    init_logging(&LoggingConfig {
        level: &logging.level,
        format: logging.format,
    })
    .map_err(CliError::failure)?;
    let _guard = GlobalContextGuard::new("startup");

    let resolution = resolve_watch_paths(&config).await?;
    if resolution.discovered {
        config.replays_root = Some(resolution.root.clone());
        ctx.store.save(&config)?;
        info!(root = %resolution.root.display(), "saved replays root to configuration");
    }

    let client = Sc2ReplayStatsClient::new(
        &config.api_root,
        api_key,
        config.pipeline.http_timeout(),
    )
    .map_err(CliError::failure)?;

    let events = EventBus::new();
    let summary = Arc::new(Mutex::new(SessionSummary::default()));
    let tally = tokio::spawn(tally_events(events.subscribe(), Arc::clone(&summary)));

    let pipeline = ReplayPipeline::new(PipelineDeps {
        service: Arc::new(client),
        events: events.clone(),
        settings: config.pipeline.clone(),
    });
    record_app_mode("watch");
    let outcome = pipeline
        .run(&resolution.watch_paths, shutdown_signal())
        .await;
    let summary = settle_summary(tally, &summary, &events).await;
    outcome?;

    info!(
        uploaded = summary.uploaded,
        processed = summary.processed,
        failed = summary.failed,
        "replay uploader stopped"
    );
    Ok(())
}

/// Per-session counts of replay outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SessionSummary {
    uploaded: u64,
    processed: u64,
    failed: u64,
    last_id: EventId,
}

impl SessionSummary {
    /// Count `envelope` unless an event at or after its id was already seen.
    fn record(&mut self, envelope: &EventEnvelope) {
        if envelope.id <= self.last_id {
            return;
        }
        self.last_id = envelope.id;
        match &envelope.event {
            Event::UploadAccepted { .. } => self.uploaded += 1,
            Event::ReplayProcessed { .. } => self.processed += 1,
            event if event.is_terminal() => self.failed += 1,
            _ => {}
        }
    }

    fn catch_up(&mut self, recent: &[EventEnvelope]) {
        for envelope in recent {
            self.record(envelope);
        }
    }
}

async fn tally_events(mut stream: EventStream, summary: Arc<Mutex<SessionSummary>>) {
    while let Some(envelope) = stream.next().await {
        summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&envelope);
    }
}

/// Stop the tally task and count whatever it had not reached yet.
async fn settle_summary(
    tally: JoinHandle<()>,
    summary: &Mutex<SessionSummary>,
    events: &EventBus,
) -> SessionSummary {
    tally.abort();
    // Cancellation is the expected outcome.
    let _ = tally.await;
    let mut summary = summary.lock().unwrap_or_else(PoisonError::into_inner);
    summary.catch_up(&events.recent());
    *summary
}

/// Command-line flags win over the file; they are never written back.
fn effective_logging(config: &UploaderConfig, ctx: &CliContext) -> LoggingSettings {
    LoggingSettings {
        level: ctx
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: ctx.log_format.unwrap_or(config.logging.format),
    }
}

/// Directory scanning and the operator prompt block, so they run off the async workers.
async fn resolve_watch_paths(config: &UploaderConfig) -> CliResult<Resolution> {
    let configured = config.replays_root.clone();
    tokio::task::spawn_blocking(move || {
        let resolver = PathResolver::from_home()?;
        let stdin = io::stdin();
        resolver.resolve(configured.as_deref(), stdin.lock(), io::stdout())
    })
    .await
    .context("replay directory resolution task failed")
    .map_err(CliError::failure)?
    .map_err(CliError::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "SIGINT", "received signal, quitting"),
        () = terminate => info!(signal = "SIGTERM", "received signal, quitting"),
    }
}

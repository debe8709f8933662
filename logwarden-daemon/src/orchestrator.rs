//! Monitor orchestration -- assembly, signal handling, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `logwarden-daemon`.
//! It turns a validated `LogwardenConfig` into a running [`MonitorLoop`]:
//! loads custom rules, opens the entry store, wires the model store and the
//! notifier, then drives the loop until a shutdown signal arrives.
//!
//! # Shutdown
//!
//! `SIGTERM` and `SIGINT` cancel a shared [`CancellationToken`]. The monitor
//! loop observes it at the next cycle boundary, so an in-flight cycle always
//! completes before the daemon exits.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use logwarden_core::config::{LogwardenConfig, MonitorConfig};
use logwarden_log_pipeline::anomaly::{AnomalyModel, ModelParams};
use logwarden_log_pipeline::{
    CycleReport, FileModelStore, JsonLinesStore, MonitorLoop, ModelStore, PipelineConfig,
    RuleLoader, RuleMatcher, TracingNotifier, train_from_file,
};

use crate::pid::PidFile;

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogwardenConfig,
    /// The monitor loop driven by this daemon.
    monitor: MonitorLoop,
    /// Cancelled on SIGTERM/SIGINT or by [`Orchestrator::shutdown_token`] holders.
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - Custom rules cannot be loaded or compiled
    /// - The entry store cannot be opened
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LogwardenConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: LogwardenConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let monitor_config = &config.monitor;
        let rules = load_rules(&monitor_config.rules_path).await?;

        let mut builder = MonitorLoop::builder()
            .config(PipelineConfig::from_core(monitor_config))
            .rules(rules)
            .notifier(Arc::new(TracingNotifier));

        if !monitor_config.entry_store_path.is_empty() {
            let store = JsonLinesStore::open(&monitor_config.entry_store_path)
                .map_err(|e| anyhow::anyhow!("failed to open entry store: {}", e))?;
            tracing::info!(path = %store.path().display(), "entry store opened");
            builder = builder.entry_store(Arc::new(store));
        }

        if monitor_config.ml_enabled {
            builder = builder.model_store(Arc::new(FileModelStore::new(&monitor_config.model_path)));
        }

        let monitor = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build monitor loop: {}", e))?;

        tracing::info!(
            files = monitor.config().watch_paths.len(),
            rules = monitor.pipeline().rules().rule_count(),
            model = monitor.pipeline().has_model(),
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            monitor,
            cancel: CancellationToken::new(),
        })
    }

    /// Run the monitor loop until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    /// - cancellation of [`Orchestrator::shutdown_token`]
    ///
    /// # Errors
    ///
    /// Returns an error if the PID file cannot be claimed, signal handlers
    /// cannot be installed, or the monitor loop escalates.
    pub async fn run(&mut self) -> Result<()> {
        let pid_file = &self.config.general.pid_file;
        let _pid_guard = if pid_file.is_empty() {
            None
        } else {
            Some(PidFile::create(pid_file)?)
        };

        let signal_task = spawn_signal_watcher(self.cancel.clone())?;
        let result = self.monitor.run(self.cancel.clone()).await;

        // Release the watcher when the loop ended on its own (escalation).
        self.cancel.cancel();
        if let Err(e) = signal_task.await {
            tracing::warn!(error = %e, "signal watcher task panicked");
        }

        let stats = self.monitor.stats();
        tracing::info!(
            cycles = stats.cycles,
            lines = stats.lines_read,
            suspicious = stats.suspicious,
            alerts = stats.alerts_emitted,
            "logwarden-daemon shut down"
        );

        result.map_err(|e| anyhow::anyhow!("monitor loop failed: {}", e))
    }

    /// Run exactly one poll cycle over every watched file.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        self.monitor
            .run_once()
            .await
            .map_err(|e| anyhow::anyhow!("poll cycle failed: {}", e))
    }

    /// Token that stops [`Orchestrator::run`] at the next cycle boundary.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LogwardenConfig {
        &self.config
    }

    /// Get a reference to the monitor loop.
    pub fn monitor(&self) -> &MonitorLoop {
        &self.monitor
    }
}

/// Compile the rule table: built-in rules plus the optional custom rule file
/// or directory.
pub async fn load_rules(rules_path: &str) -> Result<RuleMatcher> {
    if rules_path.is_empty() {
        return RuleMatcher::with_builtin_rules()
            .map_err(|e| anyhow::anyhow!("failed to compile built-in rules: {}", e));
    }

    let extra = RuleLoader::load_path(rules_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load rules from {}: {}", rules_path, e))?;
    tracing::info!(path = rules_path, count = extra.len(), "custom rules loaded");
    RuleMatcher::with_extra_rules(extra)
        .map_err(|e| anyhow::anyhow!("failed to compile custom rules: {}", e))
}

/// Train the anomaly model from `input` and save it to `monitor.model_path`.
///
/// Lines matching any threat rule are excluded from the training corpus.
pub async fn train_model(config: &MonitorConfig, input: &Path) -> Result<AnomalyModel> {
    if config.model_path.is_empty() {
        return Err(anyhow::anyhow!("monitor.model_path is not configured"));
    }

    let rules = load_rules(&config.rules_path).await?;
    let model = train_from_file(input, rules, ModelParams::with_contamination(config.contamination))
        .await
        .map_err(|e| anyhow::anyhow!("failed to train model from {}: {}", input.display(), e))?;

    FileModelStore::new(&config.model_path)
        .save(&model)
        .map_err(|e| anyhow::anyhow!("failed to save model: {}", e))?;
    tracing::info!(
        path = %config.model_path,
        samples = model.training_samples(),
        threshold = ?model.threshold(),
        "anomaly model saved"
    );
    Ok(model)
}

/// Install SIGTERM/SIGINT handlers and cancel `cancel` on the first one.
///
/// Handlers are installed before the task is spawned so a failure surfaces
/// from [`Orchestrator::run`] instead of being lost in the task. The task also
/// ends quietly once `cancel` is cancelled by someone else.
fn spawn_signal_watcher(cancel: CancellationToken) -> Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::spawn(async move {
        let received = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
            () = cancel.cancelled() => return,
        };
        tracing::info!(signal = received, "shutdown signal received");
        cancel.cancel();
    }))
}

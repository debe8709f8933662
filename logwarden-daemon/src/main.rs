use anyhow::Result;
use clap::Parser;

use logwarden_core::config::LogwardenConfig;
use logwarden_daemon::cli::DaemonCli;
use logwarden_daemon::logging::init_tracing;
use logwarden_daemon::orchestrator::{Orchestrator, train_model};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일 -> 환경변수 -> CLI 순으로 덮어씀
    let mut config = LogwardenConfig::from_file(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;
    config.apply_env_overrides();
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(pid_file) = cli.pid_file {
        config.general.pid_file = pid_file;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration {} is valid", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "logwarden-daemon starting");

    if let Some(input) = cli.train {
        let model = train_model(&config.monitor, &input).await?;
        println!(
            "trained anomaly model on {} samples, saved to {}",
            model.training_samples(),
            config.monitor.model_path
        );
        return Ok(());
    }

    let mut orchestrator = Orchestrator::build_from_config(config).await?;

    if cli.once {
        let report = orchestrator.run_once().await?;
        for alert in &report.alerts {
            println!("{}", serde_json::to_string(alert)?);
        }
        tracing::info!(
            lines = report.lines_read,
            suspicious = report.suspicious,
            alerts = report.alerts.len(),
            failed_files = report.failed_files,
            "single cycle complete"
        );
        return Ok(());
    }

    orchestrator.run().await
}

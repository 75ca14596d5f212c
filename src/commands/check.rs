use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, ConfigError, Result};
use crate::metrics::Metrics;
use crate::questions::{FallbackDataset, HttpQuestionSource, QuestionSource};
use crate::worker::{AssetCacheController, CacheStorage, HttpNetwork};

pub async fn run_config_check(config: Config, test_install: bool, test_remote: bool) -> Result<()> {
    info!("Running configuration check...");

    crate::config::validate(&config)?;
    info!("✓ Configuration is valid");

    info!("\nStore:");
    match config.store.resolved_path() {
        Some(path) => info!("  Path: {}", path.display()),
        None => warn!("  ! Could not determine a store path"),
    }
    info!("  History limit: {}", config.store.history_limit);

    info!("\nSync:");
    info!("  Auto sync: {}", config.sync.auto_sync);
    info!("  Debounce: {} ms", config.sync.debounce_ms);

    info!("\nWorker {}:", config.worker.version);
    info!("  Shell cache: {}", config.worker.shell_cache_name());
    info!("  Offline cache: {}", config.worker.offline_cache_name());
    info!("  Essential resources: {:?}", config.worker.essential_resources);

    let bundled = FallbackDataset::bundled();
    info!("\n✓ Bundled dataset has {} questions", bundled.len());

    let mut all_passed = true;

    if test_remote {
        if config.remote.is_configured() {
            match check_remote(&config).await {
                Ok(count) => info!("✓ Remote source returned {} valid questions", count),
                Err(e) => {
                    error!("✗ Remote source check failed: {}", e);
                    all_passed = false;
                }
            }
        } else {
            warn!("! Remote check skipped (remote.url not set)");
        }
    }

    if test_install {
        match check_install(&config).await {
            Ok(()) => info!("✓ Worker install succeeded against {}", config.worker.origin),
            Err(e) => {
                error!("✗ Worker install failed: {}", e);
                all_passed = false;
            }
        }
    }

    if all_passed {
        info!("\n✓ All checks passed");
        Ok(())
    } else {
        Err(AppError::Config(ConfigError::Validation(
            "One or more checks failed".to_string(),
        )))
    }
}

async fn check_remote(config: &Config) -> Result<usize> {
    let source = HttpQuestionSource::from_config(&config.remote)?;
    info!("Fetching {}", source.endpoint());
    let questions = source.fetch_all().await?;
    Ok(questions.len())
}

/// Run a throwaway install so unreachable essential resources show up early
async fn check_install(config: &Config) -> Result<()> {
    let network = HttpNetwork::new(&config.worker.origin, Duration::from_secs(10))?;
    let controller = AssetCacheController::new(
        &config.worker,
        Arc::new(CacheStorage::new()),
        Arc::new(network),
        Arc::new(Metrics::new()),
    );
    controller.install().await?;
    Ok(())
}

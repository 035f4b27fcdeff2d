//! Game engine binary for the Airlock simulation.
//!
//! Loads configuration, wires persistence, the Observer API and the
//! decision oracle, then plays the configured number of games back to
//! back until they finish or Ctrl-C stops the run.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `AIRLOCK_CONFIG` (default `airlock-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the room graph
//! 4. Connect to `PostgreSQL` and start the log writer, if configured
//! 5. Start the Observer API server, if enabled
//! 6. Install the Ctrl-C handler
//! 7. Set up the oracle backends
//! 8. Play the games
//! 9. Drain the log writer and shut down

mod error;
mod game;
mod observer_callback;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use airlock_core::config::{AirlockConfig, OracleKind};
use airlock_core::control::GameControl;
use airlock_core::scheduler::SchedulerError;
use airlock_core::sink::LogSink;
use airlock_db::{PostgresPool, PostgresSink};
use airlock_observer::{AppState, ServerConfig};
use airlock_runner::config::RunnerConfig;
use airlock_runner::prompt::PromptEngine;
use rand::Rng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::game::{LlmSetup, Session};

const DEFAULT_CONFIG_PATH: &str = "airlock-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let path = config_path();
    let config = load_config(&path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        name = config.game.name,
        config = %path.display(),
        agents = config.roster.agent_count,
        byzantine = config.roster.byzantine_count,
        round_limit = config.game.round_limit,
        games = config.game.games,
        "airlock-engine starting"
    );

    // 3. Build the room graph.
    let graph = config.room_graph()?;
    info!(
        rooms = graph.rooms().count(),
        meeting_room = %graph.meeting_room(),
        "room graph built"
    );

    // 4. Connect to PostgreSQL.
    let (pool, persistent, writer) = match &config.infrastructure.postgres_url {
        Some(url) => {
            let pool = PostgresPool::connect_url(url).await.map_err(EngineError::from)?;
            pool.run_migrations().await.map_err(EngineError::from)?;
            let (sink, writer) = PostgresSink::spawn(pool.clone());
            let sink: Arc<dyn LogSink> = Arc::new(sink);
            (Some(pool), Some(sink), Some(writer))
        }
        None => {
            info!("no postgres_url configured, logs stay in memory");
            (None, None, None)
        }
    };

    // 5. Start the Observer API server.
    let observer = if config.infrastructure.observer_enabled {
        let state = Arc::new(AppState::new());
        let server = ServerConfig {
            port: config.infrastructure.observer_port,
            ..ServerConfig::default()
        };
        let _handle = airlock_observer::spawn_observer(&server, Arc::clone(&state))
            .await
            .map_err(EngineError::from)?;
        info!(port = server.port, "observer API started");
        Some(state)
    } else {
        None
    };

    // 6. Install the Ctrl-C handler.
    let control = Arc::new(GameControl::new());
    let signal_control = Arc::clone(&control);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current phase");
            signal_control.request_stop();
        }
    });

    // 7. Set up the oracle backends.
    let llm = match config.oracle.kind {
        OracleKind::Llm => {
            let runner = RunnerConfig::from_env().map_err(EngineError::from)?;
            let prompts = PromptEngine::new(runner.templates_dir.as_deref().map(Path::new))
                .map_err(EngineError::from)?;
            Some(LlmSetup {
                config: runner,
                prompts: Arc::new(prompts),
            })
        }
        OracleKind::Random => None,
    };

    let session = Session {
        graph,
        rules: config.rules(),
        plan: config.roster_plan(),
        llm,
        persistent,
        observer,
        control,
    };

    // 8. Play the games.
    let base_seed = config.game.seed.unwrap_or_else(|| rand::rng().random());
    play_all(&session, base_seed, config.game.games).await;

    // 9. Drain the log writer and shut down.
    drop(session);
    if let Some(writer) = writer {
        let report = writer.finish().await;
        info!(written = report.written, failed = report.failed, "log writer drained");
    }
    if let Some(pool) = pool {
        pool.close().await;
    }
    info!("airlock-engine stopped");
    Ok(())
}

async fn play_all(session: &Session, base_seed: u64, games: u32) {
    for index in 0..games {
        let seed = base_seed.wrapping_add(u64::from(index));
        match session.play(seed).await {
            Ok(result) => {
                let winners = result.final_stats.iter().filter(|s| s.won).count();
                info!(
                    game = index,
                    game_id = %result.game_id,
                    seed,
                    outcome = %result.outcome,
                    rounds = result.rounds,
                    winners,
                    "game finished"
                );
            }
            Err(EngineError::Game {
                source: SchedulerError::Aborted { round, phase },
            }) => {
                warn!(game = index, round, %phase, "run stopped");
                return;
            }
            Err(e) => {
                error!(game = index, seed, error = %e, "game failed");
                return;
            }
        }
    }
}

fn config_path() -> PathBuf {
    std::env::var_os("AIRLOCK_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)

}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
fn load_config(path: &Path) -> Result<AirlockConfig, EngineError> {
    if path.exists() {
        Ok(AirlockConfig::from_file(path)?)
    } else {
        let mut config = AirlockConfig::default();
        config.infrastructure.apply_env_overrides();
        config.check()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/airlock-config.yaml")).unwrap();
        assert_eq!(config.roster.agent_count, 8);
        assert_eq!(config.oracle.kind, OracleKind::Llm);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("airlock-engine-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.yaml");
        std::fs::write(&path, "roster:\n  agent_count: 3\n  byzantine_count: 3\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

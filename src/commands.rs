// ABOUTME: Subcommand handlers for the rewind binary.
// ABOUTME: Opens the store from config, runs one operation, and prints the result as JSON or YAML.

use std::sync::Arc;

use anyhow::{Context, bail};
use rewind_core::{ReplayStep, parse_timestamp};
use rewind_server::{AppState, RewindConfig, create_router};
use rewind_store::{AuditFilter, EventStore};
use serde::Serialize;

use crate::{Command, Format};

pub async fn run(command: Command, mut config: RewindConfig, format: Format) -> anyhow::Result<()> {
    if let Command::Serve { bind: Some(bind) } = &command {
        config.bind = *bind;
    }

    let store = EventStore::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?
        .with_replay_policy(config.replay_policy);

    match command {
        Command::Serve { .. } => serve(store, &config).await,
        Command::History {
            entity_type,
            entity_id,
        } => {
            let records = store.history(&entity_type, entity_id)?;
            if records.is_empty() {
                bail!("no history found for {entity_type} #{entity_id}");
            }
            print(format, &records)
        }
        Command::StateAt {
            entity_type,
            entity_id,
            timestamp,
        } => {
            let at = parse_timestamp(&timestamp)?;
            print(format, &store.require_state_at(&entity_type, entity_id, at)?)
        }
        Command::Diff {
            entity_type,
            entity_id,
            from,
            to,
        } => {
            let (from, to) = (parse_timestamp(&from)?, parse_timestamp(&to)?);
            print(format, &store.diff(&entity_type, entity_id, from, to)?)
        }
        Command::Replay {
            entity_type,
            entity_id,
            until,
        } => {
            let until = until.as_deref().map(parse_timestamp).transpose()?;
            let replay = store.replay(&entity_type, entity_id, until)?;
            if replay.is_empty() {
                bail!("no events found for {entity_type} #{entity_id}");
            }
            let steps: Vec<ReplayStep<'_>> = replay.iter().collect();
            print(format, &steps)
        }
        Command::Restore {
            entity_type,
            entity_id,
            to,
        } => {
            let to = parse_timestamp(&to)?;
            print(format, &store.restore(&entity_type, entity_id, to)?)
        }
        Command::Feed {
            limit,
            entity_types,
        } => {
            check_limit(limit, config.feed_max_limit)?;
            print(format, &store.activity_feed(limit, &entity_types)?)
        }
        Command::Audit {
            entity_type,
            entity_id,
            limit,
            offset,
        } => {
            check_limit(limit, config.feed_max_limit)?;
            let filter = AuditFilter {
                entity_type,
                entity_id,
                limit,
                offset,
            };
            print(format, &store.audit_logs(&filter)?)
        }
        Command::Stats => print(format, &store.audit_stats()?),
    }
}

async fn serve(store: EventStore, config: &RewindConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(store, config.feed_max_limit));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(
        bind = %config.bind,
        db = %config.db_path.display(),
        replay_policy = %config.replay_policy,
        "rewind listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("rewind stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}

fn check_limit(limit: u32, max: u32) -> anyhow::Result<()> {
    if limit == 0 || limit > max {
        bail!("limit must be between 1 and {max}");
    }
    Ok(())
}

fn print<T: Serialize + ?Sized>(format: Format, value: &T) -> anyhow::Result<()> {
    println!("{}", render(format, value)?);
    Ok(())
}

fn render<T: Serialize + ?Sized>(format: Format, value: &T) -> anyhow::Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yaml::to_string(value)?.trim_end().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_json_and_yaml() {
        let value = json!({"status": "resolved"});
        assert_eq!(render(Format::Json, &value).unwrap(), "{\n  \"status\": \"resolved\"\n}");
        assert_eq!(render(Format::Yaml, &value).unwrap(), "status: resolved");
    }

    #[test]
    fn limit_must_be_within_cap() {
        assert!(check_limit(1, 200).is_ok());
        assert!(check_limit(200, 200).is_ok());
        assert!(check_limit(0, 200).is_err());
        assert!(check_limit(201, 200).is_err());
    }

    #[tokio::test]
    async fn offline_commands_read_an_existing_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("rewind.db");
        {
            let store = EventStore::open(&db_path).unwrap();
            let after = json!({"title": "Ship it"}).as_object().cloned().unwrap();
            store
                .record(&rewind_core::NewChange::create("task", 1, after))
                .unwrap();
        }

        let config = RewindConfig {
            db_path,
            bind: "127.0.0.1:0".parse().unwrap(),
            feed_max_limit: 200,
            replay_policy: Default::default(),
        };

        run(
            Command::History {
                entity_type: "task".into(),
                entity_id: 1,
            },
            config.clone(),
            Format::Json,
        )
        .await
        .unwrap();

        let missing = run(
            Command::History {
                entity_type: "task".into(),
                entity_id: 2,
            },
            config,
            Format::Yaml,
        )
        .await;
        assert!(missing.unwrap_err().to_string().contains("#2"));
    }
}

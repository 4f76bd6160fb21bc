use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{Value, json};
use tether_core::impls::{BroadcastEventSink, JsonFilePersistence, WatchConnectivity};
use tether_core::ports::Persistence;
use tether_core::typed::{DeadLetterPayload, ErrorClass, Hook, Transformed};
use tether_core::{EngineBuilder, EngineConfig, HookError};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TODO_CREATE: &str = "todo.create";

/// Offline-first action queue demo.
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding queue.json and dead_letters.json.
    #[arg(long, env = "TETHER_DATA_DIR", default_value = ".tether")]
    data_dir: PathBuf,

    /// TOML file with an `[engine]` table.
    #[arg(short, long, env = "TETHER_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enqueue actions while offline, reconnect and let the engine drain them.
    Demo {
        /// Number of actions to enqueue.
        #[arg(long, default_value_t = 5)]
        count: u32,

        /// How many hook calls fail before the remote "recovers".
        #[arg(long, default_value_t = 2)]
        failures: u32,
    },
    /// Print the persisted queues.
    Status,
    /// Drop every dead-letter entry.
    ClearDeadLetters,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    engine: EngineConfig,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let file: FileConfig =
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(file.engine)
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// 最初の数回だけ失敗する「リモート API」
struct FlakyRemote {
    remaining_failures: AtomicU32,
}

#[async_trait]
impl Hook for FlakyRemote {
    async fn execute(&self, id: &str, payload: Value) -> Result<(), HookError> {
        sleep(Duration::from_millis(100)).await;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(HookError::new(format!("503 service unavailable (left={left})")));
        }

        info!(%id, %payload, "remote accepted todo");
        Ok(())
    }
}

fn to_remote(payload: &Value) -> Result<Transformed, HookError> {
    let Some(title) = payload["title"].as_str() else {
        return Err(HookError::new("todo without title"));
    };
    let id = format!("todo-{}", payload["n"]);
    Ok(Transformed::new(id, json!({ "name": title })))
}

fn classify(err: &HookError) -> ErrorClass {
    // 認証エラーはユーザー操作が要るので止める
    if err.message().starts_with("401") {
        ErrorClass::Fatal
    } else {
        ErrorClass::Recoverable
    }
}

async fn demo(
    config: EngineConfig,
    persistence: Arc<dyn Persistence>,
    count: u32,
    failures: u32,
) -> anyhow::Result<()> {
    let connectivity = Arc::new(WatchConnectivity::new(false));
    let events = Arc::new(BroadcastEventSink::new(config.event_capacity));

    let engine = EngineBuilder::from_config(config)
        .register_hook(
            TODO_CREATE,
            FlakyRemote {
                remaining_failures: AtomicU32::new(failures),
            },
        )?
        .register_transformer(TODO_CREATE, to_remote)?
        .register_dead_letter_transformer(TODO_CREATE, |payload: &Value| {
            DeadLetterPayload::new(payload.clone()).with_entity("title", payload["title"].clone())
        })?
        .expect_action_types(&[TODO_CREATE])
        .error_policy(classify)
        .event_sink(events.clone())
        .build(persistence, connectivity.clone())
        .await?;

    let mut rx = events.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("event: {line}"),
                    Err(err) => warn!(error = %err, "failed to encode event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let handle = engine.start()?;

    // (A) オフラインのまま積む
    for n in 1..=count {
        let action = engine.action(TODO_CREATE, json!({ "n": n, "title": format!("buy milk #{n}") }));
        engine.enqueue(action).await?;
    }
    info!(queue_size = engine.queue_size(), "queued while offline");

    // (B) 復帰すると driver が listen() を走らせる
    sleep(Duration::from_millis(200)).await;
    connectivity.set_online(true);

    // (C) 空になるまで待つ
    while engine.queue_size() > 0 {
        sleep(Duration::from_millis(50)).await;
    }
    engine.flush().await?;

    let status = engine.status();
    println!("final status: {}", serde_json::to_string(&status)?);

    handle.shutdown().await;
    printer.abort();
    Ok(())
}

async fn status(persistence: &JsonFilePersistence) -> anyhow::Result<()> {
    let queue = persistence.read_queue().await?;
    let dead_letters = persistence.read_dead_letter_queue().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "queue": queue,
            "deadLetters": dead_letters,
        }))?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = load_config(args.config.as_deref())?;
    let persistence = JsonFilePersistence::open(&args.data_dir)
        .await
        .with_context(|| format!("failed to open {}", args.data_dir.display()))?;
    info!(dir = %persistence.dir().display(), "using file persistence");

    match args.command {
        Command::Demo { count, failures } => {
            demo(config, Arc::new(persistence), count, failures).await
        }
        Command::Status => status(&persistence).await,
        Command::ClearDeadLetters => {
            // dead-letter を消すだけなので hook は登録しない
            let engine = EngineBuilder::from_config(EngineConfig {
                expected_action_types: Vec::new(),
                ..config
            })
            .build(Arc::new(persistence), Arc::new(WatchConnectivity::new(false)))
            .await?;
            let removed = engine.clear_dead_letter_queue().await?;
            engine.flush().await?;
            println!("removed {removed} dead-letter entries");
            Ok(())
        }
    }
}

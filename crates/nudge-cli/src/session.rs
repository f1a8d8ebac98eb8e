//! Interactive session: stdin chat with the scheduler attached.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use nudge_core::{
    ConfigStore, Conversation, FileConfigStore, Host, HostSignal, InMemoryConversationStore,
    NudgeConfig, NudgeResult, ProactiveScheduler, SchedulerEvent, SendOutcome,
};
use nudge_llm::GeneratorFactory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::commands::{Input, HELP};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print assistant messages as the scheduler sends them.
fn print_sent_messages(scheduler: &ProactiveScheduler) -> tokio::task::JoinHandle<()> {
    let mut events = scheduler.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SchedulerEvent::Sent { mode, message, .. } => {
                    println!("assistant ({})> {}", mode, message.content);
                }
                SchedulerEvent::Failed { mode, error } => {
                    eprintln!("[{} message failed: {}]", mode, error);
                }
                _ => {}
            }
        }
    })
}

fn print_status(scheduler: &ProactiveScheduler) {
    let config = scheduler.config();
    let state = scheduler.state();
    let now = Utc::now();

    println!("enabled:      {}", config.enabled);
    println!("running:      {}", scheduler.is_running());
    println!("armed:        {:?}", scheduler.armed_modes());
    println!("idle for:     {}s", state.idle_for(now).as_secs());
    match state.last_auto_message_at {
        Some(at) => println!("last message: {}", at.format("%H:%M:%S")),
        None => println!("last message: never"),
    }
    if config.max_uses > 0 {
        println!("uses:         {}/{}", state.use_count, config.max_uses);
    } else {
        println!("uses:         {}", state.use_count);
    }
}

/// Flip the master switch in the config file.
///
/// Starts from what the file says, not from the running settings, so
/// `NUDGE_*` overrides never end up written to disk.
async fn save_enabled(store: &FileConfigStore, enabled: bool) -> NudgeResult<()> {
    let mut settings = store.load().await?.unwrap_or_default();
    settings.enabled = enabled;
    store.save(&settings).await
}

async fn switch(settings_file: &FileConfigStore, enabled: bool) -> HostSignal {
    if let Err(e) = save_enabled(settings_file, enabled).await {
        eprintln!("[could not save settings: {}]", e);
    }
    HostSignal::SetEnabled(enabled)
}

/// Run the session until `/quit`, end of input or a shutdown signal.
pub async fn run(config: NudgeConfig, path: PathBuf) -> Result<()> {
    let generator =
        GeneratorFactory::from_config(&config.provider).context("creating generator")?;
    let model = config.provider.model_or_default().to_string();
    let conversations = Arc::new(InMemoryConversationStore::new());
    conversations.open(Conversation::new().with_model(model.clone()));

    // The running settings carry env overrides; the file is written here
    // rather than through the scheduler.
    let settings_file = FileConfigStore::new(path.clone());
    let host = Host::new(conversations.clone(), generator);
    let scheduler = Arc::new(ProactiveScheduler::new(config.scheduler, host));

    let printer = print_sent_messages(&scheduler);
    let armed = scheduler.start()?;
    info!(modes = ?armed, "Session started");
    println!("nudge: chatting with {}. Type /help for commands.", model);

    let (signals, receiver) = mpsc::channel(32);
    let signal_loop = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_signals(receiver).await })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let Some(input) = Input::parse(&line) else { continue };

        let signal = match input {
            Input::Say(text) => {
                conversations.push_user_message(text, Utc::now())?;
                HostSignal::UserInput
            }
            Input::New => {
                conversations.open(Conversation::new().with_model(model.clone()));
                println!("[new conversation]");
                HostSignal::ConversationChanged
            }
            Input::Enable => switch(&settings_file, true).await,
            Input::Disable => switch(&settings_file, false).await,
            Input::Reload => match NudgeConfig::from_file(&path) {
                Ok(file) => {
                    let settings = file.with_env_overrides().scheduler;
                    HostSignal::UpdateConfig(Box::new(settings))
                }
                Err(e) => {
                    eprintln!("[reload failed: {}]", e);
                    continue;
                }
            },
            Input::Send(mode) => {
                match scheduler.trigger_now(mode).await {
                    SendOutcome::Rejected(reason) => {
                        println!("[{} skipped: {}]", mode, reason)
                    }
                    SendOutcome::Sent { .. } | SendOutcome::Failed(_) => {}
                }
                continue;
            }
            Input::Status => {
                print_status(&scheduler);
                continue;
            }
            Input::Help => {
                println!("{}", HELP);
                continue;
            }
            Input::Invalid(reason) => {
                eprintln!("[{}]", reason);
                continue;
            }
            Input::Quit => break,
        };

        if signals.send(signal).await.is_err() {
            warn!("Signal loop stopped");
            break;
        }
    }

    drop(signals);
    if let Err(e) = signal_loop.await {
        warn!(error = %e, "Signal loop ended abnormally");
    }
    scheduler.stop();
    printer.abort();
    info!("Session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nudge_core::{GeneratorProvider, ProviderConfig, SchedulerConfig};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_enabled_keeps_file_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        NudgeConfig::builder()
            .max_uses(2)
            .provider(ProviderConfig::new(GeneratorProvider::Ollama))
            .build()
            .save_to_file(&path)
            .unwrap();

        let store = FileConfigStore::new(&path);
        save_enabled(&store, false).await.unwrap();

        let file = NudgeConfig::from_file(&path).unwrap();
        assert!(!file.scheduler.enabled);
        assert_eq!(file.scheduler.max_uses, 2);
        assert_eq!(file.provider.provider, GeneratorProvider::Ollama);
    }

    #[tokio::test]
    async fn test_save_enabled_without_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(dir.path().join("nudge").join("config.toml"));
        save_enabled(&store, true).await.unwrap();

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved, SchedulerConfig::default());
    }
}

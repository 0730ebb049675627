//! focusd - The focus timer background service
//!
//! This is the main entry point for the focusd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Session controller
//! - Denylist enforcer and notifier
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use focus_config::{load_config_or_default, EnforcerConfig};
use focus_core::SessionController;
use focus_host_api::{DenylistEnforcer, EnforcerEvent, Notifier};
use focus_host_local::{HostsFileEnforcer, LogNotifier, PassiveEnforcer};
use focus_ipc::{IpcServer, ServerMessage};
use focus_store::{SqliteStore, Store};
use focus_util::default_config_path;
use focusd::Daemon;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// focusd - Pomodoro focus timer with website blocking
#[derive(Parser, Debug)]
#[command(name = "focusd")]
#[command(about = "Pomodoro focus timer service with website blocking", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/focusd/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set FOCUSD_SOCKET env var)
    #[arg(short, long, env = "FOCUSD_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set FOCUSD_DATA_DIR env var)
    #[arg(short, long, env = "FOCUSD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Main service state
struct Service {
    daemon: Arc<Daemon>,
    enforcer: Arc<dyn DenylistEnforcer>,
    ipc: Arc<IpcServer>,
    tick_interval: Duration,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            enforcer = ?config.enforcer,
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("focusd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let enforcer: Arc<dyn DenylistEnforcer> = match &config.enforcer {
            EnforcerConfig::Passive => Arc::new(PassiveEnforcer::new()),
            EnforcerConfig::HostsFile { hosts_path } => {
                info!(path = %hosts_path.display(), "Using hosts-file enforcement");
                Arc::new(HostsFileEnforcer::new(hosts_path.clone()))
            }
        };
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new());

        let controller = SessionController::new(store, config.default_settings.clone(), focus_util::now());
        let daemon = Daemon::new(
            controller,
            enforcer.clone(),
            notifier,
            config.service.collaborator_timeout,
        );

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            daemon: Arc::new(daemon),
            enforcer,
            ipc: Arc::new(ipc),
            tick_interval: config.service.tick_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let daemon = self.daemon.clone();
        let ipc = self.ipc.clone();

        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;
        let mut enforcer_events = self.enforcer.subscribe();

        // Forward controller events to subscribed clients
        let mut observer_events = daemon.subscribe();
        let ipc_events = ipc.clone();
        tokio::spawn(async move {
            loop {
                match observer_events.recv().await {
                    Ok(event) => ipc_events.broadcast_event(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Event forwarder lagging");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        daemon.startup(focus_util::now()).await;

        let mut tick_timer = tokio::time::interval(self.tick_interval);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(tick_interval = ?self.tick_interval, "Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                _ = tick_timer.tick() => {
                    daemon.tick(focus_util::now()).await;
                }

                event = next_enforcer_event(&mut enforcer_events) => {
                    daemon.handle_enforcer_event(event, focus_util::now()).await;
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&daemon, &ipc, msg).await;
                }
            }
        }

        info!("Shutting down focusd");
        daemon.shutdown().await;

        // Let writers deliver the shutdown event
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(daemon: &Arc<Daemon>, ipc: &Arc<IpcServer>, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let Some(info) = ipc.get_client_info(&client_id).await else {
                    debug!(client_id = %client_id, "Request from departed client dropped");
                    return;
                };

                debug!(
                    client_id = %client_id,
                    request_id = request.request_id,
                    command = ?request.command,
                    "Handling request"
                );

                let response = daemon.handle_request(&info, request, focus_util::now()).await;
                if let Err(e) = ipc.send_response(&client_id, response).await {
                    debug!(client_id = %client_id, error = %e, "Failed to send response");
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
            }
        }
    }
}

/// Next event from the enforcer. Pends forever once the stream is gone.
async fn next_enforcer_event(
    events: &mut Option<mpsc::UnboundedReceiver<EnforcerEvent>>,
) -> EnforcerEvent {
    if let Some(rx) = events.as_mut() {
        if let Some(event) = rx.recv().await {
            return event;
        }
        debug!("Enforcer event stream closed");
    }
    *events = None;
    std::future::pending().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "focusd starting");

    if focus_util::is_mock_time_active() {
        warn!(
            var = focus_util::MOCK_TIME_ENV_VAR,
            now = %focus_util::format_datetime_full(&focus_util::now()),
            "Mock time is active"
        );
    }

    let service = Service::new(&args).await?;
    service.run().await
}

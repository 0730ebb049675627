//! focusctl - command-line client for focusd

mod render;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use focus_api::{Command, ImportDocument, ResponsePayload, SettingsPatch};
use focus_ipc::{IpcClient, IpcError};
use focus_util::{default_socket_path, TaskId};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Control the focusd Pomodoro service
#[derive(Parser, Debug)]
#[command(name = "focusctl", version)]
struct Cli {
    /// Socket path (or set FOCUSD_SOCKET env var)
    #[arg(short, long, env = "FOCUSD_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON payloads
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Show timer, blocking and today's statistics
    Status,
    /// Start the pending interval
    Start,
    Pause,
    Resume,
    /// Abandon the current interval
    Stop,
    /// Stream events until interrupted
    Watch,
    /// Turn blocking on, with the settings denylist or the given domains
    Block { domains: Vec<String> },
    /// Turn blocking off
    Unblock,
    /// Check whether a host is blocked right now
    Check { host: String },
    /// Report a blocked navigation
    Report { domain: String },
    #[command(subcommand)]
    Tasks(TaskAction),
    /// Today's statistics
    Stats,
    /// Archived daily statistics
    History {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
    #[command(subcommand)]
    Settings(SettingsAction),
    /// Write a backup document
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore from a backup document
    Import { file: PathBuf },
    /// Zero today's statistics
    ResetStats,
    Health,
    Ping,
}

#[derive(Subcommand, Debug)]
enum TaskAction {
    List,
    Add { text: Vec<String> },
    Toggle { id: u64 },
    #[command(alias = "rm")]
    Delete { id: u64 },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Show,
    Set(SettingsArgs),
    /// Restore the configured defaults
    Reset,
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct SettingsArgs {
    /// Work interval, minutes
    #[arg(long)]
    work: Option<i64>,
    /// Short break, minutes
    #[arg(long = "break")]
    short_break: Option<i64>,
    /// Long break, minutes
    #[arg(long)]
    long_break: Option<i64>,
    /// Work intervals per long break
    #[arg(long)]
    sessions: Option<i64>,
    #[arg(long)]
    notifications: Option<bool>,
    #[arg(long)]
    blocking: Option<bool>,
    #[arg(long)]
    auto_start_breaks: Option<bool>,
    #[arg(long)]
    auto_start_work: Option<bool>,
    #[arg(long)]
    block_while_paused: Option<bool>,
    #[arg(long)]
    notify_blocked: Option<bool>,
    /// Replace the denylist (repeatable)
    #[arg(long = "deny")]
    denylist: Vec<String>,
    /// Replace the allowlist (repeatable)
    #[arg(long = "allow")]
    allowlist: Vec<String>,
}

impl SettingsArgs {
    fn into_patch(self) -> SettingsPatch {
        SettingsPatch {
            work_duration_minutes: self.work,
            break_duration_minutes: self.short_break,
            long_break_duration_minutes: self.long_break,
            sessions_before_long_break: self.sessions,
            notifications_enabled: self.notifications,
            blocking_enabled: self.blocking,
            auto_start_breaks: self.auto_start_breaks,
            auto_start_work: self.auto_start_work,
            block_while_paused: self.block_while_paused,
            notify_blocked: self.notify_blocked,
            denylist: (!self.denylist.is_empty()).then_some(self.denylist),
            allowlist: (!self.allowlist.is_empty()).then_some(self.allowlist),
            ..Default::default()
        }
    }
}

impl Action {
    /// The request for one-shot actions; `None` for the ones handled locally
    fn to_command(&self) -> Result<Option<Command>> {
        let command = match self {
            Action::Status => Command::GetState,
            Action::Start => Command::Start,
            Action::Pause => Command::Pause,
            Action::Resume => Command::Resume,
            Action::Stop => Command::Stop,
            Action::Watch => return Ok(None),
            Action::Block { domains } => Command::EnableBlocking {
                domains: (!domains.is_empty()).then(|| domains.clone()),
            },
            Action::Unblock => Command::DisableBlocking,
            Action::Check { host } => Command::CheckDomain { host: host.clone() },
            Action::Report { domain } => Command::ReportBlocked {
                domain: domain.clone(),
            },
            Action::Tasks(TaskAction::List) => Command::ListTasks,
            Action::Tasks(TaskAction::Add { text }) => Command::AddTask {
                text: text.join(" "),
            },
            Action::Tasks(TaskAction::Toggle { id }) => Command::ToggleTask {
                id: TaskId::new(*id),
            },
            Action::Tasks(TaskAction::Delete { id }) => Command::DeleteTask {
                id: TaskId::new(*id),
            },
            Action::Stats | Action::Settings(SettingsAction::Show) => Command::GetState,
            Action::History { days } => Command::GetHistory { days: *days },
            Action::Settings(SettingsAction::Set(args)) => {
                let patch = args.clone().into_patch();
                if patch.is_empty() {
                    bail!("Nothing to change; pass at least one option");
                }
                Command::UpdateSettings { patch }
            }
            Action::Settings(SettingsAction::Reset) => Command::ResetSettings,
            Action::Export { .. } => Command::ExportData,
            Action::Import { file } => {
                let content = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let document: ImportDocument = serde_json::from_str(&content)
                    .with_context(|| format!("{} is not a backup document", file.display()))?;
                Command::ImportData { document }
            }
            Action::ResetStats => Command::ResetStats,
            Action::Health => Command::GetHealth,
            Action::Ping => Command::Ping,
        };
        Ok(Some(command))
    }
}

/// Stream events, reconnecting whenever the service goes away
async fn watch(socket: &Path, json: bool) -> Result<()> {
    loop {
        match watch_once(socket, json).await {
            Ok(()) => eprintln!("focusd closed the connection, reconnecting"),
            Err(e) => {
                debug!(error = %e, "Watch connection failed");
                eprintln!("focusd unavailable ({}), retrying", e);
            }
        }
        sleep(RECONNECT_DELAY).await;
    }
}

async fn watch_once(socket: &Path, json: bool) -> Result<()> {
    let mut client = IpcClient::connect(socket).await?;

    // Events missed while disconnected are gone; start from a fresh snapshot
    if let ResponsePayload::State(snapshot) = client.request(Command::GetState).await? {
        if json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            println!("{}", render::snapshot(&snapshot));
        }
    }

    let mut events = client.subscribe().await.context("Failed to subscribe")?;
    loop {
        match events.next().await {
            Ok(event) => {
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", render::event(&event));
                }
            }
            Err(IpcError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

fn print_payload(action: &Action, payload: &ResponsePayload, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(payload)?);
        return Ok(());
    }

    let text = match (action, payload) {
        (Action::Stats, ResponsePayload::State(s)) => render::stats_line(&s.daily_stats),
        (Action::Settings(_), ResponsePayload::State(s)) => render::settings(&s.settings),
        (_, ResponsePayload::State(s)) => render::snapshot(s),
        (_, ResponsePayload::Settings(s)) => render::settings(s),
        (_, ResponsePayload::Blocking(status)) => render::blocking_line(status),
        (_, ResponsePayload::DomainCheck { host, blocked_by }) => match blocked_by {
            Some(entry) => format!("{} is blocked (matches {})", host, entry),
            None => format!("{} is allowed", host),
        },
        (
            _,
            ResponsePayload::BlockedRecorded {
                counted,
                blocked_attempts_today,
            },
        ) => {
            if *counted {
                format!("Recorded ({} today)", blocked_attempts_today)
            } else {
                "Ignored: blocking is off".to_string()
            }
        }
        (_, ResponsePayload::Tasks { tasks, productivity_score }) => {
            render::tasks(tasks, *productivity_score)
        }
        (_, ResponsePayload::Task(task)) => format!(
            "Task {} {}: {}",
            task.id,
            if task.completed { "done" } else { "open" },
            task.text
        ),
        (_, ResponsePayload::TaskDeleted { id }) => format!("Task {} deleted", id),
        (_, ResponsePayload::Export(doc)) => serde_json::to_string_pretty(doc)?,
        (_, ResponsePayload::History { days }) => {
            if days.is_empty() {
                "No history yet".to_string()
            } else {
                days.iter().map(render::stats_line).collect::<Vec<_>>().join("\n")
            }
        }
        (_, ResponsePayload::Stats(stats)) => render::stats_line(stats),
        (_, ResponsePayload::Health(h)) => render::health(h),
        (_, ResponsePayload::Pong) => "pong".to_string(),
        (_, ResponsePayload::Subscribed { .. } | ResponsePayload::Unsubscribed) => String::new(),
    };

    if let (Action::Export { output: Some(path) }, ResponsePayload::Export(_)) = (action, payload) {
        std::fs::write(path, format!("{}\n", text))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Exported to {}", path.display());
        return Ok(());
    }

    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command.to_command()? else {
        return watch(&cli.socket, cli.json).await;
    };

    let mut client = IpcClient::connect(&cli.socket)
        .await
        .with_context(|| format!("Failed to connect to focusd at {}", cli.socket.display()))?;

    match client.request(command).await {
        Ok(payload) => print_payload(&cli.command, &payload, cli.json),
        Err(IpcError::Rejected { code, message }) => {
            eprintln!("focusd: {} ({:?})", message, code);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["focusctl"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_block_without_domains_uses_settings() {
        let cli = parse(&["block"]);
        assert!(matches!(
            cli.command.to_command().unwrap(),
            Some(Command::EnableBlocking { domains: None })
        ));

        let cli = parse(&["block", "example.com"]);
        match cli.command.to_command().unwrap() {
            Some(Command::EnableBlocking { domains: Some(d) }) => assert_eq!(d, vec!["example.com"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_settings_set_builds_patch() {
        let cli = parse(&["settings", "set", "--work", "50", "--break", "10", "--deny", "a.com", "--deny", "b.com"]);
        match cli.command.to_command().unwrap() {
            Some(Command::UpdateSettings { patch }) => {
                assert_eq!(patch.work_duration_minutes, Some(50));
                assert_eq!(patch.break_duration_minutes, Some(10));
                assert_eq!(patch.denylist, Some(vec!["a.com".to_string(), "b.com".to_string()]));
                assert_eq!(patch.allowlist, None);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(parse(&["settings", "set"]).command.to_command().is_err());
    }

    #[test]
    fn test_task_commands() {
        let cli = parse(&["tasks", "add", "write", "the", "report"]);
        assert!(matches!(
            cli.command.to_command().unwrap(),
            Some(Command::AddTask { text }) if text == "write the report"
        ));

        let cli = parse(&["tasks", "rm", "3"]);
        assert!(matches!(
            cli.command.to_command().unwrap(),
            Some(Command::DeleteTask { id }) if id == TaskId::new(3)
        ));
    }

    #[test]
    fn test_watch_is_local() {
        assert!(parse(&["watch"]).command.to_command().unwrap().is_none());
    }
}

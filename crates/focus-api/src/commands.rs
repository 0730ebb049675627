//! Command types for the focusd protocol

use focus_util::{ClientId, TaskId};
use serde::{Deserialize, Serialize};

use crate::{
    BlockingStatus, ClientRole, DailyStats, ExportDocument, HealthStatus, ImportDocument,
    Settings, SettingsPatch, StateSnapshot, Task, API_VERSION,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    /// Command does not apply in the current timer state
    InvalidState,
    NoActiveSession,
    SessionActive,
    TaskNotFound,
    PermissionDenied,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get the full state snapshot
    GetState,

    /// Start the pending interval (work unless a break is pending)
    Start,
    Pause,
    Resume,
    /// Abandon the current interval
    Stop,

    UpdateSettings { patch: SettingsPatch },

    /// Turn blocking on, optionally replacing the denylist
    EnableBlocking {
        #[serde(default)]
        domains: Option<Vec<String>>,
    },
    DisableBlocking,

    /// Ask whether navigating to `host` is blocked right now
    CheckDomain { host: String },

    /// Report a navigation that was blocked client-side
    ReportBlocked { domain: String },

    ListTasks,
    AddTask { text: String },
    ToggleTask { id: TaskId },
    DeleteTask { id: TaskId },

    ExportData,
    ImportData { document: ImportDocument },

    /// Archived daily totals, most recent first
    GetHistory {
        #[serde(default = "default_history_days")]
        days: u32,
    },

    ResetStats,
    ResetSettings,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

fn default_history_days() -> u32 {
    7
}

impl Command {
    /// Whether `role` may issue this command.
    pub fn permitted_for(&self, role: ClientRole) -> bool {
        if role.can_control() {
            return true;
        }
        matches!(
            self,
            Command::GetState
                | Command::CheckDomain { .. }
                | Command::ReportBlocked { .. }
                | Command::ListTasks
                | Command::ExportData
                | Command::GetHistory { .. }
                | Command::SubscribeEvents
                | Command::UnsubscribeEvents
                | Command::GetHealth
                | Command::Ping
        )
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(StateSnapshot),
    Settings(Settings),
    Blocking(BlockingStatus),
    DomainCheck {
        host: String,
        /// Denylist entry that matched, if the host is blocked
        blocked_by: Option<String>,
    },
    BlockedRecorded {
        /// False when blocking was inactive and the report was ignored
        counted: bool,
        blocked_attempts_today: u32,
    },
    Tasks {
        tasks: Vec<Task>,
        productivity_score: u8,
    },
    Task(Task),
    TaskDeleted {
        id: TaskId,
    },
    Export(ExportDocument),
    History {
        days: Vec<DailyStats>,
    },
    Stats(DailyStats),
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = Request::new(1, Command::GetState);
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(parsed.command, Command::GetState));
    }

    #[test]
    fn command_wire_format() {
        let json = r#"{"request_id":7,"api_version":1,"command":{"type":"enable_blocking"}}"#;
        let parsed: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed.command, Command::EnableBlocking { domains: None }));

        let json = r#"{"type":"update_settings","patch":{"workDurationMinutes":-3}}"#;
        let parsed: Command = serde_json::from_str(json).unwrap();
        match parsed {
            Command::UpdateSettings { patch } => assert_eq!(patch.work_duration_minutes, Some(-3)),
            other => panic!("unexpected command {:?}", other),
        }

        let parsed: Command = serde_json::from_str(r#"{"type":"get_history"}"#).unwrap();
        assert!(matches!(parsed, Command::GetHistory { days: 7 }));
    }

    #[test]
    fn response_serialization() {
        let resp = Response::success(
            3,
            ResponsePayload::DomainCheck {
                host: "www.youtube.com".into(),
                blocked_by: Some("youtube.com".into()),
            },
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 3);
        assert!(matches!(
            parsed.result,
            ResponseResult::Ok(ResponsePayload::DomainCheck { .. })
        ));
    }

    #[test]
    fn observers_cannot_mutate() {
        let observer = ClientRole::Observer;
        assert!(Command::GetState.permitted_for(observer));
        assert!(Command::ReportBlocked { domain: "x.com".into() }.permitted_for(observer));
        assert!(!Command::Start.permitted_for(observer));
        assert!(!Command::ResetStats.permitted_for(observer));
        assert!(!Command::AddTask { text: "x".into() }.permitted_for(observer));

        assert!(Command::Stop.permitted_for(ClientRole::Controller));
    }
}

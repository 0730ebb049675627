//! Command dispatch and side-effect application
//!
//! The controller decides; the daemon carries its decisions out. Every
//! call locks the controller, collects the resulting [`CoreEvent`]s,
//! releases the lock and only then talks to collaborators, each call
//! bounded by the configured timeout.

use chrono::{DateTime, Local};
use focus_api::{
    ClientInfo, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Request,
    Response, ResponsePayload, API_VERSION,
};
use focus_core::{CoreEvent, EnforcementRequest, SessionController, TransitionError};
use focus_host_api::{DenylistEnforcer, EnforcerEvent, Notifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const MAX_HISTORY_DAYS: u32 = 365;

pub struct Daemon {
    controller: Mutex<SessionController>,
    enforcer: Arc<dyn DenylistEnforcer>,
    notifier: Arc<dyn Notifier>,
    collaborator_timeout: Duration,
    events: broadcast::Sender<Event>,
}

impl Daemon {
    pub fn new(
        controller: SessionController,
        enforcer: Arc<dyn DenylistEnforcer>,
        notifier: Arc<dyn Notifier>,
        collaborator_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            controller: Mutex::new(controller),
            enforcer,
            notifier,
            collaborator_timeout,
            events,
        }
    }

    /// Events for observers. Only events sent after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Run with the controller locked
    pub async fn with_controller<R>(&self, f: impl FnOnce(&mut SessionController) -> R) -> R {
        let mut controller = self.controller.lock().await;
        f(&mut controller)
    }

    /// Reconcile the enforcer with the restored state
    pub async fn startup(&self, now: DateTime<Local>) {
        let events = self.controller.lock().await.startup(now);
        self.apply(events, now).await;
    }

    pub async fn tick(&self, now: DateTime<Local>) {
        let events = self.controller.lock().await.tick(now);
        self.apply(events, now).await;
    }

    pub async fn handle_enforcer_event(&self, event: EnforcerEvent, now: DateTime<Local>) {
        match event {
            EnforcerEvent::NavigationBlocked { domain } => {
                let (counted, events) = self.controller.lock().await.record_blocked(&domain, now);
                debug!(domain = %domain, counted, "Enforcer reported blocked navigation");
                self.apply(events, now).await;
            }
        }
    }

    /// Flush unsaved state and tell observers we are going away
    pub async fn shutdown(&self) {
        self.controller.lock().await.flush();
        self.publish(EventPayload::Shutdown);
    }

    pub async fn health(&self) -> HealthStatus {
        let controller = self.controller.lock().await;
        let store_ok = controller.store_healthy();
        HealthStatus {
            live: true,
            ready: store_ok && !controller.load_pending(),
            store_ok,
            enforcer_ok: self.enforcer.is_healthy(),
            enforcement_in_sync: controller.blocking().in_sync(),
            persist_pending: controller.persist_pending(),
        }
    }

    pub async fn handle_request(
        &self,
        client: &ClientInfo,
        request: Request,
        now: DateTime<Local>,
    ) -> Response {
        let request_id = request.request_id;

        if request.api_version != API_VERSION {
            return Response::error(
                request_id,
                ErrorInfo::new(
                    ErrorCode::InvalidRequest,
                    format!(
                        "Unsupported API version {} (expected {})",
                        request.api_version, API_VERSION
                    ),
                ),
            );
        }

        if !request.command.permitted_for(client.role) {
            warn!(
                client_id = %client.client_id,
                role = ?client.role,
                command = ?request.command,
                "Command not permitted"
            );
            return Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, "Command requires the controller role"),
            );
        }

        match self.handle_command(client, request.command, now).await {
            Ok(payload) => Response::success(request_id, payload),
            Err(error) => Response::error(request_id, error),
        }
    }

    async fn handle_command(
        &self,
        client: &ClientInfo,
        command: Command,
        now: DateTime<Local>,
    ) -> Result<ResponsePayload, ErrorInfo> {
        match command {
            Command::SubscribeEvents => {
                return Ok(ResponsePayload::Subscribed {
                    client_id: client.client_id.clone(),
                });
            }
            Command::UnsubscribeEvents => return Ok(ResponsePayload::Unsubscribed),
            Command::GetHealth => return Ok(ResponsePayload::Health(self.health().await)),
            Command::Ping => return Ok(ResponsePayload::Pong),
            _ => {}
        }

        let mut events = Vec::new();
        let result = {
            let mut controller = self.controller.lock().await;
            events.extend(controller.refresh_day(now));
            dispatch(&mut controller, command, now, &mut events)
        };

        self.apply(events, now).await;

        let payload = result.map_err(|e| ErrorInfo::new(e.code(), e.to_string()))?;

        // Enforcement may have failed while applying; report what stuck
        Ok(match payload {
            ResponsePayload::State(_) => {
                ResponsePayload::State(self.controller.lock().await.snapshot(now))
            }
            ResponsePayload::Blocking(_) => {
                ResponsePayload::Blocking(self.controller.lock().await.blocking().status())
            }
            other => other,
        })
    }

    async fn apply(&self, events: Vec<CoreEvent>, now: DateTime<Local>) {
        for event in events {
            match event {
                CoreEvent::Enforce(request) => self.enforce(request).await,
                CoreEvent::Notify(notification) => {
                    let notifier = self.notifier.clone();
                    let timeout = self.collaborator_timeout;
                    tokio::spawn(async move {
                        match tokio::time::timeout(timeout, notifier.notify(&notification)).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                warn!(kind = ?notification.kind, error = %e, "Notification failed")
                            }
                            Err(_) => {
                                warn!(kind = ?notification.kind, "Notification timed out")
                            }
                        }
                    });
                }
                CoreEvent::Tick {
                    mode,
                    remaining_seconds,
                } => self.publish(EventPayload::Tick {
                    mode,
                    remaining_seconds,
                }),
                CoreEvent::ModeChanged {
                    mode,
                    running,
                    paused,
                    sessions_completed,
                    remaining_seconds,
                } => self.publish(EventPayload::ModeChanged {
                    mode,
                    running,
                    paused,
                    sessions_completed,
                    remaining_seconds,
                }),
                CoreEvent::BlockingChanged { active, domains } => {
                    self.publish(EventPayload::BlockingChanged { active, domains })
                }
                CoreEvent::StatsChanged(stats) => self.publish(EventPayload::StatsChanged(stats)),
                CoreEvent::SettingsChanged(settings) => {
                    self.publish(EventPayload::SettingsChanged(settings))
                }
                CoreEvent::TasksChanged(tasks) => self.publish(EventPayload::TasksChanged { tasks }),
                CoreEvent::StateReplaced => {
                    let snapshot = self.controller.lock().await.snapshot(now);
                    self.publish(EventPayload::StateChanged(snapshot));
                }
            }
        }
    }

    async fn enforce(&self, request: EnforcementRequest) {
        let timeout = self.collaborator_timeout;
        let result = match &request {
            EnforcementRequest::Install(domains) => {
                tokio::time::timeout(timeout, self.enforcer.set_denylist(domains)).await
            }
            EnforcementRequest::Clear => {
                tokio::time::timeout(timeout, self.enforcer.clear_denylist()).await
            }
        };

        let failure = match result {
            Ok(Ok(())) => {
                debug!(request = ?request, "Enforcement applied");
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", timeout),
        };

        warn!(request = ?request, error = %failure, "Enforcement failed, will retry on next tick");
        self.controller.lock().await.enforcement_failed();
    }

    fn publish(&self, payload: EventPayload) {
        // No receivers is fine
        let _ = self.events.send(Event::new(payload));
    }
}

fn dispatch(
    controller: &mut SessionController,
    command: Command,
    now: DateTime<Local>,
    events: &mut Vec<CoreEvent>,
) -> Result<ResponsePayload, TransitionError> {
    let payload = match command {
        Command::GetState => ResponsePayload::State(controller.snapshot(now)),

        Command::Start => {
            events.extend(controller.start(now)?);
            ResponsePayload::State(controller.snapshot(now))
        }
        Command::Pause => {
            events.extend(controller.pause(now)?);
            ResponsePayload::State(controller.snapshot(now))
        }
        Command::Resume => {
            events.extend(controller.resume(now)?);
            ResponsePayload::State(controller.snapshot(now))
        }
        Command::Stop => {
            events.extend(controller.stop(now)?);
            ResponsePayload::State(controller.snapshot(now))
        }

        Command::UpdateSettings { patch } => {
            events.extend(controller.update_settings(&patch));
            ResponsePayload::Settings(controller.settings().clone())
        }
        Command::ResetSettings => {
            events.extend(controller.reset_settings());
            ResponsePayload::Settings(controller.settings().clone())
        }

        Command::EnableBlocking { domains } => {
            events.extend(controller.enable_blocking(domains.as_deref())?);
            ResponsePayload::Blocking(controller.blocking().status())
        }
        Command::DisableBlocking => {
            events.extend(controller.disable_blocking());
            ResponsePayload::Blocking(controller.blocking().status())
        }
        Command::CheckDomain { host } => {
            let blocked_by = controller.check_domain(&host);
            ResponsePayload::DomainCheck { host, blocked_by }
        }
        Command::ReportBlocked { domain } => {
            let (counted, produced) = controller.record_blocked(&domain, now);
            events.extend(produced);
            ResponsePayload::BlockedRecorded {
                counted,
                blocked_attempts_today: controller.daily_stats().blocked_attempts_today,
            }
        }

        Command::ListTasks => ResponsePayload::Tasks {
            tasks: controller.tasks().to_vec(),
            productivity_score: controller.productivity_score(),
        },
        Command::AddTask { text } => {
            let (task, produced) = controller.add_task(&text, now)?;
            events.extend(produced);
            ResponsePayload::Task(task)
        }
        Command::ToggleTask { id } => {
            let (task, produced) = controller.toggle_task(id)?;
            events.extend(produced);
            ResponsePayload::Task(task)
        }
        Command::DeleteTask { id } => {
            events.extend(controller.delete_task(id)?);
            ResponsePayload::TaskDeleted { id }
        }

        Command::ExportData => ResponsePayload::Export(controller.export(now)),
        Command::ImportData { document } => {
            events.extend(controller.import(document, now));
            ResponsePayload::State(controller.snapshot(now))
        }

        Command::GetHistory { days } => ResponsePayload::History {
            days: controller.history(days.clamp(1, MAX_HISTORY_DAYS) as usize)?,
        },
        Command::ResetStats => {
            events.extend(controller.reset_stats(now));
            ResponsePayload::Stats(controller.daily_stats().clone())
        }

        Command::SubscribeEvents
        | Command::UnsubscribeEvents
        | Command::GetHealth
        | Command::Ping => {
            return Err(TransitionError::InvalidInput(
                "connection-level command reached the controller".into(),
            ));
        }
    };

    Ok(payload)
}

//! Main message dispatcher: decodes host lines and routes them to the session.

use serde_json::{json, Value};

use product_watch::WatchCommand;

use crate::session::WatchSession;
use crate::transport::framing;
use crate::types::*;

/// Runtime control over log verbosity, for `TOGGLE_DEBUG`.
pub trait LogControl {
    fn set_debug(&self, enabled: bool) -> AgentResult<()>;
}

/// Ignores debug toggles.
pub struct NoopLogControl;

impl LogControl for NoopLogControl {
    fn set_debug(&self, _enabled: bool) -> AgentResult<()> {
        Ok(())
    }
}

/// Dispatches host messages against a [`WatchSession`].
pub struct ProtocolHandler {
    session: WatchSession,
    log: Box<dyn LogControl>,
    debug: bool,
    closed: bool,
}

impl ProtocolHandler {
    pub fn new(session: WatchSession, log: Box<dyn LogControl>) -> Self {
        Self {
            session,
            log,
            debug: false,
            closed: false,
        }
    }

    pub fn session(&self) -> &WatchSession {
        &self.session
    }

    /// True once the host sent `CLOSE`.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start watching `url`, replacing any current watcher.
    pub async fn navigate(&mut self, url: &str, html: Option<&str>) -> Value {
        let status = self.session.open(url, html).await;
        json!({ "success": true, "phase": status.phase })
    }

    /// Handle one raw inbound line. Returns the reply to write, if any.
    pub async fn handle_line(&mut self, line: &str) -> Option<Value> {
        let value = match framing::parse_message(line) {
            Ok(value) => value,
            Err(e) => {
                log_failure(None, &e);
                return Some(error_response(None, &e));
            }
        };

        let request = value.get("type").and_then(Value::as_str).map(str::to_string);
        match HostMessage::from_value(value) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => {
                log_failure(request.as_deref(), &e);
                Some(error_response(request.as_deref(), &e))
            }
        }
    }

    pub async fn handle_message(&mut self, msg: HostMessage) -> Option<Value> {
        let kind = msg.kind();
        match self.dispatch(msg).await {
            Ok(Some(body)) => Some(response(Some(kind), body)),
            Ok(None) => None,
            Err(e) => {
                log_failure(Some(kind), &e);
                Some(error_response(Some(kind), &e))
            }
        }
    }

    async fn dispatch(&mut self, msg: HostMessage) -> AgentResult<Option<Value>> {
        match msg {
            HostMessage::DomSnapshot { html, mutations } => {
                self.session.send(WatchCommand::DomChanged {
                    html,
                    records: mutations,
                })?;
                Ok(None)
            }

            HostMessage::ForceCheck => {
                self.session.force_check().await?;
                Ok(Some(json!({ "success": true })))
            }

            HostMessage::GetCurrentProduct => {
                let title = self.session.current_title().await?;
                Ok(Some(json!({ "title": title })))
            }

            HostMessage::GetStatus => {
                let status = self.session.status().await?;
                let mut body = serde_json::to_value(&status)?;
                body["debug"] = json!(self.debug);
                if let Some(since) = self.session.opened_at() {
                    body["since"] = json!(since.to_rfc3339());
                }
                Ok(Some(body))
            }

            HostMessage::ToggleDebug { enabled } => {
                self.log.set_debug(enabled)?;
                self.debug = enabled;
                tracing::info!("Debug mode {}", if enabled { "enabled" } else { "disabled" });
                Ok(Some(json!({ "success": true, "debug": enabled })))
            }

            HostMessage::Navigate { url, html } => {
                Ok(Some(self.navigate(&url, html.as_deref()).await))
            }

            HostMessage::Close => {
                self.shutdown().await;
                self.closed = true;
                Ok(Some(json!({ "success": true })))
            }
        }
    }

    /// Tear down the current watcher.
    pub async fn shutdown(&mut self) {
        self.session.close().await;
    }
}

/// Bad input from the host is a warning; anything else is the agent's fault.
fn log_failure(request: Option<&str>, e: &AgentError) {
    let request = request.unwrap_or("<untyped>");
    if e.is_client_error() {
        tracing::warn!("Rejected {request}: {e}");
    } else {
        tracing::error!("{request} failed: {e}");
    }
}

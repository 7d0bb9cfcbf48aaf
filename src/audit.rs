use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Severity accepted by the external audit service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl AuditLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditLevel::Debug => "debug",
            AuditLevel::Info => "info",
            AuditLevel::Warn => "warn",
            AuditLevel::Error => "error",
            AuditLevel::Fatal => "fatal",
        }
    }
}

/// Subsystem names accepted by the external audit service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    Db,
    Controller,
    Handler,
    Route,
    Service,
    Config,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Component::Db => "db",
            Component::Controller => "controller",
            Component::Handler => "handler",
            Component::Route => "route",
            Component::Service => "service",
            Component::Config => "config",
        }
    }
}

struct Sink {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

/// Best-effort client for the remote audit service. Every emit is dispatched
/// as a detached task; delivery failures are swallowed and must never reach
/// the caller. With no endpoint configured the logger is a no-op.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Option<Arc<Sink>>,
}

impl AuditLogger {
    /// Reads `AUDIT_LOG_ENDPOINT` and `AUDIT_LOG_TOKEN`; absent endpoint
    /// disables the logger entirely.
    pub fn from_env() -> Self {
        let endpoint = match std::env::var("AUDIT_LOG_ENDPOINT") {
            Ok(endpoint) if !endpoint.is_empty() => endpoint,
            _ => return AuditLogger::disabled(),
        };
        let token = std::env::var("AUDIT_LOG_TOKEN").unwrap_or_default();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        AuditLogger {
            sink: Some(Arc::new(Sink {
                client,
                endpoint,
                token,
            })),
        }
    }

    pub fn disabled() -> Self {
        AuditLogger { sink: None }
    }

    /// Fire-and-forget emit. Returns immediately; the POST runs on its own
    /// task and its outcome never affects the caller.
    pub fn emit(&self, level: AuditLevel, component: Component, message: impl Into<String>) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let message = message.into();
        tokio::spawn(async move {
            let payload = json!({
                "stack": "backend",
                "level": level.as_str(),
                "package": component.as_str(),
                "message": message,
            });
            let result = sink
                .client
                .post(&sink.endpoint)
                .bearer_auth(&sink.token)
                .json(&payload)
                .send()
                .await;
            if let Err(err) = result {
                tracing::debug!("audit log delivery failed: {}", err);
            }
        });
    }
}

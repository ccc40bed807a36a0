//! Audit-trail seam.
//!
//! Sinks are one-way: [`AuditSink::record`] takes the event and returns
//! nothing, so a logging outage can never propagate into the state machine
//! that emitted the event.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
}

/// A single audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub category: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub message: String,
    /// Profile/user id the event is about, when known.
    pub subject: Option<String>,
    pub severity: AuditSeverity,
    pub metadata: Value,
}

impl AuditEvent {
    pub fn new(
        category: impl Into<String>,
        event_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            event_type: event_type.into(),
            message: message.into(),
            subject: None,
            severity: AuditSeverity::Info,
            metadata: Value::Null,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One-way audit sink. Implementations must not panic; there is no error
/// channel back to the caller by design.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Default sink that forwards events to the `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match event.severity {
            AuditSeverity::Info => tracing::info!(
                category = %event.category,
                event_type = %event.event_type,
                subject = event.subject.as_deref().unwrap_or("-"),
                metadata = %event.metadata,
                "{}",
                event.message
            ),
            AuditSeverity::Warning => tracing::warn!(
                category = %event.category,
                event_type = %event.event_type,
                subject = event.subject.as_deref().unwrap_or("-"),
                metadata = %event.metadata,
                "{}",
                event.message
            ),
            AuditSeverity::Error => tracing::error!(
                category = %event.category,
                event_type = %event.event_type,
                subject = event.subject.as_deref().unwrap_or("-"),
                metadata = %event.metadata,
                "{}",
                event.message
            ),
        }
    }
}

/// Sink that drops every event, for callers that opt out of auditing.
#[derive(Debug, Clone)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder_defaults() {
        let event = AuditEvent::new("auth", "oauth_login_success", "signed in");
        assert_eq!(event.category, "auth");
        assert_eq!(event.event_type, "oauth_login_success");
        assert_eq!(event.severity, AuditSeverity::Info);
        assert!(event.subject.is_none());
        assert!(event.metadata.is_null());
    }

    #[test]
    fn test_event_builder_chaining() {
        let event = AuditEvent::new("auth", "oauth_email_conflict", "conflict")
            .subject("sub-1")
            .severity(AuditSeverity::Warning)
            .metadata(json!({ "email": "a@b.com" }));
        assert_eq!(event.subject.as_deref(), Some("sub-1"));
        assert_eq!(event.severity, AuditSeverity::Warning);
        assert_eq!(event.metadata["email"], "a@b.com");
    }

    #[test]
    fn test_event_serialization_uses_camel_case_type() {
        let event = AuditEvent::new("auth", "oauth_signup_success", "ok");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["eventType"], "oauth_signup_success");
        assert_eq!(value["severity"], "info");
    }

    #[test]
    fn test_sinks_accept_events() {
        // Neither sink may panic, whatever the event looks like.
        TracingAuditSink.record(AuditEvent::new("auth", "t", "m"));
        NullAuditSink.record(
            AuditEvent::new("auth", "t", "m")
                .severity(AuditSeverity::Error)
                .metadata(json!({ "k": [1, 2, 3] })),
        );
    }
}

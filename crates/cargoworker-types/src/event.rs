use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Granularity an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    /// Whole run
    Run,
    /// Logical container (module, package)
    Container,
    /// Single file
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Start,
    Advance,
    Complete,
    Error,
}

/// Progress / lifecycle message broadcast on the event bus.
///
/// Events are plain values: they carry no identity beyond their fields and are
/// cloned once per subscriber. Errors travel as their rendered message so the
/// event stays `Clone` + `Send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub run_id: Uuid,
    pub scope: EventScope,
    /// Free-form step label ("plan", "classify", ...)
    pub step: String,
    /// Unit the event is about, typically a file path
    #[serde(default)]
    pub unit_id: String,
    pub state: EventState,
    pub value: u64,
    pub total: u64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        run_id: Uuid,
        scope: EventScope,
        state: EventState,
        step: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            scope,
            step: step.into(),
            unit_id: String::new(),
            state,
            value: 0,
            total: 0,
            message: String::new(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_unit(mut self, unit_id: impl Into<String>) -> Self {
        self.unit_id = unit_id.into();
        self
    }

    pub fn with_progress(mut self, value: u64, total: u64) -> Self {
        self.value = value;
        self.total = total;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_error(mut self, err: &dyn std::error::Error) -> Self {
        self.error = Some(err.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.state == EventState::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let run_id = Uuid::new_v4();
        let event = Event::new(run_id, EventScope::File, EventState::Advance, "plan")
            .with_unit("src/main.go")
            .with_progress(3, 10)
            .with_message("selected");

        assert_eq!(event.run_id, run_id);
        assert_eq!(event.scope, EventScope::File);
        assert_eq!(event.unit_id, "src/main.go");
        assert_eq!((event.value, event.total), (3, 10));
        assert!(event.error.is_none());
        assert!(!event.is_error());
    }

    #[test]
    fn test_error_is_rendered() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let event =
            Event::new(Uuid::nil(), EventScope::Run, EventState::Error, "plan").with_error(&io);

        assert!(event.is_error());
        assert_eq!(event.error.as_deref(), Some("denied"));
    }

    #[test]
    fn test_serialization_uses_snake_case() {
        let event = Event::new(Uuid::nil(), EventScope::Container, EventState::Complete, "plan");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["scope"], "container");
        assert_eq!(json["state"], "complete");
        assert!(json.get("error").is_none());
    }
}

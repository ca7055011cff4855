//! Typed lifecycle payloads.
//!
//! Each host function receives the framework's event object as JSON text.
//! Parsing it into an owned value is the ingress copy: nothing in the tree
//! ever aliases data owned by the page.

use crate::bridge::Lifecycle;
use crate::error::RunError;
use crate::report::RunStats;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of `begin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginDetails {
    pub total_tests: u64,
}

/// Payload of `moduleStart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStartDetails {
    pub name: String,
}

/// Payload of `moduleDone`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDoneDetails {
    pub name: String,
    pub failed: u64,
    pub passed: u64,
    pub total: u64,
    pub runtime: f64,
}

/// Payload of `testStart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStartDetails {
    pub name: String,
    pub module: String,
    #[serde(default)]
    pub test_id: Option<String>,
}

/// Payload of `log`, one per assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDetails {
    pub result: bool,
    #[serde(default)]
    pub expected: Value,
    #[serde(default)]
    pub actual: Value,
    #[serde(default)]
    pub message: Option<String>,
    pub module: String,
    pub name: String,
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub todo: Option<bool>,
}

/// Payload of `testDone`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDoneDetails {
    pub name: String,
    pub module: String,
    #[serde(default)]
    pub test_id: Option<String>,
    pub failed: u64,
    pub passed: u64,
    pub total: u64,
    pub runtime: f64,
    #[serde(default)]
    pub skipped: Option<bool>,
    #[serde(default)]
    pub todo: Option<bool>,
}

/// A parsed lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Begin(BeginDetails),
    ModuleStart(ModuleStartDetails),
    TestStart(TestStartDetails),
    Log(LogDetails),
    TestDone(TestDoneDetails),
    ModuleDone(ModuleDoneDetails),
    Done(RunStats),
}

impl LifecycleEvent {
    /// Parses the JSON text a host function received for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Payload`] when the text is not a JSON object of
    /// the expected shape.
    pub fn parse(kind: Lifecycle, payload: &str) -> Result<Self, RunError> {
        let wrap = |source| RunError::Payload { event: kind, source };
        let event = match kind {
            Lifecycle::Begin => Self::Begin(serde_json::from_str(payload).map_err(wrap)?),
            Lifecycle::ModuleStart => {
                Self::ModuleStart(serde_json::from_str(payload).map_err(wrap)?)
            }
            Lifecycle::TestStart => Self::TestStart(serde_json::from_str(payload).map_err(wrap)?),
            Lifecycle::Log => Self::Log(serde_json::from_str(payload).map_err(wrap)?),
            Lifecycle::TestDone => Self::TestDone(serde_json::from_str(payload).map_err(wrap)?),
            Lifecycle::ModuleDone => {
                Self::ModuleDone(serde_json::from_str(payload).map_err(wrap)?)
            }
            Lifecycle::Done => Self::Done(serde_json::from_str(payload).map_err(wrap)?),
        };
        Ok(event)
    }

    /// The hook this event was delivered through.
    #[must_use]
    pub fn kind(&self) -> Lifecycle {
        match self {
            Self::Begin(_) => Lifecycle::Begin,
            Self::ModuleStart(_) => Lifecycle::ModuleStart,
            Self::TestStart(_) => Lifecycle::TestStart,
            Self::Log(_) => Lifecycle::Log,
            Self::TestDone(_) => Lifecycle::TestDone,
            Self::ModuleDone(_) => Lifecycle::ModuleDone,
            Self::Done(_) => Lifecycle::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_test_start_with_and_without_id() {
        let with_id = LifecycleEvent::parse(
            Lifecycle::TestStart,
            r#"{"name":"A","module":"M","testId":"a1b2","previousFailure":false}"#,
        )
        .unwrap();
        assert_eq!(
            with_id,
            LifecycleEvent::TestStart(TestStartDetails {
                name: "A".into(),
                module: "M".into(),
                test_id: Some("a1b2".into()),
            })
        );

        let without_id =
            LifecycleEvent::parse(Lifecycle::TestStart, r#"{"name":"A","module":"M"}"#).unwrap();
        assert!(matches!(without_id, LifecycleEvent::TestStart(ref d) if d.test_id.is_none()));
    }

    #[test]
    fn log_defaults_missing_expected_and_actual_to_null() {
        let event = LifecycleEvent::parse(
            Lifecycle::Log,
            r#"{"result":true,"module":"M","name":"A","message":"ok"}"#,
        )
        .unwrap();

        let LifecycleEvent::Log(details) = event else {
            panic!("expected a log event");
        };
        assert_eq!(details.expected, Value::Null);
        assert_eq!(details.actual, Value::Null);
        assert_eq!(details.message.as_deref(), Some("ok"));
    }

    #[test]
    fn done_accepts_fractional_runtime() {
        let event = LifecycleEvent::parse(
            Lifecycle::Done,
            r#"{"total":2,"passed":1,"failed":1,"runtime":12.5}"#,
        )
        .unwrap();
        assert_eq!(event.kind(), Lifecycle::Done);
        assert!(matches!(event, LifecycleEvent::Done(ref s) if s.failed == 1 && s.runtime == 12.5));
    }

    #[test]
    fn malformed_payload_names_the_event() {
        let err = LifecycleEvent::parse(Lifecycle::ModuleDone, r#"{"name":"M"}"#).unwrap_err();
        assert!(matches!(err, RunError::Payload { event: Lifecycle::ModuleDone, .. }));

        let err = LifecycleEvent::parse(Lifecycle::Begin, "null").unwrap_err();
        assert!(err.to_string().starts_with("malformed `begin` payload"));
    }
}

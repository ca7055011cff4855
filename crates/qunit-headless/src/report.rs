//! The report assembled from one run.
//!
//! All types serialize to camelCase JSON and deserialize back to equal
//! values. Fields the framework fills in late are `Option`s and are omitted
//! from JSON while absent.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Number of tests the framework registered, from `begin`.
    pub total_tests: u64,
    /// Aggregate assertion counts, from `done`.
    pub stats: RunStats,
    /// Modules keyed by name, in start order.
    pub modules: IndexMap<String, Module>,
}

impl Report {
    /// True when no assertion failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.stats.failed == 0
    }

    /// Iterates over every test of every module.
    pub fn tests(&self) -> impl Iterator<Item = &Test> {
        self.modules.values().flat_map(|module| module.tests.iter())
    }

    /// Iterates over tests with at least one failed assertion.
    pub fn failed_tests(&self) -> impl Iterator<Item = &Test> {
        self.tests().filter(|test| test.is_failed())
    }
}

/// Assertion-level counts for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// Milliseconds.
    pub runtime: f64,
}

/// A named group of tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    /// Tests in the order the framework started them.
    #[serde(default)]
    pub tests: Vec<Test>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<f64>,
}

impl Module {
    /// An empty module as created by `moduleStart`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            failed: None,
            passed: None,
            total: None,
            runtime: None,
        }
    }

    /// Number of tests in this module with a failed assertion.
    #[must_use]
    pub fn failed_test_count(&self) -> usize {
        self.tests.iter().filter(|test| test.is_failed()).count()
    }
}

/// A single test and the assertions it logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub name: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<bool>,
    /// Assertions in emission order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<LogEntry>,
}

impl Test {
    /// A placeholder as created by `testStart`.
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            test_id: None,
            passed: None,
            failed: None,
            total: None,
            runtime: None,
            skipped: None,
            todo: None,
            log: Vec::new(),
        }
    }

    /// True when the framework reported failed assertions.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed.unwrap_or(0) > 0
    }

    /// Logged assertions that did not hold.
    pub fn failed_assertions(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter().filter(|entry| !entry.result)
    }
}

/// One recorded assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub result: bool,
    #[serde(default)]
    pub expected: Value,
    #[serde(default)]
    pub actual: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub module: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

//! Folds lifecycle events into the result tree.
//!
//! The aggregator is owned by a single task and applies events in arrival
//! order, so it needs no locking. It relies on the framework ordering
//! (`begin`, then per module `moduleStart`, per test `testStart`, `log*`,
//! `testDone`, then `moduleDone`, and finally `done`) and never buffers or
//! reorders; an event whose parent is missing is a [`ProtocolError`].

use crate::bridge::Lifecycle;
use crate::error::ProtocolError;
use crate::events::{
    BeginDetails, LifecycleEvent, LogDetails, ModuleDoneDetails, ModuleStartDetails,
    TestDoneDetails, TestStartDetails,
};
use crate::report::{LogEntry, Module, Report, RunStats, Test};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// The run is still in flight.
    Pending,
    /// `done` arrived; the report is final.
    Complete(Report),
}

/// The in-flight result tree.
#[derive(Debug, Default)]
pub struct Aggregator {
    total_tests: Option<u64>,
    modules: IndexMap<String, Module>,
    completed: bool,
}

impl Aggregator {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `done` has been applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Applies one event.
    ///
    /// Returns [`Progress::Complete`] with the finished report when the
    /// event is `done`. Events after that are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the event refers to a module or test
    /// that has not been started.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<Progress, ProtocolError> {
        if self.completed {
            debug!(event = %event.kind(), "ignoring lifecycle event after done");
            return Ok(Progress::Pending);
        }
        trace!(event = %event.kind(), "applying lifecycle event");

        match event {
            LifecycleEvent::Begin(details) => self.begin(details),
            LifecycleEvent::ModuleStart(details) => self.module_start(details),
            LifecycleEvent::TestStart(details) => self.test_start(details)?,
            LifecycleEvent::Log(details) => self.log(details)?,
            LifecycleEvent::TestDone(details) => self.test_done(details)?,
            LifecycleEvent::ModuleDone(details) => self.module_done(details)?,
            LifecycleEvent::Done(stats) => return Ok(Progress::Complete(self.done(stats))),
        }
        Ok(Progress::Pending)
    }

    fn begin(&mut self, details: BeginDetails) {
        self.total_tests = Some(details.total_tests);
    }

    fn module_start(&mut self, details: ModuleStartDetails) {
        let module = Module::new(details.name.clone());
        self.modules.insert(details.name, module);
    }

    fn test_start(&mut self, details: TestStartDetails) -> Result<(), ProtocolError> {
        let module = module_mut(&mut self.modules, Lifecycle::TestStart, &details.module)?;

        let existing = details.test_id.as_deref().and_then(|id| {
            module
                .tests
                .iter()
                .position(|test| test.test_id.as_deref() == Some(id))
        });

        match existing {
            Some(index) => {
                let test = &mut module.tests[index];
                test.name = details.name;
                test.module = details.module;
            }
            None => {
                let mut test = Test::new(details.name, details.module);
                test.test_id = details.test_id;
                module.tests.push(test);
            }
        }
        Ok(())
    }

    fn log(&mut self, details: LogDetails) -> Result<(), ProtocolError> {
        let test = test_mut(
            &mut self.modules,
            Lifecycle::Log,
            &details.module,
            details.test_id.as_deref(),
            &details.name,
        )?;

        test.log.push(LogEntry {
            result: details.result,
            expected: details.expected,
            actual: details.actual,
            message: details.message,
            module: details.module,
            name: details.name,
            test_id: details.test_id,
            source: details.source,
        });
        Ok(())
    }

    fn test_done(&mut self, details: TestDoneDetails) -> Result<(), ProtocolError> {
        let test = test_mut(
            &mut self.modules,
            Lifecycle::TestDone,
            &details.module,
            details.test_id.as_deref(),
            &details.name,
        )?;

        // Only the terminal counts; the log gathered since testStart stays.
        test.passed = Some(details.passed);
        test.failed = Some(details.failed);
        test.total = Some(details.total);
        test.runtime = Some(details.runtime);
        if details.skipped.is_some() {
            test.skipped = details.skipped;
        }
        if details.todo.is_some() {
            test.todo = details.todo;
        }
        Ok(())
    }

    fn module_done(&mut self, details: ModuleDoneDetails) -> Result<(), ProtocolError> {
        let module = module_mut(&mut self.modules, Lifecycle::ModuleDone, &details.name)?;
        module.failed = Some(details.failed);
        module.passed = Some(details.passed);
        module.total = Some(details.total);
        module.runtime = Some(details.runtime);
        Ok(())
    }

    fn done(&mut self, stats: RunStats) -> Report {
        self.completed = true;

        let total_tests = self.total_tests.unwrap_or_else(|| {
            warn!("run finished without a begin event; reporting totalTests = 0");
            0
        });

        debug!(
            modules = self.modules.len(),
            failed = stats.failed,
            "test run complete"
        );

        Report {
            total_tests,
            stats,
            modules: std::mem::take(&mut self.modules),
        }
    }
}

fn module_mut<'a>(
    modules: &'a mut IndexMap<String, Module>,
    event: Lifecycle,
    name: &str,
) -> Result<&'a mut Module, ProtocolError> {
    modules
        .get_mut(name)
        .ok_or_else(|| ProtocolError::UnknownModule {
            event,
            module: name.to_string(),
        })
}

/// Resolves a test by `testId` when the event carries one, otherwise by the
/// most recently started test with a matching name. An id that matches no
/// test is unknown; it never falls back to the name.
fn test_mut<'a>(
    modules: &'a mut IndexMap<String, Module>,
    event: Lifecycle,
    module_name: &str,
    test_id: Option<&str>,
    test_name: &str,
) -> Result<&'a mut Test, ProtocolError> {
    let module = module_mut(modules, event, module_name)?;

    let index = match test_id {
        Some(id) => module
            .tests
            .iter()
            .position(|test| test.test_id.as_deref() == Some(id)),
        None => module.tests.iter().rposition(|test| test.name == test_name),
    };

    match index {
        Some(index) => Ok(&mut module.tests[index]),
        None => Err(ProtocolError::UnknownTest {
            event,
            module: module_name.to_string(),
            test: test_name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn start_test(name: &str, id: Option<&str>) -> LifecycleEvent {
        start_test_in("M", name, id)
    }

    fn start_test_in(module: &str, name: &str, id: Option<&str>) -> LifecycleEvent {
        LifecycleEvent::TestStart(TestStartDetails {
            name: name.into(),
            module: module.into(),
            test_id: id.map(str::to_string),
        })
    }

    fn log_in(module: &str, name: &str, message: &str, result: bool) -> LifecycleEvent {
        LifecycleEvent::Log(LogDetails {
            result,
            expected: json!(message),
            actual: json!(message),
            message: Some(message.into()),
            module: module.into(),
            name: name.into(),
            test_id: None,
            source: None,
            todo: None,
        })
    }

    fn finish_test_in(module: &str, name: &str, passed: u64, failed: u64) -> LifecycleEvent {
        LifecycleEvent::TestDone(TestDoneDetails {
            name: name.into(),
            module: module.into(),
            test_id: None,
            failed,
            passed,
            total: passed + failed,
            runtime: 1.0,
            skipped: None,
            todo: None,
        })
    }

    fn finish_module(name: &str, passed: u64, failed: u64) -> LifecycleEvent {
        LifecycleEvent::ModuleDone(ModuleDoneDetails {
            name: name.into(),
            failed,
            passed,
            total: passed + failed,
            runtime: 2.0,
        })
    }

    fn log(name: &str, id: Option<&str>, result: bool) -> LifecycleEvent {
        LifecycleEvent::Log(LogDetails {
            result,
            expected: json!(1),
            actual: if result { json!(1) } else { json!(2) },
            message: Some(format!("{name} assertion")),
            module: "M".into(),
            name: name.into(),
            test_id: id.map(str::to_string),
            source: None,
            todo: None,
        })
    }

    fn finish_test(name: &str, id: Option<&str>, passed: u64, failed: u64) -> LifecycleEvent {
        LifecycleEvent::TestDone(TestDoneDetails {
            name: name.into(),
            module: "M".into(),
            test_id: id.map(str::to_string),
            failed,
            passed,
            total: passed + failed,
            runtime: 1.5,
            skipped: Some(false),
            todo: None,
        })
    }

    fn module_start(name: &str) -> LifecycleEvent {
        LifecycleEvent::ModuleStart(ModuleStartDetails { name: name.into() })
    }

    fn done(total: u64, passed: u64, failed: u64) -> LifecycleEvent {
        LifecycleEvent::Done(RunStats {
            total,
            passed,
            failed,
            runtime: 20.0,
        })
    }

    fn complete(progress: Progress) -> Report {
        match progress {
            Progress::Complete(report) => report,
            Progress::Pending => panic!("run should be complete"),
        }
    }

    #[test]
    fn full_sequence_builds_ordered_tree() {
        let mut agg = Aggregator::new();
        let events = vec![
            LifecycleEvent::Begin(BeginDetails { total_tests: 4 }),
            module_start("M"),
            start_test("A", None),
            log("A", None, true),
            finish_test("A", None, 1, 0),
            start_test("B", None),
            log("B", None, false),
            finish_test("B", None, 0, 1),
            LifecycleEvent::ModuleDone(ModuleDoneDetails {
                name: "M".into(),
                failed: 1,
                passed: 1,
                total: 2,
                runtime: 3.0,
            }),
        ];
        for event in events {
            assert_eq!(agg.apply(event).unwrap(), Progress::Pending);
        }

        let report = complete(agg.apply(done(2, 1, 1)).unwrap());
        assert_eq!(report.total_tests, 4);
        assert_eq!(report.stats.failed, 1);

        let module = &report.modules["M"];
        assert_eq!(module.passed, Some(1));
        let names: Vec<_> = module.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(module.tests[1].log.len(), 1);
        assert!(!module.tests[1].log[0].result);
        assert_eq!(module.tests[1].failed, Some(1));
    }

    #[test]
    fn several_modules_keep_start_and_emission_order() {
        let mut agg = Aggregator::new();
        let events = vec![
            LifecycleEvent::Begin(BeginDetails { total_tests: 5 }),
            module_start("parse"),
            start_test_in("parse", "numbers", None),
            log_in("parse", "numbers", "ints", true),
            log_in("parse", "numbers", "floats", true),
            log_in("parse", "numbers", "exponents", false),
            finish_test_in("parse", "numbers", 2, 1),
            start_test_in("parse", "strings", None),
            log_in("parse", "strings", "quotes", true),
            finish_test_in("parse", "strings", 1, 0),
            finish_module("parse", 3, 1),
            module_start("eval"),
            start_test_in("eval", "sum", None),
            log_in("eval", "sum", "empty", true),
            log_in("eval", "sum", "single", true),
            finish_test_in("eval", "sum", 2, 0),
            start_test_in("eval", "product", None),
            finish_test_in("eval", "product", 0, 0),
            finish_module("eval", 2, 0),
            module_start("alpha"),
            start_test_in("alpha", "zeta", None),
            log_in("alpha", "zeta", "last", true),
            log_in("alpha", "zeta", "first", true),
            finish_test_in("alpha", "zeta", 2, 0),
            finish_module("alpha", 2, 0),
        ];
        for event in events {
            assert_eq!(agg.apply(event).unwrap(), Progress::Pending);
        }

        let report = complete(agg.apply(done(8, 7, 1)).unwrap());

        let modules: Vec<&str> = report.modules.keys().map(String::as_str).collect();
        assert_eq!(modules, ["parse", "eval", "alpha"]);

        let tests = |module: &str| -> Vec<String> {
            report.modules[module].tests.iter().map(|t| t.name.clone()).collect()
        };
        assert_eq!(tests("parse"), ["numbers", "strings"]);
        assert_eq!(tests("eval"), ["sum", "product"]);
        assert_eq!(tests("alpha"), ["zeta"]);

        let messages = |module: &str, index: usize| -> Vec<String> {
            report.modules[module].tests[index]
                .log
                .iter()
                .filter_map(|entry| entry.message.clone())
                .collect()
        };
        assert_eq!(messages("parse", 0), ["ints", "floats", "exponents"]);
        assert_eq!(messages("parse", 1), ["quotes"]);
        assert_eq!(messages("eval", 0), ["empty", "single"]);
        assert!(messages("eval", 1).is_empty());
        assert_eq!(messages("alpha", 0), ["last", "first"]);

        let failing: Vec<&str> = report.failed_tests().map(|t| t.name.as_str()).collect();
        assert_eq!(failing, ["numbers"]);
        assert_eq!(report.modules["parse"].failed, Some(1));
        assert_eq!(report.modules["eval"].passed, Some(2));
    }

    #[test]
    fn events_route_to_their_own_module() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("one")).unwrap();
        agg.apply(module_start("two")).unwrap();
        agg.apply(start_test_in("one", "shared", None)).unwrap();
        agg.apply(start_test_in("two", "shared", None)).unwrap();
        agg.apply(log_in("one", "shared", "from one", true)).unwrap();
        agg.apply(log_in("two", "shared", "from two", false)).unwrap();

        let report = complete(agg.apply(done(2, 1, 1)).unwrap());
        assert_eq!(report.modules["one"].tests[0].log[0].message.as_deref(), Some("from one"));
        assert_eq!(report.modules["two"].tests[0].log[0].message.as_deref(), Some("from two"));
    }

    #[test]
    fn unknown_test_id_does_not_fall_back_to_name() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();
        agg.apply(start_test("same", Some("known"))).unwrap();

        let err = agg.apply(log("same", Some("stale"), false)).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnknownTest {
                event: Lifecycle::Log,
                module: "M".into(),
                test: "same".into(),
            }
        );

        let err = agg.apply(finish_test("same", Some("stale"), 0, 1)).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTest { event: Lifecycle::TestDone, .. }));

        let report = complete(agg.apply(done(0, 0, 0)).unwrap());
        assert!(report.modules["M"].tests[0].log.is_empty());
    }

    #[test]
    fn test_done_keeps_accumulated_log() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();
        agg.apply(start_test("A", Some("a"))).unwrap();
        agg.apply(log("A", Some("a"), true)).unwrap();
        agg.apply(log("A", Some("a"), false)).unwrap();
        agg.apply(finish_test("A", Some("a"), 1, 1)).unwrap();

        let report = complete(agg.apply(done(2, 1, 1)).unwrap());
        let test = &report.modules["M"].tests[0];
        let results: Vec<bool> = test.log.iter().map(|entry| entry.result).collect();
        assert_eq!(results, [true, false]);
        assert_eq!(test.log[1].actual, json!(2));
        assert_eq!(test.passed, Some(1));
        assert_eq!(test.skipped, Some(false));
    }

    #[test]
    fn test_start_requires_module() {
        let mut agg = Aggregator::new();
        let err = agg.apply(start_test("A", None)).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnknownModule {
                event: Lifecycle::TestStart,
                module: "M".into(),
            }
        );
    }

    #[test]
    fn log_and_test_done_require_test() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();

        let err = agg.apply(log("ghost", None, true)).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTest { event: Lifecycle::Log, .. }));

        let err = agg.apply(finish_test("ghost", None, 1, 0)).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTest { event: Lifecycle::TestDone, .. }));
    }

    #[test]
    fn module_done_requires_module() {
        let mut agg = Aggregator::new();
        let err = agg
            .apply(LifecycleEvent::ModuleDone(ModuleDoneDetails {
                name: "missing".into(),
                failed: 0,
                passed: 0,
                total: 0,
                runtime: 0.0,
            }))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownModule { event: Lifecycle::ModuleDone, .. }));
    }

    #[test]
    fn duplicate_names_are_told_apart_by_test_id() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();
        agg.apply(start_test("same", Some("first"))).unwrap();
        agg.apply(finish_test("same", Some("first"), 1, 0)).unwrap();
        agg.apply(start_test("same", Some("second"))).unwrap();
        agg.apply(log("same", Some("first"), false)).unwrap();
        agg.apply(finish_test("same", Some("second"), 0, 1)).unwrap();

        let report = complete(agg.apply(done(2, 1, 1)).unwrap());
        let tests = &report.modules["M"].tests;
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].log.len(), 1);
        assert_eq!(tests[0].passed, Some(1));
        assert_eq!(tests[1].failed, Some(1));
        assert!(tests[1].log.is_empty());
    }

    #[test]
    fn name_lookup_prefers_latest_test() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();
        agg.apply(start_test("same", None)).unwrap();
        agg.apply(finish_test("same", None, 1, 0)).unwrap();
        agg.apply(start_test("same", None)).unwrap();
        agg.apply(log("same", None, true)).unwrap();

        let report = complete(agg.apply(done(1, 1, 0)).unwrap());
        let tests = &report.modules["M"].tests;
        assert!(tests[0].log.is_empty());
        assert_eq!(tests[1].log.len(), 1);
    }

    #[test]
    fn redelivered_test_start_with_same_id_merges() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();
        agg.apply(start_test("A", Some("a"))).unwrap();
        agg.apply(log("A", Some("a"), true)).unwrap();
        agg.apply(start_test("A", Some("a"))).unwrap();

        let report = complete(agg.apply(done(1, 1, 0)).unwrap());
        let tests = &report.modules["M"].tests;
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].log.len(), 1);
    }

    #[test]
    fn module_start_reinsert_resets_module() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();
        agg.apply(start_test("A", None)).unwrap();
        agg.apply(module_start("M")).unwrap();

        let report = complete(agg.apply(done(0, 0, 0)).unwrap());
        assert_eq!(report.modules.len(), 1);
        assert!(report.modules["M"].tests.is_empty());
    }

    #[test]
    fn begin_is_idempotent_under_redelivery() {
        let mut agg = Aggregator::new();
        agg.apply(LifecycleEvent::Begin(BeginDetails { total_tests: 3 })).unwrap();
        agg.apply(LifecycleEvent::Begin(BeginDetails { total_tests: 3 })).unwrap();

        let report = complete(agg.apply(done(0, 0, 0)).unwrap());
        assert_eq!(report.total_tests, 3);
        assert!(report.modules.is_empty());
    }

    #[test]
    fn missing_begin_reports_zero_total() {
        let mut agg = Aggregator::new();
        let report = complete(agg.apply(done(0, 0, 0)).unwrap());
        assert_eq!(report.total_tests, 0);
    }

    #[test]
    fn events_after_done_are_ignored() {
        let mut agg = Aggregator::new();
        complete(agg.apply(done(0, 0, 0)).unwrap());
        assert!(agg.is_complete());

        assert_eq!(agg.apply(start_test("late", None)).unwrap(), Progress::Pending);
        assert_eq!(agg.apply(done(1, 1, 0)).unwrap(), Progress::Pending);
    }

    #[test]
    fn log_expected_values_are_kept_verbatim() {
        let mut agg = Aggregator::new();
        agg.apply(module_start("M")).unwrap();
        agg.apply(start_test("A", None)).unwrap();
        agg.apply(LifecycleEvent::Log(LogDetails {
            result: false,
            expected: json!({"nested": [1, {"deep": true}]}),
            actual: Value::Null,
            message: None,
            module: "M".into(),
            name: "A".into(),
            test_id: None,
            source: Some("at t.js:3".into()),
            todo: None,
        }))
        .unwrap();

        let report = complete(agg.apply(done(1, 0, 1)).unwrap());
        let entry = &report.modules["M"].tests[0].log[0];
        assert_eq!(entry.expected["nested"][1]["deep"], json!(true));
        assert_eq!(entry.source.as_deref(), Some("at t.js:3"));
    }
}

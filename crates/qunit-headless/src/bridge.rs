//! The in-page bridge: lifecycle vocabulary, host function names and the
//! pre-navigation shim.
//!
//! The shim runs in the page before any of its own scripts. It turns the
//! global `QUnit` slot into an accessor property, so whenever the page
//! assigns its framework object the setter wires the seven lifecycle hooks to
//! host functions. Payloads cross the isolation boundary as JSON text, which
//! means the host only ever sees value copies.
//!
//! The shim knows nothing about host state; it only receives the host
//! function names, the per-test timeout and the marker for unencodable
//! payloads, embedded as JSON.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Global slot the page installs its framework object into.
pub const FRAMEWORK_GLOBAL: &str = "QUnit";

/// Default prefix for host function names.
pub const DEFAULT_BINDING_PREFIX: &str = "qunit_headless";

/// Prefix of the text the shim forwards when a payload cannot be encoded.
/// It is not JSON, so the host fails the run with a payload error.
pub const UNENCODABLE_PREFIX: &str = "!unencodable payload: ";

/// One of the seven lifecycle notifications the framework emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Run started; carries the number of registered tests.
    Begin,
    /// Run finished; carries the aggregate assertion counts.
    Done,
    /// A module started.
    ModuleStart,
    /// A module finished.
    ModuleDone,
    /// A test started.
    TestStart,
    /// A test finished.
    TestDone,
    /// An assertion was recorded.
    Log,
}

impl Lifecycle {
    /// All hooks, in registration order.
    pub const ALL: [Lifecycle; 7] = [
        Lifecycle::Begin,
        Lifecycle::Done,
        Lifecycle::ModuleStart,
        Lifecycle::ModuleDone,
        Lifecycle::TestStart,
        Lifecycle::TestDone,
        Lifecycle::Log,
    ];

    /// The framework's registration method name for this hook.
    #[must_use]
    pub fn hook_name(self) -> &'static str {
        match self {
            Lifecycle::Begin => "begin",
            Lifecycle::Done => "done",
            Lifecycle::ModuleStart => "moduleStart",
            Lifecycle::ModuleDone => "moduleDone",
            Lifecycle::TestStart => "testStart",
            Lifecycle::TestDone => "testDone",
            Lifecycle::Log => "log",
        }
    }

    /// Parses a framework hook name.
    #[must_use]
    pub fn from_hook_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.hook_name() == name)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hook_name())
    }
}

/// Host function names for each lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackNames {
    prefix: String,
}

impl CallbackNames {
    /// Builds the name set `<prefix>_<hook>`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The host function name for `kind`.
    #[must_use]
    pub fn name_for(&self, kind: Lifecycle) -> String {
        format!("{}_{}", self.prefix, kind.hook_name())
    }

    /// Maps a host function name back to its hook.
    #[must_use]
    pub fn lifecycle_for(&self, name: &str) -> Option<Lifecycle> {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(Lifecycle::from_hook_name)
    }

    /// All seven host function names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        Lifecycle::ALL
            .into_iter()
            .map(|kind| self.name_for(kind))
            .collect()
    }
}

impl Default for CallbackNames {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_BINDING_PREFIX)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShimConfig<'a> {
    global: &'a str,
    test_timeout: u128,
    unencodable: &'a str,
    callbacks: BTreeMap<&'static str, String>,
}

const SHIM_TEMPLATE: &str = r#"(function (config) {
  'use strict';
  var wired = typeof WeakSet === 'function' ? new WeakSet() : null;

  function describe(err) {
    try {
      return String(err);
    } catch (ignored) {
      return 'error';
    }
  }

  function unreadable(err) {
    return '[Unreadable: ' + describe(err) + ']';
  }

  // Plain JSON-safe copy of `value`. Only objects on the current path count
  // as cycles; the same object reached twice through siblings is copied twice.
  function copy(value, path) {
    switch (typeof value) {
      case 'undefined':
      case 'function':
      case 'symbol':
        return undefined;
      case 'bigint':
        return value.toString();
      case 'number':
        return isFinite(value) ? value : null;
      case 'string':
      case 'boolean':
        return value;
    }
    if (value === null) {
      return null;
    }
    if (typeof value.toJSON === 'function') {
      try {
        value = value.toJSON();
      } catch (err) {
        return unreadable(err);
      }
      if (typeof value !== 'object' || value === null) {
        return copy(value, path);
      }
    }
    if (path.indexOf(value) !== -1) {
      return '[Circular]';
    }

    path.push(value);
    try {
      if (Array.isArray(value)) {
        var items = [];
        for (var i = 0; i < value.length; i++) {
          var item = copy(read(value, i), path);
          items.push(item === undefined ? null : item);
        }
        return items;
      }
      var out = {};
      Object.keys(value).forEach(function (key) {
        var field = copy(read(value, key), path);
        if (field !== undefined) {
          out[key] = field;
        }
      });
      return out;
    } catch (err) {
      return unreadable(err);
    } finally {
      path.pop();
    }
  }

  function read(target, key) {
    try {
      return target[key];
    } catch (err) {
      return unreadable(err);
    }
  }

  function encode(details) {
    var plain = copy(details, []);
    return JSON.stringify(plain === undefined ? null : plain);
  }

  function trampoline(binding) {
    return function (details) {
      var text;
      try {
        text = encode(details);
      } catch (err) {
        console.error('qunit-headless: could not encode ' + binding + ' payload: ' + describe(err));
        // Still forwarded, as text the host rejects, so the run fails.
        text = config.unencodable + describe(err);
      }
      try {
        window[binding](text);
      } catch (err) {
        console.error('qunit-headless: failed to forward to ' + binding + ': ' + err);
      }
    };
  }

  function wire(framework) {
    if (!framework || (typeof framework !== 'object' && typeof framework !== 'function')) {
      return;
    }
    if (wired) {
      if (wired.has(framework)) {
        return;
      }
      wired.add(framework);
    }
    try {
      if (framework.config) {
        framework.config.testTimeout = config.testTimeout;
      }
      Object.keys(config.callbacks).forEach(function (hook) {
        framework[hook](trampoline(config.callbacks[hook]));
      });
    } catch (err) {
      console.error('qunit-headless: error while wiring ' + config.global + ': ' + err);
    }
  }

  var current;
  Object.defineProperty(window, config.global, {
    configurable: true,
    enumerable: true,
    get: function () {
      return current;
    },
    set: function (value) {
      current = value;
      wire(value);
    }
  });
})(__SHIM_CONFIG__);
"#;

/// The pre-navigation script that intercepts the framework global.
#[derive(Debug, Clone)]
pub struct BridgeScript {
    test_timeout: Duration,
    callbacks: CallbackNames,
}

impl BridgeScript {
    /// Creates a shim for the given per-test timeout and host names.
    #[must_use]
    pub fn new(test_timeout: Duration, callbacks: CallbackNames) -> Self {
        Self {
            test_timeout,
            callbacks,
        }
    }

    /// Renders the JavaScript source.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be encoded as JSON.
    pub fn render(&self) -> serde_json::Result<String> {
        let config = ShimConfig {
            global: FRAMEWORK_GLOBAL,
            unencodable: UNENCODABLE_PREFIX,
            test_timeout: self.test_timeout.as_millis(),
            callbacks: Lifecycle::ALL
                .into_iter()
                .map(|kind| (kind.hook_name(), self.callbacks.name_for(kind)))
                .collect(),
        };
        let json = serde_json::to_string(&config)?;
        Ok(SHIM_TEMPLATE.replace("__SHIM_CONFIG__", &json))
    }
}

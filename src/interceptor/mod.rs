//! Interceptor pipeline — before/after hooks around the connection handler.
//!
//! Interceptors run in an ordered [`InterceptorStack`] around the
//! application handler: [`Interceptor::inspect`] before it, so policy is in
//! place ahead of any broadcast the handler might trigger synchronously, and
//! [`Interceptor::post_inspect`] after it, once the handler has had the
//! chance to write an initial response body.
//!
//! The built-in [`LifecycleInterceptor`] automates suspend/resume policy per
//! transport; see [`lifecycle`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::resource::Resource;

pub mod lifecycle;

pub use lifecycle::LifecycleInterceptor;

/// Verdict of an interceptor's inspect step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Proceed to the next interceptor and then the handler.
    Continue,
    /// Skip the application handler but complete the request normally.
    Skip,
    /// Abort the request; the container tears the connection down.
    Cancel,
}

/// String key/value option bag passed to [`Interceptor::configure`].
///
/// Options are flat string pairs, loadable from JSON. Interceptors read the
/// keys they recognize and ignore the rest; a missing key falls back to the
/// interceptor's default silently.
///
/// # Examples
///
/// ```
/// use pushwire::interceptor::InterceptorOptions;
///
/// let options = InterceptorOptions::from_json(r#"{"lifecycle.trigger-method": "POST"}"#).unwrap();
/// assert_eq!(options.get("lifecycle.trigger-method"), Some("POST"));
/// assert_eq!(options.get("unknown"), None);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct InterceptorOptions {
    entries: HashMap<String, String>,
}

impl InterceptorOptions {
    /// Creates an empty option bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a flat JSON object of string values.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Sets an option, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Returns the value for `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// Before/after hooks around the connection handler.
///
/// All methods default to no-ops so an interceptor implements only the
/// phases it participates in.
///
/// # Contract
///
/// - `inspect` runs on the request-handling task before the handler; it must
///   not block on I/O.
/// - `post_inspect` runs on the same task after the handler returns, and
///   only if `inspect` returned [`Action::Continue`] for the whole stack.
/// - Implementations are shared across tasks, hence `Send + Sync`.
pub trait Interceptor: Send + Sync {
    /// One-time initialization from the option bag. Unrecognized options are
    /// ignored; recognized-but-absent options keep their defaults.
    fn configure(&mut self, options: &InterceptorOptions) {
        let _ = options;
    }

    /// Runs before the handler. Returning anything other than
    /// [`Action::Continue`] short-circuits the rest of the stack.
    fn inspect(&self, resource: &Arc<Resource>) -> Action {
        let _ = resource;
        Action::Continue
    }

    /// Runs after the handler has executed.
    fn post_inspect(&self, resource: &Arc<Resource>) {
        let _ = resource;
    }
}

/// An ordered stack of interceptors.
///
/// `inspect` walks the stack in registration order and stops at the first
/// non-`Continue` verdict. `post_inspect` unwinds in reverse registration
/// order; the container invokes it only when `inspect` returned `Continue`.
#[derive(Default)]
pub struct InterceptorStack {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl InterceptorStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `interceptor` from `options` and appends it to the stack.
    pub fn install(&mut self, mut interceptor: Box<dyn Interceptor>, options: &InterceptorOptions) {
        interceptor.configure(options);
        self.interceptors.push(interceptor);
    }

    /// Number of installed interceptors.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if no interceptors are installed.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs every interceptor's inspect phase in order.
    ///
    /// The first non-`Continue` verdict is returned immediately and the
    /// remaining interceptors do not run.
    pub fn inspect(&self, resource: &Arc<Resource>) -> Action {
        for interceptor in &self.interceptors {
            let action = interceptor.inspect(resource);
            if action != Action::Continue {
                debug!(resource = resource.id(), ?action, "inspect short-circuit");
                return action;
            }
        }
        Action::Continue
    }

    /// Runs every interceptor's post-inspect phase, unwinding in reverse
    /// registration order.
    pub fn post_inspect(&self, resource: &Arc<Resource>) {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.post_inspect(resource);
        }
    }
}

//! Handler registry for dispatching requests by public name.
//!
//! The registry maps public names to handlers and event names to event
//! handlers. Both maps are single-slot: registering a name again replaces
//! the previous entry as a whole.
//!
//! # Example
//!
//! ```
//! use domwire::handler::{HandlerOptions, HandlerRegistry};
//! use domwire::Response;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("greet", |r: &mut Response, name: String| {
//!     r.alert(format!("Hello, {name}!"));
//! }, HandlerOptions::new());
//!
//! assert!(registry.contains("greet"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::callback::{CallError, Callback, IntoCallback};
use super::outcome::{HandlerResult, IntoOutcome, Outcome};
use crate::error::{DomwireError, Result};
use crate::response::{Response, ResponseFactory};

/// Event fired right before the main handler.
pub const EVENT_BEFORE_PROCESSING: &str = "before_processing";

/// Event fired right after the main handler.
pub const EVENT_AFTER_PROCESSING: &str = "after_processing";

/// Event fired instead of the handler when the requested name is unknown.
/// Receives the requested function name.
pub const EVENT_INVALID_REQUEST: &str = "invalid_request";

/// Event fired when a handler was called with arguments it cannot take.
/// Receives the callback that rejected them.
pub const EVENT_INVALID_CALL: &str = "invalid_call";

const INVALID_REQUEST_ALERT: &str = "The action you performed is unavailable!";
const INVALID_CALL_ALERT: &str = "You tried to perform an action in a wrong way!";

/// Function shape of the invalid-call event.
pub type InvalidCallFn =
    Arc<dyn Fn(&mut Response, &Callback) -> HandlerResult + Send + Sync>;

/// A registered event handler.
#[derive(Clone)]
pub enum EventHandler {
    /// Called like a regular handler.
    Callback(Callback),
    /// Called with the callback whose invocation failed.
    InvalidCall(InvalidCallFn),
}

impl EventHandler {
    /// The regular callback, if this is one.
    pub fn callback(&self) -> Option<&Callback> {
        match self {
            EventHandler::Callback(cb) => Some(cb),
            EventHandler::InvalidCall(_) => None,
        }
    }

    /// Run as the invalid-call event for `failed`.
    ///
    /// A plain callback in this slot is invoked without arguments. If it
    /// cannot be called that way, the generic invalid-call alert is shown.
    pub fn invoke_invalid_call(
        &self,
        response: &mut Response,
        failed: &Callback,
    ) -> Result<Outcome> {
        match self {
            EventHandler::InvalidCall(f) => f(response, failed).map_err(DomwireError::Handler),
            EventHandler::Callback(cb) => match cb.call(response, Vec::new()) {
                Ok(outcome) => Ok(outcome),
                Err(CallError::Arguments(reason)) => {
                    tracing::warn!(
                        "Invalid-call event handler cannot take zero arguments ({}); \
                         showing the default alert",
                        reason
                    );
                    response.alert(INVALID_CALL_ALERT);
                    Ok(Outcome::Done)
                }
                Err(fault) => Err(fault.into()),
            },
        }
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventHandler::Callback(cb) => f.debug_tuple("Callback").field(cb).finish(),
            EventHandler::InvalidCall(_) => f.write_str("InvalidCall(..)"),
        }
    }
}

/// Per-registration options.
#[derive(Clone, Default)]
pub struct HandlerOptions {
    /// Response context to build; `None` means the regular context.
    context: Option<ResponseFactory>,
    /// Arguments placed before the request arguments.
    extra_args: Vec<Value>,
}

impl HandlerOptions {
    /// Regular context, no extra arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different response context.
    pub fn context(mut self, factory: ResponseFactory) -> Self {
        self.context = Some(factory);
        self
    }

    /// Pass fixed arguments ahead of the request arguments.
    ///
    /// `args` must serialize to a JSON array (a `Vec`, slice or tuple) or to
    /// `null` (no extra arguments).
    pub fn extra_args<T: Serialize>(mut self, args: T) -> Result<Self> {
        self.extra_args = match serde_json::to_value(args)? {
            Value::Null => Vec::new(),
            Value::Array(values) => values,
            other => {
                return Err(DomwireError::InvalidArgument(format!(
                    "extra args must be a list, a tuple or null, got {}",
                    json_kind(&other)
                )))
            }
        };
        Ok(self)
    }

    /// Whether a response context was chosen explicitly.
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn response_factory(&self) -> Option<&ResponseFactory> {
        self.context.as_ref()
    }

    pub fn extra_arg_values(&self) -> &[Value] {
        &self.extra_args
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("custom_context", &self.context.is_some())
            .field("extra_args", &self.extra_args)
            .finish()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Entry for a registered handler.
#[derive(Debug, Clone)]
pub struct Registration {
    /// The handler function.
    pub callback: Callback,
    /// Options it was registered with.
    pub options: HandlerOptions,
}

/// Anything that exposes a set of named handlers.
///
/// Members whose names start with `_` are private and are skipped by mass
/// registration.
pub trait PublicSurface {
    fn members(&self) -> Vec<(String, Callback)>;
}

impl PublicSurface for Vec<(String, Callback)> {
    fn members(&self) -> Vec<(String, Callback)> {
        self.clone()
    }
}

impl PublicSurface for [(&str, Callback)] {
    fn members(&self) -> Vec<(String, Callback)> {
        self.iter()
            .map(|(name, cb)| (name.to_string(), cb.clone()))
            .collect()
    }
}

/// Registry mapping public names to handlers and event names to events.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    /// Handlers by public name.
    handlers: HashMap<String, Registration>,
    /// Event handlers by event name.
    events: HashMap<String, EventHandler>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any previous one.
    pub fn register<H, Args>(&mut self, name: &str, handler: H, options: HandlerOptions)
    where
        H: IntoCallback<Args>,
    {
        let callback = handler.into_callback();
        let previous = self
            .handlers
            .insert(name.to_string(), Registration { callback, options });
        if previous.is_some() {
            tracing::debug!("Replaced handler registration for {}", name);
        } else {
            tracing::debug!("Registered handler {}", name);
        }
    }

    /// Register every public member of `surface` with the same options.
    pub fn register_surface<S>(&mut self, surface: &S, options: HandlerOptions)
    where
        S: PublicSurface + ?Sized,
    {
        for (name, callback) in surface.members() {
            if name.starts_with('_') {
                continue;
            }
            self.register(&name, callback, options.clone());
        }
    }

    /// Get a registration by public name.
    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered public names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Register a regular callback for an event, replacing any previous one.
    pub fn register_event<H, Args>(&mut self, name: &str, handler: H)
    where
        H: IntoCallback<Args>,
    {
        self.events.insert(
            name.to_string(),
            EventHandler::Callback(handler.into_callback()),
        );
    }

    /// Register the invalid-call event handler.
    pub fn register_invalid_call<F, R>(&mut self, handler: F)
    where
        F: Fn(&mut Response, &Callback) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        let f: InvalidCallFn = Arc::new(
            move |response: &mut Response, failed: &Callback| -> HandlerResult {
                handler(response, failed).into_outcome()
            },
        );
        self.events
            .insert(EVENT_INVALID_CALL.to_string(), EventHandler::InvalidCall(f));
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub fn get_event(&self, name: &str) -> Option<&EventHandler> {
        self.events.get(name)
    }

    /// Install the built-in event handlers.
    ///
    /// Before/after processing do nothing; the two error events show a
    /// generic alert.
    pub fn install_default_events(&mut self) {
        self.register_event(EVENT_BEFORE_PROCESSING, |_: &mut Response| {});
        self.register_event(EVENT_AFTER_PROCESSING, |_: &mut Response| {});
        self.register_event(EVENT_INVALID_REQUEST, |r: &mut Response, _function: Value| {
            r.alert(INVALID_REQUEST_ALERT);
        });
        self.register_invalid_call(|r: &mut Response, _failed: &Callback| {
            r.alert(INVALID_CALL_ALERT);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_handler() {
        let mut registry = HandlerRegistry::new();

        registry.register("echo", |_: &mut Response, _v: Value| {}, HandlerOptions::new());

        assert!(registry.contains("echo"));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = HandlerRegistry::new();
        let first = Callback::from_fn(|_: &mut Response| {});
        let second = Callback::from_fn(|_: &mut Response| {});

        registry.register(
            "same",
            first,
            HandlerOptions::new().extra_args(["old"]).unwrap(),
        );
        registry.register("same", second.clone(), HandlerOptions::new());

        let entry = registry.get("same").unwrap();
        assert!(entry.callback.ptr_eq(&second));
        assert!(entry.options.extra_arg_values().is_empty());
        assert_eq!(registry.names().count(), 1);
    }

    #[test]
    fn test_extra_args_shapes() {
        let opts = HandlerOptions::new().extra_args(("one", 2)).unwrap();
        assert_eq!(opts.extra_arg_values(), &[json!("one"), json!(2)]);

        let opts = HandlerOptions::new().extra_args(vec![json!([1])]).unwrap();
        assert_eq!(opts.extra_arg_values(), &[json!([1])]);

        let opts = HandlerOptions::new().extra_args(Value::Null).unwrap();
        assert!(opts.extra_arg_values().is_empty());

        for bad in [json!("text"), json!(5), json!({"k": "v"})] {
            let err = HandlerOptions::new().extra_args(bad).unwrap_err();
            assert!(matches!(err, DomwireError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_register_surface_skips_private_members() {
        let mut registry = HandlerRegistry::new();
        let surface: Vec<(String, Callback)> = vec![
            ("visible".to_string(), Callback::from_fn(|_: &mut Response| {})),
            ("_hidden".to_string(), Callback::from_fn(|_: &mut Response| {})),
        ];

        registry.register_surface(&surface, HandlerOptions::new().extra_args(["x"]).unwrap());

        assert!(registry.contains("visible"));
        assert!(!registry.contains("_hidden"));
        assert_eq!(
            registry.get("visible").unwrap().options.extra_arg_values(),
            &[json!("x")]
        );
    }

    #[test]
    fn test_default_events_installed() {
        let mut registry = HandlerRegistry::new();
        assert!(!registry.has_event(EVENT_BEFORE_PROCESSING));

        registry.install_default_events();

        for name in [
            EVENT_BEFORE_PROCESSING,
            EVENT_AFTER_PROCESSING,
            EVENT_INVALID_REQUEST,
            EVENT_INVALID_CALL,
        ] {
            assert!(registry.has_event(name), "no handler for {name}");
        }
        assert!(matches!(
            registry.get_event(EVENT_INVALID_CALL),
            Some(EventHandler::InvalidCall(_))
        ));
    }

    #[test]
    fn test_custom_event_replaces_previous() {
        let mut registry = HandlerRegistry::new();
        registry.register_event("my_event", |r: &mut Response| {
            r.alert("first");
        });
        registry.register_event("my_event", |r: &mut Response| {
            r.alert("second");
        });

        let mut response = Response::new();
        let cb = registry.get_event("my_event").unwrap().callback().unwrap();
        cb.call(&mut response, vec![]).unwrap();

        assert_eq!(
            response.to_json().unwrap(),
            r#"[{"type":"alert","alert":"second"}]"#
        );
    }

    #[test]
    fn test_plain_callback_as_invalid_call_event() {
        let mut registry = HandlerRegistry::new();
        registry.register_event(EVENT_INVALID_CALL, |r: &mut Response| {
            r.alert("custom");
        });
        let failed = Callback::from_fn(|_: &mut Response| {});
        let mut response = Response::new();

        registry
            .get_event(EVENT_INVALID_CALL)
            .unwrap()
            .invoke_invalid_call(&mut response, &failed)
            .unwrap();

        assert_eq!(response.commands().len(), 1);
    }

    #[test]
    fn test_invalid_call_event_with_parameters_falls_back_to_alert() {
        let mut registry = HandlerRegistry::new();
        registry.register_event(EVENT_INVALID_CALL, |r: &mut Response, _reason: String| {
            r.alert("never shown");
        });
        let failed = Callback::from_fn(|_: &mut Response, _x: i32| {});
        let mut response = Response::new();

        let outcome = registry
            .get_event(EVENT_INVALID_CALL)
            .unwrap()
            .invoke_invalid_call(&mut response, &failed)
            .unwrap();

        assert!(matches!(outcome, Outcome::Done));
        let sent: Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert_eq!(sent, json!([{"type": "alert", "alert": INVALID_CALL_ALERT}]));
    }
}

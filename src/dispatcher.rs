//! Request dispatcher.
//!
//! The [`Dispatcher`] owns the handler registry and the raw request data of
//! one request. Its lifecycle per request is:
//! 1. Feed the transport's key/value data with [`Dispatcher::set_request_data`]
//! 2. Check [`Dispatcher::is_dispatch_request`]
//! 3. Call [`Dispatcher::dispatch`] and hand the [`Output`] to the transport
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use domwire::{Dispatcher, Response};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register("say_hi", |r: &mut Response, name: String| {
//!     r.alert(format!("Hi {name}"));
//! });
//!
//! let data = HashMap::from([
//!     ("sijax_rq".to_string(), "say_hi".to_string()),
//!     ("sijax_args".to_string(), r#"["Ann"]"#.to_string()),
//! ]);
//! dispatcher.set_request_data(data);
//!
//! let json = dispatcher.dispatch().unwrap().into_json().unwrap();
//! assert_eq!(json, r#"[{"type":"alert","alert":"Hi Ann"}]"#);
//! ```

use std::cell::OnceCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::control::{build_bootstrap_script, PARAM_ARGS, PARAM_REQUEST};
use crate::error::{DomwireError, Result};
use crate::handler::{
    Callback, EventHandler, HandlerOptions, HandlerRegistry, IntoCallback, IntoOutcome,
    PublicSurface, EVENT_AFTER_PROCESSING, EVENT_BEFORE_PROCESSING, EVENT_INVALID_CALL,
    EVENT_INVALID_REQUEST,
};
use crate::response::{BaseContext, CallChain, Output, Response};

/// Matches requests to registered handlers and runs them.
///
/// Meant to be created once per request; it is not shared between threads.
#[derive(Debug)]
pub struct Dispatcher {
    /// Raw request data from the transport.
    data: HashMap<String, String>,
    registry: HandlerRegistry,
    /// Where the client sends its requests.
    request_uri: Option<String>,
    /// Where the client loads a JSON polyfill from.
    json_uri: Option<String>,
    /// Parsed request arguments, computed on first use.
    request_args: OnceCell<Vec<Value>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with the built-in event handlers.
    pub fn new() -> Self {
        let mut registry = HandlerRegistry::new();
        registry.install_default_events();
        Self {
            data: HashMap::new(),
            registry,
            request_uri: None,
            json_uri: None,
            request_args: OnceCell::new(),
        }
    }

    /// Replace the request data.
    pub fn set_request_data(&mut self, data: HashMap<String, String>) -> &mut Self {
        self.data = data;
        self.request_args = OnceCell::new();
        self
    }

    pub fn request_data(&self) -> &HashMap<String, String> {
        &self.data
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Register `handler` under `name` with explicit options.
    ///
    /// Registering a name again replaces the previous handler and its
    /// options.
    pub fn register_handler<H, Args>(
        &mut self,
        name: &str,
        handler: H,
        options: HandlerOptions,
    ) -> &mut Self
    where
        H: IntoCallback<Args>,
    {
        self.registry.register(name, handler, options);
        self
    }

    /// Register `handler` under `name` with the regular context.
    pub fn register<H, Args>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: IntoCallback<Args>,
    {
        self.register_handler(name, handler, HandlerOptions::new())
    }

    /// Register every public member of `surface`.
    pub fn register_surface<S>(&mut self, surface: &S, options: HandlerOptions) -> &mut Self
    where
        S: PublicSurface + ?Sized,
    {
        self.registry.register_surface(surface, options);
        self
    }

    /// Register an event handler, replacing the current one.
    pub fn register_event<H, Args>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: IntoCallback<Args>,
    {
        self.registry.register_event(name, handler);
        self
    }

    /// Register the handler run when a callback rejects its arguments.
    pub fn register_invalid_call<F, R>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Response, &Callback) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.registry.register_invalid_call(handler);
        self
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.registry.has_event(name)
    }

    pub fn get_event(&self, name: &str) -> Option<&EventHandler> {
        self.registry.get_event(name)
    }

    /// Whether the request data carries both reserved keys.
    pub fn is_dispatch_request(&self) -> bool {
        self.data.contains_key(PARAM_REQUEST) && self.data.contains_key(PARAM_ARGS)
    }

    /// Name of the function the client asked for.
    pub fn requested_function(&self) -> Option<&str> {
        self.data.get(PARAM_REQUEST).map(String::as_str)
    }

    /// Arguments the client sent.
    ///
    /// Missing, malformed or non-list argument data yields an empty list.
    pub fn request_args(&self) -> &[Value] {
        self.request_args.get_or_init(|| {
            let Some(raw) = self.data.get(PARAM_ARGS) else {
                return Vec::new();
            };
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Array(args)) => args,
                Ok(_) => {
                    tracing::debug!("Request args are not a list, using no args");
                    Vec::new()
                }
                Err(e) => {
                    tracing::debug!("Failed to parse request args: {}", e);
                    Vec::new()
                }
            }
        })
    }

    /// Run the requested handler.
    ///
    /// An unknown function name runs the invalid-request event instead, with
    /// the requested name as its only argument.
    ///
    /// # Errors
    ///
    /// [`DomwireError::NotADispatchRequest`] when a reserved key is missing,
    /// plus whatever the handler chain fails with.
    pub fn dispatch(&self) -> Result<Output> {
        if !self.is_dispatch_request() {
            return Err(DomwireError::NotADispatchRequest);
        }
        let name = self.requested_function().unwrap_or_default();

        match self.registry.get(name) {
            Some(registration) => {
                tracing::debug!("Dispatching {}", name);
                self.execute_handler(
                    self.request_args().to_vec(),
                    registration.callback.clone(),
                    &registration.options,
                )
            }
            None => {
                tracing::warn!("Unknown function requested: {}", name);
                let callback = self.event_callback(EVENT_INVALID_REQUEST);
                self.execute_handler(
                    vec![Value::String(name.to_string())],
                    callback,
                    &HandlerOptions::new(),
                )
            }
        }
    }

    /// Run `callback` within a fresh response context.
    ///
    /// The context is built from `options` (regular by default) and seeded
    /// with `args`. The callback receives the extra args followed by the
    /// context's request args, between the before and after events.
    pub fn execute_handler(
        &self,
        args: Vec<Value>,
        callback: Callback,
        options: &HandlerOptions,
    ) -> Result<Output> {
        let context = match options.response_factory() {
            Some(factory) => factory(self, args)?,
            None => BaseContext::factory()(self, args)?,
        };

        let mut call_args = options.extra_arg_values().to_vec();
        call_args.extend(context.request_args());

        let invalid_call = self
            .registry
            .get_event(EVENT_INVALID_CALL)
            .cloned()
            .unwrap_or_else(|| EventHandler::Callback(noop()));

        let chain = CallChain::new(invalid_call)
            .stage(self.event_callback(EVENT_BEFORE_PROCESSING), Vec::new())
            .stage(callback, call_args)
            .stage(self.event_callback(EVENT_AFTER_PROCESSING), Vec::new());

        context.process_call_chain(chain)
    }

    /// Set the URI the client sends requests to.
    pub fn set_request_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.request_uri = Some(uri.into());
        self
    }

    /// Set the URI of a JSON polyfill for old browsers.
    pub fn set_json_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.json_uri = Some(uri.into());
        self
    }

    /// Script configuring the client library.
    ///
    /// # Errors
    ///
    /// [`DomwireError::MissingConfiguration`] without a request URI.
    pub fn bootstrap_script(&self) -> Result<String> {
        let request_uri = self
            .request_uri
            .as_deref()
            .ok_or(DomwireError::MissingConfiguration("request URI"))?;
        build_bootstrap_script(request_uri, self.json_uri.as_deref())
    }

    fn event_callback(&self, name: &str) -> Callback {
        self.registry
            .get_event(name)
            .and_then(EventHandler::callback)
            .cloned()
            .unwrap_or_else(noop)
    }
}

fn noop() -> Callback {
    Callback::variadic(|_: &mut Response, _: Vec<Value>| {})
}

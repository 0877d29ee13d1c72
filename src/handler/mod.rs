//! Handler module - handler functions, their outcomes and the registry.
//!
//! Provides:
//! - [`Callback`] - a shared, invocable handler
//! - [`Outcome`] / [`Suspend`] - finished versus suspended handler calls
//! - [`HandlerRegistry`] - maps public names to handlers and events
//!
//! # Example
//!
//! ```
//! use domwire::handler::{HandlerOptions, HandlerRegistry, Steps};
//! use domwire::Response;
//!
//! let mut registry = HandlerRegistry::new();
//!
//! // A regular handler
//! registry.register("greet", |r: &mut Response, name: String| {
//!     r.alert(format!("Hi {name}"));
//! }, HandlerOptions::new());
//!
//! // A streaming handler flushing after every step
//! registry.register("progress", |_: &mut Response| {
//!     Steps::new()
//!         .then(|r: &mut Response| { r.set_html("#bar", "50%"); })
//!         .then(|r: &mut Response| { r.set_html("#bar", "100%"); })
//! }, HandlerOptions::new().context(domwire::plugin::comet::factory()));
//! ```

mod callback;
mod outcome;
mod registry;

pub use callback::{Arity, CallError, CallResult, Callback, Handler, IntoCallback, TypedHandler};
pub use outcome::{HandlerResult, IntoOutcome, Outcome, Step, StepResult, Steps, Suspend};
pub use registry::{
    EventHandler, HandlerOptions, HandlerRegistry, InvalidCallFn, PublicSurface, Registration,
    EVENT_AFTER_PROCESSING, EVENT_BEFORE_PROCESSING, EVENT_INVALID_CALL, EVENT_INVALID_REQUEST,
};

pub(crate) use registry::json_kind;

//! Response module - per-request command collection and call-chain execution.
//!
//! A dispatch builds one [`ResponseContext`] through a [`ResponseFactory`],
//! then hands it the call chain (before event, handler, after event):
//!
//! - [`BaseContext`] runs the chain and returns one JSON batch.
//! - [`StreamingContext`] turns the chain into a lazy [`ChunkStream`] that
//!   flushes partial batches as the handlers make progress.
//!
//! Handlers only ever see the [`Response`] inside the context.

mod base;
mod streaming;

pub use base::{BaseContext, Response};
pub use streaming::{
    ChunkStream, StreamConfig, StreamingContext, DEFAULT_PADDING_LEN, DEFAULT_PROCESSOR,
};

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::dispatcher::Dispatcher;
use crate::error::{DomwireError, Result};
use crate::handler::{CallError, Callback, EventHandler, Outcome};

/// Capability every response context variant provides.
pub trait ResponseContext: Send {
    /// The command collector handed to handlers.
    fn response(&mut self) -> &mut Response;

    /// Arguments the main handler is called with (before extra args are
    /// prepended). Variants may rewrite the raw request arguments here.
    fn request_args(&self) -> Vec<Value>;

    /// Run the chain and produce the output for the transport.
    fn process_call_chain(self: Box<Self>, chain: CallChain) -> Result<Output>;
}

/// Builds a response context from the dispatcher and raw request arguments.
pub type ResponseFactory =
    Arc<dyn Fn(&Dispatcher, Vec<Value>) -> Result<Box<dyn ResponseContext>> + Send + Sync>;

/// What a dispatch produces.
pub enum Output {
    /// A single JSON command array.
    Json(String),
    /// Lazily produced chunks, each carrying one command batch.
    Stream(ChunkStream),
}

impl Output {
    pub fn is_stream(&self) -> bool {
        matches!(self, Output::Stream(_))
    }

    pub fn into_json(self) -> Option<String> {
        match self {
            Output::Json(json) => Some(json),
            Output::Stream(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<ChunkStream> {
        match self {
            Output::Stream(stream) => Some(stream),
            Output::Json(_) => None,
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Json(json) => f.debug_tuple("Json").field(json).finish(),
            Output::Stream(stream) => f.debug_tuple("Stream").field(stream).finish(),
        }
    }
}

/// One callback and the arguments it is called with.
#[derive(Debug, Clone)]
pub struct Stage {
    pub callback: Callback,
    pub args: Vec<Value>,
}

/// Ordered stages plus the event used when a stage rejects its arguments.
#[derive(Debug, Clone)]
pub struct CallChain {
    stages: Vec<Stage>,
    invalid_call: EventHandler,
}

impl CallChain {
    /// Empty chain reporting invalid calls to `invalid_call`.
    pub fn new(invalid_call: EventHandler) -> Self {
        Self {
            stages: Vec::new(),
            invalid_call,
        }
    }

    /// Append a stage.
    pub fn stage(mut self, callback: Callback, args: Vec<Value>) -> Self {
        self.stages.push(Stage { callback, args });
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Stage>, EventHandler) {
        (self.stages, self.invalid_call)
    }
}

/// Call `callback` with `args`, routing argument mismatches to the
/// invalid-call event.
///
/// The arity is checked before the call; decode failures at the call
/// boundary count as mismatches too. Errors raised by the handler body are
/// returned as [`DomwireError::Handler`] untouched.
pub fn perform_handler_call(
    response: &mut Response,
    callback: &Callback,
    args: Vec<Value>,
    invalid_call: &EventHandler,
) -> Result<Outcome> {
    let result = if callback.arity().accepts(args.len()) {
        callback.call(response, args)
    } else {
        Err(CallError::Arguments(format!(
            "expected {} arguments, got {}",
            callback.arity(),
            args.len()
        )))
    };

    match result {
        Ok(outcome) => Ok(outcome),
        Err(CallError::Arguments(reason)) => {
            tracing::warn!("Invalid call to {:?}: {}", callback, reason);
            invalid_call.invoke_invalid_call(response, callback)
        }
        Err(CallError::Fault(e)) => Err(DomwireError::Handler(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, InvalidCallFn};
    use serde_json::json;

    fn invalid_call_alert() -> EventHandler {
        let f: InvalidCallFn = Arc::new(|r: &mut Response, _: &Callback| -> HandlerResult {
            r.alert("bad call");
            Ok(Outcome::Done)
        });
        EventHandler::InvalidCall(f)
    }

    #[test]
    fn test_perform_calls_handler() {
        let cb = Callback::from_fn(|r: &mut Response, x: i32| {
            r.alert(x.to_string());
        });
        let mut response = Response::new();

        perform_handler_call(&mut response, &cb, vec![json!(7)], &invalid_call_alert()).unwrap();

        assert_eq!(response.to_json().unwrap(), r#"[{"type":"alert","alert":"7"}]"#);
    }

    #[test]
    fn test_perform_routes_arity_mismatch_to_event() {
        let cb = Callback::from_fn(|r: &mut Response, _x: i32| {
            r.alert("ran");
        });
        let mut response = Response::new();

        perform_handler_call(&mut response, &cb, vec![], &invalid_call_alert()).unwrap();

        assert_eq!(
            response.to_json().unwrap(),
            r#"[{"type":"alert","alert":"bad call"}]"#
        );
    }

    #[test]
    fn test_perform_propagates_fault() {
        #[derive(Debug)]
        struct Nested;
        impl fmt::Display for Nested {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("nested failure")
            }
        }
        impl std::error::Error for Nested {}

        fn inner() -> std::result::Result<(), Nested> {
            Err(Nested)
        }
        fn handler(_: &mut Response) -> std::result::Result<(), Nested> {
            inner()?;
            Ok(())
        }

        let cb = Callback::from_fn(handler);
        let err = perform_handler_call(&mut Response::new(), &cb, vec![], &invalid_call_alert())
            .unwrap_err();

        match err {
            DomwireError::Handler(e) => assert!(e.downcast_ref::<Nested>().is_some()),
            other => panic!("expected handler error, got {other:?}"),
        }
    }

    #[test]
    fn test_call_chain_builder() {
        let noop = Callback::from_fn(|_: &mut Response| {});
        let chain = CallChain::new(invalid_call_alert())
            .stage(noop.clone(), vec![])
            .stage(noop, vec![json!(1)]);

        assert_eq!(chain.len(), 2);
        let (stages, _) = chain.into_parts();
        assert_eq!(stages[1].args, vec![json!(1)]);
    }

    #[test]
    fn test_output_accessors() {
        let out = Output::Json("[]".to_string());
        assert!(!out.is_stream());
        assert_eq!(out.into_json().as_deref(), Some("[]"));
    }
}

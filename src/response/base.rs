//! The handler-facing command API and the regular (one batch) context.
//!
//! # Example
//!
//! ```
//! use domwire::Response;
//!
//! let mut response = Response::new();
//! response
//!     .alert("Saved")
//!     .set_html("#status", "<em>ok</em>")
//!     .set_css_property("#status", "color", "green")
//!     .remove(".spinner");
//!
//! assert_eq!(response.commands().len(), 4);
//! ```

use serde::Serialize;
use serde_json::Value;

use super::{perform_handler_call, CallChain, Output, ResponseContext, ResponseFactory};
use crate::command::{Command, CommandBuffer, SetType};
use crate::dispatcher::Dispatcher;
use crate::error::{DomwireError, Result};
use crate::handler::json_kind;

/// Collects the commands a handler issues during one request.
///
/// All mutation methods return `&mut Self` so calls can be chained.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Commands issued since construction or the last flush.
    commands: CommandBuffer,
    /// Id of the submitted form, for upload calls.
    pub(crate) form_id: Option<String>,
}

impl Response {
    /// Create an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued commands.
    pub fn commands(&self) -> &CommandBuffer {
        &self.commands
    }

    /// Whether nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Queue a raw command.
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Drop every queued command.
    pub fn clear_commands(&mut self) -> &mut Self {
        self.commands.clear();
        self
    }

    /// Show a message box.
    pub fn alert(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(Command::Alert {
            alert: message.into(),
        })
    }

    fn html(
        &mut self,
        selector: impl Into<String>,
        html: impl Into<String>,
        set_type: SetType,
    ) -> &mut Self {
        self.push(Command::Html {
            selector: selector.into(),
            html: html.into(),
            set_type,
        })
    }

    /// Replace the html of every element matching `selector`.
    ///
    /// Scripts inside the html are executed by the client.
    pub fn set_html(&mut self, selector: impl Into<String>, html: impl Into<String>) -> &mut Self {
        self.html(selector, html, SetType::Replace)
    }

    /// Like [`Response::set_html`], but appends.
    pub fn append_html(
        &mut self,
        selector: impl Into<String>,
        html: impl Into<String>,
    ) -> &mut Self {
        self.html(selector, html, SetType::Append)
    }

    /// Like [`Response::set_html`], but prepends.
    pub fn prepend_html(
        &mut self,
        selector: impl Into<String>,
        html: impl Into<String>,
    ) -> &mut Self {
        self.html(selector, html, SetType::Prepend)
    }

    /// Run code on the client.
    ///
    /// The client evaluates it inside a helper function, so it does not touch
    /// the global scope unless it does so explicitly.
    pub fn run_script(&mut self, code: impl Into<String>) -> &mut Self {
        self.push(Command::Script {
            script: code.into(),
        })
    }

    /// Set one style property on every element matching `selector`.
    pub fn set_css_property(
        &mut self,
        selector: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push(Command::Css {
            selector: selector.into(),
            key: property.into(),
            value: value.into(),
        })
    }

    fn attr(
        &mut self,
        selector: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
        set_type: SetType,
    ) -> &mut Self {
        self.push(Command::Attr {
            selector: selector.into(),
            key: key.into(),
            value: value.into(),
            set_type,
        })
    }

    /// Set an attribute on every element matching `selector`.
    pub fn set_attr(
        &mut self,
        selector: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.attr(selector, key, value, SetType::Replace)
    }

    /// Like [`Response::set_attr`], but appends to the current value.
    pub fn append_attr(
        &mut self,
        selector: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.attr(selector, key, value, SetType::Append)
    }

    /// Like [`Response::set_attr`], but prepends to the current value.
    pub fn prepend_attr(
        &mut self,
        selector: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.attr(selector, key, value, SetType::Prepend)
    }

    /// Remove every element matching `selector`.
    pub fn remove(&mut self, selector: impl Into<String>) -> &mut Self {
        self.push(Command::Remove {
            remove: selector.into(),
        })
    }

    /// Navigate the browser to `uri`.
    pub fn redirect(&mut self, uri: impl Into<String>) -> &mut Self {
        let target = Value::String(uri.into());
        self.run_script(format!("window.location = {target};"))
    }

    /// Call the client function `function` with positional `args`.
    ///
    /// `args` must serialize to a JSON array (`Vec`, slice, tuple) or to
    /// `null`, which means no arguments.
    ///
    /// # Errors
    ///
    /// [`DomwireError::InvalidArgument`] for any other shape.
    pub fn invoke<T: Serialize>(
        &mut self,
        function: impl Into<String>,
        args: T,
    ) -> Result<&mut Self> {
        let params = match serde_json::to_value(args)? {
            Value::Null => Vec::new(),
            Value::Array(values) => values,
            other => {
                return Err(DomwireError::InvalidArgument(format!(
                    "invoke expects a list, a tuple or null for the args, got {}",
                    json_kind(&other)
                )))
            }
        };
        Ok(self.push(Command::Call {
            call: function.into(),
            params,
        }))
    }

    /// JSON array of the queued commands.
    pub fn to_json(&self) -> Result<String> {
        self.commands.serialize()
    }

    /// Serialize the queued commands and clear the buffer.
    pub(crate) fn drain_json(&mut self) -> Result<String> {
        self.commands.drain_json()
    }
}

/// Regular context: runs the whole chain, then returns one JSON batch.
#[derive(Debug, Default)]
pub struct BaseContext {
    response: Response,
    request_args: Vec<Value>,
}

impl BaseContext {
    pub fn new(request_args: Vec<Value>) -> Self {
        Self {
            response: Response::new(),
            request_args,
        }
    }

    /// Factory producing regular contexts.
    pub fn factory() -> ResponseFactory {
        std::sync::Arc::new(base_context)
    }
}

fn base_context(_: &Dispatcher, args: Vec<Value>) -> Result<Box<dyn ResponseContext>> {
    Ok(Box::new(BaseContext::new(args)))
}

impl ResponseContext for BaseContext {
    fn response(&mut self) -> &mut Response {
        &mut self.response
    }

    fn request_args(&self) -> Vec<Value> {
        self.request_args.clone()
    }

    fn process_call_chain(mut self: Box<Self>, chain: CallChain) -> Result<Output> {
        let (stages, invalid_call) = chain.into_parts();
        for stage in stages {
            let outcome = perform_handler_call(
                &mut self.response,
                &stage.callback,
                stage.args,
                &invalid_call,
            )?;
            if outcome.is_suspended() {
                return Err(DomwireError::StreamingNotSupported);
            }
        }
        Ok(Output::Json(self.response.to_json()?))
    }
}

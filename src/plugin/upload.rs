//! Upload handlers.
//!
//! The client submits an upload form through a hidden frame and calls the
//! handler registered under `"{form_id}_upload"` with the form id as its only
//! argument. The handler instead receives a single mapping of the submitted
//! form fields, and its commands are streamed back into the frame.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use domwire::handler::HandlerOptions;
//! use domwire::plugin::upload;
//! use domwire::{Dispatcher, Response};
//!
//! let mut dispatcher = Dispatcher::new();
//! let js = upload::register_upload_callback(
//!     &mut dispatcher,
//!     "avatar",
//!     |r: &mut Response, fields: HashMap<String, String>| {
//!         r.alert(format!("got {} fields", fields.len()));
//!         r.reset_form();
//!     },
//!     HandlerOptions::new(),
//! )
//! .unwrap();
//!
//! assert!(js.contains("sjxUpload.registerForm"));
//! ```

use serde_json::{Map, Value};

use crate::command::Command;
use crate::control::{build_upload_registration, PARAM_ARGS, PARAM_REQUEST, UPLOAD_NAMESPACE};
use crate::dispatcher::Dispatcher;
use crate::error::{DomwireError, Result};
use crate::handler::{HandlerOptions, IntoCallback};
use crate::response::{
    CallChain, Output, Response, ResponseContext, ResponseFactory, StreamConfig, StreamingContext,
};

/// Public name an upload form's handler is registered under.
pub fn public_name(form_id: &str) -> String {
    format!("{form_id}_upload")
}

/// Register the upload handler for `form_id`.
///
/// The context defaults to [`UploadContext`]. Returns the script that
/// turns the form into an upload form; it must run on the page holding the
/// form.
pub fn register_upload_callback<H, Args>(
    dispatcher: &mut Dispatcher,
    form_id: &str,
    handler: H,
    options: HandlerOptions,
) -> Result<String>
where
    H: IntoCallback<Args>,
{
    let name = public_name(form_id);
    let options = if options.has_context() {
        options
    } else {
        options.context(UploadContext::factory(StreamConfig::default()))
    };
    dispatcher.register_handler(&name, handler, options);
    build_upload_registration(form_id, &name)
}

/// Streaming context for upload handlers.
#[derive(Debug)]
pub struct UploadContext {
    inner: StreamingContext,
    form_values: Value,
}

impl UploadContext {
    /// Build the context for `dispatcher`'s request.
    ///
    /// # Errors
    ///
    /// [`DomwireError::InvalidArgument`] unless `request_args` is exactly
    /// one element, the form id.
    pub fn new(
        dispatcher: &Dispatcher,
        request_args: Vec<Value>,
        config: StreamConfig,
    ) -> Result<Self> {
        let [form_id] = <[Value; 1]>::try_from(request_args).map_err(|args| {
            DomwireError::InvalidArgument(format!(
                "upload requests carry exactly 1 argument, {} given",
                args.len()
            ))
        })?;
        let form_id = match form_id {
            Value::String(id) => id,
            other => other.to_string(),
        };

        let form_values: Map<String, Value> = dispatcher
            .request_data()
            .iter()
            .filter(|(key, _)| key.as_str() != PARAM_REQUEST && key.as_str() != PARAM_ARGS)
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        let mut inner = StreamingContext::new(Vec::new(), config);
        inner.response().form_id = Some(form_id);

        Ok(Self {
            inner,
            form_values: Value::Object(form_values),
        })
    }

    /// Factory producing upload contexts with `config`.
    pub fn factory(config: StreamConfig) -> ResponseFactory {
        std::sync::Arc::new(
            move |dispatcher: &Dispatcher, args: Vec<Value>| -> Result<Box<dyn ResponseContext>> {
                Ok(Box::new(UploadContext::new(dispatcher, args, config.clone())?))
            },
        )
    }

    /// The submitted form's id.
    pub fn form_id(&self) -> Option<&str> {
        self.inner.current_response().form_id()
    }
}

impl ResponseContext for UploadContext {
    fn response(&mut self) -> &mut Response {
        self.inner.response()
    }

    /// A single mapping of the submitted fields.
    fn request_args(&self) -> Vec<Value> {
        vec![self.form_values.clone()]
    }

    fn process_call_chain(self: Box<Self>, chain: CallChain) -> Result<Output> {
        Ok(Output::Stream(self.inner.into_stream(chain)))
    }
}

impl Response {
    /// Id of the submitted form, inside upload handlers.
    pub fn form_id(&self) -> Option<&str> {
        self.form_id.as_deref()
    }

    /// Reset the submitted form to its page-load state.
    pub fn reset_form(&mut self) -> &mut Self {
        let form_id = self.form_id.clone().map_or(Value::Null, Value::String);
        self.push(Command::Call {
            call: format!("{UPLOAD_NAMESPACE}.resetForm"),
            params: vec![form_id],
        })
    }
}

//! # domwire
//!
//! Expose server-side handlers to a browser client and answer every call
//! with a list of DOM mutation commands for the client to replay.
//!
//! ## Architecture
//!
//! - **Dispatcher**: matches a request (function name + JSON argument list)
//!   to a registered handler and runs it between the before/after events
//! - **Response**: the command buffer handlers write into (`alert`,
//!   `set_html`, `set_attr`, `invoke`, ...)
//! - **Contexts**: the regular context returns one JSON batch; the streaming
//!   context returns a lazy sequence of script chunks, one per flush point
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use domwire::{Dispatcher, Output, Response};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register("hide", |r: &mut Response, selector: String| {
//!     r.set_css_property(selector, "display", "none");
//! });
//!
//! dispatcher.set_request_data(HashMap::from([
//!     ("sijax_rq".to_string(), "hide".to_string()),
//!     ("sijax_args".to_string(), r##"["#banner"]"##.to_string()),
//! ]));
//!
//! match dispatcher.dispatch().unwrap() {
//!     Output::Json(json) => assert!(json.contains("display")),
//!     Output::Stream(_) => unreachable!(),
//! }
//! ```

pub mod command;
pub mod control;
pub mod error;
pub mod handler;
pub mod plugin;
pub mod response;
pub mod writer;

mod dispatcher;

pub use command::{Command, CommandBuffer, SetType};
pub use dispatcher::Dispatcher;
pub use error::{DomwireError, Result};
pub use handler::{Callback, HandlerOptions, Outcome, Step, Steps};
pub use response::{ChunkStream, Output, Response, StreamConfig};
pub use writer::write_output;

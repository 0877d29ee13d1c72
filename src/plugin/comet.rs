//! Comet handlers.
//!
//! A comet handler runs inside a streaming context, so it can return a
//! suspending [`Outcome`](crate::handler::Outcome) and have every step
//! delivered to the browser as soon as it is done.
//!
//! # Example
//!
//! ```
//! use domwire::handler::{HandlerOptions, Steps};
//! use domwire::plugin::comet;
//! use domwire::{Dispatcher, Response};
//!
//! let mut dispatcher = Dispatcher::new();
//! comet::register_comet_callback(&mut dispatcher, "countdown", |_: &mut Response, from: u32| {
//!     (0..=from).rev().fold(Steps::new(), |steps, n| {
//!         steps.then(move |r: &mut Response| {
//!             r.set_html("#counter", n.to_string());
//!         })
//!     })
//! }, HandlerOptions::new());
//! ```

use crate::dispatcher::Dispatcher;
use crate::handler::{HandlerOptions, IntoCallback, PublicSurface};
use crate::response::{ResponseFactory, StreamConfig, StreamingContext};

/// Streaming factory with the default configuration.
pub fn factory() -> ResponseFactory {
    StreamingContext::factory(StreamConfig::default())
}

fn prepare_options(options: HandlerOptions) -> HandlerOptions {
    if options.has_context() {
        options
    } else {
        options.context(factory())
    }
}

/// Register a comet handler.
///
/// Same as [`Dispatcher::register_handler`], except that the context
/// defaults to a streaming one. An explicitly chosen context is kept.
pub fn register_comet_callback<H, Args>(
    dispatcher: &mut Dispatcher,
    name: &str,
    handler: H,
    options: HandlerOptions,
) where
    H: IntoCallback<Args>,
{
    dispatcher.register_handler(name, handler, prepare_options(options));
}

/// Register every public member of `surface` as a comet handler.
pub fn register_comet_surface<S>(dispatcher: &mut Dispatcher, surface: &S, options: HandlerOptions)
where
    S: PublicSurface + ?Sized,
{
    dispatcher.register_surface(surface, prepare_options(options));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Callback;
    use crate::response::{BaseContext, Response};

    #[test]
    fn test_comet_callback_gets_streaming_context() {
        let mut dispatcher = Dispatcher::new();
        register_comet_callback(
            &mut dispatcher,
            "tick",
            |_: &mut Response| {},
            HandlerOptions::new(),
        );

        let entry = dispatcher.registry().get("tick").unwrap();
        assert!(entry.options.has_context());
    }

    #[test]
    fn test_explicit_context_is_kept() {
        let mut dispatcher = Dispatcher::new();
        let base = BaseContext::factory();
        register_comet_callback(
            &mut dispatcher,
            "plain",
            |_: &mut Response| {},
            HandlerOptions::new().context(base.clone()),
        );

        let entry = dispatcher.registry().get("plain").unwrap();
        let kept = entry.options.response_factory().unwrap();
        assert!(std::sync::Arc::ptr_eq(kept, &base));
    }

    #[test]
    fn test_comet_surface() {
        let mut dispatcher = Dispatcher::new();
        let surface: Vec<(String, Callback)> = vec![
            ("a".to_string(), Callback::from_fn(|_: &mut Response| {})),
            ("_b".to_string(), Callback::from_fn(|_: &mut Response| {})),
        ];

        register_comet_surface(&mut dispatcher, &surface, HandlerOptions::new());

        assert!(dispatcher.registry().get("a").unwrap().options.has_context());
        assert!(!dispatcher.registry().contains("_b"));
    }
}

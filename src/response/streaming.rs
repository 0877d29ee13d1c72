//! Streaming context and the lazy chunk sequence it produces.
//!
//! Every chunk is a script block that hands one JSON command batch to the
//! client-side processor. The first chunk of a context is preceded by inert
//! padding so browsers that buffer the start of a long-lived response start
//! interpreting it right away.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use super::{
    perform_handler_call, CallChain, Output, Response, ResponseContext, ResponseFactory, Stage,
};
use crate::dispatcher::Dispatcher;
use crate::error::{DomwireError, Result};
use crate::handler::{EventHandler, Outcome, Step, Suspend};

/// Default amount of padding newlines before the first chunk.
pub const DEFAULT_PADDING_LEN: usize = 2000;

/// Default client-side entry point receiving each batch.
pub const DEFAULT_PROCESSOR: &str = "window.parent.Sijax.processCommands";

const PADDING_MARKER: &str = "\n<script type='text/javascript'></script>\n\n";

/// Streaming configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Newlines written ahead of the first chunk.
    pub padding_len: usize,
    /// Client function every chunk calls with its batch.
    pub processor: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            padding_len: DEFAULT_PADDING_LEN,
            processor: DEFAULT_PROCESSOR.to_string(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the padding length.
    pub fn padding_len(mut self, len: usize) -> Self {
        self.padding_len = len;
        self
    }

    /// Set the client entry point.
    pub fn processor(mut self, processor: impl Into<String>) -> Self {
        self.processor = processor.into();
        self
    }
}

/// Response context that flushes partial batches while the chain runs.
#[derive(Debug)]
pub struct StreamingContext {
    response: Response,
    request_args: Vec<Value>,
    config: StreamConfig,
    first_flush: bool,
}

impl StreamingContext {
    pub fn new(request_args: Vec<Value>, config: StreamConfig) -> Self {
        Self {
            response: Response::new(),
            request_args,
            config,
            first_flush: true,
        }
    }

    /// Factory producing streaming contexts with `config`.
    pub fn factory(config: StreamConfig) -> ResponseFactory {
        Arc::new(
            move |_: &Dispatcher, args: Vec<Value>| -> Result<Box<dyn ResponseContext>> {
                Ok(Box::new(StreamingContext::new(args, config.clone())))
            },
        )
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Read-only view of the response.
    pub fn current_response(&self) -> &Response {
        &self.response
    }

    /// Serialize and clear the buffer, wrapped for the client.
    pub fn flush(&mut self) -> Result<Bytes> {
        // `</` inside a script block would end it early; `<\/` is the same JSON string
        let json = self.response.drain_json()?.replace("</", "<\\/");
        let envelope = format!(
            "\n<script type=\"text/javascript\">\n    {}({});\n</script>\n",
            self.config.processor, json
        );

        if !self.first_flush {
            tracing::trace!("Flushing {} bytes", envelope.len());
            return Ok(Bytes::from(envelope));
        }

        self.first_flush = false;
        let mut chunk =
            String::with_capacity(PADDING_MARKER.len() + self.config.padding_len + envelope.len());
        chunk.push_str(PADDING_MARKER);
        chunk.extend(std::iter::repeat('\n').take(self.config.padding_len));
        chunk.push_str(&envelope);
        tracing::trace!(
            "Flushing {} bytes (first chunk, {} padding)",
            chunk.len(),
            self.config.padding_len
        );
        Ok(Bytes::from(chunk))
    }

    /// Turn the chain into a lazy chunk sequence owning this context.
    pub fn into_stream(self, chain: CallChain) -> ChunkStream {
        let (stages, invalid_call) = chain.into_parts();
        ChunkStream {
            context: self,
            stages: stages.into_iter(),
            invalid_call,
            state: State::Ready,
        }
    }

    fn flush_pending(&mut self) -> Option<Result<Bytes>> {
        if self.response.is_empty() {
            None
        } else {
            Some(self.flush())
        }
    }
}

impl ResponseContext for StreamingContext {
    fn response(&mut self) -> &mut Response {
        &mut self.response
    }

    fn request_args(&self) -> Vec<Value> {
        self.request_args.clone()
    }

    fn process_call_chain(self: Box<Self>, chain: CallChain) -> Result<Output> {
        Ok(Output::Stream((*self).into_stream(chain)))
    }
}

enum State {
    /// Between stages.
    Ready,
    /// A stage returned a task that is not complete yet.
    Suspended(Box<dyn Suspend>),
    /// Exhausted or failed.
    Done,
}

/// Lazy, forward-only sequence of flushed chunks.
///
/// Stages run strictly in order. A chunk is produced only when a stage (or a
/// step of a suspended stage) left commands in the buffer. After an error
/// the stream yields that error once and then ends.
pub struct ChunkStream {
    context: StreamingContext,
    stages: std::vec::IntoIter<Stage>,
    invalid_call: EventHandler,
    state: State,
}

impl ChunkStream {
    /// Stages not started yet.
    pub fn remaining_stages(&self) -> usize {
        self.stages.len()
    }

    /// Whether the stream has ended.
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    fn fail(&mut self, err: DomwireError) -> Option<Result<Bytes>> {
        self.state = State::Done;
        Some(Err(err))
    }
}

impl Iterator for ChunkStream {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Done => return None,
                State::Ready => {
                    let Some(stage) = self.stages.next() else {
                        return None;
                    };
                    let outcome = perform_handler_call(
                        &mut self.context.response,
                        &stage.callback,
                        stage.args,
                        &self.invalid_call,
                    );
                    match outcome {
                        Ok(Outcome::Done) => {
                            self.state = State::Ready;
                            if let Some(chunk) = self.context.flush_pending() {
                                return Some(chunk);
                            }
                        }
                        Ok(Outcome::Suspended(task)) => self.state = State::Suspended(task),
                        Err(e) => return self.fail(e),
                    }
                }
                State::Suspended(mut task) => match task.resume(&mut self.context.response) {
                    Ok(Step::Yield) => {
                        self.state = State::Suspended(task);
                        if let Some(chunk) = self.context.flush_pending() {
                            return Some(chunk);
                        }
                    }
                    Ok(Step::Complete) => {
                        self.state = State::Ready;
                        if let Some(chunk) = self.context.flush_pending() {
                            return Some(chunk);
                        }
                    }
                    Err(e) => return self.fail(DomwireError::Handler(e)),
                },
            }
        }
    }
}

impl FusedIterator for ChunkStream {}

impl fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Ready => "ready",
            State::Suspended(_) => "suspended",
            State::Done => "done",
        };
        f.debug_struct("ChunkStream")
            .field("state", &state)
            .field("remaining_stages", &self.stages.len())
            .field("pending_commands", &self.context.response.commands().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Callback, Steps};
    use serde_json::json;

    fn noop_invalid_call() -> EventHandler {
        EventHandler::Callback(Callback::from_fn(|_: &mut Response| {}))
    }

    fn context() -> StreamingContext {
        StreamingContext::new(vec![], StreamConfig::default().padding_len(10))
    }

    fn payload(chunk: &[u8]) -> Vec<Value> {
        let text = std::str::from_utf8(chunk).unwrap();
        let start = text.find("processCommands(").unwrap() + "processCommands(".len();
        let end = text.rfind(");").unwrap();
        serde_json::from_str(&text[start..end]).unwrap()
    }

    #[test]
    fn test_first_flush_is_padded_once() {
        let mut ctx = context();

        ctx.response().alert("one");
        let first = ctx.flush().unwrap();
        ctx.response().alert("two");
        let second = ctx.flush().unwrap();

        assert!(first.starts_with(PADDING_MARKER.as_bytes()));
        assert_eq!(first.len(), PADDING_MARKER.len() + 10 + second.len());
        assert!(second.starts_with(b"\n<script type=\"text/javascript\">"));
        assert_eq!(payload(&second), vec![json!({"type": "alert", "alert": "two"})]);
    }

    #[test]
    fn test_flush_escapes_closing_tags() {
        let mut ctx = context();
        ctx.response().set_html("#x", "<b>hi</b><script>init()</script>");

        let chunk = ctx.flush().unwrap();
        let text = std::str::from_utf8(&chunk).unwrap();

        assert_eq!(text.matches("</script>").count(), 2);
        assert!(text.trim_end().ends_with("</script>"));
        assert_eq!(
            payload(&chunk)[0]["html"],
            json!("<b>hi</b><script>init()</script>")
        );
    }

    #[test]
    fn test_flush_clears_buffer() {
        let mut ctx = context();
        ctx.response().alert("x");

        ctx.flush().unwrap();

        assert!(ctx.response().is_empty());
        let empty = ctx.flush().unwrap();
        assert_eq!(payload(&empty), Vec::<Value>::new());
    }

    #[test]
    fn test_custom_processor() {
        let mut ctx = StreamingContext::new(
            vec![],
            StreamConfig::new().padding_len(0).processor("top.handle"),
        );
        let chunk = ctx.flush().unwrap();
        let text = std::str::from_utf8(&chunk).unwrap();
        assert!(text.contains("top.handle([]);"));
    }

    #[test]
    fn test_ordinary_stages_flush_when_non_empty() {
        let before = Callback::from_fn(|r: &mut Response| {
            r.alert("before");
        });
        let silent = Callback::from_fn(|_: &mut Response| {});
        let after = Callback::from_fn(|r: &mut Response| {
            r.alert("after");
        });
        let chain = CallChain::new(noop_invalid_call())
            .stage(before, vec![])
            .stage(silent, vec![])
            .stage(after, vec![]);

        let chunks: Vec<Bytes> = context()
            .into_stream(chain)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(payload(&chunks[0])[0]["alert"], json!("before"));
        assert_eq!(payload(&chunks[1])[0]["alert"], json!("after"));
    }

    #[test]
    fn test_suspended_steps_flush_per_demand_point() {
        let handler = Callback::from_fn(|_: &mut Response| {
            Steps::new()
                .then(|r: &mut Response| {
                    r.alert("1");
                })
                .then(|_: &mut Response| {})
                .then(|r: &mut Response| {
                    r.alert("2");
                    r.alert("3");
                })
        });
        let chain = CallChain::new(noop_invalid_call()).stage(handler, vec![]);

        let chunks: Vec<Bytes> = context()
            .into_stream(chain)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(payload(&chunks[1]).len(), 2);
    }

    #[test]
    fn test_trailing_commands_flush_on_complete() {
        let handler = Callback::from_fn(|_: &mut Response| {
            let mut calls = 0;
            Outcome::stream(move |r: &mut Response| {
                calls += 1;
                r.alert(calls.to_string());
                Ok(if calls == 1 { Step::Yield } else { Step::Complete })
            })
        });
        let chain = CallChain::new(noop_invalid_call()).stage(handler, vec![]);

        let chunks: Vec<Bytes> = context()
            .into_stream(chain)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(payload(&chunks[1])[0]["alert"], json!("2"));
    }

    #[test]
    fn test_stream_is_lazy() {
        let first = Callback::from_fn(|r: &mut Response| {
            r.alert("first");
        });
        let second = Callback::from_fn(|r: &mut Response| {
            r.alert("second");
        });
        let chain = CallChain::new(noop_invalid_call())
            .stage(first, vec![])
            .stage(second, vec![]);

        let mut stream = context().into_stream(chain);
        assert_eq!(stream.remaining_stages(), 2);

        stream.next().unwrap().unwrap();
        assert_eq!(stream.remaining_stages(), 1);
    }

    #[test]
    fn test_fault_ends_stream() {
        let failing =
            Callback::from_fn(|_: &mut Response| -> std::result::Result<(), std::io::Error> {
                Err(std::io::Error::other("gone"))
            });
        let after = Callback::from_fn(|r: &mut Response| {
            r.alert("never");
        });
        let chain = CallChain::new(noop_invalid_call())
            .stage(failing, vec![])
            .stage(after, vec![]);

        let mut stream = context().into_stream(chain);

        assert!(matches!(stream.next(), Some(Err(DomwireError::Handler(_)))));
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
        assert!(stream.is_done());
    }

    #[test]
    fn test_chunk_stream_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ChunkStream>();
    }
}

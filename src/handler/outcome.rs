//! What a handler hands back after it runs.
//!
//! Most handlers finish in one go and return [`Outcome::Done`]. Streaming
//! handlers return [`Outcome::Suspended`] with a [`Suspend`] task; the
//! streaming context resumes the task until it reports [`Step::Complete`],
//! flushing the command buffer after every step that queued something.

use std::collections::VecDeque;
use std::fmt;

use crate::error::BoxError;
use crate::response::Response;

/// Result of running a handler body.
pub type HandlerResult = std::result::Result<Outcome, BoxError>;

/// Result of resuming a suspended handler.
pub type StepResult = std::result::Result<Step, BoxError>;

/// A cooperative task that pauses at flush points.
///
/// The task never holds the [`Response`] between steps; it gets it back on
/// every resume.
pub trait Suspend: Send {
    /// Run until the next flush point or until the task is finished.
    fn resume(&mut self, response: &mut Response) -> StepResult;
}

impl<F> Suspend for F
where
    F: FnMut(&mut Response) -> StepResult + Send,
{
    fn resume(&mut self, response: &mut Response) -> StepResult {
        self(response)
    }
}

/// Where a suspended task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Paused at a flush point; more work follows.
    Yield,
    /// Finished.
    Complete,
}

/// Final state of a handler call.
pub enum Outcome {
    /// The handler ran to completion.
    Done,
    /// The handler paused and must be resumed until complete.
    Suspended(Box<dyn Suspend>),
}

impl Outcome {
    /// Wrap a suspending task.
    pub fn suspend(task: impl Suspend + 'static) -> Self {
        Outcome::Suspended(Box::new(task))
    }

    /// Build a suspending outcome from a step closure.
    ///
    /// ```
    /// use domwire::handler::{Outcome, Step};
    /// use domwire::Response;
    ///
    /// let mut left = 3;
    /// let outcome = Outcome::stream(move |r: &mut Response| {
    ///     if left == 0 {
    ///         return Ok(Step::Complete);
    ///     }
    ///     r.alert(format!("{left} to go"));
    ///     left -= 1;
    ///     Ok(Step::Yield)
    /// });
    /// assert!(outcome.is_suspended());
    /// ```
    pub fn stream<F>(step: F) -> Self
    where
        F: FnMut(&mut Response) -> StepResult + Send + 'static,
    {
        Outcome::Suspended(Box::new(step))
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Outcome::Suspended(_))
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => f.write_str("Done"),
            Outcome::Suspended(_) => f.write_str("Suspended(..)"),
        }
    }
}

/// Conversion of handler return values into an [`Outcome`].
pub trait IntoOutcome {
    fn into_outcome(self) -> HandlerResult;
}

impl IntoOutcome for () {
    #[inline]
    fn into_outcome(self) -> HandlerResult {
        Ok(Outcome::Done)
    }
}

impl IntoOutcome for Outcome {
    #[inline]
    fn into_outcome(self) -> HandlerResult {
        Ok(self)
    }
}

impl<T, E> IntoOutcome for std::result::Result<T, E>
where
    T: IntoOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> HandlerResult {
        match self {
            Ok(value) => value.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}

type StepFn = Box<dyn FnOnce(&mut Response) + Send>;

/// A fixed list of steps with a flush point after each one.
///
/// ```
/// use domwire::handler::{Outcome, Steps};
/// use domwire::Response;
///
/// let outcome: Outcome = Steps::new()
///     .then(|r: &mut Response| {
///         r.set_html("#status", "working");
///     })
///     .then(|r: &mut Response| {
///         r.set_html("#status", "done");
///     })
///     .into();
/// assert!(outcome.is_suspended());
/// ```
#[derive(Default)]
pub struct Steps {
    pending: VecDeque<StepFn>,
}

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue another step.
    pub fn then<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut Response) + Send + 'static,
    {
        self.pending.push_back(Box::new(step));
        self
    }

    /// Steps not yet run.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Suspend for Steps {
    fn resume(&mut self, response: &mut Response) -> StepResult {
        match self.pending.pop_front() {
            Some(step) => {
                step(response);
                Ok(Step::Yield)
            }
            None => Ok(Step::Complete),
        }
    }
}

impl From<Steps> for Outcome {
    fn from(steps: Steps) -> Self {
        Outcome::suspend(steps)
    }
}

impl IntoOutcome for Steps {
    #[inline]
    fn into_outcome(self) -> HandlerResult {
        Ok(self.into())
    }
}

impl fmt::Debug for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Steps")
            .field("remaining", &self.pending.len())
            .finish()
    }
}

//! Callable handlers and their typed adapters.
//!
//! Any `Fn(&mut Response, A1, .., An) -> R` where every `Ai` is
//! [`DeserializeOwned`] and `R` is [`IntoOutcome`] can be registered.
//! The JSON request arguments are decoded one per parameter before the
//! function runs, so a call with the wrong argument count or shape never
//! reaches the handler body.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::outcome::{IntoOutcome, Outcome};
use crate::error::{BoxError, DomwireError};
use crate::response::Response;

/// How many arguments a handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many.
    Exact(usize),
    /// Any number.
    Any,
}

impl Arity {
    #[inline]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => n == count,
            Arity::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Any => f.write_str("any"),
        }
    }
}

/// Why a handler call did not produce an outcome.
#[derive(Debug)]
pub enum CallError {
    /// The arguments do not fit the handler signature. The body never ran.
    Arguments(String),
    /// The body ran and failed.
    Fault(BoxError),
}

impl From<CallError> for DomwireError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Arguments(reason) => DomwireError::InvalidArgument(reason),
            CallError::Fault(e) => DomwireError::Handler(e),
        }
    }
}

/// Result of calling a handler.
pub type CallResult = std::result::Result<Outcome, CallError>;

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Declared argument count.
    fn arity(&self) -> Arity;

    /// Call the handler with already-parsed JSON arguments.
    fn call(&self, response: &mut Response, args: Vec<Value>) -> CallResult;
}

/// Shared reference to a registered handler.
///
/// Cloning is cheap. Two clones of the same callback compare equal with
/// [`Callback::ptr_eq`].
#[derive(Clone)]
pub struct Callback(Arc<dyn Handler>);

impl Callback {
    /// Wrap a [`Handler`] implementation.
    pub fn new(handler: impl Handler) -> Self {
        Self(Arc::new(handler))
    }

    /// Build a callback from any supported function shape.
    pub fn from_fn<H, Args>(handler: H) -> Self
    where
        H: IntoCallback<Args>,
    {
        handler.into_callback()
    }

    /// Build a callback that takes the raw argument list, whatever its length.
    pub fn variadic<F, R>(handler: F) -> Self
    where
        F: Fn(&mut Response, Vec<Value>) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        Self::new(VariadicHandler { handler })
    }

    #[inline]
    pub fn arity(&self) -> Arity {
        self.0.arity()
    }

    /// Invoke the handler.
    #[inline]
    pub fn call(&self, response: &mut Response, args: Vec<Value>) -> CallResult {
        self.0.call(response, args)
    }

    /// Whether both point to the same handler.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}

/// Conversion into a [`Callback`].
///
/// `Args` is a marker that keeps the per-arity implementations apart.
pub trait IntoCallback<Args>: Send + Sync + Sized + 'static {
    fn into_callback(self) -> Callback;
}

impl IntoCallback<Callback> for Callback {
    #[inline]
    fn into_callback(self) -> Callback {
        self
    }
}

/// Wrapper that deserializes each argument before calling the function.
pub struct TypedHandler<F, Args> {
    handler: F,
    _phantom: PhantomData<fn() -> Args>,
}

impl<F, Args> TypedHandler<F, Args> {
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

fn decode_arg<T: DeserializeOwned>(position: usize, value: Value) -> Result<T, CallError> {
    serde_json::from_value(value)
        .map_err(|e| CallError::Arguments(format!("argument {position}: {e}")))
}

macro_rules! impl_typed_handler {
    ($count:literal; $($ty:ident),*) => {
        impl<F, R, $($ty,)*> Handler for TypedHandler<F, ($($ty,)*)>
        where
            F: Fn(&mut Response, $($ty,)*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($ty: DeserializeOwned + 'static,)*
        {
            fn arity(&self) -> Arity {
                Arity::Exact($count)
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(&self, response: &mut Response, args: Vec<Value>) -> CallResult {
                if args.len() != $count {
                    return Err(CallError::Arguments(format!(
                        "expected {} arguments, got {}",
                        $count,
                        args.len()
                    )));
                }

                let mut args = args.into_iter();
                let mut position = 0usize;
                $(
                    position += 1;
                    let $ty: $ty = decode_arg(position, args.next().unwrap_or_default())?;
                )*

                (self.handler)(response, $($ty,)*)
                    .into_outcome()
                    .map_err(CallError::Fault)
            }
        }

        impl<F, R, $($ty,)*> IntoCallback<($($ty,)*)> for F
        where
            F: Fn(&mut Response, $($ty,)*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($ty: DeserializeOwned + 'static,)*
        {
            fn into_callback(self) -> Callback {
                Callback::new(TypedHandler::<F, ($($ty,)*)>::new(self))
            }
        }
    };
}

impl_typed_handler!(0;);
impl_typed_handler!(1; A1);
impl_typed_handler!(2; A1, A2);
impl_typed_handler!(3; A1, A2, A3);
impl_typed_handler!(4; A1, A2, A3, A4);
impl_typed_handler!(5; A1, A2, A3, A4, A5);
impl_typed_handler!(6; A1, A2, A3, A4, A5, A6);

struct VariadicHandler<F> {
    handler: F,
}

impl<F, R> Handler for VariadicHandler<F>
where
    F: Fn(&mut Response, Vec<Value>) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn arity(&self) -> Arity {
        Arity::Any
    }

    fn call(&self, response: &mut Response, args: Vec<Value>) -> CallResult {
        (self.handler)(response, args)
            .into_outcome()
            .map_err(CallError::Fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_handler_decodes_arguments() {
        let callback = Callback::from_fn(|r: &mut Response, name: String, times: u32| {
            r.alert(name.repeat(times as usize));
        });
        let mut response = Response::new();

        assert_eq!(callback.arity(), Arity::Exact(2));
        let outcome = callback
            .call(&mut response, vec![json!("ab"), json!(2)])
            .unwrap();

        assert!(!outcome.is_suspended());
        assert_eq!(
            response.to_json().unwrap(),
            r#"[{"type":"alert","alert":"abab"}]"#
        );
    }

    #[test]
    fn test_wrong_count_is_argument_error() {
        let callback = Callback::from_fn(|_: &mut Response, _a: i64| {});
        let mut response = Response::new();

        let err = callback.call(&mut response, vec![]).unwrap_err();
        assert!(matches!(err, CallError::Arguments(_)));

        let err = callback
            .call(&mut response, vec![json!(1), json!(2)])
            .unwrap_err();
        assert!(matches!(err, CallError::Arguments(_)));
    }

    #[test]
    fn test_wrong_shape_is_argument_error() {
        let callback = Callback::from_fn(|_: &mut Response, _n: u8| {});
        let mut response = Response::new();

        let err = callback
            .call(&mut response, vec![json!("not a number")])
            .unwrap_err();
        match err {
            CallError::Arguments(reason) => assert!(reason.starts_with("argument 1")),
            other => panic!("expected argument error, got {other:?}"),
        }
    }

    #[test]
    fn test_body_error_is_fault() {
        fn failing(_: &mut Response) -> Result<(), std::io::Error> {
            Err(std::io::Error::other("boom"))
        }

        let callback = Callback::from_fn(failing);
        let err = callback.call(&mut Response::new(), vec![]).unwrap_err();
        match err {
            CallError::Fault(e) => assert_eq!(e.to_string(), "boom"),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_variadic_accepts_any_count() {
        let callback = Callback::variadic(|r: &mut Response, args: Vec<Value>| {
            r.alert(args.len().to_string());
        });
        let mut response = Response::new();

        assert_eq!(callback.arity(), Arity::Any);
        callback.call(&mut response, vec![]).unwrap();
        callback
            .call(&mut response, vec![json!(1), json!(2), json!(3)])
            .unwrap();
        assert_eq!(response.commands().len(), 2);
    }

    #[test]
    fn test_ptr_eq_tracks_identity() {
        let a = Callback::from_fn(|_: &mut Response| {});
        let b = Callback::from_fn(|_: &mut Response| {});
        let a2 = a.clone();

        assert!(a.ptr_eq(&a2));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(1));
        assert!(Arity::Any.accepts(0));
        assert!(Arity::Any.accepts(9));
    }
}

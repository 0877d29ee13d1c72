//! Control module - the fixed client contract.
//!
//! The client library finds the function name and the JSON argument list
//! under two reserved request keys, and is configured by a small bootstrap
//! script emitted into the page.
//!
//! # Example
//!
//! ```
//! use domwire::control::{build_bootstrap_script, PARAM_ARGS, PARAM_REQUEST};
//!
//! assert_eq!(PARAM_REQUEST, "sijax_rq");
//! assert_eq!(PARAM_ARGS, "sijax_args");
//!
//! let js = build_bootstrap_script("/ajax", None).unwrap();
//! assert_eq!(js, r#"Sijax.setRequestUri("/ajax");"#);
//! ```

mod bootstrap;

pub use bootstrap::{build_bootstrap_script, build_upload_registration};

/// Request key holding the name of the called function.
pub const PARAM_REQUEST: &str = "sijax_rq";

/// Request key holding the JSON-encoded argument list.
pub const PARAM_ARGS: &str = "sijax_args";

/// Global object of the client library.
pub const CLIENT_NAMESPACE: &str = "Sijax";

/// Global object of the client upload plugin.
pub const UPLOAD_NAMESPACE: &str = "sjxUpload";

//! Command module - typed UI mutation instructions.
//!
//! Every handler side effect becomes one [`Command`] pushed into a
//! [`CommandBuffer`]. The client replays the buffer in order.
//!
//! # Wire format
//!
//! Commands serialize as flat JSON objects tagged by `type`:
//!
//! ```
//! use domwire::command::{Command, SetType};
//!
//! let cmd = Command::Html {
//!     selector: "#box".to_string(),
//!     html: "<b>hi</b>".to_string(),
//!     set_type: SetType::Append,
//! };
//! let json = serde_json::to_string(&cmd).unwrap();
//! assert_eq!(
//!     json,
//!     r##"{"type":"html","selector":"#box","html":"<b>hi</b>","setType":"append"}"##
//! );
//! ```

mod buffer;

pub use buffer::CommandBuffer;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a value is combined with what is already on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetType {
    /// Overwrite the current value.
    Replace,
    /// Add after the current value.
    Append,
    /// Add before the current value.
    Prepend,
}

/// A single client-side mutation instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    /// Show a message box.
    Alert { alert: String },

    /// Change the inner html of every element matching `selector`.
    Html {
        selector: String,
        html: String,
        #[serde(rename = "setType")]
        set_type: SetType,
    },

    /// Evaluate code inside the client's helper scope.
    Script { script: String },

    /// Change an attribute of every element matching `selector`.
    Attr {
        selector: String,
        key: String,
        value: Value,
        #[serde(rename = "setType")]
        set_type: SetType,
    },

    /// Change a single style property.
    Css {
        selector: String,
        key: String,
        value: Value,
    },

    /// Remove every element matching the selector.
    Remove { remove: String },

    /// Call a named client function with positional params.
    Call { call: String, params: Vec<Value> },
}

impl Command {
    /// The `type` tag this command is sent with.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Command::Alert { .. } => "alert",
            Command::Html { .. } => "html",
            Command::Script { .. } => "script",
            Command::Attr { .. } => "attr",
            Command::Css { .. } => "css",
            Command::Remove { .. } => "remove",
            Command::Call { .. } => "call",
        }
    }
}

//! Plugins - registration helpers for the streamed handler variants.
//!
//! - [`comet`]: handlers streaming partial batches over a long-lived
//!   connection
//! - [`upload`]: handlers receiving a submitted form through a hidden frame

pub mod comet;
pub mod upload;

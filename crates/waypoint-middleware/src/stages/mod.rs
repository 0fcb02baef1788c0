//! Built-in middleware.
//!
//! - [`xhr`] - Rejects requests that were not sent by `XMLHttpRequest`

pub mod xhr;

pub use xhr::XhrMiddleware;

//! Stateless decorators: request shaping, response validation, and body handling.
//!
//! Each constructor wraps a [`SharedClient`](crate::client::SharedClient) and returns a new
//! one. A `None` client is replaced by the default transport. Except for [`set_request`],
//! every decorator fails with [`Error::InvalidArgument`](crate::error::Error::InvalidArgument)
//! when handed no request.

pub mod body;
pub mod header;
pub mod request;
pub mod validate;

pub use body::*;
pub use header::*;
pub use request::*;
pub use validate::*;

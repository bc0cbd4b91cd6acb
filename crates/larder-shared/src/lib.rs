//! # Larder Shared
//!
//! Wire types shared between the API server and the client.
//! Everything here serializes with camelCase field names.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse, ResponseStatus};

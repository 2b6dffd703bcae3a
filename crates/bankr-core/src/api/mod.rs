//! Backend API: HTTP client adapter, wire types and typed operations.

pub mod accounts;
pub mod auth;
pub mod errors;
pub mod http;
pub mod types;

pub use errors::{ApiError, ApiErrorKind};
pub use http::{ApiRequest, HttpClient, UnauthorizedHandler};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body limit, timeout, request ID, trace)
//!     → middleware/admission.rs (client key → AdmissionGate)
//!     → handlers.rs (form.rs → uploads validator → backend)
//!     → response.rs (status mapping, Retry-After, attachment headers)
//!     → Send to client
//! ```

pub mod form;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{client_key, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};

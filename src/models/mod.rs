//! Request and response data models

/// Analysis request bodies.
pub mod request;

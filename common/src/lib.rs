//! Common code shared between the `fashion_server` library and its binaries.
pub mod labels;
pub mod protocol;

/// Error type.
pub type Error = Box<dyn std::error::Error>;

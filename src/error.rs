//! Error types for Slashforge
//!
//! This module defines all error types used throughout the Slashforge
//! framework. Uses `thiserror` for ergonomic error handling with automatic
//! `Display` and `Error` trait implementations.

use thiserror::Error;

/// The primary error type for Slashforge operations.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Configuration-related errors (illegal dist directory, missing
    /// credentials, etc.). Raised before any filesystem mutation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A compilation pass failed. Carries the full diagnostic output.
    #[error("Build error: {0}")]
    Build(String),

    /// A compiled command module is missing, malformed, or declares the
    /// wrong structural role for the position it was loaded at.
    #[error("Module error: {0}")]
    Module(String),

    /// An inbound interaction could not be routed to a handler chain.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Non-success response from the Discord REST API. Carries the HTTP
    /// status and response body.
    #[error("Discord API error: {0}")]
    RemoteApi(String),

    /// A second reply/defer on one interaction. Raised synchronously,
    /// before any network call is issued.
    #[error("Already replied to this interaction")]
    AlreadyReplied,

    /// Reply-dependent operation (edit/delete) before any reply was sent.
    #[error("Not replied to this interaction yet")]
    NotReplied,

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for Slashforge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

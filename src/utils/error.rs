// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Page interaction failed: {0}")]
    Interaction(String),

    #[error("Page snapshot unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Document already exists")]
    Conflict, // The store's explicit duplicate response

    #[error("Remote store configuration invalid: {0}")]
    Config(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Extraction already running")]
    AlreadyRunning,

    #[error("Not on a valid extraction page: {0}")]
    Precondition(String),

    #[error("Host interaction failed: {0}")]
    Host(#[from] HostError),

    #[error("Local storage failed: {0}")]
    Storage(#[from] StorageError),
}

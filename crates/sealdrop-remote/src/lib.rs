//! # Sealdrop Remote
//!
//! The seam between the client and the transfer service that stores and
//! relays envelopes.
//!
//! ## Key Types
//!
//! - [`TransferService`] - async trait for upload, download, remote decrypt, and metadata
//! - [`HttpTransferService`] - reqwest client for a real server
//! - [`MemoryTransferService`] - in-process service for tests
//! - [`RemoteConfig`] - base URL and timeout, with environment overrides

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod service;

pub use config::RemoteConfig;
pub use error::{RemoteError, Result};
pub use http::HttpTransferService;
pub use memory::MemoryTransferService;
pub use service::{AccessToken, TransferService, UploadReceipt, UploadRequest};

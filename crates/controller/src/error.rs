//! Recoverable fault types.
//!
//! Every fault in a boot cycle is one of these, and every one of them is
//! handled by assuming absence and carrying on. The only thing that escapes
//! a cycle is an `anyhow::Error`, which the controller catches so the device
//! still reboots.

/// The retained buffer held bytes that are not a valid record.
#[derive(Debug, thiserror::Error)]
#[error("retained record is corrupt: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// The retained buffer could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("retained memory I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode retained record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The remote schedule could not be used.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("schedule request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("schedule response could not be decoded: {0}")]
    Decode(String),

    #[error("schedule field{slot} is {reason}")]
    InvalidField { slot: u8, reason: &'static str },
}

/// A network exchange failed. Treated as "offline" or "skipped".
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
}

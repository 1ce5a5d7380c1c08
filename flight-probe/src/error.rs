use std::fmt;
use std::path::PathBuf;

use arrow_flight::error::FlightError;
use thiserror::Error;

/// Failure of one pipeline phase. Every variant is fatal for the run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid endpoint address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("could not connect to {endpoint}: {}", error_chain(.source))]
    Connection {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("request rejected: {0}")]
    Request(#[source] FlightError),
    #[error("failed to encode request descriptor: {0}")]
    RequestEncoding(#[from] serde_json::Error),
    #[error("error reading result stream: {0}")]
    StreamRead(#[source] FlightError),
    #[error("failed to export result to {}: {reason}", .path.display())]
    Export { path: PathBuf, reason: String },
}

/// Phase names used in the one-line diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAddress,
    ConnectionError,
    RequestError,
    StreamReadError,
    ExportError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidAddress => "InvalidAddress",
            ErrorKind::ConnectionError => "ConnectionError",
            ErrorKind::RequestError => "RequestError",
            ErrorKind::StreamReadError => "StreamReadError",
            ErrorKind::ExportError => "ExportError",
        };
        f.write_str(name)
    }
}

impl ProbeError {
    pub(crate) fn invalid_address(address: &str, reason: impl Into<String>) -> Self {
        ProbeError::InvalidAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// The phase that failed, used as the `[Kind]` tag on stderr.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            ProbeError::Connection { .. } => ErrorKind::ConnectionError,
            ProbeError::Request(_) | ProbeError::RequestEncoding(_) => ErrorKind::RequestError,
            ProbeError::StreamRead(_) => ErrorKind::StreamReadError,
            ProbeError::Export { .. } => ErrorKind::ExportError,
        }
    }
}

// Transport errors keep the useful part (refused, dns, tls) in their sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

pub type Result<T, E = ProbeError> = std::result::Result<T, E>;

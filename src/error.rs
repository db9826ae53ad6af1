// =============================================================================
// Error taxonomy — typed failures for the upstream client and cache stores
// =============================================================================
//
// Failures stay typed inside the crate so callers can tell "no data" from
// "fetch failed" from "store broken". They are collapsed to `None` only at the
// boundary the dashboard consumes (see `MarketSource::fetch_one`).
// =============================================================================

use thiserror::Error;

/// Why a single-ZIP market fetch did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network error before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not valid JSON or did not match the market shape.
    #[error("invalid JSON response: {0}")]
    Parse(String),

    /// Valid response with zero items.
    #[error("no market data for zip {0}")]
    NoData(String),
}

impl FetchError {
    /// `true` for an empty-but-valid response, `false` for real failures.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Failure of a key-value store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("failed to serialise cache entry: {0}")]
    Serialize(String),

    #[error("storage quota exceeded ({limit} entries)")]
    QuotaExceeded { limit: usize },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_is_distinguished_from_failures() {
        assert!(FetchError::NoData("32789".into()).is_no_data());
        assert!(!FetchError::Transport("refused".into()).is_no_data());
        assert!(!FetchError::Status { status: 500, body: String::new() }.is_no_data());
    }

    #[test]
    fn status_error_message_includes_code() {
        let err = FetchError::Status { status: 429, body: "slow down".into() };
        assert_eq!(err.to_string(), "upstream returned HTTP 429: slow down");
    }

    #[test]
    fn serde_errors_map_to_parse() {
        let err: FetchError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}

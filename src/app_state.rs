// =============================================================================
// Central Application State — shared by every API handler
// =============================================================================
//
// Holds the loaded configuration, the market cache (which owns the upstream
// client), the shared dashboard passphrase and a bounded log of recent fetch
// failures for the dashboard's diagnostics view.
// =============================================================================

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::cache::MarketCache;
use crate::error::FetchError;
use crate::runtime_config::DashboardConfig;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded fetch failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub zip: String,
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

pub struct AppState {
    pub config: DashboardConfig,
    pub markets: MarketCache,
    passphrase: Option<String>,
    recent_errors: RwLock<Vec<ErrorRecord>>,
    /// Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: DashboardConfig, markets: MarketCache, passphrase: Option<String>) -> Self {
        Self {
            config,
            markets,
            passphrase: passphrase.filter(|p| !p.is_empty()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// The shared passphrase, if one is configured.
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    /// Remember a failed fetch. Empty results are not failures and are skipped.
    pub fn record_error(&self, zip: &str, err: &FetchError) {
        if err.is_no_data() {
            return;
        }

        let mut errors = self.recent_errors.write();
        errors.push(ErrorRecord {
            zip: zip.to_string(),
            message: err.to_string(),
            at: Utc::now().to_rfc3339(),
        });
        if errors.len() > MAX_RECENT_ERRORS {
            let overflow = errors.len() - MAX_RECENT_ERRORS;
            errors.drain(..overflow);
        }
    }

    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cache::MemoryStore;
    use crate::market::source::testing::StubSource;

    fn state() -> AppState {
        let cache = MarketCache::new(Arc::new(MemoryStore::new()), Arc::new(StubSource::new()));
        AppState::new(DashboardConfig::default(), cache, Some(String::new()))
    }

    #[test]
    fn empty_passphrase_counts_as_unset() {
        assert!(state().passphrase().is_none());
    }

    #[test]
    fn error_log_is_bounded_and_skips_no_data() {
        let state = state();
        state.record_error("00000", &FetchError::NoData("00000".into()));
        assert!(state.recent_errors().is_empty());

        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.record_error(&format!("{i:05}"), &FetchError::Transport("timeout".into()));
        }
        let errors = state.recent_errors();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].zip, "00005");
        assert_eq!(errors.last().unwrap().message, "transport error: timeout");
    }
}

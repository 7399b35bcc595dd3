//! Per-operation log lines.

use std::fmt::Display;
use std::time::Instant;

use crate::error::Result;
use crate::path::Path;

/// Tracing target for operation log lines.
pub const OPS_TARGET: &str = "shelf::ops";

/// Times one [`Db`](crate::Db) operation and logs its outcome.
///
/// A disabled log records nothing and never builds its data summary.
pub(crate) struct OpLog {
    enabled: bool,
    method: &'static str,
    path: String,
    key: String,
    data: String,
    start: Instant,
}

impl OpLog {
    pub(crate) fn start(enabled: bool, method: &'static str, path: &Path, key: &str) -> Self {
        let (path, key) = if enabled {
            (path.to_string(), key.to_string())
        } else {
            (String::new(), String::new())
        };
        Self {
            enabled,
            method,
            path,
            key,
            data: String::new(),
            start: Instant::now(),
        }
    }

    /// Attach a summary of the operation's input.
    #[must_use]
    pub(crate) fn data(mut self, summary: impl FnOnce() -> String) -> Self {
        if self.enabled {
            self.data = summary();
        }
        self
    }

    /// Log the outcome and hand it back unchanged.
    pub(crate) fn finish<T>(self, result: Result<T>) -> Result<T> {
        if !self.enabled {
            return result;
        }

        let elapsed = self.start.elapsed().as_secs_f64();
        match &result {
            Ok(_) => tracing::info!(
                target: OPS_TARGET,
                method = self.method,
                path = %self.path,
                key = %self.key,
                elapsed,
                "[{elapsed:.3}s] {} {}:{} {}",
                self.method,
                self.path,
                self.key,
                self.data
            ),
            Err(e) => tracing::warn!(
                target: OPS_TARGET,
                method = self.method,
                path = %self.path,
                key = %self.key,
                elapsed,
                error = %e,
                "[{elapsed:.3}s] {} {}:{} {} error: {e}",
                self.method,
                self.path,
                self.key,
                self.data
            ),
        }
        result
    }
}

/// Comma-joined list, for key summaries.
pub(crate) fn joined<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::path;

    #[test]
    fn disabled_log_skips_summary() {
        let log = OpLog::start(false, "SAVE", &path!("a"), "1")
            .data(|| panic!("summary built while disabled"));
        assert!(log.finish(Ok(())).is_ok());
    }

    #[test]
    fn outcome_passes_through() {
        let log = OpLog::start(true, "FIND", &path!("a/b"), "7").data(|| "x".into());
        assert_eq!(log.path, "a/b");
        assert_eq!(log.data, "x");
        let err = log.finish::<()>(Err(Error::NotOpen)).unwrap_err();
        assert!(matches!(err, Error::NotOpen));
    }

    #[test]
    fn joined_keys() {
        assert_eq!(joined(["1", "2", "3"]), "1,2,3");
        assert_eq!(joined(Vec::<String>::new()), "");
    }
}

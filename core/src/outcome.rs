//! The uniform result type returned by every client operation.
//!
//! # Design
//! `Outcome` is a tagged variant rather than a `Result` because a successful
//! call may legitimately carry no data (204, empty 200) and because an
//! external cache needs to stamp `cached` onto the same shape. Callers that
//! prefer `?` can convert with `into_result`.

use crate::error::ServiceError;

/// Result of one client operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success { data: Option<T>, cached: bool },
    Failure { error: ServiceError },
}

impl<T> Outcome<T> {
    /// A fresh (uncached) success carrying `data`.
    pub fn success(data: Option<T>) -> Self {
        Outcome::Success {
            data,
            cached: false,
        }
    }

    pub fn failure(error: ServiceError) -> Self {
        Outcome::Failure { error }
    }

    /// Stamp a success as served from an external cache. Failures pass
    /// through unchanged.
    pub fn mark_cached(self) -> Self {
        match self {
            Outcome::Success { data, .. } => Outcome::Success { data, cached: true },
            failure => failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Outcome::Success { cached: true, .. })
    }

    /// The payload of a success, or `None` for failures and empty successes.
    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success { data, .. } => data.as_ref(),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ServiceError> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error } => Some(error),
        }
    }

    /// Human-readable failure message, as shown to end users.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success { data, cached } => Outcome::Success {
                data: data.map(f),
                cached,
            },
            Outcome::Failure { error } => Outcome::Failure { error },
        }
    }

    pub fn into_result(self) -> Result<Option<T>, ServiceError> {
        match self {
            Outcome::Success { data, .. } => Ok(data),
            Outcome::Failure { error } => Err(error),
        }
    }
}

impl<T> From<ServiceError> for Outcome<T> {
    fn from(error: ServiceError) -> Self {
        Outcome::failure(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_success_is_not_cached() {
        let outcome = Outcome::success(Some(1));
        assert!(outcome.is_success());
        assert!(!outcome.is_cached());
        assert_eq!(outcome.data(), Some(&1));
    }

    #[test]
    fn mark_cached_stamps_success_only() {
        assert!(Outcome::success(Some("x")).mark_cached().is_cached());

        let failure: Outcome<()> = Outcome::failure(ServiceError::Timeout).mark_cached();
        assert!(!failure.is_cached());
        assert_eq!(failure.error_message().as_deref(), Some("Request timeout"));
    }

    #[test]
    fn map_preserves_cached_flag() {
        let mapped = Outcome::success(Some(2)).mark_cached().map(|n| n * 10);
        assert_eq!(
            mapped,
            Outcome::Success {
                data: Some(20),
                cached: true
            }
        );
    }

    #[test]
    fn into_result_splits_variants() {
        assert_eq!(Outcome::<u8>::success(None).into_result(), Ok(None));
        assert_eq!(
            Outcome::<u8>::failure(ServiceError::NotFound).into_result(),
            Err(ServiceError::NotFound)
        );
    }
}

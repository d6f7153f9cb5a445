// SPDX-License-Identifier: Apache-2.0

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RaffleErrorKind {
    Configuration,
    Authentication,
    UpstreamFetch,
    Storage,
}

impl RaffleErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::UpstreamFetch => "upstream_fetch",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for RaffleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a raffle operation.
///
/// An empty ticket pool is not represented here: it is a valid draw outcome
/// (see [`crate::DrawOutcome::NoQualifyingTickets`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleError {
    kind: RaffleErrorKind,
    message: String,
}

impl RaffleError {
    #[must_use]
    pub fn new(kind: RaffleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(RaffleErrorKind::Configuration, message)
    }

    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(RaffleErrorKind::Authentication, message)
    }

    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(RaffleErrorKind::UpstreamFetch, message)
    }

    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(RaffleErrorKind::Storage, message)
    }

    #[must_use]
    pub const fn kind(&self) -> RaffleErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RaffleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RaffleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_kind() {
        let err = RaffleError::upstream("status=502");
        assert_eq!(err.kind(), RaffleErrorKind::UpstreamFetch);
        assert_eq!(err.to_string(), "upstream_fetch: status=502");
    }
}

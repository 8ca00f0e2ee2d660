//! Private-seller classification

use crate::state::ListingCandidate;
use std::fmt;

/// Why a candidate was not recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No private-sale keyword anywhere on the page
    NotPrivate,
    /// Price missing or zero
    NoPrice,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPrivate => f.write_str("no private-sale keyword"),
            Self::NoPrice => f.write_str("no price"),
        }
    }
}

/// Outcome of classifying one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Decides whether a candidate is a priced private-sale offer
///
/// The page text is expected in lower case; keywords are compared
/// case-insensitively as plain substrings.
pub fn classify<S: AsRef<str>>(candidate: &ListingCandidate, keywords: &[S]) -> Verdict {
    let is_private = keywords
        .iter()
        .map(|k| k.as_ref().to_lowercase())
        .any(|k| !k.is_empty() && candidate.page_text.contains(&k));

    if !is_private {
        return Verdict::Reject(RejectReason::NotPrivate);
    }
    if candidate.price == 0 {
        return Verdict::Reject(RejectReason::NoPrice);
    }

    Verdict::Accept
}

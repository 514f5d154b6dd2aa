//! Recovery strategies
//!
//! In resilient mode the driver repositions the cursor after a reported error so
//! parsing can continue. A strategy that makes no progress is followed by a
//! forced single-token skip in the driver.

use crate::peg::token::Token;
use serde::{Deserialize, Serialize};

/// Upper bound on tokens a single recovery may scan.
pub const MAX_RECOVERY_SCAN: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "tokens", rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Skip exactly one token
    #[default]
    SkipOne,
    /// Skip until a token of one of these kinds, leaving it unconsumed
    SkipUntil(Vec<String>),
    /// Skip until a token of one of these kinds and consume it too
    SkipPast(Vec<String>),
}

impl RecoveryStrategy {
    /// New cursor position after recovering from a failure at `from`.
    ///
    /// Never moves past `tokens.len()`.
    pub fn recover(&self, tokens: &[Token], from: usize) -> usize {
        match self {
            RecoveryStrategy::SkipOne => (from + 1).min(tokens.len()),
            RecoveryStrategy::SkipUntil(kinds) => scan_to(tokens, from, kinds).0,
            RecoveryStrategy::SkipPast(kinds) => match scan_to(tokens, from, kinds) {
                (found, true) => found + 1,
                (stopped, false) => stopped,
            },
        }
    }
}

/// Position of the first token at or after `from` whose kind is in `kinds`,
/// and whether one was found.
///
/// Gives up after [MAX_RECOVERY_SCAN] tokens and reports where the scan stopped.
fn scan_to(tokens: &[Token], from: usize, kinds: &[String]) -> (usize, bool) {
    let limit = from.saturating_add(MAX_RECOVERY_SCAN).min(tokens.len());
    let start = from.min(limit);
    tokens[start..limit]
        .iter()
        .position(|tok| kinds.iter().any(|k| tok.is(k)))
        .map(|offset| (start + offset, true))
        .unwrap_or((limit, false))
}

pub fn skip_until<S: Into<String>>(kinds: impl IntoIterator<Item = S>) -> RecoveryStrategy {
    RecoveryStrategy::SkipUntil(kinds.into_iter().map(Into::into).collect())
}

pub fn skip_past<S: Into<String>>(kinds: impl IntoIterator<Item = S>) -> RecoveryStrategy {
    RecoveryStrategy::SkipPast(kinds.into_iter().map(Into::into).collect())
}

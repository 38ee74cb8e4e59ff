//! Execution order of implementations within a chain.
//!
//! The chain is walked from the highest [`ExecutionOrder`] to the lowest.
//! Within one tier the most recently registered implementation goes first, so
//! registering a new implementation overrides an older one of the same tier.
//! The default implementation is always walked last, whatever its tier.

use std::cmp::Ordering;
use std::fmt;

/// Declared priority tier of an implementation.
///
/// Variants are listed from lowest to highest precedence, so the derived
/// ordering makes `First` the greatest value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExecutionOrder {
    /// Tried after every other tier.
    Last,
    /// Tried after `Late`.
    Later,
    /// Tried after `Soon`.
    Late,
    /// The middle tier, used when nothing else is declared.
    #[default]
    Soon,
    /// Tried before `Soon`.
    Sooner,
    /// Tried before every other tier.
    First,
}

impl ExecutionOrder {
    /// All tiers, highest precedence first.
    pub const ALL: [Self; 6] = [
        Self::First,
        Self::Sooner,
        Self::Soon,
        Self::Late,
        Self::Later,
        Self::Last,
    ];

    /// Returns the tier name as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Later => "later",
            Self::Late => "late",
            Self::Soon => "soon",
            Self::Sooner => "sooner",
            Self::First => "first",
        }
    }
}

impl fmt::Display for ExecutionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The attributes of a slot that decide its place in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPosition {
    /// Whether the slot is the repository's default.
    pub is_default: bool,
    /// Declared tier.
    pub order: ExecutionOrder,
    /// Registration sequence number within the repository, starting at zero.
    pub sequence: u64,
}

/// Compares two chain positions; `Less` means "walked earlier".
///
/// Positions are totally ordered as long as sequence numbers are unique.
pub fn chain_order(a: &ChainPosition, b: &ChainPosition) -> Ordering {
    a.is_default
        .cmp(&b.is_default)
        .then_with(|| b.order.cmp(&a.order))
        .then_with(|| b.sequence.cmp(&a.sequence))
}

/// Sorts `items` into walk order using the position extracted by `position`.
pub fn sort_chain<T>(items: &mut [T], position: impl Fn(&T) -> ChainPosition) {
    items.sort_by(|a, b| chain_order(&position(a), &position(b)));
}

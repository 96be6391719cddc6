//! Error type for solver failures.
//!
//! Only configuration problems are errors. An instance without a Steiner
//! tree is a regular result ([`crate::solver::Outcome::NoSolution`]), and
//! broken internal invariants are panics.

use crate::types::BagId;

/// Error type for solver operations.
#[derive(Debug)]
pub enum SteinerError {
    /// A bag holds more vertices than colors are available (width > 31).
    WidthTooLarge { width: usize },
    /// The instance has no terminal vertices.
    NoTerminals,
    /// A canonical bag with more than two children reached the evaluator.
    TooManyChildren { bag: BagId, children: usize },
    /// The tree decomposition is not valid for the graph.
    MalformedDecomposition(String),
    /// The terminal DP was requested for too many terminals.
    TooManyTerminals { terminals: usize, limit: usize },
    /// The tree-decomposition DP was requested but no decomposition was given.
    MissingDecomposition,
}

impl std::fmt::Display for SteinerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SteinerError::WidthTooLarge { width } => {
                write!(f, "Width {} is too large, only widths up to 31 (bag size 32) are supported", width)
            }
            SteinerError::NoTerminals => write!(f, "There should be at least one terminal"),
            SteinerError::TooManyChildren { bag, children } => {
                write!(f, "Bag {} has {} children, the decomposition is not binary", bag, children)
            }
            SteinerError::MalformedDecomposition(msg) => write!(f, "Malformed tree decomposition: {}", msg),
            SteinerError::TooManyTerminals { terminals, limit } => {
                write!(f, "Terminal DP supports at most {} terminals, got {}", limit, terminals)
            }
            SteinerError::MissingDecomposition => write!(f, "The instance has no tree decomposition"),
        }
    }
}

impl std::error::Error for SteinerError {}

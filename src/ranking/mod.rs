//! Offline ranking of history records against an analyzed query.
//!
//! `keyword` scores records against extracted concepts and literal query
//! words; `domain` contributes platform-inclusion rules and host-level
//! bonuses. Together they form the sole gate before any network stage runs.

pub mod domain;
pub mod keyword;

pub use domain::DomainVerdict;
pub use keyword::{filter_and_rank, query_words, ScoredRecord};

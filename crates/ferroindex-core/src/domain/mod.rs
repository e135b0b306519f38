//! # Domain Models
//!
//! Value types shared by every construction stage.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Candidate`] | Security eligible for, or member of, an index |
//! | [`CandidateRecord`] | Unvalidated candidate row from a data snapshot |
//! | [`Factor`] | Numeric candidate attribute used for ranking and weighting |
//! | [`Ticker`] | Validated, normalized security identifier |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates invariants; engines never see an invalid candidate.

mod candidate;
mod factor;
mod ticker;
mod timestamp;

pub use candidate::{Candidate, CandidateRecord};
pub use factor::Factor;
pub use ticker::Ticker;
pub use timestamp::{format_date, parse_date, UtcDateTime};

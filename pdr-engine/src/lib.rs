#![forbid(unsafe_code)]

pub mod certify;
pub mod driver;
pub mod error;
pub mod frames;
pub mod generalize;
pub mod obligation;
pub mod options;
pub mod propagate;
pub mod stats;
pub mod verdict;

pub use certify::{check_invariant, check_trace, is_valid, Validity};
pub use driver::{verify, verify_with, verify_with_stats, Pdr, Phase};
#[cfg(feature = "z3")]
pub use driver::verify_z3;
pub use error::PdrError;
pub use options::{DropOrder, PdrOptions, PdrProfile, TieBreak};
pub use stats::Stats;
pub use verdict::{Invariant, Trace, UnknownReason, Verdict};

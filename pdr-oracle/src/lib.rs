#![forbid(unsafe_code)]

pub mod sat_oracle;
pub mod solver;

pub use sat_oracle::SatOracle;
pub use solver::{ActLit, Assumption, Core, Model, Oracle, OracleBudget, OracleError, SatResult};

#[cfg(feature = "z3")]
pub use solver::z3_oracle::Z3Oracle;

#![forbid(unsafe_code)]

pub mod expr;
pub mod lit;
pub mod system;

pub use expr::{Expr, Symbol};
pub use lit::{Clause, Cube, Lit, State, Var};
pub use system::{cur, next, SystemBuilder, SystemError, TransitionSystem, Vocabulary};

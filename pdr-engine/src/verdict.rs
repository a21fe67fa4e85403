#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use pdr_logic::{Clause, Expr, State, TransitionSystem};

/// Inductive invariant `property & lemmas`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub lemmas: Vec<Clause>,
    pub property: Expr,
    /// Frame index at which the fixpoint was found.
    pub level: usize,
}

impl Invariant {
    pub fn formula(&self) -> Expr {
        let mut parts = vec![self.property.clone()];
        parts.extend(self.lemmas.iter().map(Expr::from));
        Expr::And(parts)
    }

    pub fn holds(&self, system: &TransitionSystem, state: &State) -> bool {
        system.holds_prop(state) && self.lemmas.iter().all(|c| c.satisfied_by(state))
    }
}

/// Concrete path from an initial state to a property violation.
///
/// `inputs[i]` drives the step from `states[i]` to `states[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub states: Vec<State>,
    pub inputs: Vec<Vec<bool>>,
}

impl Trace {
    /// Number of transitions.
    pub fn depth(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn first(&self) -> Option<&State> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownReason {
    Oracle(String),
    ObligationDepthExceeded { depth: usize, limit: usize },
    FrameLimit { limit: usize },
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::Oracle(why) => write!(f, "oracle returned unknown ({why})"),
            UnknownReason::ObligationDepthExceeded { depth, limit } => {
                write!(f, "obligation depth {depth} exceeded bound {limit}")
            }
            UnknownReason::FrameLimit { limit } => write!(f, "frame limit {limit} reached"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Safe(Invariant),
    Unsafe(Trace),
    Unknown(UnknownReason),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe(_))
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, Verdict::Unsafe(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Safe(_) => "safe",
            Verdict::Unsafe(_) => "unsafe",
            Verdict::Unknown(_) => "unknown",
        }
    }
}

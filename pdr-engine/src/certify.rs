#![forbid(unsafe_code)]

//! Independent re-checks of verdicts. Traces are checked by evaluation alone;
//! invariants with three elementary queries on a fresh oracle.

use pdr_logic::{Expr, TransitionSystem, Vocabulary};
use pdr_oracle::{Model, Oracle, SatOracle, SatResult};

use crate::error::PdrError;
use crate::verdict::{Invariant, Trace};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// An assignment falsifying the formula.
    Invalid(Model),
}

fn unsound_trace(message: String) -> PdrError {
    PdrError::Unsound {
        what: "counterexample",
        message,
    }
}

pub fn check_trace(system: &TransitionSystem, trace: &Trace) -> Result<(), PdrError> {
    let Some(first) = trace.first() else {
        return Err(unsound_trace("empty trace".to_string()));
    };
    if trace.inputs.len() + 1 != trace.states.len() {
        return Err(unsound_trace(format!(
            "{} states but {} input vectors",
            trace.states.len(),
            trace.inputs.len()
        )));
    }
    if let Some(bad) = trace.states.iter().find(|s| s.len() != system.num_states()) {
        return Err(unsound_trace(format!("state {bad} has the wrong width")));
    }
    if let Some(bad) = trace.inputs.iter().find(|i| i.len() != system.num_inputs()) {
        return Err(unsound_trace(format!("input vector of width {} (expected {})", bad.len(), system.num_inputs())));
    }

    if !system.holds_init(first) {
        return Err(unsound_trace(format!(
            "first state [{}] is not initial",
            system.render_state(first)
        )));
    }
    for (i, pair) in trace.states.windows(2).enumerate() {
        if !system.holds_trans(&pair[0], &trace.inputs[i], &pair[1]) {
            return Err(unsound_trace(format!(
                "step {i} [{}] -> [{}] is not a transition",
                system.render_state(&pair[0]),
                system.render_state(&pair[1])
            )));
        }
    }
    if let Some(last) = trace.last() {
        if system.holds_prop(last) {
            return Err(unsound_trace(format!(
                "last state [{}] satisfies the property",
                system.render_state(last)
            )));
        }
    }
    Ok(())
}

/// `Init ⊨ F`, `F & T ⊨ F'` and `F ⊨ P` for `F = property & lemmas`.
pub fn check_invariant(system: &TransitionSystem, invariant: &Invariant) -> Result<(), PdrError> {
    let vocab = system.vocabulary();
    let f = invariant.formula();

    let obligations = [
        ("initiation", vec![system.init.clone(), Expr::not(f.clone())]),
        (
            "consecution",
            vec![f.clone(), system.trans.clone(), Expr::not(f.prime())],
        ),
        ("safety", vec![f.clone(), Expr::not(system.prop.clone())]),
    ];
    for (name, parts) in obligations {
        if let Some(model) = satisfy(vocab, &parts)? {
            return Err(PdrError::Unsound {
                what: "invariant",
                message: format!(
                    "{name} fails at [{}]",
                    system.render_state(&model.current)
                ),
            });
        }
    }
    Ok(())
}

/// Whether `f` holds under every assignment of `vocab`.
pub fn is_valid(vocab: Vocabulary, f: &Expr) -> Result<Validity, PdrError> {
    Ok(match satisfy(vocab, &[Expr::not(f.clone())])? {
        Some(model) => Validity::Invalid(model),
        None => Validity::Valid,
    })
}

fn satisfy(vocab: Vocabulary, parts: &[Expr]) -> Result<Option<Model>, PdrError> {
    let mut oracle = SatOracle::new(vocab);
    for p in parts {
        oracle.assert_permanent(p)?;
    }
    match oracle.check_sat(&[])? {
        SatResult::Sat(model) => Ok(Some(model)),
        SatResult::Unsat(_) => Ok(None),
        SatResult::Unknown(why) => Err(PdrError::OracleUnknown(why)),
    }
}

#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pdr_logic::{Expr, Lit, State, Vocabulary};

#[derive(Debug, Error, Diagnostic)]
#[error("oracle error: {message}")]
#[diagnostic(
    code(pdr::oracle),
    help("the query mentioned something outside the declared variable universe, or the backend failed internally")
)]
pub struct OracleError {
    pub message: String,
}

impl OracleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Activation literal: guards a group of assertions so a query can switch them on by assumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActLit(u32);

impl ActLit {
    pub fn new(id: u32) -> Self {
        ActLit(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Assumption {
    /// A state literal, over current-state (`primed = false`) or next-state symbols.
    State { lit: Lit, primed: bool },
    Act(ActLit),
}

impl Assumption {
    pub fn cur(lit: Lit) -> Self {
        Assumption::State { lit, primed: false }
    }

    pub fn next(lit: Lit) -> Self {
        Assumption::State { lit, primed: true }
    }
}

/// Satisfying assignment, restricted to the declared vocabulary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    pub current: State,
    pub inputs: Vec<bool>,
    pub next: State,
}

/// Subset of the assumptions that already makes the query unsatisfiable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Core {
    pub assumptions: Vec<Assumption>,
}

impl Core {
    pub fn contains(&self, a: &Assumption) -> bool {
        self.assumptions.contains(a)
    }

    /// State literals of the core on the requested side of the transition.
    pub fn state_lits(&self, primed: bool) -> impl Iterator<Item = Lit> + '_ {
        self.assumptions.iter().filter_map(move |a| match a {
            Assumption::State { lit, primed: p } if *p == primed => Some(*lit),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SatResult {
    Sat(Model),
    Unsat(Core),
    /// Undecided, with the backend's reason.
    Unknown(String),
}

/// Per-query resource limits. Exhausting one yields [`SatResult::Unknown`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleBudget {
    /// CaDiCaL conflicts; Z3 reads it as its `rlimit` resource count.
    pub conflict_limit: Option<u64>,
    pub time_limit_ms: Option<u64>,
}

/// Z3 solver parameters carrying `budget`, with fixed seeds.
#[cfg(any(feature = "z3", test))]
pub(crate) fn z3_params(budget: OracleBudget) -> Vec<(&'static str, u32)> {
    let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
    let mut params = vec![("smt.random_seed", 0), ("sat.random_seed", 0)];
    if let Some(ms) = budget.time_limit_ms {
        params.push(("timeout", clamp(ms)));
    }
    if let Some(limit) = budget.conflict_limit {
        params.push(("rlimit", clamp(limit)));
    }
    params
}

/// Incremental satisfiability oracle over one transition system's vocabulary.
///
/// Assertions are never removed. Scoping uses activation literals: a group of
/// assertions is added as `act -> f` and only takes part in queries that assume
/// `act`; retiring `act` asserts `!act` for good.
pub trait Oracle {
    fn vocabulary(&self) -> Vocabulary;

    fn assert_permanent(&mut self, f: &Expr) -> Result<(), OracleError>;

    fn new_activation(&mut self) -> ActLit;

    fn assert_guarded(&mut self, act: ActLit, f: &Expr) -> Result<(), OracleError>;

    fn retire(&mut self, act: ActLit) -> Result<(), OracleError>;

    /// Decide the permanent assertions under `assumptions`.
    ///
    /// On `Unsat` the core lists a subset of `assumptions`.
    fn check_sat(&mut self, assumptions: &[Assumption]) -> Result<SatResult, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn vocabulary(&self) -> Vocabulary {
        (**self).vocabulary()
    }

    fn assert_permanent(&mut self, f: &Expr) -> Result<(), OracleError> {
        (**self).assert_permanent(f)
    }

    fn new_activation(&mut self) -> ActLit {
        (**self).new_activation()
    }

    fn assert_guarded(&mut self, act: ActLit, f: &Expr) -> Result<(), OracleError> {
        (**self).assert_guarded(act, f)
    }

    fn retire(&mut self, act: ActLit) -> Result<(), OracleError> {
        (**self).retire(act)
    }

    fn check_sat(&mut self, assumptions: &[Assumption]) -> Result<SatResult, OracleError> {
        (**self).check_sat(assumptions)
    }
}

pub(crate) fn check_vocabulary(vocab: Vocabulary, f: &Expr) -> Result<(), OracleError> {
    for sym in f.symbols() {
        if !vocab.contains(sym) {
            return Err(OracleError::new(format!(
                "symbol {sym} is outside the vocabulary ({} state vars, {} inputs)",
                vocab.states, vocab.inputs
            )));
        }
    }
    Ok(())
}

#[cfg(feature = "z3")]
pub mod z3_oracle {
    use std::collections::HashMap;

    use super::{
        check_vocabulary, z3_params, ActLit, Assumption, Core, Model, Oracle, OracleBudget,
        OracleError, SatResult,
    };
    use pdr_logic::{Expr, State, Symbol, Var, Vocabulary};

    use z3::{ast::Bool, Config, Context, Params, SatResult as Z3Result, Solver};

    /// Oracle backed by a single incremental Z3 solver.
    pub struct Z3Oracle {
        ctx: &'static Context,
        solver: Solver<'static>,
        vocab: Vocabulary,
        acts: Vec<Bool<'static>>,
    }

    impl Z3Oracle {
        pub fn new(vocab: Vocabulary, budget: OracleBudget) -> Self {
            let mut cfg = Config::new();
            cfg.set_model_generation(true);
            // Leaked so the solver can borrow it for 'static; one context per run.
            let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
            let solver = Solver::new(ctx);

            let mut params = Params::new(ctx);
            for (key, value) in z3_params(budget) {
                params.set_u32(key, value);
            }
            params.set_bool("unsat_core", true);
            solver.set_params(&params);

            Self {
                ctx,
                solver,
                vocab,
                acts: Vec::new(),
            }
        }

        fn sym(&self, sym: Symbol) -> Bool<'static> {
            let name = match sym {
                Symbol::Cur(v) => format!("s{}", v.0),
                Symbol::Next(v) => format!("n{}", v.0),
                Symbol::Input(i) => format!("i{i}"),
            };
            Bool::new_const(self.ctx, name)
        }

        fn encode(&self, e: &Expr) -> Bool<'static> {
            match e {
                Expr::Const(b) => Bool::from_bool(self.ctx, *b),
                Expr::Sym(s) => self.sym(*s),
                Expr::Not(a) => self.encode(a).not(),
                Expr::And(es) => {
                    let parts = es.iter().map(|e| self.encode(e)).collect::<Vec<_>>();
                    Bool::and(self.ctx, &parts.iter().collect::<Vec<_>>())
                }
                Expr::Or(es) => {
                    let parts = es.iter().map(|e| self.encode(e)).collect::<Vec<_>>();
                    Bool::or(self.ctx, &parts.iter().collect::<Vec<_>>())
                }
                Expr::Xor(a, b) => self.encode(a).xor(&self.encode(b)),
                Expr::Iff(a, b) => self.encode(a).iff(&self.encode(b)),
                Expr::Implies(a, b) => self.encode(a).implies(&self.encode(b)),
                Expr::Ite(c, t, f) => self.encode(c).ite(&self.encode(t), &self.encode(f)),
            }
        }

        fn act(&self, act: ActLit) -> Result<&Bool<'static>, OracleError> {
            self.acts
                .get(act.id() as usize)
                .ok_or_else(|| OracleError::new(format!("unknown activation literal {}", act.id())))
        }

        fn assumption(&self, a: &Assumption) -> Result<Bool<'static>, OracleError> {
            match a {
                Assumption::Act(act) => self.act(*act).cloned(),
                Assumption::State { lit, primed } => {
                    let sym = if *primed {
                        Symbol::Next(lit.var())
                    } else {
                        Symbol::Cur(lit.var())
                    };
                    if !self.vocab.contains(sym) {
                        return Err(OracleError::new(format!("assumption on undeclared {sym}")));
                    }
                    let b = self.sym(sym);
                    Ok(if lit.is_positive() { b } else { b.not() })
                }
            }
        }

        fn read_model(&self) -> Result<Model, OracleError> {
            let model = self
                .solver
                .get_model()
                .ok_or_else(|| OracleError::new("z3 reported sat without a model"))?;
            let value = |sym: Symbol| {
                model
                    .eval(&self.sym(sym), true)
                    .and_then(|b| b.as_bool())
                    .unwrap_or(false)
            };
            let states = self.vocab.states as u32;
            Ok(Model {
                current: State::new((0..states).map(|v| value(Symbol::Cur(Var(v)))).collect()),
                inputs: (0..self.vocab.inputs as u32)
                    .map(|i| value(Symbol::Input(i)))
                    .collect(),
                next: State::new((0..states).map(|v| value(Symbol::Next(Var(v)))).collect()),
            })
        }
    }

    impl Oracle for Z3Oracle {
        fn vocabulary(&self) -> Vocabulary {
            self.vocab
        }

        fn assert_permanent(&mut self, f: &Expr) -> Result<(), OracleError> {
            check_vocabulary(self.vocab, f)?;
            self.solver.assert(&self.encode(f));
            Ok(())
        }

        fn new_activation(&mut self) -> ActLit {
            let id = self.acts.len() as u32;
            self.acts
                .push(Bool::new_const(self.ctx, format!("act!{id}")));
            ActLit::new(id)
        }

        fn assert_guarded(&mut self, act: ActLit, f: &Expr) -> Result<(), OracleError> {
            check_vocabulary(self.vocab, f)?;
            let guard = self.act(act)?.clone();
            self.solver.assert(&guard.implies(&self.encode(f)));
            Ok(())
        }

        fn retire(&mut self, act: ActLit) -> Result<(), OracleError> {
            let guard = self.act(act)?.clone();
            self.solver.assert(&guard.not());
            Ok(())
        }

        fn check_sat(&mut self, assumptions: &[Assumption]) -> Result<SatResult, OracleError> {
            let mut by_name: HashMap<String, Vec<Assumption>> = HashMap::new();
            let mut lits = Vec::with_capacity(assumptions.len());
            for a in assumptions {
                let b = self.assumption(a)?;
                by_name.entry(b.to_string()).or_default().push(*a);
                lits.push(b);
            }

            match self.solver.check_assumptions(&lits) {
                Z3Result::Sat => Ok(SatResult::Sat(self.read_model()?)),
                Z3Result::Unsat => {
                    let mut core = Core::default();
                    for b in self.solver.get_unsat_core() {
                        if let Some(found) = by_name.get(&b.to_string()) {
                            core.assumptions.extend(found.iter().copied());
                        }
                    }
                    Ok(SatResult::Unsat(core))
                }
                Z3Result::Unknown => Ok(SatResult::Unknown(
                    self.solver
                        .get_reason_unknown()
                        .unwrap_or_else(|| "z3 returned unknown".to_string()),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z3_params_carry_both_budgets() {
        let params = z3_params(OracleBudget {
            conflict_limit: Some(10_000),
            time_limit_ms: Some(u64::MAX),
        });
        assert!(params.contains(&("rlimit", 10_000)));
        assert!(params.contains(&("timeout", u32::MAX)));
    }

    #[test]
    fn unlimited_budget_sets_only_seeds() {
        let params = z3_params(OracleBudget::default());
        assert!(params.iter().all(|(k, _)| k.ends_with("random_seed")));
    }
}

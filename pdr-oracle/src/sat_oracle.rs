#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use cadical::{Callbacks, Solver};

use pdr_logic::{Expr, State, Symbol, Vocabulary};

use crate::solver::{
    check_vocabulary, ActLit, Assumption, Core, Model, Oracle, OracleBudget, OracleError,
    SatResult,
};

/// Terminates a CaDiCaL search once its wall-clock allowance is spent.
#[derive(Debug)]
struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Callbacks for Deadline {
    fn started(&mut self) {
        self.started = Instant::now();
    }

    fn terminate(&mut self) -> bool {
        self.started.elapsed() >= self.limit
    }
}

/// Built-in oracle: Tseitin-encodes formulas into CNF for CaDiCaL.
///
/// Solver variables (1-based, DIMACS style) are laid out as current-state
/// vars, next-state vars, inputs, a constant-true var, then activation and
/// auxiliary vars in creation order.
pub struct SatOracle {
    sat: Solver<Deadline>,
    vocab: Vocabulary,
    budget: OracleBudget,
    true_lit: i32,
    next_var: i32,
    queries: u64,
}

impl SatOracle {
    pub fn new(vocab: Vocabulary) -> Self {
        Self::with_budget(vocab, OracleBudget::default())
    }

    pub fn with_budget(vocab: Vocabulary, budget: OracleBudget) -> Self {
        let mut sat: Solver<Deadline> = Solver::new();
        if let Some(ms) = budget.time_limit_ms {
            sat.set_callbacks(Some(Deadline {
                started: Instant::now(),
                limit: Duration::from_millis(ms),
            }));
        }
        let true_lit = (2 * vocab.states + vocab.inputs) as i32 + 1;
        sat.add_clause([true_lit]);
        Self {
            sat,
            vocab,
            budget,
            true_lit,
            next_var: true_lit + 1,
            queries: 0,
        }
    }

    /// Number of `check_sat` calls answered so far.
    pub fn queries(&self) -> u64 {
        self.queries
    }

    fn sym(&self, sym: Symbol) -> i32 {
        let n = self.vocab.states as i32;
        let v = match sym {
            Symbol::Cur(v) => v.0 as i32,
            Symbol::Next(v) => n + v.0 as i32,
            Symbol::Input(i) => 2 * n + i as i32,
        };
        v + 1
    }

    fn fresh(&mut self) -> i32 {
        let v = self.next_var;
        self.next_var += 1;
        v
    }

    fn clause<const N: usize>(&mut self, lits: [i32; N]) {
        self.sat.add_clause(lits);
    }

    fn encode(&mut self, e: &Expr) -> i32 {
        match e {
            Expr::Const(true) => self.true_lit,
            Expr::Const(false) => -self.true_lit,
            Expr::Sym(s) => self.sym(*s),
            Expr::Not(a) => -self.encode(a),
            Expr::And(es) => {
                let parts = es.iter().map(|e| self.encode(e)).collect::<Vec<_>>();
                self.and_gate(&parts)
            }
            Expr::Or(es) => {
                let parts = es.iter().map(|e| -self.encode(e)).collect::<Vec<_>>();
                -self.and_gate(&parts)
            }
            Expr::Xor(a, b) => {
                let (a, b) = (self.encode(a), self.encode(b));
                self.xor_gate(a, b)
            }
            Expr::Iff(a, b) => {
                let (a, b) = (self.encode(a), self.encode(b));
                -self.xor_gate(a, b)
            }
            Expr::Implies(a, b) => {
                let (a, b) = (self.encode(a), self.encode(b));
                -self.and_gate(&[a, -b])
            }
            Expr::Ite(c, t, f) => {
                let (c, t, f) = (self.encode(c), self.encode(t), self.encode(f));
                let x = self.fresh();
                self.clause([-x, -c, t]);
                self.clause([-x, c, f]);
                self.clause([x, -c, -t]);
                self.clause([x, c, -f]);
                x
            }
        }
    }

    fn and_gate(&mut self, parts: &[i32]) -> i32 {
        match parts {
            [] => self.true_lit,
            [single] => *single,
            _ => {
                let x = self.fresh();
                let mut long = vec![x];
                for &p in parts {
                    self.clause([-x, p]);
                    long.push(-p);
                }
                self.sat.add_clause(long);
                x
            }
        }
    }

    fn xor_gate(&mut self, a: i32, b: i32) -> i32 {
        let x = self.fresh();
        self.clause([-x, a, b]);
        self.clause([-x, -a, -b]);
        self.clause([x, -a, b]);
        self.clause([x, a, -b]);
        x
    }

    /// Assert `f`, weakened by `guard` when given. Conjunctions and disjunctions
    /// at the top are turned into clauses directly.
    fn assert_expr(&mut self, f: &Expr, guard: Option<i32>) {
        match f {
            Expr::Const(true) => {}
            Expr::And(es) => {
                for e in es {
                    self.assert_expr(e, guard);
                }
            }
            Expr::Not(inner) if matches!(**inner, Expr::Or(_)) => {
                if let Expr::Or(es) = &**inner {
                    for e in es {
                        self.assert_expr(&Expr::not(e.clone()), guard);
                    }
                }
            }
            Expr::Or(es) => {
                let mut clause = es.iter().map(|e| self.encode(e)).collect::<Vec<_>>();
                clause.extend(guard.map(|g| -g));
                self.sat.add_clause(clause);
            }
            other => {
                let mut clause = vec![self.encode(other)];
                clause.extend(guard.map(|g| -g));
                self.sat.add_clause(clause);
            }
        }
    }

    fn act_lit(&self, act: ActLit) -> Result<i32, OracleError> {
        let id = i64::from(act.id());
        if id <= i64::from(self.true_lit) || id >= i64::from(self.next_var) {
            return Err(OracleError::new(format!("unknown activation literal {}", act.id())));
        }
        Ok(id as i32)
    }

    fn assumption_lit(&self, a: &Assumption) -> Result<i32, OracleError> {
        match a {
            Assumption::Act(act) => self.act_lit(*act),
            Assumption::State { lit, primed } => {
                let sym = if *primed {
                    Symbol::Next(lit.var())
                } else {
                    Symbol::Cur(lit.var())
                };
                if !self.vocab.contains(sym) {
                    return Err(OracleError::new(format!("assumption on undeclared {sym}")));
                }
                let s = self.sym(sym);
                Ok(if lit.is_positive() { s } else { -s })
            }
        }
    }

    /// Per-query conflict allowance; CaDiCaL drops limits after every solve.
    fn arm_conflict_limit(&mut self) -> Result<(), OracleError> {
        if let Some(limit) = self.budget.conflict_limit {
            let limit = i32::try_from(limit).unwrap_or(i32::MAX);
            self.sat
                .set_limit("conflicts", limit)
                .map_err(|_| OracleError::new("cadical rejected the conflict limit"))?;
        }
        Ok(())
    }

    fn value(&self, var: i32) -> bool {
        // Vars that occur in no clause are unconstrained.
        var <= self.sat.max_variable() && self.sat.value(var) == Some(true)
    }

    fn read_model(&self) -> Model {
        let n = self.vocab.states as i32;
        let value = |v: i32| self.value(v + 1);
        Model {
            current: State::new((0..n).map(value).collect()),
            inputs: (0..self.vocab.inputs as i32).map(|i| value(2 * n + i)).collect(),
            next: State::new((0..n).map(|v| value(n + v)).collect()),
        }
    }
}

impl Oracle for SatOracle {
    fn vocabulary(&self) -> Vocabulary {
        self.vocab
    }

    fn assert_permanent(&mut self, f: &Expr) -> Result<(), OracleError> {
        check_vocabulary(self.vocab, f)?;
        self.assert_expr(f, None);
        Ok(())
    }

    fn new_activation(&mut self) -> ActLit {
        ActLit::new(self.fresh() as u32)
    }

    fn assert_guarded(&mut self, act: ActLit, f: &Expr) -> Result<(), OracleError> {
        check_vocabulary(self.vocab, f)?;
        let guard = self.act_lit(act)?;
        self.assert_expr(f, Some(guard));
        Ok(())
    }

    fn retire(&mut self, act: ActLit) -> Result<(), OracleError> {
        let guard = self.act_lit(act)?;
        self.clause([-guard]);
        Ok(())
    }

    fn check_sat(&mut self, assumptions: &[Assumption]) -> Result<SatResult, OracleError> {
        let lits = assumptions
            .iter()
            .map(|a| self.assumption_lit(a))
            .collect::<Result<Vec<_>, _>>()?;
        self.arm_conflict_limit()?;
        self.queries += 1;

        let result = match self.sat.solve_with(lits.iter().copied()) {
            Some(true) => SatResult::Sat(self.read_model()),
            Some(false) => SatResult::Unsat(Core {
                assumptions: assumptions
                    .iter()
                    .zip(&lits)
                    .filter(|(_, l)| self.sat.failed(**l))
                    .map(|(a, _)| *a)
                    .collect(),
            }),
            None => SatResult::Unknown("cadical stopped at its conflict or time budget".into()),
        };
        tracing::trace!(
            query = self.queries,
            assumptions = assumptions.len(),
            sat = matches!(result, SatResult::Sat(_)),
            "sat query"
        );
        Ok(result)
    }
}

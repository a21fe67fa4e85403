#![forbid(unsafe_code)]

//! Frame sequence `R0..=Rtop`.
//!
//! `R0` is `Init`. Every later frame is `P` plus the clauses stored at its own
//! level or above: a clause lives once, at the highest level where it is known
//! to hold, so clause sets shrink as the index grows and `R(i) ⊨ R(i+1)`.
//! Each level owns an activation literal; a query on frame `i` assumes the
//! literals of levels `i..=top`.

use pdr_logic::{Clause, Cube, Expr, TransitionSystem};
use pdr_oracle::{ActLit, Assumption, Model, Oracle, SatResult};

use crate::error::PdrError;
use crate::stats::QueryStats;

/// Outcome of a one-step reachability query into a cube.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reach {
    /// No transition from the frame lands in the cube. Carries the part of
    /// the cube that appeared in the unsat core.
    Blocked(Cube),
    /// A frame state steps into the cube.
    Reachable(Model),
}

pub struct FrameManager {
    init_act: ActLit,
    prop_act: ActLit,
    bad_act: ActLit,
    /// `level_acts[i]` guards the clauses of level `i`; index 0 is unused.
    level_acts: Vec<ActLit>,
    deltas: Vec<Vec<Clause>>,
    queries: QueryStats,
}

impl FrameManager {
    /// Load `system` into the oracle and create frame 0.
    pub fn new<O: Oracle + ?Sized>(
        oracle: &mut O,
        system: &TransitionSystem,
    ) -> Result<Self, PdrError> {
        oracle.assert_permanent(&system.trans)?;

        let init_act = oracle.new_activation();
        oracle.assert_guarded(init_act, &system.init)?;
        let prop_act = oracle.new_activation();
        oracle.assert_guarded(prop_act, &system.prop)?;
        let bad_act = oracle.new_activation();
        oracle.assert_guarded(bad_act, &Expr::not(system.prop.prime()))?;

        Ok(Self {
            init_act,
            prop_act,
            bad_act,
            level_acts: vec![init_act],
            deltas: vec![Vec::new()],
            queries: QueryStats::default(),
        })
    }

    /// Index of the newest frame.
    pub fn top(&self) -> usize {
        self.deltas.len() - 1
    }

    pub fn queries(&self) -> QueryStats {
        self.queries
    }

    /// Append an empty frame (`P` alone) and return its index.
    pub fn new_frame<O: Oracle + ?Sized>(&mut self, oracle: &mut O) -> usize {
        self.level_acts.push(oracle.new_activation());
        self.deltas.push(Vec::new());
        self.top()
    }

    /// Clauses stored exactly at `level`.
    pub fn delta(&self, level: usize) -> &[Clause] {
        self.deltas.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All clauses of frame `i` (`i >= 1`), excluding `P`.
    pub fn clauses(&self, i: usize) -> Vec<Clause> {
        self.deltas
            .iter()
            .skip(i.max(1))
            .flat_map(|d| d.iter().cloned())
            .collect()
    }

    /// Number of stored clauses over all levels.
    pub fn num_clauses(&self) -> usize {
        self.deltas.iter().map(Vec::len).sum()
    }

    /// Some clause of frame `i` already excludes all of `cube`.
    pub fn syntactically_blocked(&self, i: usize, cube: &Cube) -> bool {
        self.deltas
            .iter()
            .skip(i.max(1))
            .flatten()
            .any(|c| c.negate().subsumes(cube))
    }

    fn implied_at(&self, level: usize, clause: &Clause) -> bool {
        self.deltas
            .iter()
            .skip(level.max(1))
            .flatten()
            .any(|c| c.subsumes(clause))
    }

    fn prune_subsumed(&mut self, upto: usize, clause: &Clause) {
        for delta in self.deltas.iter_mut().take(upto + 1).skip(1) {
            delta.retain(|c| !clause.subsumes(c));
        }
    }

    /// Strengthen frames `1..=level` with `clause`.
    ///
    /// Returns `false` when a clause of frame `level` already implies it.
    /// Clauses at or below `level` that the new clause implies are dropped.
    pub fn add_clause<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        level: usize,
        clause: Clause,
    ) -> Result<bool, PdrError> {
        debug_assert!(level >= 1 && level <= self.top());
        if self.implied_at(level, &clause) {
            self.prune_subsumed(level - 1, &clause);
            return Ok(false);
        }
        self.prune_subsumed(level, &clause);
        oracle.assert_guarded(self.level_acts[level], &Expr::clause(&clause, false))?;
        tracing::debug!(level, clause = %clause, "clause added");
        self.deltas[level].push(clause);
        Ok(true)
    }

    /// Assumptions that switch on frame `i`.
    pub fn assumptions(&self, i: usize) -> Vec<Assumption> {
        if i == 0 {
            return vec![Assumption::Act(self.init_act)];
        }
        let mut out = vec![Assumption::Act(self.prop_act)];
        out.extend(self.level_acts[i..].iter().map(|a| Assumption::Act(*a)));
        out
    }

    fn query<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        assumptions: &[Assumption],
    ) -> Result<SatResult, PdrError> {
        match oracle.check_sat(assumptions)? {
            SatResult::Unknown(why) => {
                self.queries.unknown += 1;
                Err(PdrError::OracleUnknown(why))
            }
            res => {
                match res {
                    SatResult::Sat(_) => self.queries.sat += 1,
                    _ => self.queries.unsat += 1,
                }
                Ok(res)
            }
        }
    }

    /// `R(i) & T & cube'`.
    pub fn is_blocked_at<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        i: usize,
        cube: &Cube,
    ) -> Result<Reach, PdrError> {
        self.reach(oracle, i, cube, false)
    }

    /// `R(i) & !cube & T & cube'`: blocked here means `!cube` is inductive relative to `R(i)`.
    pub fn is_relatively_inductive<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        i: usize,
        cube: &Cube,
    ) -> Result<Reach, PdrError> {
        self.reach(oracle, i, cube, true)
    }

    fn reach<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        i: usize,
        cube: &Cube,
        relative: bool,
    ) -> Result<Reach, PdrError> {
        let mut assumptions = self.assumptions(i);
        // Init states never lie in a blocked cube, so `!cube` is only needed above frame 0.
        let temp = if relative && i > 0 {
            let act = oracle.new_activation();
            oracle.assert_guarded(act, &Expr::clause(&cube.negate(), false))?;
            assumptions.push(Assumption::Act(act));
            Some(act)
        } else {
            None
        };
        assumptions.extend(cube.lits().iter().map(|l| Assumption::next(*l)));

        let res = self.query(oracle, &assumptions);
        if let Some(act) = temp {
            oracle.retire(act)?;
        }
        Ok(match res? {
            SatResult::Sat(model) => Reach::Reachable(model),
            SatResult::Unsat(core) => Reach::Blocked(core.state_lits(true).collect()),
            SatResult::Unknown(why) => return Err(PdrError::OracleUnknown(why)),
        })
    }

    /// `Init & cube` is satisfiable.
    pub fn init_intersects<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        cube: &Cube,
    ) -> Result<bool, PdrError> {
        let mut assumptions = self.assumptions(0);
        assumptions.extend(cube.lits().iter().map(|l| Assumption::cur(*l)));
        Ok(matches!(
            self.query(oracle, &assumptions)?,
            SatResult::Sat(_)
        ))
    }

    /// A state of frame `i` with a successor violating `P`.
    pub fn bad_state<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        i: usize,
    ) -> Result<Option<Model>, PdrError> {
        let mut assumptions = self.assumptions(i);
        assumptions.push(Assumption::Act(self.bad_act));
        Ok(match self.query(oracle, &assumptions)? {
            SatResult::Sat(model) => Some(model),
            _ => None,
        })
    }

    /// An initial state violating `P`.
    pub fn init_violation<O: Oracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        system: &TransitionSystem,
    ) -> Result<Option<Model>, PdrError> {
        let act = oracle.new_activation();
        oracle.assert_guarded(act, &Expr::not(system.prop.clone()))?;
        let res = self.query(oracle, &[Assumption::Act(self.init_act), Assumption::Act(act)]);
        oracle.retire(act)?;
        Ok(match res? {
            SatResult::Sat(model) => Some(model),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdr_logic::{cur, Lit, SystemBuilder, Var};
    use pdr_oracle::SatOracle;

    /// Two-bit shift register: a' = 0, b' = a. Init a=0 b=0.
    fn shift() -> TransitionSystem {
        let mut b = SystemBuilder::new("shift");
        let a = b.state("a");
        let s = b.state("b");
        b.init(Expr::and([Expr::not(cur(a)), Expr::not(cur(s))]));
        b.next(a, Expr::ff());
        b.next(s, cur(a));
        b.prop(Expr::not(cur(s)));
        b.build().unwrap()
    }

    fn setup() -> (SatOracle, FrameManager) {
        let sys = shift();
        let mut oracle = SatOracle::new(sys.vocabulary());
        let frames = FrameManager::new(&mut oracle, &sys).unwrap();
        (oracle, frames)
    }

    fn a() -> Lit {
        Lit::pos(Var(0))
    }

    #[test]
    fn new_frames_start_empty() {
        let (mut o, mut f) = setup();
        assert_eq!(f.top(), 0);
        assert_eq!(f.new_frame(&mut o), 1);
        assert!(f.delta(1).is_empty());
        assert_eq!(f.assumptions(1).len(), 2);
    }

    #[test]
    fn add_clause_reaches_every_earlier_frame() {
        let (mut o, mut f) = setup();
        f.new_frame(&mut o);
        f.new_frame(&mut o);
        let clause = Cube::new([a()]).negate();
        assert!(f.add_clause(&mut o, 2, clause.clone()).unwrap());
        assert_eq!(f.clauses(1), vec![clause.clone()]);
        assert_eq!(f.clauses(2), vec![clause.clone()]);
        assert!(f.syntactically_blocked(1, &Cube::new([a(), Lit::neg(Var(1))])));
        assert!(!f.add_clause(&mut o, 1, clause).unwrap());
    }

    #[test]
    fn stronger_clause_replaces_weaker_ones() {
        let (mut o, mut f) = setup();
        f.new_frame(&mut o);
        let weak = Cube::new([a(), Lit::pos(Var(1))]).negate();
        let strong = Cube::new([a()]).negate();
        f.add_clause(&mut o, 1, weak).unwrap();
        f.add_clause(&mut o, 1, strong.clone()).unwrap();
        assert_eq!(f.delta(1), &[strong]);
    }

    #[test]
    fn blocking_queries_follow_the_frames() {
        let (mut o, mut f) = setup();
        f.new_frame(&mut o);
        let a_set = Cube::new([a()]);
        // Nothing ever sets a.
        assert!(matches!(f.is_blocked_at(&mut o, 0, &a_set).unwrap(), Reach::Blocked(_)));
        assert!(matches!(f.is_blocked_at(&mut o, 1, &a_set).unwrap(), Reach::Blocked(_)));
        // From R1 = {b=0} the state a=0,b=0 is reachable.
        let zero = Cube::new([Lit::neg(Var(0)), Lit::neg(Var(1))]);
        assert!(matches!(f.is_blocked_at(&mut o, 1, &zero).unwrap(), Reach::Reachable(_)));
        assert!(f.init_intersects(&mut o, &zero).unwrap());
        assert!(!f.init_intersects(&mut o, &a_set).unwrap());
    }

    #[test]
    fn bad_state_is_found_until_blocked() {
        let (mut o, mut f) = setup();
        f.new_frame(&mut o);
        let m = f.bad_state(&mut o, 1).unwrap().expect("a=1 in R1 leads to b'=1");
        assert!(m.current.get(Var(0)));
        assert!(m.next.get(Var(1)));
        f.add_clause(&mut o, 1, Cube::new([a()]).negate()).unwrap();
        assert!(f.bad_state(&mut o, 1).unwrap().is_none());
        assert!(f.init_violation(&mut o, &shift()).unwrap().is_none());
        assert!(f.queries().total() >= 3);
    }

    #[test]
    fn relative_query_retires_its_temporary_clause() {
        let (mut o, mut f) = setup();
        f.new_frame(&mut o);
        assert!(matches!(
            f.is_relatively_inductive(&mut o, 1, &Cube::new([a()])).unwrap(),
            Reach::Blocked(_)
        ));
        // With `!a` leaked into R1 the bad state a=1 would disappear.
        let m = f.bad_state(&mut o, 1).unwrap().expect("a=1 is still in R1");
        assert!(m.current.get(Var(0)));
    }
}

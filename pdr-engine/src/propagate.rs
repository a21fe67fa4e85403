#![forbid(unsafe_code)]

use pdr_oracle::Oracle;

use crate::error::PdrError;
use crate::frames::{FrameManager, Reach};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Clauses pushed one level up.
    pub moved: u64,
    /// Lowest frame found equal to its successor.
    pub fixpoint: Option<usize>,
}

/// Push clauses forward through frames `1..top`.
///
/// A clause of level `i` moves to `i + 1` when `R(i) & T & !clause'` is
/// unsatisfiable. Once level `i` keeps no clause of its own, `R(i) = R(i+1)`
/// and `R(i)` is inductive.
pub fn propagate<O: Oracle + ?Sized>(
    frames: &mut FrameManager,
    oracle: &mut O,
) -> Result<Propagation, PdrError> {
    let mut out = Propagation::default();
    let top = frames.top();

    for i in 1..top {
        for clause in frames.delta(i).to_vec() {
            // An earlier move in this pass may have subsumed it.
            if !frames.delta(i).contains(&clause) {
                continue;
            }
            if let Reach::Blocked(_) = frames.is_blocked_at(oracle, i, &clause.negate())? {
                frames.add_clause(oracle, i + 1, clause)?;
                out.moved += 1;
            }
        }
        if frames.delta(i).is_empty() {
            tracing::debug!(level = i, moved = out.moved, "fixpoint");
            out.fixpoint = Some(i);
            return Ok(out);
        }
    }

    tracing::debug!(top, moved = out.moved, "propagated");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdr_logic::{cur, Cube, Expr, Lit, SystemBuilder, Var};
    use pdr_oracle::SatOracle;

    #[test]
    fn inductive_clause_moves_and_empty_level_is_a_fixpoint() {
        // x' = x, Init x=0.
        let mut b = SystemBuilder::new("latch");
        let x = b.state("x");
        b.init(Expr::not(cur(x)));
        b.next(x, cur(x));
        b.prop(Expr::tt());
        let sys = b.build().unwrap();

        let mut o = SatOracle::new(sys.vocabulary());
        let mut f = FrameManager::new(&mut o, &sys).unwrap();
        f.new_frame(&mut o);
        f.new_frame(&mut o);
        let clause = Cube::new([Lit::pos(Var(0))]).negate();
        f.add_clause(&mut o, 1, clause.clone()).unwrap();

        let p = propagate(&mut f, &mut o).unwrap();
        assert_eq!(p.moved, 1);
        assert_eq!(p.fixpoint, Some(1));
        assert_eq!(f.delta(2), &[clause]);
    }

    #[test]
    fn non_inductive_clause_stays() {
        // x' = !x, Init x=0: "x=0" holds at frame 0 only.
        let mut b = SystemBuilder::new("toggle");
        let x = b.state("x");
        b.init(Expr::not(cur(x)));
        b.next(x, Expr::not(cur(x)));
        b.prop(Expr::tt());
        let sys = b.build().unwrap();

        let mut o = SatOracle::new(sys.vocabulary());
        let mut f = FrameManager::new(&mut o, &sys).unwrap();
        f.new_frame(&mut o);
        f.new_frame(&mut o);
        let clause = Cube::new([Lit::pos(Var(0))]).negate();
        f.add_clause(&mut o, 1, clause.clone()).unwrap();

        let p = propagate(&mut f, &mut o).unwrap();
        assert_eq!(p, Propagation::default());
        assert_eq!(f.delta(1), &[clause]);
    }
}

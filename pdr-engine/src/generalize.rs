#![forbid(unsafe_code)]

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use pdr_logic::{Cube, Lit};
use pdr_oracle::Oracle;

use crate::error::PdrError;
use crate::frames::{FrameManager, Reach};
use crate::options::DropOrder;

/// Shrinks a blocked cube to a minimal one that is still blocked and disjoint from `Init`.
pub struct Generalizer {
    order: DropOrder,
    rng: Option<StdRng>,
    relative: bool,
}

impl Generalizer {
    pub fn new(order: DropOrder, relative_induction: bool) -> Self {
        let rng = match order {
            DropOrder::Shuffled { seed } => Some(StdRng::seed_from_u64(seed)),
            _ => None,
        };
        Self {
            order,
            rng,
            relative: relative_induction,
        }
    }

    /// Blocking check used for obligations and candidates: plain or relative to `!cube`.
    pub fn check<O: Oracle + ?Sized>(
        &self,
        frames: &mut FrameManager,
        oracle: &mut O,
        level: usize,
        cube: &Cube,
    ) -> Result<Reach, PdrError> {
        if self.relative {
            frames.is_relatively_inductive(oracle, level, cube)
        } else {
            frames.is_blocked_at(oracle, level, cube)
        }
    }

    pub fn blocked<O: Oracle + ?Sized>(
        &self,
        frames: &mut FrameManager,
        oracle: &mut O,
        level: usize,
        cube: &Cube,
    ) -> Result<Option<Cube>, PdrError> {
        Ok(match self.check(frames, oracle, level, cube)? {
            Reach::Blocked(core) => Some(core),
            Reach::Reachable(_) => None,
        })
    }

    /// Generalize `cube`, known blocked at `frame - 1` with unsat-core literals `core`.
    ///
    /// The result is a sub-cube of `cube` from which no single literal can be
    /// dropped without losing blockedness or `Init`-disjointness.
    pub fn generalize<O: Oracle + ?Sized>(
        &mut self,
        frames: &mut FrameManager,
        oracle: &mut O,
        frame: usize,
        cube: &Cube,
        core: &Cube,
    ) -> Result<Cube, PdrError> {
        debug_assert!(frame >= 1);
        let mut g = shrink(frames, oracle, cube, core)?;

        loop {
            let mut changed = false;
            for lit in self.drop_order(&g) {
                if g.len() <= 1 || !g.contains(lit) {
                    continue;
                }
                let candidate = g.without(lit);
                if frames.init_intersects(oracle, &candidate)? {
                    continue;
                }
                if let Some(core) = self.blocked(frames, oracle, frame - 1, &candidate)? {
                    g = shrink(frames, oracle, &candidate, &core)?;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        tracing::trace!(frame, from = cube.len(), to = g.len(), "generalized");
        Ok(g)
    }

    fn drop_order(&mut self, cube: &Cube) -> Vec<Lit> {
        let mut lits = cube.lits().to_vec();
        match self.order {
            DropOrder::Forward => {}
            DropOrder::Reverse => lits.reverse(),
            DropOrder::Shuffled { .. } => {
                if let Some(rng) = self.rng.as_mut() {
                    lits.shuffle(rng);
                }
            }
        }
        lits
    }
}

/// Restrict `cube` to the literals of `core`, then add dropped literals back in
/// order until the result no longer meets `Init`.
fn shrink<O: Oracle + ?Sized>(
    frames: &mut FrameManager,
    oracle: &mut O,
    cube: &Cube,
    core: &Cube,
) -> Result<Cube, PdrError> {
    let mut d: Cube = cube.lits().iter().copied().filter(|l| core.contains(*l)).collect();
    if d.len() == cube.len() {
        return Ok(d);
    }
    if frames.init_intersects(oracle, &d)? {
        for lit in cube.lits() {
            if d.contains(*lit) {
                continue;
            }
            d = d.with(*lit);
            if !frames.init_intersects(oracle, &d)? {
                break;
            }
        }
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdr_logic::{cur, Expr, SystemBuilder, TransitionSystem, Var};
    use pdr_oracle::SatOracle;

    /// Three frozen bits; Init fixes a=0 and b=0, c is free.
    fn frozen() -> TransitionSystem {
        let mut b = SystemBuilder::new("frozen");
        let vars = [b.state("a"), b.state("b"), b.state("c")];
        for v in vars {
            b.next(v, cur(v));
        }
        b.init(Expr::and([Expr::not(cur(vars[0])), Expr::not(cur(vars[1]))]));
        b.prop(Expr::tt());
        b.build().unwrap()
    }

    fn setup(sys: &TransitionSystem) -> (SatOracle, FrameManager) {
        let mut oracle = SatOracle::new(sys.vocabulary());
        let mut frames = FrameManager::new(&mut oracle, sys).unwrap();
        frames.new_frame(&mut oracle);
        (oracle, frames)
    }

    fn lit(v: u32) -> Lit {
        Lit::pos(Var(v))
    }

    fn all_set() -> Cube {
        Cube::new([lit(0), lit(1), lit(2)])
    }

    fn assert_minimal(
        generalizer: &Generalizer,
        frames: &mut FrameManager,
        oracle: &mut SatOracle,
        g: &Cube,
    ) {
        assert!(!frames.init_intersects(oracle, g).unwrap());
        assert!(generalizer.blocked(frames, oracle, 0, g).unwrap().is_some());
        for l in g.lits() {
            let smaller = g.without(*l);
            let droppable = !frames.init_intersects(oracle, &smaller).unwrap()
                && generalizer.blocked(frames, oracle, 0, &smaller).unwrap().is_some();
            assert!(!droppable, "{l} could still be dropped from {g}");
        }
    }

    #[test]
    fn result_is_minimal_and_idempotent() {
        let sys = frozen();
        let (mut o, mut f) = setup(&sys);
        let mut generalizer = Generalizer::new(DropOrder::Forward, true);
        let cube = all_set();

        let g = generalizer.generalize(&mut f, &mut o, 1, &cube, &cube).unwrap();
        assert!(g.subsumes(&cube));
        assert_eq!(g.len(), 1);
        assert_minimal(&generalizer, &mut f, &mut o, &g);

        let again = generalizer.generalize(&mut f, &mut o, 1, &g, &g).unwrap();
        assert_eq!(again, g);
    }

    #[test]
    fn drop_order_picks_between_minimal_cubes() {
        let sys = frozen();
        let cube = all_set();

        let (mut o, mut f) = setup(&sys);
        let forward = Generalizer::new(DropOrder::Forward, false)
            .generalize(&mut f, &mut o, 1, &cube, &cube)
            .unwrap();
        let (mut o, mut f) = setup(&sys);
        let reverse = Generalizer::new(DropOrder::Reverse, false)
            .generalize(&mut f, &mut o, 1, &cube, &cube)
            .unwrap();

        assert_eq!(forward, Cube::new([lit(1)]));
        assert_eq!(reverse, Cube::new([lit(0)]));
    }

    #[test]
    fn shuffled_order_is_reproducible() {
        let sys = frozen();
        let cube = all_set();
        let run = |seed| {
            let (mut o, mut f) = setup(&sys);
            Generalizer::new(DropOrder::Shuffled { seed }, true)
                .generalize(&mut f, &mut o, 1, &cube, &cube)
                .unwrap()
        };
        let first = run(7);
        assert_eq!(run(7), first);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn empty_core_is_repaired_against_init() {
        // Init: !(a & b); identity transition.
        let mut b = SystemBuilder::new("pair");
        let a = b.state("a");
        let bb = b.state("b");
        let c = b.state("c");
        for v in [a, bb, c] {
            b.next(v, cur(v));
        }
        b.init(Expr::not(Expr::and([cur(a), cur(bb)])));
        b.prop(Expr::tt());
        let sys = b.build().unwrap();

        let (mut o, mut f) = setup(&sys);
        let mut generalizer = Generalizer::new(DropOrder::Forward, false);
        let cube = all_set();
        let g = generalizer
            .generalize(&mut f, &mut o, 1, &cube, &Cube::default())
            .unwrap();
        assert_eq!(g, Cube::new([lit(0), lit(1)]));
        assert_minimal(&generalizer, &mut f, &mut o, &g);
    }
}

#![forbid(unsafe_code)]

use pdr_logic::{SystemError, TransitionSystem};
use pdr_oracle::{Oracle, SatOracle};

use crate::certify;
use crate::error::PdrError;
use crate::frames::{FrameManager, Reach};
use crate::generalize::Generalizer;
use crate::obligation::{Obligation, ObligationQueue, Step};
use crate::options::PdrOptions;
use crate::propagate::propagate;
use crate::stats::Stats;
use crate::verdict::{Invariant, Trace, UnknownReason, Verdict};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Does some initial state violate `P`?
    CheckInit,
    /// Append a frame.
    ExtendFrame,
    /// Block every state of the previous top frame that steps out of `P`.
    Block,
    /// Push clauses forward and look for a fixpoint.
    Propagate,
    Proved,
    Disproved,
}

/// One verification run over a caller-provided oracle.
pub struct Pdr<'s, O: Oracle> {
    system: &'s TransitionSystem,
    oracle: O,
    options: PdrOptions,
    frames: FrameManager,
    queue: ObligationQueue,
    generalizer: Generalizer,
    phase: Phase,
    stats: Stats,
    verdict: Option<Verdict>,
}

impl<'s, O: Oracle> Pdr<'s, O> {
    pub fn new(
        system: &'s TransitionSystem,
        mut oracle: O,
        options: PdrOptions,
    ) -> Result<Self, PdrError> {
        system.validate()?;
        if oracle.vocabulary() != system.vocabulary() {
            return Err(SystemError {
                system: system.name.clone(),
                message: format!(
                    "oracle vocabulary {:?} does not match the system's {:?}",
                    oracle.vocabulary(),
                    system.vocabulary()
                ),
            }
            .into());
        }
        let frames = FrameManager::new(&mut oracle, system)?;
        Ok(Self {
            system,
            oracle,
            queue: ObligationQueue::new(options.tie_break),
            generalizer: Generalizer::new(options.drop_order, options.relative_induction),
            options,
            frames,
            phase: Phase::CheckInit,
            stats: Stats::default(),
            verdict: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn frames(&self) -> &FrameManager {
        &self.frames
    }

    pub fn queue(&self) -> &ObligationQueue {
        &self.queue
    }

    pub fn stats(&self) -> Stats {
        let mut stats = self.stats;
        stats.queries = self.frames.queries();
        stats.frames = self.frames.top() + 1;
        stats
    }

    /// Run to a verdict. Inconclusive failures become `Verdict::Unknown`;
    /// oracle faults and failed certification are errors.
    pub fn run(&mut self) -> Result<Verdict, PdrError> {
        if let Some(done) = &self.verdict {
            return Ok(done.clone());
        }
        tracing::info!(
            system = %self.system.name,
            states = self.system.num_states(),
            inputs = self.system.num_inputs(),
            "pdr start"
        );

        let verdict = match self.search() {
            Ok(v) => v,
            Err(e) => Verdict::Unknown(e.into_unknown()?),
        };

        if self.options.certify {
            match &verdict {
                Verdict::Safe(inv) => certify::check_invariant(self.system, inv)?,
                Verdict::Unsafe(trace) => certify::check_trace(self.system, trace)?,
                Verdict::Unknown(_) => {}
            }
        }

        match &verdict {
            Verdict::Safe(inv) => tracing::info!(
                system = %self.system.name,
                lemmas = inv.lemmas.len(),
                level = inv.level,
                "safe"
            ),
            Verdict::Unsafe(trace) => tracing::info!(
                system = %self.system.name,
                depth = trace.depth(),
                "unsafe"
            ),
            Verdict::Unknown(reason) => tracing::warn!(
                system = %self.system.name,
                %reason,
                "unknown"
            ),
        }
        tracing::debug!(stats = %self.stats(), "pdr done");

        self.verdict = Some(verdict.clone());
        Ok(verdict)
    }

    fn search(&mut self) -> Result<Verdict, PdrError> {
        loop {
            self.phase = match self.phase {
                Phase::CheckInit => {
                    match self.frames.init_violation(&mut self.oracle, self.system)? {
                        Some(model) => {
                            self.verdict = Some(Verdict::Unsafe(Trace {
                                states: vec![model.current],
                                inputs: Vec::new(),
                            }));
                            Phase::Disproved
                        }
                        None => Phase::ExtendFrame,
                    }
                }
                Phase::ExtendFrame => {
                    if let Some(limit) = self.options.max_frames {
                        if self.frames.top() + 1 >= limit {
                            return Ok(Verdict::Unknown(UnknownReason::FrameLimit { limit }));
                        }
                    }
                    let top = self.frames.new_frame(&mut self.oracle);
                    tracing::debug!(frame = top, clauses = self.frames.num_clauses(), "new frame");
                    Phase::Block
                }
                Phase::Block => match self.block()? {
                    Some(trace) => {
                        self.verdict = Some(Verdict::Unsafe(trace));
                        Phase::Disproved
                    }
                    None => Phase::Propagate,
                },
                Phase::Propagate => {
                    let p = propagate(&mut self.frames, &mut self.oracle)?;
                    self.stats.propagated += p.moved;
                    match p.fixpoint {
                        Some(level) => {
                            self.verdict = Some(Verdict::Safe(Invariant {
                                lemmas: self.frames.clauses(level),
                                property: self.system.prop.clone(),
                                level,
                            }));
                            Phase::Proved
                        }
                        None => Phase::ExtendFrame,
                    }
                }
                Phase::Proved | Phase::Disproved => {
                    return self.verdict.take().ok_or_else(|| PdrError::Unsound {
                        what: "run",
                        message: "terminal phase reached without a verdict".to_string(),
                    });
                }
            };
        }
    }

    /// Drive `R(k) & T & !P'` to unsat for `k = top - 1`, blocking each bad state on the way.
    fn block(&mut self) -> Result<Option<Trace>, PdrError> {
        let k = self.frames.top() - 1;
        while let Some(model) = self.frames.bad_state(&mut self.oracle, k)? {
            let root = Obligation::root(
                model.current,
                k,
                Step {
                    inputs: model.inputs,
                    successor: model.next,
                },
            );
            tracing::debug!(frame = k, state = %root.state, "bad state");
            self.queue.push(root);
            self.stats.obligations += 1;
            if let Some(trace) = self.discharge(k)? {
                return Ok(Some(trace));
            }
        }
        Ok(None)
    }

    /// Process the queue until it is empty or an obligation reaches `Init`.
    fn discharge(&mut self, k: usize) -> Result<Option<Trace>, PdrError> {
        while let Some(id) = self.queue.pop_min() {
            let ob = self.queue.get(id).clone();

            if ob.frame == 0 || self.frames.init_intersects(&mut self.oracle, &ob.cube)? {
                let trace = self.queue.trace(id);
                self.queue.clear();
                return Ok(Some(trace));
            }

            if self.frames.syntactically_blocked(ob.frame, &ob.cube) {
                if self.options.reschedule && ob.frame < k {
                    self.queue.reschedule(id, ob.frame + 1);
                }
                continue;
            }

            match self
                .generalizer
                .check(&mut self.frames, &mut self.oracle, ob.frame - 1, &ob.cube)?
            {
                Reach::Reachable(model) => {
                    let pred = Obligation::predecessor(
                        id,
                        &ob,
                        model.current,
                        Step {
                            inputs: model.inputs,
                            successor: model.next,
                        },
                    );
                    if pred.depth > self.options.max_obligation_depth {
                        return Err(PdrError::ObligationDepthExceeded {
                            depth: pred.depth,
                            limit: self.options.max_obligation_depth,
                        });
                    }
                    tracing::trace!(frame = pred.frame, depth = pred.depth, state = %pred.state, "predecessor");
                    self.stats.max_depth = self.stats.max_depth.max(pred.depth);
                    self.stats.obligations += 1;
                    self.queue.push(pred);
                    self.queue.requeue(id);
                }
                Reach::Blocked(core) => {
                    let g = self.generalizer.generalize(
                        &mut self.frames,
                        &mut self.oracle,
                        ob.frame,
                        &ob.cube,
                        &core,
                    )?;
                    self.stats.blocked += 1;
                    self.stats.literals_dropped += (ob.cube.len() - g.len()) as u64;
                    if self.frames.add_clause(&mut self.oracle, ob.frame, g.negate())? {
                        self.stats.lemmas += 1;
                    }
                    if self.options.reschedule && ob.frame < k {
                        self.queue.reschedule(id, ob.frame + 1);
                    }
                }
            }
        }
        self.queue.clear();
        Ok(None)
    }
}

/// Check `system` with the built-in oracle and default options.
pub fn verify(system: &TransitionSystem) -> Result<Verdict, PdrError> {
    verify_with(system, &PdrOptions::default())
}

pub fn verify_with(system: &TransitionSystem, options: &PdrOptions) -> Result<Verdict, PdrError> {
    verify_with_stats(system, options).map(|(verdict, _)| verdict)
}

/// Like [`verify_with`], also returning the run's counters.
pub fn verify_with_stats(
    system: &TransitionSystem,
    options: &PdrOptions,
) -> Result<(Verdict, Stats), PdrError> {
    let oracle = SatOracle::with_budget(system.vocabulary(), options.budget);
    let mut pdr = Pdr::new(system, oracle, options.clone())?;
    let verdict = pdr.run()?;
    Ok((verdict, pdr.stats()))
}

#[cfg(feature = "z3")]
pub fn verify_z3(
    system: &TransitionSystem,
    options: &PdrOptions,
) -> Result<(Verdict, Stats), PdrError> {
    let oracle = pdr_oracle::Z3Oracle::new(system.vocabulary(), options.budget);
    let mut pdr = Pdr::new(system, oracle, options.clone())?;
    let verdict = pdr.run()?;
    Ok((verdict, pdr.stats()))
}

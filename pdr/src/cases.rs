#![forbid(unsafe_code)]

//! Built-in benchmark systems with known verdicts.

use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use pdr_engine::{verify_with_stats, PdrError, PdrOptions, Stats, Verdict};
use pdr_logic::{cur, Expr, State, SystemBuilder, SystemError, TransitionSystem, Var};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expected {
    Safe,
    Unsafe,
}

#[derive(Clone, Debug)]
pub struct Case {
    pub name: &'static str,
    pub description: &'static str,
    pub system: TransitionSystem,
    pub expected: Expected,
    /// Partial assignment a reported counterexample is expected to start in.
    /// Informational: several start states may lead to a violation.
    pub ce_start: Option<Vec<(&'static str, bool)>>,
}

impl Case {
    fn start_matches(&self, start: &State) -> Option<bool> {
        let hint = self.ce_start.as_ref()?;
        Some(hint.iter().all(|(name, value)| {
            self.system
                .var_by_name(name)
                .is_some_and(|v| start.get(v) == *value)
        }))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    pub expected: Expected,
    /// `safe`, `unsafe` or `unknown`.
    pub verdict: &'static str,
    pub passed: bool,
    /// Whether the counterexample starts where the case predicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ce_start_matches: Option<bool>,
    pub stats: Stats,
    pub elapsed_ms: u128,
}

pub fn run_case(case: &Case, options: &PdrOptions) -> Result<CaseOutcome, PdrError> {
    let started = Instant::now();
    let (verdict, stats) = verify_with_stats(&case.system, options)?;

    let passed = matches!(
        (&verdict, case.expected),
        (Verdict::Safe(_), Expected::Safe) | (Verdict::Unsafe(_), Expected::Unsafe)
    );
    let ce_start_matches = match &verdict {
        Verdict::Unsafe(trace) => trace.first().and_then(|s| case.start_matches(s)),
        _ => None,
    };
    if !passed {
        tracing::warn!(
            case = case.name,
            expected = ?case.expected,
            got = verdict.label(),
            "unexpected verdict"
        );
    }

    Ok(CaseOutcome {
        name: case.name.to_string(),
        expected: case.expected,
        verdict: verdict.label(),
        passed,
        ce_start_matches,
        stats,
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/// Run `cases` in parallel; results keep the input order.
pub fn run_cases(
    cases: &[Case],
    options: &PdrOptions,
) -> Vec<(&'static str, Result<CaseOutcome, PdrError>)> {
    cases
        .par_iter()
        .map(|case| (case.name, run_case(case, options)))
        .collect()
}

pub fn find(name: &str) -> Result<Option<Case>, SystemError> {
    Ok(library()?.into_iter().find(|c| c.name == name))
}

pub fn library() -> Result<Vec<Case>, SystemError> {
    Ok(vec![
        latch()?,
        counter_reaches_five()?,
        clocked_pair()?,
        easy(true)?,
        easy(false)?,
        easy_counter(true)?,
        easy_counter(false)?,
        marginal_algebra_safe()?,
        marginal_algebra_unsafe()?,
        adder_safe()?,
        adder_unsafe()?,
        adder_unsafe2()?,
        adder_safe2()?,
    ])
}

fn not(v: Var) -> Expr {
    Expr::not(cur(v))
}

fn latch() -> Result<Case, SystemError> {
    let mut b = SystemBuilder::new("latch");
    let x = b.state("x");
    b.init(not(x));
    b.next(x, cur(x));
    b.prop(not(x));
    Ok(Case {
        name: "latch",
        description: "One-bit latch that never leaves 0.",
        system: b.build()?,
        expected: Expected::Safe,
        ce_start: None,
    })
}

fn counter_reaches_five() -> Result<Case, SystemError> {
    let mut b = SystemBuilder::new("counter-reaches-5");
    let x = [b.state("x0"), b.state("x1"), b.state("x2")];
    b.init(Expr::and(x.iter().map(|v| not(*v))));
    b.next(x[0], not(x[0]));
    b.next(x[1], Expr::xor(cur(x[1]), cur(x[0])));
    b.next(x[2], Expr::xor(cur(x[2]), Expr::and([cur(x[1]), cur(x[0])])));
    b.prop(Expr::not(Expr::and([cur(x[0]), not(x[1]), cur(x[2])])));
    Ok(Case {
        name: "counter-reaches-5",
        description: "3-bit counter from 0; the property forbids 5.",
        system: b.build()?,
        expected: Expected::Unsafe,
        ce_start: Some(vec![("x0", false), ("x1", false), ("x2", false)]),
    })
}

fn clocked_pair() -> Result<Case, SystemError> {
    let mut b = SystemBuilder::new("clocked-pair");
    let a = b.state("a");
    let c = b.state("b");
    let ca = b.input("ca");
    let cb = b.input("cb");
    b.init(Expr::not(Expr::and([cur(a), cur(c)])));
    b.next(a, Expr::and([cur(a), ca]));
    b.next(c, Expr::and([cur(c), cb]));
    b.prop(Expr::not(Expr::and([cur(a), cur(c)])));
    Ok(Case {
        name: "clocked-pair",
        description: "Two bits held by independent clocks; a=b=1 is unreachable.",
        system: b.build()?,
        expected: Expected::Safe,
        ce_start: None,
    })
}

fn easy(safe: bool) -> Result<Case, SystemError> {
    let mut b = SystemBuilder::new(if safe { "easy-safe" } else { "easy-unsafe" });
    let [x, y, z] = [b.state("x"), b.state("y"), b.state("z")];
    if safe {
        b.init(Expr::and([cur(x), cur(y), cur(z)]));
    } else {
        b.init(Expr::not(Expr::or([cur(x), cur(y), cur(z)])));
    }
    b.next(z, Expr::xor(cur(x), cur(y)));
    b.next(x, cur(y));
    b.next(y, Expr::or([cur(x), cur(z)]));
    b.prop(cur(x));
    if safe {
        Ok(Case {
            name: "easy-safe",
            description: "Three bits starting at 1; x stays set.",
            system: b.build()?,
            expected: Expected::Safe,
            ce_start: None,
        })
    } else {
        Ok(Case {
            name: "easy-unsafe",
            description: "Three bits starting at 0; x is violated immediately.",
            system: b.build()?,
            expected: Expected::Unsafe,
            ce_start: Some(vec![("x", false), ("y", false), ("z", false)]),
        })
    }
}

/// `abcd += 2` with overflow dropped; the property asks for an even value.
fn easy_counter(safe: bool) -> Result<Case, SystemError> {
    let mut b = SystemBuilder::new(if safe {
        "easy-counter-safe"
    } else {
        "easy-counter-unsafe"
    });
    let [a, bb, c, d] = [b.state("a"), b.state("b"), b.state("c"), b.state("d")];
    let d_init = if safe { not(d) } else { cur(d) };
    b.init(Expr::and([not(a), not(bb), not(c), d_init]));
    b.next(d, cur(d));
    b.next(c, Expr::not(cur(c)));
    b.next(bb, Expr::xor(cur(bb), cur(c)));
    b.next(a, Expr::xor(cur(a), Expr::and([cur(bb), cur(c)])));
    b.prop(not(d));
    if safe {
        Ok(Case {
            name: "easy-counter-safe",
            description: "Counter stepping by two from 0 stays even.",
            system: b.build()?,
            expected: Expected::Safe,
            ce_start: None,
        })
    } else {
        Ok(Case {
            name: "easy-counter-unsafe",
            description: "Counter stepping by two from 1 is never even.",
            system: b.build()?,
            expected: Expected::Unsafe,
            ce_start: Some(vec![("d", true)]),
        })
    }
}

fn six_bits(b: &mut SystemBuilder) -> [Var; 6] {
    ["a", "b", "c", "d", "e", "f"].map(|n| b.state(n))
}

/// `abcdef <= 24` over the bits `abcdef` (a most significant).
fn at_most_24(v: &[Var; 6]) -> Expr {
    let [a, b, c, d, e, f] = *v;
    Expr::and([
        not(a),
        Expr::implies(
            Expr::and([cur(b), cur(c)]),
            Expr::not(Expr::or([cur(d), cur(e), cur(f)])),
        ),
    ])
}

fn marginal_algebra_safe() -> Result<Case, SystemError> {
    let mut b = SystemBuilder::new("marginal-algebra-safe");
    let v = six_bits(&mut b);
    let [a, bb, c, d, e, f] = v;
    b.init(Expr::and([not(a), not(bb)]));
    // abcdef = (abcdef + 24) >> 1
    b.next(f, cur(e));
    b.next(e, cur(d));
    b.next(d, Expr::not(cur(c)));
    b.next(c, Expr::not(Expr::xor(cur(bb), cur(c))));
    b.next(bb, Expr::xor(cur(a), Expr::or([cur(bb), cur(c)])));
    b.next(a, Expr::ff());
    b.prop(at_most_24(&v));
    Ok(Case {
        name: "marginal-algebra-safe",
        description: "Below 16, repeatedly add 24 and halve; never exceeds 24.",
        system: b.build()?,
        expected: Expected::Safe,
        ce_start: None,
    })
}

fn marginal_algebra_unsafe() -> Result<Case, SystemError> {
    let mut b = SystemBuilder::new("marginal-algebra-unsafe");
    let v = six_bits(&mut b);
    let [a, bb, c, d, e, f] = v;
    b.init(Expr::and([not(a), not(bb)]));
    // abcdef = (abcdef + 26) >> 1
    let de = Expr::and([cur(d), cur(e)]);
    b.next(f, Expr::not(cur(e)));
    b.next(e, Expr::xor(cur(d), cur(e)));
    b.next(d, Expr::not(Expr::xor(cur(c), de.clone())));
    b.next(c, Expr::not(Expr::xor(cur(bb), Expr::or([cur(c), de.clone()]))));
    b.next(bb, Expr::xor(cur(a), Expr::or([cur(bb), cur(c), de])));
    b.next(a, Expr::ff());
    b.prop(at_most_24(&v));
    Ok(Case {
        name: "marginal-algebra-unsafe",
        description: "Below 16, repeatedly add 26 and halve; eventually exceeds 24.",
        system: b.build()?,
        expected: Expected::Unsafe,
        ce_start: Some(vec![("a", false), ("b", false)]),
    })
}

/// `abc += def` over 3 bits. The carries `z` (bit 0) and `y` (bit 1) are free
/// inputs pinned by the transition relation.
fn adder(
    name: &str,
    init: impl FnOnce(&[Var; 6]) -> Expr,
    prop: impl FnOnce(&[Var; 6]) -> Expr,
) -> Result<TransitionSystem, SystemError> {
    let mut b = SystemBuilder::new(name);
    let v = six_bits(&mut b);
    let y = b.input("y");
    let z = b.input("z");
    let [a, bb, c, d, e, f] = v;
    let maj = |p: Expr, q: Expr, r: Expr| {
        Expr::or([
            Expr::and([p.clone(), q.clone()]),
            Expr::and([q, r.clone()]),
            Expr::and([p, r]),
        ])
    };

    b.next(f, cur(f));
    b.next(e, cur(e));
    b.next(d, cur(d));
    b.next(c, Expr::xor(cur(c), cur(f)));
    b.trans(Expr::iff(z.clone(), Expr::and([cur(c), cur(f)])));
    b.next(bb, Expr::xor(Expr::xor(cur(bb), cur(e)), z.clone()));
    b.trans(Expr::iff(y.clone(), maj(cur(bb), cur(e), z)));
    b.next(a, Expr::xor(Expr::xor(cur(a), cur(d)), y));

    b.init(init(&v));
    b.prop(prop(&v));
    b.build()
}

fn abc_nonzero(v: &[Var; 6]) -> Expr {
    Expr::or([cur(v[0]), cur(v[1]), cur(v[2])])
}

fn adder_safe() -> Result<Case, SystemError> {
    Ok(Case {
        name: "adder-safe",
        description: "abc += def from abc = 0 with a trivial property.",
        system: adder("adder-safe", |v| Expr::not(abc_nonzero(v)), |_| Expr::tt())?,
        expected: Expected::Safe,
        ce_start: None,
    })
}

fn adder_unsafe() -> Result<Case, SystemError> {
    Ok(Case {
        name: "adder-unsafe",
        description: "abc += def from abc != 0 with def odd; abc reaches 0.",
        system: adder(
            "adder-unsafe",
            |v| Expr::and([abc_nonzero(v), cur(v[5])]),
            abc_nonzero,
        )?,
        expected: Expected::Unsafe,
        ce_start: Some(vec![("f", true)]),
    })
}

fn adder_unsafe2() -> Result<Case, SystemError> {
    Ok(Case {
        name: "adder-unsafe2",
        description: "abc += def from abc != 0 with def even; abc can still reach 0.",
        system: adder(
            "adder-unsafe2",
            |v| Expr::and([abc_nonzero(v), not(v[5])]),
            abc_nonzero,
        )?,
        expected: Expected::Unsafe,
        ce_start: Some(vec![("e", false), ("f", false), ("b", false), ("c", false)]),
    })
}

fn adder_safe2() -> Result<Case, SystemError> {
    Ok(Case {
        name: "adder-safe2",
        description: "abc += 2 from abc = 7 never wraps to 0.",
        system: adder(
            "adder-safe2",
            |v| {
                let [a, b, c, d, e, f] = *v;
                Expr::and([cur(a), cur(b), cur(c), not(d), cur(e), not(f)])
            },
            abc_nonzero,
        )?,
        expected: Expected::Safe,
        ce_start: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_names_are_unique_and_findable() {
        let lib = library().unwrap();
        let mut names = lib.iter().map(|c| c.name).collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), lib.len());
        assert!(find("adder-safe2").unwrap().is_some());
        assert!(find("no-such-case").unwrap().is_none());
    }

    #[test]
    fn adder_adds() {
        let sys = adder_safe().unwrap().system;
        // abc=3, def=3 -> abc=6; carries z=1, y=1.
        let from = State::new(vec![false, true, true, false, true, true]);
        let to = State::new(vec![true, true, false, false, true, true]);
        assert!(sys.holds_trans(&from, &[true, true], &to));
        assert!(!sys.holds_trans(&from, &[false, true], &to));
    }

    #[test]
    fn start_hint_compares_named_bits() {
        let case = easy_counter(false).unwrap();
        assert_eq!(case.start_matches(&State::from_bits(4, 0b1000)), Some(true));
        assert_eq!(case.start_matches(&State::from_bits(4, 0)), Some(false));
        assert_eq!(easy(true).unwrap().start_matches(&State::from_bits(3, 0)), None);
    }
}

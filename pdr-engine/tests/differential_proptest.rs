use pdr_engine::{verify, Verdict};
use proptest::{
    prelude::any,
    test_runner::{Config, TestCaseError, TestRunner},
};

mod common;
use common::{from_tables, shortest_counterexample};

#[test]
fn verdicts_match_explicit_reachability_on_random_systems() {
    let mut runner = TestRunner::new(Config {
        cases: 64,
        ..Config::default()
    });
    let strat = (any::<[u16; 3]>(), any::<u8>(), any::<u8>());

    runner
        .run(&strat, |(next, init, prop)| {
            let sys = from_tables(next, init, prop);
            let expected = shortest_counterexample(&sys);
            let verdict = verify(&sys).map_err(|e| TestCaseError::fail(format!("{e:?}")))?;

            match (verdict, expected) {
                (Verdict::Safe(_), None) => Ok(()),
                (Verdict::Unsafe(trace), Some(depth)) => {
                    // Certification already checked the trace; it cannot beat BFS.
                    if trace.depth() < depth {
                        return Err(TestCaseError::fail(format!(
                            "trace of depth {} shorter than shortest path {depth}",
                            trace.depth()
                        )));
                    }
                    Ok(())
                }
                (v, e) => Err(TestCaseError::fail(format!(
                    "verdict {} disagrees with reachability {e:?} (tables {next:?}, init {init:#04x}, prop {prop:#04x})",
                    v.label()
                ))),
            }
        })
        .unwrap();
}

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use pdr_engine::{Stats, Verdict};
use pdr_logic::TransitionSystem;

/// Verdict of one `pdr check`, with every variable referred to by name.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub system: String,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invariant: Option<InvariantReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub stats: Stats,
}

#[derive(Clone, Debug, Serialize)]
pub struct InvariantReport {
    pub level: usize,
    pub property: String,
    pub lemmas: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TraceStep {
    pub state: BTreeMap<String, bool>,
    /// Inputs driving the step to the next state; empty on the last step.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, bool>,
}

fn named(names: &[String], values: &[bool]) -> BTreeMap<String, bool> {
    names.iter().cloned().zip(values.iter().copied()).collect()
}

impl Report {
    pub fn new(system: &TransitionSystem, verdict: &Verdict, stats: Stats) -> Self {
        let mut report = Self {
            system: system.name.clone(),
            verdict: verdict.label(),
            invariant: None,
            trace: None,
            reason: None,
            stats,
        };
        match verdict {
            Verdict::Safe(inv) => {
                report.invariant = Some(InvariantReport {
                    level: inv.level,
                    property: system.render_expr(&inv.property),
                    lemmas: inv.lemmas.iter().map(|c| system.render_clause(c)).collect(),
                });
            }
            Verdict::Unsafe(trace) => {
                let steps = trace
                    .states
                    .iter()
                    .enumerate()
                    .map(|(i, s)| TraceStep {
                        state: named(&system.state_names, s.values()),
                        inputs: trace
                            .inputs
                            .get(i)
                            .map(|v| named(&system.input_names, v))
                            .unwrap_or_default(),
                    })
                    .collect();
                report.trace = Some(steps);
            }
            Verdict::Unknown(reason) => report.reason = Some(reason.to_string()),
        }
        report
    }

    /// Plain-text rendering for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", self.system, self.verdict.to_uppercase());
        if let Some(inv) = &self.invariant {
            let _ = writeln!(out, "  inductive at frame {}", inv.level);
            let _ = writeln!(out, "  property: {}", inv.property);
            for lemma in &inv.lemmas {
                let _ = writeln!(out, "  lemma:    {lemma}");
            }
        }
        if let Some(trace) = &self.trace {
            for (i, step) in trace.iter().enumerate() {
                let state = render_assignment(&step.state);
                if step.inputs.is_empty() {
                    let _ = writeln!(out, "  #{i}: {state}");
                } else {
                    let _ = writeln!(out, "  #{i}: {state}  | {}", render_assignment(&step.inputs));
                }
            }
        }
        if let Some(reason) = &self.reason {
            let _ = writeln!(out, "  {reason}");
        }
        let _ = writeln!(out, "  {}", self.stats);
        out
    }
}

fn render_assignment(values: &BTreeMap<String, bool>) -> String {
    values
        .iter()
        .map(|(k, v)| format!("{k}={}", u8::from(*v)))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdr_engine::{Invariant, Trace, UnknownReason};
    use pdr_logic::{cur, Cube, Expr, Lit, State, SystemBuilder, Var};

    fn toggle() -> TransitionSystem {
        let mut b = SystemBuilder::new("toggle");
        let x = b.state("x");
        let go = b.input("go");
        b.init(Expr::not(cur(x)));
        b.next(x, Expr::xor(cur(x), go));
        b.prop(Expr::not(cur(x)));
        b.build().unwrap()
    }

    #[test]
    fn trace_steps_carry_named_inputs() {
        let sys = toggle();
        let verdict = Verdict::Unsafe(Trace {
            states: vec![State::new(vec![false]), State::new(vec![true])],
            inputs: vec![vec![true]],
        });
        let report = Report::new(&sys, &verdict, Stats::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["verdict"], "unsafe");
        assert_eq!(json["trace"][0]["state"]["x"], false);
        assert_eq!(json["trace"][0]["inputs"]["go"], true);
        assert!(json["trace"][1].get("inputs").is_none());
        assert!(report.render().contains("#1: x=1"));
    }

    #[test]
    fn invariant_lemmas_are_rendered_by_name() {
        let sys = toggle();
        let verdict = Verdict::Safe(Invariant {
            lemmas: vec![Cube::new([Lit::pos(Var(0))]).negate()],
            property: sys.prop.clone(),
            level: 1,
        });
        let report = Report::new(&sys, &verdict, Stats::default());
        let inv = report.invariant.as_ref().unwrap();
        assert_eq!(inv.lemmas, vec!["!x".to_string()]);
    }

    #[test]
    fn unknown_keeps_its_reason() {
        let report = Report::new(
            &toggle(),
            &Verdict::Unknown(UnknownReason::FrameLimit { limit: 4 }),
            Stats::default(),
        );
        assert_eq!(report.reason.as_deref(), Some("frame limit 4 reached"));
        assert!(report.render().contains("UNKNOWN"));
    }
}

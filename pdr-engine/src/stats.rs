#![forbid(unsafe_code)]

use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueryStats {
    pub sat: u64,
    pub unsat: u64,
    pub unknown: u64,
}

impl QueryStats {
    pub fn total(&self) -> u64 {
        self.sat + self.unsat + self.unknown
    }
}

/// Counters collected over one verification run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub queries: QueryStats,
    pub frames: usize,
    pub obligations: u64,
    pub blocked: u64,
    pub lemmas: u64,
    pub propagated: u64,
    pub literals_dropped: u64,
    pub max_depth: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames={} queries={} (sat {}, unsat {}, unknown {}) obligations={} blocked={} lemmas={} propagated={} dropped={} max_depth={}",
            self.frames,
            self.queries.total(),
            self.queries.sat,
            self.queries.unsat,
            self.queries.unknown,
            self.obligations,
            self.blocked,
            self.lemmas,
            self.propagated,
            self.literals_dropped,
            self.max_depth
        )
    }
}

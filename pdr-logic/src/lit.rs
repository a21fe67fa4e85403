#![forbid(unsafe_code)]

use std::fmt;
use std::ops::Not;

use serde::{Deserialize, Serialize};

/// Index of a current-state variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Var(pub u32);

impl Var {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A state-variable literal packed as `var << 1 | negated`.
///
/// Literals order by variable first, so a sorted literal list groups both
/// polarities of one variable next to each other.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lit(u32);

impl Lit {
    pub fn new(var: Var, positive: bool) -> Self {
        Lit((var.0 << 1) | u32::from(!positive))
    }

    pub fn pos(var: Var) -> Self {
        Self::new(var, true)
    }

    pub fn neg(var: Var) -> Self {
        Self::new(var, false)
    }

    pub fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    pub fn is_positive(self) -> bool {
        self.0 & 1 == 0
    }

    pub fn code(self) -> u32 {
        self.0
    }

    /// True when `value` (the variable's value) makes this literal true.
    pub fn holds_for(self, value: bool) -> bool {
        value == self.is_positive()
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_positive() {
            write!(f, "{}", self.var())
        } else {
            write!(f, "!{}", self.var())
        }
    }
}

fn normalize(mut lits: Vec<Lit>) -> Vec<Lit> {
    lits.sort_unstable();
    lits.dedup();
    lits
}

fn is_subset(small: &[Lit], big: &[Lit]) -> bool {
    if small.len() > big.len() {
        return false;
    }
    let mut it = big.iter();
    'outer: for l in small {
        for b in it.by_ref() {
            if b == l {
                continue 'outer;
            }
            if b > l {
                return false;
            }
        }
        return false;
    }
    true
}

/// Conjunction of literals: a (possibly partial) state or set of states.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Lit>", into = "Vec<Lit>")]
pub struct Cube {
    lits: Vec<Lit>,
}

impl Cube {
    pub fn new(lits: impl IntoIterator<Item = Lit>) -> Self {
        Self {
            lits: normalize(lits.into_iter().collect()),
        }
    }

    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    pub fn contains(&self, lit: Lit) -> bool {
        self.lits.binary_search(&lit).is_ok()
    }

    /// A cube holding both `l` and `!l` denotes no state at all.
    pub fn is_contradictory(&self) -> bool {
        self.lits.windows(2).any(|w| w[0].var() == w[1].var())
    }

    /// `self` is a sub-cube of `other`: every state in `other` is in `self`.
    pub fn subsumes(&self, other: &Cube) -> bool {
        is_subset(&self.lits, &other.lits)
    }

    pub fn without(&self, lit: Lit) -> Cube {
        Cube {
            lits: self.lits.iter().copied().filter(|l| *l != lit).collect(),
        }
    }

    pub fn with(&self, lit: Lit) -> Cube {
        let mut lits = self.lits.clone();
        if let Err(pos) = lits.binary_search(&lit) {
            lits.insert(pos, lit);
        }
        Cube { lits }
    }

    pub fn negate(&self) -> Clause {
        Clause::new(self.lits.iter().map(|l| !*l))
    }

    pub fn satisfied_by(&self, state: &State) -> bool {
        self.lits.iter().all(|l| state.satisfies(*l))
    }
}

impl From<Vec<Lit>> for Cube {
    fn from(lits: Vec<Lit>) -> Self {
        Cube { lits: normalize(lits) }
    }
}

impl From<Cube> for Vec<Lit> {
    fn from(cube: Cube) -> Self {
        cube.lits
    }
}

impl FromIterator<Lit> for Cube {
    fn from_iter<I: IntoIterator<Item = Lit>>(iter: I) -> Self {
        Cube::new(iter)
    }
}

impl fmt::Debug for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lits.is_empty() {
            return write!(f, "true");
        }
        let parts = self.lits.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        write!(f, "{}", parts.join(" & "))
    }
}

/// Disjunction of literals; always the negation of some cube.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Lit>", into = "Vec<Lit>")]
pub struct Clause {
    lits: Vec<Lit>,
}

impl Clause {
    pub fn new(lits: impl IntoIterator<Item = Lit>) -> Self {
        Self {
            lits: normalize(lits.into_iter().collect()),
        }
    }

    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// `self` implies `other` (its literals are a subset of `other`'s).
    pub fn subsumes(&self, other: &Clause) -> bool {
        is_subset(&self.lits, &other.lits)
    }

    pub fn negate(&self) -> Cube {
        Cube::new(self.lits.iter().map(|l| !*l))
    }

    pub fn satisfied_by(&self, state: &State) -> bool {
        self.lits.iter().any(|l| state.satisfies(*l))
    }
}

impl From<Vec<Lit>> for Clause {
    fn from(lits: Vec<Lit>) -> Self {
        Clause { lits: normalize(lits) }
    }
}

impl From<Clause> for Vec<Lit> {
    fn from(clause: Clause) -> Self {
        clause.lits
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lits.is_empty() {
            return write!(f, "false");
        }
        let parts = self.lits.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        write!(f, "{}", parts.join(" | "))
    }
}

/// A complete assignment to the current-state variables.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct State {
    values: Vec<bool>,
}

impl State {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// State whose variables spell `value` in binary, variable 0 as the least significant bit.
    /// Variables past bit 63 are false.
    pub fn from_bits(width: usize, value: u64) -> Self {
        Self {
            values: (0..width).map(|i| i < 64 && (value >> i) & 1 == 1).collect(),
        }
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, var: Var) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    pub fn satisfies(&self, lit: Lit) -> bool {
        lit.holds_for(self.get(lit.var()))
    }

    pub fn to_cube(&self) -> Cube {
        Cube {
            lits: self
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| Lit::new(Var(i as u32), *v))
                .collect(),
        }
    }

    /// Inverse of [`State::from_bits`]; `None` once a set variable lies past bit 63.
    pub fn to_bits(&self) -> Option<u64> {
        self.values.iter().enumerate().try_fold(0u64, |acc, (i, v)| {
            if !*v {
                return Some(acc);
            }
            let bit = 1u64.checked_shl(u32::try_from(i).ok()?)?;
            Some(acc | bit)
        })
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in &self.values {
            write!(f, "{}", if *v { '1' } else { '0' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(v: u32, pos: bool) -> Lit {
        Lit::new(Var(v), pos)
    }

    #[test]
    fn lit_packing_round_trips_polarity() {
        let a = l(3, true);
        assert_eq!(a.var(), Var(3));
        assert!(a.is_positive());
        assert!(!(!a).is_positive());
        assert_eq!(!!a, a);
        assert!(l(2, false) < l(3, true));
    }

    #[test]
    fn cube_is_normalized_and_subsumption_is_containment() {
        let big = Cube::new([l(2, true), l(0, false), l(1, true), l(0, false)]);
        assert_eq!(big.len(), 3);
        let small = Cube::new([l(2, true), l(0, false)]);
        assert!(small.subsumes(&big));
        assert!(!big.subsumes(&small));
        assert!(Cube::default().subsumes(&big));
        assert_eq!(big.without(l(1, true)), small);
        assert_eq!(small.with(l(1, true)), big);
    }

    #[test]
    fn contradictory_cube_is_detected() {
        assert!(Cube::new([l(1, true), l(1, false)]).is_contradictory());
        assert!(!Cube::new([l(1, true), l(2, false)]).is_contradictory());
    }

    #[test]
    fn clause_is_negation_of_cube() {
        let c = Cube::new([l(0, true), l(1, false)]);
        let cl = c.negate();
        assert_eq!(cl.lits(), &[l(0, false), l(1, true)]);
        assert_eq!(cl.negate(), c);

        let s = State::new(vec![true, false]);
        assert!(c.satisfied_by(&s));
        assert!(!cl.satisfied_by(&s));
    }

    #[test]
    fn state_bits_and_cube_agree() {
        let s = State::from_bits(3, 5);
        assert_eq!(s.values(), &[true, false, true]);
        assert_eq!(s.to_bits(), Some(5));
        assert!(s.to_cube().satisfied_by(&s));
        assert_eq!(s.to_cube().len(), 3);
        assert_eq!(s.to_string(), "101");
    }

    #[test]
    fn empty_forms_render_as_constants() {
        assert_eq!(Cube::default().to_string(), "true");
        assert_eq!(Clause::default().to_string(), "false");
    }

    #[test]
    fn wide_states_do_not_overflow_bit_helpers() {
        let mut values = vec![false; 70];
        values[63] = true;
        assert_eq!(State::new(values.clone()).to_bits(), Some(1 << 63));
        values[69] = true;
        assert_eq!(State::new(values).to_bits(), None);

        let s = State::from_bits(70, u64::MAX);
        assert!(s.get(Var(63)));
        assert!(!s.get(Var(64)) && !s.get(Var(69)));
    }

    #[test]
    fn deserialized_literal_lists_are_normalized() {
        // Packed literals: 4 = v2, 0 = v0, 2 = v1.
        let cube: Cube = serde_json::from_str("[4, 0, 2, 0]").unwrap();
        assert_eq!(cube, Cube::new([l(0, true), l(1, true), l(2, true)]));
        assert!(cube.contains(l(1, true)));
        assert!(Cube::new([l(2, true), l(0, true)]).subsumes(&cube));
        assert_eq!(serde_json::to_string(&cube).unwrap(), "[0,2,4]");

        let clause: Clause = serde_json::from_str("[5, 1, 5]").unwrap();
        assert_eq!(clause.lits(), &[l(0, false), l(2, false)]);
        assert_eq!(serde_json::from_str::<Clause>("[1,5]").unwrap(), clause);
    }
}

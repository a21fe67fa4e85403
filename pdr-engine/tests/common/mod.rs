#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};

use pdr_logic::{cur, Expr, State, SystemBuilder, TransitionSystem, Var};

/// One-bit latch: Init x=0, x' = x, Prop x=0.
pub fn latch() -> TransitionSystem {
    let mut b = SystemBuilder::new("latch");
    let x = b.state("x");
    b.init(Expr::not(cur(x)));
    b.next(x, cur(x));
    b.prop(Expr::not(cur(x)));
    b.build().expect("latch")
}

/// 3-bit counter x' = x + 1 mod 8 from 0, Prop x != `bad`.
pub fn counter3(bad: u64) -> TransitionSystem {
    let mut b = SystemBuilder::new(format!("counter3-not-{bad}"));
    let x = [b.state("x0"), b.state("x1"), b.state("x2")];
    b.init(Expr::and(x.iter().map(|v| Expr::not(cur(*v)))));
    b.next(x[0], Expr::not(cur(x[0])));
    b.next(x[1], Expr::xor(cur(x[1]), cur(x[0])));
    b.next(x[2], Expr::xor(cur(x[2]), Expr::and([cur(x[1]), cur(x[0])])));
    b.prop(Expr::not(value_is(&x, bad)));
    b.build().expect("counter3")
}

fn value_is(vars: &[Var], value: u64) -> Expr {
    Expr::and(vars.iter().enumerate().map(|(i, v)| {
        if (value >> i) & 1 == 1 {
            cur(*v)
        } else {
            Expr::not(cur(*v))
        }
    }))
}

/// Two bits, each kept alive only while its own input clock is high.
/// Init and Prop both exclude a=b=1.
pub fn clocked_pair() -> TransitionSystem {
    let mut b = SystemBuilder::new("clocked-pair");
    let a = b.state("a");
    let bb = b.state("b");
    let ca = b.input("ca");
    let cb = b.input("cb");
    b.init(Expr::not(Expr::and([cur(a), cur(bb)])));
    b.next(a, Expr::and([cur(a), ca]));
    b.next(bb, Expr::and([cur(bb), cb]));
    b.prop(Expr::not(Expr::and([cur(a), cur(bb)])));
    b.build().expect("clocked pair")
}

/// Truth table over `vars` (first var = least significant row bit) as a DNF.
fn table_expr(vars: &[Expr], table: u64) -> Expr {
    let rows = 1u64 << vars.len();
    Expr::or((0..rows).filter(|r| (table >> r) & 1 == 1).map(|r| {
        Expr::and(vars.iter().enumerate().map(|(i, v)| {
            if (r >> i) & 1 == 1 {
                v.clone()
            } else {
                Expr::not(v.clone())
            }
        }))
    }))
}

/// Three state bits and one input; each next-state function is a 16-row table
/// over (x0, x1, x2, in).
pub fn from_tables(next: [u16; 3], init: u8, prop: u8) -> TransitionSystem {
    let mut b = SystemBuilder::new("random");
    let x = [b.state("x0"), b.state("x1"), b.state("x2")];
    let input = b.input("in");
    let cur_vars = x.iter().map(|v| cur(*v)).collect::<Vec<_>>();
    let mut all = cur_vars.clone();
    all.push(input);
    for (v, table) in x.iter().zip(next) {
        b.next(*v, table_expr(&all, u64::from(table)));
    }
    b.init(table_expr(&cur_vars, u64::from(init)));
    b.prop(table_expr(&cur_vars, u64::from(prop)));
    b.build().expect("table system")
}

pub fn all_states(width: usize) -> impl Iterator<Item = State> {
    (0..(1u64 << width)).map(move |v| State::from_bits(width, v))
}

fn all_inputs(width: usize) -> impl Iterator<Item = Vec<bool>> {
    (0..(1u64 << width)).map(move |v| (0..width).map(|i| (v >> i) & 1 == 1).collect())
}

/// Length (in transitions) of the shortest path from Init to a `!Prop` state.
pub fn shortest_counterexample(sys: &TransitionSystem) -> Option<usize> {
    let n = sys.num_states();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    for s in all_states(n).filter(|s| sys.holds_init(s)) {
        seen.insert(s.to_bits());
        queue.push_back((s, 0usize));
    }
    while let Some((s, depth)) = queue.pop_front() {
        if !sys.holds_prop(&s) {
            return Some(depth);
        }
        for t in all_states(n) {
            if seen.contains(&t.to_bits()) {
                continue;
            }
            if all_inputs(sys.num_inputs()).any(|i| sys.holds_trans(&s, &i, &t)) {
                seen.insert(t.to_bits());
                queue.push_back((t, depth + 1));
            }
        }
    }
    None
}

/// Six bits `abcdef` updated as `abcdef = (abcdef + 24) >> 1` from any value
/// below 16; the value never exceeds 24.
pub fn shift_average() -> TransitionSystem {
    let mut b = SystemBuilder::new("shift-average");
    let [a, bb, c, d, e, f] = ["a", "b", "c", "d", "e", "f"].map(|n| b.state(n));
    b.init(Expr::and([Expr::not(cur(a)), Expr::not(cur(bb))]));
    b.next(f, cur(e));
    b.next(e, cur(d));
    b.next(d, Expr::xor(cur(c), Expr::tt()));
    b.next(c, Expr::not(Expr::xor(cur(bb), cur(c))));
    b.next(bb, Expr::xor(cur(a), Expr::or([cur(bb), cur(c)])));
    b.next(a, Expr::ff());
    b.prop(Expr::and([
        Expr::not(cur(a)),
        Expr::implies(
            Expr::and([cur(bb), cur(c)]),
            Expr::not(Expr::or([cur(d), cur(e), cur(f)])),
        ),
    ]));
    b.build().expect("shift average")
}

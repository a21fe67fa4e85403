#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lit::{Clause, Cube, Lit, Var};

/// A symbol of the variable universe: current-state, next-state or input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Cur(Var),
    Next(Var),
    Input(u32),
}

impl Symbol {
    pub fn primed(self) -> Symbol {
        match self {
            Symbol::Cur(v) => Symbol::Next(v),
            other => other,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Cur(v) => write!(f, "{v}"),
            Symbol::Next(v) => write!(f, "{v}'"),
            Symbol::Input(i) => write!(f, "in{i}"),
        }
    }
}

/// Boolean formula over [`Symbol`]s.
///
/// The engine never looks inside these beyond priming and conjunction; the
/// oracle backends and the trace checker are the only consumers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Const(bool),
    Sym(Symbol),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Xor(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn tt() -> Expr {
        Expr::Const(true)
    }

    pub fn ff() -> Expr {
        Expr::Const(false)
    }

    pub fn cur(var: u32) -> Expr {
        Expr::Sym(Symbol::Cur(Var(var)))
    }

    pub fn next(var: u32) -> Expr {
        Expr::Sym(Symbol::Next(Var(var)))
    }

    pub fn input(idx: u32) -> Expr {
        Expr::Sym(Symbol::Input(idx))
    }

    pub fn lit(lit: Lit, primed: bool) -> Expr {
        let sym = if primed {
            Symbol::Next(lit.var())
        } else {
            Symbol::Cur(lit.var())
        };
        if lit.is_positive() {
            Expr::Sym(sym)
        } else {
            Expr::Not(Box::new(Expr::Sym(sym)))
        }
    }

    pub fn not(e: Expr) -> Expr {
        match e {
            Expr::Const(b) => Expr::Const(!b),
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    pub fn and(es: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(es.into_iter().collect())
    }

    pub fn or(es: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(es.into_iter().collect())
    }

    pub fn xor(a: Expr, b: Expr) -> Expr {
        Expr::Xor(Box::new(a), Box::new(b))
    }

    pub fn iff(a: Expr, b: Expr) -> Expr {
        Expr::Iff(Box::new(a), Box::new(b))
    }

    pub fn implies(a: Expr, b: Expr) -> Expr {
        Expr::Implies(Box::new(a), Box::new(b))
    }

    pub fn ite(c: Expr, t: Expr, e: Expr) -> Expr {
        Expr::Ite(Box::new(c), Box::new(t), Box::new(e))
    }

    pub fn cube(cube: &Cube, primed: bool) -> Expr {
        Expr::And(cube.lits().iter().map(|l| Expr::lit(*l, primed)).collect())
    }

    pub fn clause(clause: &Clause, primed: bool) -> Expr {
        Expr::Or(clause.lits().iter().map(|l| Expr::lit(*l, primed)).collect())
    }

    /// Replace every current-state symbol by its next-state twin.
    pub fn prime(&self) -> Expr {
        self.map_symbols(&|s| s.primed())
    }

    pub fn map_symbols(&self, f: &dyn Fn(Symbol) -> Symbol) -> Expr {
        match self {
            Expr::Const(b) => Expr::Const(*b),
            Expr::Sym(s) => Expr::Sym(f(*s)),
            Expr::Not(e) => Expr::Not(Box::new(e.map_symbols(f))),
            Expr::And(es) => Expr::And(es.iter().map(|e| e.map_symbols(f)).collect()),
            Expr::Or(es) => Expr::Or(es.iter().map(|e| e.map_symbols(f)).collect()),
            Expr::Xor(a, b) => Expr::Xor(Box::new(a.map_symbols(f)), Box::new(b.map_symbols(f))),
            Expr::Iff(a, b) => Expr::Iff(Box::new(a.map_symbols(f)), Box::new(b.map_symbols(f))),
            Expr::Implies(a, b) => {
                Expr::Implies(Box::new(a.map_symbols(f)), Box::new(b.map_symbols(f)))
            }
            Expr::Ite(c, t, e) => Expr::Ite(
                Box::new(c.map_symbols(f)),
                Box::new(t.map_symbols(f)),
                Box::new(e.map_symbols(f)),
            ),
        }
    }

    pub fn eval(&self, env: &dyn Fn(Symbol) -> bool) -> bool {
        match self {
            Expr::Const(b) => *b,
            Expr::Sym(s) => env(*s),
            Expr::Not(e) => !e.eval(env),
            Expr::And(es) => es.iter().all(|e| e.eval(env)),
            Expr::Or(es) => es.iter().any(|e| e.eval(env)),
            Expr::Xor(a, b) => a.eval(env) != b.eval(env),
            Expr::Iff(a, b) => a.eval(env) == b.eval(env),
            Expr::Implies(a, b) => !a.eval(env) || b.eval(env),
            Expr::Ite(c, t, e) => {
                if c.eval(env) {
                    t.eval(env)
                } else {
                    e.eval(env)
                }
            }
        }
    }

    pub fn visit_symbols(&self, f: &mut dyn FnMut(Symbol)) {
        match self {
            Expr::Const(_) => {}
            Expr::Sym(s) => f(*s),
            Expr::Not(e) => e.visit_symbols(f),
            Expr::And(es) | Expr::Or(es) => es.iter().for_each(|e| e.visit_symbols(f)),
            Expr::Xor(a, b) | Expr::Iff(a, b) | Expr::Implies(a, b) => {
                a.visit_symbols(f);
                b.visit_symbols(f);
            }
            Expr::Ite(c, t, e) => {
                c.visit_symbols(f);
                t.visit_symbols(f);
                e.visit_symbols(f);
            }
        }
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        self.visit_symbols(&mut |s| out.push(s));
        out.sort();
        out.dedup();
        out
    }

    pub fn render(&self, name: &dyn Fn(Symbol) -> String) -> String {
        fn join(es: &[Expr], sep: &str, empty: &str, name: &dyn Fn(Symbol) -> String) -> String {
            if es.is_empty() {
                return empty.to_string();
            }
            let parts = es.iter().map(|e| e.render(name)).collect::<Vec<_>>();
            format!("({})", parts.join(sep))
        }
        match self {
            Expr::Const(b) => b.to_string(),
            Expr::Sym(s) => name(*s),
            Expr::Not(e) => format!("!{}", e.render(name)),
            Expr::And(es) => join(es, " & ", "true", name),
            Expr::Or(es) => join(es, " | ", "false", name),
            Expr::Xor(a, b) => format!("({} ^ {})", a.render(name), b.render(name)),
            Expr::Iff(a, b) => format!("({} == {})", a.render(name), b.render(name)),
            Expr::Implies(a, b) => format!("({} -> {})", a.render(name), b.render(name)),
            Expr::Ite(c, t, e) => format!(
                "(if {} then {} else {})",
                c.render(name),
                t.render(name),
                e.render(name)
            ),
        }
    }
}

impl From<&Cube> for Expr {
    fn from(cube: &Cube) -> Expr {
        Expr::cube(cube, false)
    }
}

impl From<&Clause> for Expr {
    fn from(clause: &Clause) -> Expr {
        Expr::clause(clause, false)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&|s| s.to_string()))
    }
}

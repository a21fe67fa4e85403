#![forbid(unsafe_code)]
#![allow(unused_assignments)]

//! JSON model files.
//!
//! ```json
//! {
//!   "name": "latch",
//!   "states": ["x"],
//!   "init": {"not": "x"},
//!   "next": {"x": "x"},
//!   "prop": {"not": "x"}
//! }
//! ```
//!
//! A term is `true`/`false`, a variable name (`"x"`, `"x'"` for the next-state
//! copy, or an input name), or a single-key object: `not`, `and`, `or`,
//! `xor`, `iff`, `implies`, `ite`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pdr_logic::{Expr, Symbol, SystemBuilder, TransitionSystem, Var};

#[derive(Debug, Error, Diagnostic)]
#[error("model error: {message}")]
#[diagnostic(code(pdr::model))]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    Const(bool),
    Name(String),
    Op(Op),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Xor(Box<Term>, Box<Term>),
    Iff(Box<Term>, Box<Term>),
    Implies(Box<Term>, Box<Term>),
    Ite(Box<Term>, Box<Term>, Box<Term>),
}

fn default_true() -> Term {
    Term::Const(true)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    pub name: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    pub init: Term,
    /// Next-state functions, `x' == term`.
    #[serde(default)]
    pub next: BTreeMap<String, Term>,
    /// Extra transition constraints.
    #[serde(default = "default_true")]
    pub trans: Term,
    pub prop: Term,
}

impl ModelFile {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ModelError::new(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&raw)
            .map_err(|e| ModelError::new(format!("{}: {}", path.display(), e.message)))
    }

    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        serde_json::from_str(raw).map_err(|e| ModelError::new(format!("invalid model json: {e}")))
    }

    pub fn to_system(&self) -> Result<TransitionSystem, ModelError> {
        let mut b = SystemBuilder::new(self.name.clone());
        for s in &self.states {
            b.state(s.clone());
        }
        for i in &self.inputs {
            b.input(i.clone());
        }
        let scope = Scope { model: self };

        b.init(scope.resolve(&self.init)?);
        for (name, term) in &self.next {
            let var = scope
                .state(name)
                .ok_or_else(|| ModelError::new(format!("`next` assigns unknown state `{name}`")))?;
            b.next(var, scope.resolve(term)?);
        }
        if self.trans != Term::Const(true) {
            b.trans(scope.resolve(&self.trans)?);
        }
        b.prop(scope.resolve(&self.prop)?);

        b.build().map_err(|e| ModelError::new(e.to_string()))
    }

    /// Inverse of [`ModelFile::to_system`]; next-state constraints land in `trans`.
    pub fn from_system(sys: &TransitionSystem) -> Self {
        Self {
            name: sys.name.clone(),
            states: sys.state_names.clone(),
            inputs: sys.input_names.clone(),
            init: Term::from_expr(sys, &sys.init),
            next: BTreeMap::new(),
            trans: Term::from_expr(sys, &sys.trans),
            prop: Term::from_expr(sys, &sys.prop),
        }
    }
}

struct Scope<'m> {
    model: &'m ModelFile,
}

impl Scope<'_> {
    fn state(&self, name: &str) -> Option<Var> {
        self.model
            .states
            .iter()
            .position(|s| s == name)
            .map(|i| Var(i as u32))
    }

    fn symbol(&self, name: &str) -> Result<Symbol, ModelError> {
        if let Some(base) = name.strip_suffix('\'') {
            return self
                .state(base)
                .map(Symbol::Next)
                .ok_or_else(|| ModelError::new(format!("`{name}` primes an unknown state variable")));
        }
        if let Some(v) = self.state(name) {
            return Ok(Symbol::Cur(v));
        }
        self.model
            .inputs
            .iter()
            .position(|i| i == name)
            .map(|i| Symbol::Input(i as u32))
            .ok_or_else(|| ModelError::new(format!("unknown variable `{name}`")))
    }

    fn resolve(&self, t: &Term) -> Result<Expr, ModelError> {
        let bin = |a: &Term, b: &Term| -> Result<(Expr, Expr), ModelError> {
            Ok((self.resolve(a)?, self.resolve(b)?))
        };
        Ok(match t {
            Term::Const(b) => Expr::Const(*b),
            Term::Name(n) => Expr::Sym(self.symbol(n)?),
            Term::Op(Op::Not(a)) => Expr::Not(Box::new(self.resolve(a)?)),
            Term::Op(Op::And(ts)) => Expr::And(ts.iter().map(|t| self.resolve(t)).collect::<Result<_, _>>()?),
            Term::Op(Op::Or(ts)) => Expr::Or(ts.iter().map(|t| self.resolve(t)).collect::<Result<_, _>>()?),
            Term::Op(Op::Xor(a, b)) => {
                let (a, b) = bin(a, b)?;
                Expr::xor(a, b)
            }
            Term::Op(Op::Iff(a, b)) => {
                let (a, b) = bin(a, b)?;
                Expr::iff(a, b)
            }
            Term::Op(Op::Implies(a, b)) => {
                let (a, b) = bin(a, b)?;
                Expr::implies(a, b)
            }
            Term::Op(Op::Ite(c, a, b)) => {
                let (a, b) = bin(a, b)?;
                Expr::ite(self.resolve(c)?, a, b)
            }
        })
    }
}

impl Term {
    pub fn from_expr(sys: &TransitionSystem, e: &Expr) -> Term {
        let b = |x: &Expr| Box::new(Term::from_expr(sys, x));
        match e {
            Expr::Const(v) => Term::Const(*v),
            Expr::Sym(s) => Term::Name(sys.symbol_name(*s)),
            Expr::Not(a) => Term::Op(Op::Not(b(a))),
            Expr::And(es) => Term::Op(Op::And(es.iter().map(|x| Term::from_expr(sys, x)).collect())),
            Expr::Or(es) => Term::Op(Op::Or(es.iter().map(|x| Term::from_expr(sys, x)).collect())),
            Expr::Xor(x, y) => Term::Op(Op::Xor(b(x), b(y))),
            Expr::Iff(x, y) => Term::Op(Op::Iff(b(x), b(y))),
            Expr::Implies(x, y) => Term::Op(Op::Implies(b(x), b(y))),
            Expr::Ite(c, x, y) => Term::Op(Op::Ite(b(c), b(x), b(y))),
        }
    }
}

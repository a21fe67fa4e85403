#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{Expr, Symbol};
use crate::lit::{Clause, Cube, Lit, State, Var};

#[derive(Debug, Error, Diagnostic)]
#[error("malformed transition system `{system}`: {message}")]
#[diagnostic(code(pdr::system))]
pub struct SystemError {
    pub system: String,
    pub message: String,
}

/// Sizes of the symbol universe a query may mention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub states: usize,
    pub inputs: usize,
}

impl Vocabulary {
    pub fn contains(&self, sym: Symbol) -> bool {
        match sym {
            Symbol::Cur(v) | Symbol::Next(v) => v.index() < self.states,
            Symbol::Input(i) => (i as usize) < self.inputs,
        }
    }
}

/// A finite-state transition system over boolean state variables.
///
/// `init` and `prop` range over current-state symbols; `trans` may mention
/// current-state, input and next-state symbols.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionSystem {
    pub name: String,
    pub state_names: Vec<String>,
    pub input_names: Vec<String>,
    pub init: Expr,
    pub trans: Expr,
    pub prop: Expr,
}

impl TransitionSystem {
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            states: self.state_names.len(),
            inputs: self.input_names.len(),
        }
    }

    pub fn num_states(&self) -> usize {
        self.state_names.len()
    }

    pub fn num_inputs(&self) -> usize {
        self.input_names.len()
    }

    /// Fail fast on formulas that step outside the declared variable sets.
    pub fn validate(&self) -> Result<(), SystemError> {
        let vocab = self.vocabulary();
        let check = |what: &str, e: &Expr, current_only: bool| -> Result<(), SystemError> {
            for sym in e.symbols() {
                if !vocab.contains(sym) {
                    return Err(self.error(format!("{what} mentions undeclared symbol {sym}")));
                }
                if current_only && !matches!(sym, Symbol::Cur(_)) {
                    return Err(self.error(format!(
                        "{what} must range over current-state variables, found {}",
                        self.symbol_name(sym)
                    )));
                }
            }
            Ok(())
        };
        check("init", &self.init, true)?;
        check("prop", &self.prop, true)?;
        check("trans", &self.trans, false)?;

        let mut names = std::collections::BTreeSet::new();
        for n in self.state_names.iter().chain(self.input_names.iter()) {
            if !names.insert(n.as_str()) {
                return Err(self.error(format!("duplicate variable name `{n}`")));
            }
        }
        Ok(())
    }

    fn error(&self, message: String) -> SystemError {
        SystemError {
            system: self.name.clone(),
            message,
        }
    }

    pub fn symbol_name(&self, sym: Symbol) -> String {
        match sym {
            Symbol::Cur(v) => self.var_name(v),
            Symbol::Next(v) => format!("{}'", self.var_name(v)),
            Symbol::Input(i) => self
                .input_names
                .get(i as usize)
                .cloned()
                .unwrap_or_else(|| format!("in{i}")),
        }
    }

    pub fn var_name(&self, var: Var) -> String {
        self.state_names
            .get(var.index())
            .cloned()
            .unwrap_or_else(|| var.to_string())
    }

    pub fn var_by_name(&self, name: &str) -> Option<Var> {
        self.state_names
            .iter()
            .position(|n| n == name)
            .map(|i| Var(i as u32))
    }

    pub fn render_lit(&self, lit: Lit) -> String {
        if lit.is_positive() {
            self.var_name(lit.var())
        } else {
            format!("!{}", self.var_name(lit.var()))
        }
    }

    pub fn render_cube(&self, cube: &Cube) -> String {
        if cube.is_empty() {
            return "true".to_string();
        }
        cube.lits()
            .iter()
            .map(|l| self.render_lit(*l))
            .collect::<Vec<_>>()
            .join(" & ")
    }

    pub fn render_clause(&self, clause: &Clause) -> String {
        if clause.is_empty() {
            return "false".to_string();
        }
        clause
            .lits()
            .iter()
            .map(|l| self.render_lit(*l))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn render_state(&self, state: &State) -> String {
        state
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{}={}", self.var_name(Var(i as u32)), u8::from(*v)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn render_expr(&self, e: &Expr) -> String {
        e.render(&|s| self.symbol_name(s))
    }

    pub fn holds_init(&self, state: &State) -> bool {
        self.init.eval(&|s| match s {
            Symbol::Cur(v) => state.get(v),
            _ => false,
        })
    }

    pub fn holds_prop(&self, state: &State) -> bool {
        self.prop.eval(&|s| match s {
            Symbol::Cur(v) => state.get(v),
            _ => false,
        })
    }

    pub fn holds_trans(&self, from: &State, inputs: &[bool], to: &State) -> bool {
        self.trans.eval(&|s| match s {
            Symbol::Cur(v) => from.get(v),
            Symbol::Next(v) => to.get(v),
            Symbol::Input(i) => inputs.get(i as usize).copied().unwrap_or(false),
        })
    }
}

/// Incremental construction of a [`TransitionSystem`] by variable name.
#[derive(Clone, Debug, Default)]
pub struct SystemBuilder {
    name: String,
    state_names: Vec<String>,
    input_names: Vec<String>,
    init: Vec<Expr>,
    trans: Vec<Expr>,
    prop: Vec<Expr>,
}

impl SystemBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a state variable.
    pub fn state(&mut self, name: impl Into<String>) -> Var {
        self.state_names.push(name.into());
        Var((self.state_names.len() - 1) as u32)
    }

    pub fn input(&mut self, name: impl Into<String>) -> Expr {
        self.input_names.push(name.into());
        Expr::input((self.input_names.len() - 1) as u32)
    }

    pub fn init(&mut self, e: Expr) -> &mut Self {
        self.init.push(e);
        self
    }

    pub fn trans(&mut self, e: Expr) -> &mut Self {
        self.trans.push(e);
        self
    }

    /// Constrain `var'` to equal `next`.
    pub fn next(&mut self, var: Var, next: Expr) -> &mut Self {
        self.trans.push(Expr::iff(Expr::Sym(Symbol::Next(var)), next));
        self
    }

    pub fn prop(&mut self, e: Expr) -> &mut Self {
        self.prop.push(e);
        self
    }

    pub fn build(&self) -> Result<TransitionSystem, SystemError> {
        let conj = |es: &[Expr]| match es {
            [single] => single.clone(),
            many => Expr::And(many.to_vec()),
        };
        let sys = TransitionSystem {
            name: self.name.clone(),
            state_names: self.state_names.clone(),
            input_names: self.input_names.clone(),
            init: conj(&self.init),
            trans: conj(&self.trans),
            prop: conj(&self.prop),
        };
        sys.validate()?;
        Ok(sys)
    }
}

pub fn cur(var: Var) -> Expr {
    Expr::Sym(Symbol::Cur(var))
}

pub fn next(var: Var) -> Expr {
    Expr::Sym(Symbol::Next(var))
}

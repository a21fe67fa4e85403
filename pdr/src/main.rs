#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, miette};
use tracing_subscriber::EnvFilter;

use pdr::cases::{self, CaseOutcome};
use pdr::config::{self, Overrides};
use pdr::{ModelFile, Report};
use pdr_engine::{DropOrder, PdrOptions, PdrProfile, TieBreak};

#[derive(Parser, Debug)]
#[command(name = "pdr", version, about = "Property-directed reachability safety checker")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ProfileArg {
    Fast,
    Ci,
    Thorough,
}

impl From<ProfileArg> for PdrProfile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Fast => PdrProfile::Fast,
            ProfileArg::Ci => PdrProfile::Ci,
            ProfileArg::Thorough => PdrProfile::Thorough,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DropOrderArg {
    Forward,
    Reverse,
    Shuffled,
}

#[derive(clap::Args, Debug)]
struct EngineArgs {
    /// Budget profile: `fast`, `ci`, or `thorough`. Overrides `pdr.toml`.
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Give up once this many frames exist
    #[arg(long)]
    max_frames: Option<usize>,

    /// Longest obligation chain before giving up
    #[arg(long)]
    max_depth: Option<usize>,

    /// Literal-drop order used by generalization
    #[arg(long, value_enum)]
    drop_order: Option<DropOrderArg>,

    /// Seed for `--drop-order shuffled`
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Pop the newest obligation first among equal frames
    #[arg(long)]
    lifo: bool,

    /// Generalize with plain (non-relative) blocking queries
    #[arg(long)]
    no_relative_induction: bool,

    /// Skip the independent re-check of verdicts
    #[arg(long)]
    no_certify: bool,

    /// Oracle conflict budget per query
    #[arg(long)]
    conflict_limit: Option<u64>,

    /// Oracle wall-clock budget per query, in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,
}

impl EngineArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile.map(Into::into),
            max_obligation_depth: self.max_depth,
            max_frames: self.max_frames,
            tie_break: self.lifo.then_some(TieBreak::Lifo),
            drop_order: self.drop_order.map(|d| match d {
                DropOrderArg::Forward => DropOrder::Forward,
                DropOrderArg::Reverse => DropOrder::Reverse,
                DropOrderArg::Shuffled => DropOrder::Shuffled { seed: self.seed },
            }),
            relative_induction: self.no_relative_induction.then_some(false),
            reschedule: None,
            certify: self.no_certify.then_some(false),
            conflict_limit: self.conflict_limit,
            time_limit_ms: self.time_limit_ms,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check a JSON model file
    Check {
        /// Input model (.json)
        path: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,

        /// Use Z3 instead of the built-in CaDiCaL oracle
        #[cfg(feature = "z3")]
        #[arg(long)]
        z3: bool,
    },

    /// Run the built-in case library and compare against expected verdicts
    Cases {
        /// Only run cases whose name contains this string
        #[arg(long)]
        filter: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,

        /// Print JSON outcomes instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write a library case as a JSON model file
    Export {
        /// Case name (see `pdr cases`)
        name: String,

        /// Output path; stdout when omitted
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_options(start: &Path, engine: &EngineArgs) -> miette::Result<PdrOptions> {
    let (options, path) = config::load_options(start, &engine.overrides())?;
    if let Some(p) = path {
        tracing::info!(config = %p.display(), "using config");
    }
    Ok(options)
}

fn main() -> miette::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Check {
            path,
            engine,
            json,
            #[cfg(feature = "z3")]
            z3,
        } => {
            let options = resolve_options(&path, &engine)?;
            let system = ModelFile::load(&path)?.to_system()?;

            #[cfg(feature = "z3")]
            let (verdict, stats) = if z3 {
                pdr_engine::verify_z3(&system, &options)?
            } else {
                pdr_engine::verify_with_stats(&system, &options)?
            };
            #[cfg(not(feature = "z3"))]
            let (verdict, stats) = pdr_engine::verify_with_stats(&system, &options)?;

            let report = Report::new(&system, &verdict, stats);
            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                print!("{}", report.render());
            }
            Ok(())
        }

        Cmd::Cases {
            filter,
            engine,
            json,
        } => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            let options = resolve_options(&cwd, &engine)?;
            let selected = cases::library()?
                .into_iter()
                .filter(|c| filter.as_deref().is_none_or(|f| c.name.contains(f)))
                .collect::<Vec<_>>();
            if selected.is_empty() {
                return Err(miette!("no case matches the filter"));
            }

            let mut outcomes: Vec<CaseOutcome> = Vec::with_capacity(selected.len());
            let mut failed = 0usize;
            for (name, result) in cases::run_cases(&selected, &options) {
                match result {
                    Ok(outcome) => {
                        if !outcome.passed {
                            failed += 1;
                        }
                        outcomes.push(outcome);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!(case = name, error = %e, "case aborted");
                    }
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes).into_diagnostic()?);
            } else {
                for o in &outcomes {
                    let mark = if o.passed { "ok  " } else { "FAIL" };
                    let start = match o.ce_start_matches {
                        Some(false) => "  (counterexample starts elsewhere)",
                        _ => "",
                    };
                    println!(
                        "{mark} {:<26} {:<8} {:>6}ms{start}",
                        o.name, o.verdict, o.elapsed_ms
                    );
                }
            }

            if failed > 0 {
                return Err(miette!("{failed} of {} cases failed", selected.len()));
            }
            Ok(())
        }

        Cmd::Export { name, out } => {
            let case = cases::find(&name)?.ok_or_else(|| miette!("unknown case `{name}`"))?;
            let model = ModelFile::from_system(&case.system);
            let text = serde_json::to_string_pretty(&model).into_diagnostic()?;
            match out {
                Some(p) => fs::write(&p, text + "\n").into_diagnostic()?,
                None => println!("{text}"),
            }
            Ok(())
        }
    }
}

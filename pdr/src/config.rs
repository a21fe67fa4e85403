#![forbid(unsafe_code)]
#![allow(unused_assignments)]

//! `pdr.toml` discovery and option layering.
//!
//! Options are resolved in order: profile defaults, the `[engine]` table of
//! the nearest `pdr.toml`, command-line overrides, then `PDR_MAX_DEPTH`.

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use pdr_engine::{DropOrder, PdrOptions, PdrProfile, TieBreak};

pub const CONFIG_FILE: &str = "pdr.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(pdr::config))]
pub struct ConfigError {
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    engine: Option<Overrides>,
}

/// Partial engine settings; `None` leaves the lower layer in place.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    pub profile: Option<PdrProfile>,
    pub max_obligation_depth: Option<usize>,
    pub max_frames: Option<usize>,
    pub tie_break: Option<TieBreak>,
    pub drop_order: Option<DropOrder>,
    pub relative_induction: Option<bool>,
    pub reschedule: Option<bool>,
    pub certify: Option<bool>,
    pub conflict_limit: Option<u64>,
    pub time_limit_ms: Option<u64>,
}

impl Overrides {
    fn apply(&self, o: &mut PdrOptions) {
        if let Some(v) = self.max_obligation_depth {
            o.max_obligation_depth = v;
        }
        if let Some(v) = self.max_frames {
            o.max_frames = Some(v);
        }
        if let Some(v) = self.tie_break {
            o.tie_break = v;
        }
        if let Some(v) = self.drop_order {
            o.drop_order = v;
        }
        if let Some(v) = self.relative_induction {
            o.relative_induction = v;
        }
        if let Some(v) = self.reschedule {
            o.reschedule = v;
        }
        if let Some(v) = self.certify {
            o.certify = v;
        }
        if let Some(v) = self.conflict_limit {
            o.budget.conflict_limit = Some(v);
        }
        if let Some(v) = self.time_limit_ms {
            o.budget.time_limit_ms = Some(v);
        }
    }
}

pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

fn read_config(path: &Path) -> Result<Overrides, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let parsed: ConfigFile = toml::from_str(&raw).map_err(|e| ConfigError {
        message: format!("failed to parse {}: {e}", path.display()),
    })?;
    Ok(parsed.engine.unwrap_or_default())
}

/// Resolved options and the config file they were read from, if any.
pub fn load_options(
    start: &Path,
    cli: &Overrides,
) -> Result<(PdrOptions, Option<PathBuf>), ConfigError> {
    let path = find_config(start);
    let file = match &path {
        Some(p) => read_config(p)?,
        None => Overrides::default(),
    };

    let profile = cli.profile.or(file.profile).unwrap_or(PdrProfile::Ci);
    let mut options = PdrOptions::for_profile(profile);
    file.apply(&mut options);
    cli.apply(&mut options);
    options.apply_env();

    if let Some(p) = &path {
        tracing::debug!(config = %p.display(), ?profile, "loaded config");
    }
    Ok((options, path))
}

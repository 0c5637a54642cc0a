use std::env;
use std::str::FromStr;

use anyhow::Context;

pub const DEFAULT_COLLAPSE_THRESHOLD: usize = 500;
pub const DEFAULT_ADVISORY_ENTRY_LIMIT: usize = 2_500;
pub const DEFAULT_PROFILE_PICTURE_BASE: &str = "/page/studentProfilePic";
pub const DEFAULT_SUPPORT_EMAIL: &str = "teammates@comp.nus.edu.sg";

/// Knobs of the results page. The collapse threshold and the entry limit
/// quoted in the advisory message are independent of each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Above this many responses panels start collapsed.
    pub collapse_threshold: usize,
    /// Entry count mentioned to users when a report is too large.
    pub advisory_entry_limit: usize,
    pub profile_picture_base: String,
    pub support_email: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            collapse_threshold: DEFAULT_COLLAPSE_THRESHOLD,
            advisory_entry_limit: DEFAULT_ADVISORY_ENTRY_LIMIT,
            profile_picture_base: DEFAULT_PROFILE_PICTURE_BASE.to_string(),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            collapse_threshold: parse_var("RESULTS_COLLAPSE_THRESHOLD")?
                .unwrap_or(defaults.collapse_threshold),
            advisory_entry_limit: parse_var("RESULTS_ADVISORY_ENTRY_LIMIT")?
                .unwrap_or(defaults.advisory_entry_limit),
            profile_picture_base: env::var("RESULTS_PROFILE_PICTURE_BASE")
                .unwrap_or(defaults.profile_picture_base),
            support_email: env::var("RESULTS_SUPPORT_EMAIL").unwrap_or(defaults.support_email),
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(None),
    }
}

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, SimError};
use crate::sim::timing::{DelayRange, Timing};

/// Default student population
pub const DEFAULT_STUDENTS: usize = 5;

/// Default number of waiting-room chairs
pub const DEFAULT_CHAIRS: usize = 3;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(SimError::parse("TA_LOG_FORMAT", s)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub students: usize,
    pub chairs: usize,
    pub timing: Timing,
    /// Fixed seed for reproducible delays; random when unset
    pub seed: Option<u64>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            students: DEFAULT_STUDENTS,
            chairs: DEFAULT_CHAIRS,
            timing: Timing::default(),
            seed: None,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Creates configuration from the environment, after loading `.env`
    ///
    /// Optional environment variables:
    /// - `TA_NUM_STUDENTS`: number of students (default: 5)
    /// - `TA_NUM_CHAIRS`: number of waiting chairs (default: 3)
    /// - `TA_ARRIVAL_MS`: arrival delay as `min-max` (default: 100-1500)
    /// - `TA_RETRY_MS`: backoff when the room is full (default: 500-2000)
    /// - `TA_SERVICE_MS`: help session length (default: 500-2000)
    /// - `TA_SEED`: seed for reproducible runs
    /// - `TA_LOG_FORMAT`: `pretty` or `json` (default: pretty)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            students: parse_var(&lookup, "TA_NUM_STUDENTS")?.unwrap_or(defaults.students),
            chairs: parse_var(&lookup, "TA_NUM_CHAIRS")?.unwrap_or(defaults.chairs),
            timing: Timing {
                arrival: parse_var(&lookup, "TA_ARRIVAL_MS")?.unwrap_or(defaults.timing.arrival),
                retry: parse_var(&lookup, "TA_RETRY_MS")?.unwrap_or(defaults.timing.retry),
                service: parse_var(&lookup, "TA_SERVICE_MS")?.unwrap_or(defaults.timing.service),
            },
            seed: parse_var(&lookup, "TA_SEED")?,
            log_format: parse_var(&lookup, "TA_LOG_FORMAT")?.unwrap_or(defaults.log_format),
        })
    }

    /// Command-line values win over the environment
    pub fn apply_overrides(
        &mut self,
        students: Option<usize>,
        chairs: Option<usize>,
        seed: Option<u64>,
    ) {
        if let Some(students) = students {
            self.students = students;
        }
        if let Some(chairs) = chairs {
            self.chairs = chairs;
        }
        if seed.is_some() {
            self.seed = seed;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.students == 0 {
            return Err(SimError::invalid_config("number of students must be positive"));
        }
        if self.chairs == 0 {
            return Err(SimError::invalid_config("number of chairs must be positive"));
        }

        let ranges: [(&str, DelayRange); 3] = [
            ("arrival", self.timing.arrival),
            ("retry", self.timing.retry),
            ("service", self.timing.service),
        ];
        for (name, range) in ranges {
            if !range.is_valid() {
                return Err(SimError::invalid_config(format!(
                    "{} delay range {} has min above max",
                    name, range
                )));
            }
        }

        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SimError::parse(key, &raw)),
        _ => Ok(None),
    }
}

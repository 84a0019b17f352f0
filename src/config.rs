use crate::backend::BackendKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

pub const BIND_ADDR_ENV: &str = "ASSIGNMENT_BIND_ADDR";
pub const BACKEND_ENV: &str = "ASSIGNMENT_BACKEND";
pub const TIME_LIMIT_ENV: &str = "ASSIGNMENT_TIME_LIMIT_SECS";
pub const THREADS_ENV: &str = "ASSIGNMENT_THREADS";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Per-solve backend settings. Every field has a default, so `{}` is valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    pub backend: BackendKind,
    /// Wall-clock limit; reaching it yields a feasible or limit-reached outcome.
    pub time_limit_secs: Option<f64>,
    /// Relative MIP gap at which the search may stop early.
    pub mip_gap: Option<f64>,
    pub threads: u32,
    pub random_seed: i32,
    /// Let the backend print its own progress log.
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Highs,
            time_limit_secs: None,
            mip_gap: None,
            threads: 1, // limit to 1 thread for reproducibility
            random_seed: 1234,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    /// Used when a request carries no `solver` section.
    pub solver: SolverConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let bind_address = parse_or(&lookup, BIND_ADDR_ENV, || {
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().map_err(|e| format!("{}", e))
        })?;

        let mut solver = SolverConfig::default();
        if let Some(value) = lookup(BACKEND_ENV) {
            solver.backend = value.parse::<BackendKind>().map_err(|reason| ConfigError::InvalidValue {
                key: BACKEND_ENV,
                value: value.clone(),
                reason,
            })?;
        }
        if let Some(value) = lookup(TIME_LIMIT_ENV) {
            let seconds: f64 = parse_value(TIME_LIMIT_ENV, &value)?;
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(ConfigError::InvalidValue {
                    key: TIME_LIMIT_ENV,
                    value,
                    reason: "must be a positive number of seconds".to_string(),
                });
            }
            solver.time_limit_secs = Some(seconds);
        }
        if let Some(value) = lookup(THREADS_ENV) {
            let threads: u32 = parse_value(THREADS_ENV, &value)?;
            if threads == 0 || i32::try_from(threads).is_err() {
                return Err(ConfigError::InvalidValue {
                    key: THREADS_ENV,
                    value,
                    reason: format!("must be between 1 and {}", i32::MAX),
                });
            }
            solver.threads = threads;
        }

        Ok(Self {
            bind_address,
            solver,
        })
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<F, T, D>(lookup: &F, key: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    D: FnOnce() -> Result<T, String>,
{
    match lookup(key) {
        Some(value) => parse_value(key, &value),
        None => default().map_err(|reason| ConfigError::InvalidValue {
            key,
            value: String::new(),
            reason,
        }),
    }
}

//! Recognized environment variables (spec.md §6), read once into a single
//! struct rather than scattered `env::var` calls.

use std::time::Duration;

/// Process-wide configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the package server; `None` disables it entirely.
    pub pkg_server: Option<String>,
    /// Default location for `develop --shared` clones.
    pub dev_dir: Option<String>,
    pub offline: bool,
    pub precompile_auto: bool,
    pub num_precompile_tasks: usize,
    pub concurrent_downloads: usize,
    pub gc_auto: bool,
    pub ignore_hashes: bool,
    pub collect_delay: Duration,
}

const DEFAULT_CONCURRENT_DOWNLOADS: usize = 8;
const DEFAULT_PRECOMPILE_TASKS: usize = 4;

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) if v == "true" => true,
        Ok(v) if v == "false" => false,
        Ok(v) if v == "0" => false,
        Ok(v) if v == "1" => true,
        _ => default,
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

impl Config {
    /// Read the recognized subset of environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let pkg_server = match std::env::var("JULIA_PKG_SERVER") {
            Ok(v) if v.is_empty() => None,
            Ok(v) => Some(v),
            Err(_) => None,
        };

        Config {
            pkg_server,
            dev_dir: std::env::var("JULIA_PKG_DEVDIR").ok(),
            offline: env_flag("JULIA_PKG_OFFLINE", false),
            precompile_auto: std::env::var("JULIA_PKG_PRECOMPILE_AUTO").as_deref() != Ok("0"),
            num_precompile_tasks: env_usize("JULIA_NUM_PRECOMPILE_TASKS", DEFAULT_PRECOMPILE_TASKS),
            concurrent_downloads: env_usize("JULIA_PKG_CONCURRENT_DOWNLOADS", DEFAULT_CONCURRENT_DOWNLOADS),
            gc_auto: env_flag("JULIA_PKG_GC_AUTO", true),
            ignore_hashes: env_flag("JULIA_PKG_IGNORE_HASHES", false),
            collect_delay: depot_gc::DEFAULT_COLLECT_DELAY,
        }
    }
}

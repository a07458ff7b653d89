use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use nix::unistd::{getegid, geteuid};

use crate::constants::COMPILER_SUCCESS_MARKER;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}

/// Reduced-privilege identity the untrusted binary runs as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SandboxIdentity {
    pub uid: u32,
    pub gid: u32,
}

/// Command-line conventions of the external compiler and runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub compiler_path: PathBuf,
    pub compiler_args: Vec<String>,
    /// Launcher for the compiled binary (e.g. `mono`); `None` executes it directly.
    pub runner_path: Option<PathBuf>,
    pub source_extension: String,
    pub binary_extension: String,
    pub success_marker: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            compiler_path: PathBuf::from("mono"),
            compiler_args: vec!["/usr/bin/pascal/pabcnetcclear.exe".to_string()],
            runner_path: Some(PathBuf::from("mono")),
            source_extension: "pas".to_string(),
            binary_extension: "exe".to_string(),
            success_marker: COMPILER_SUCCESS_MARKER.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckerLimits {
    pub max_operations: u64,
    pub timeout: Duration,
    /// Floor for the longest string a predicate may build, in bytes.
    pub max_string_size: usize,
}

impl Default for CheckerLimits {
    fn default() -> Self {
        CheckerLimits {
            max_operations: 1_000_000,
            timeout: Duration::from_secs(1),
            max_string_size: 1 << 20,
        }
    }
}

/// Process-wide settings, read once at startup and shared immutably.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub timeout: Duration,
    pub sandbox_dir: PathBuf,
    pub identity: SandboxIdentity,
    pub toolchain: Toolchain,
    pub checker: CheckerLimits,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = Duration::from_secs(parse_or(&lookup, "SANDBOX_TIMEOUT_SECS", 5)?);
        let sandbox_dir = lookup("SANDBOX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        let uid = parse_opt::<u32, _>(&lookup, "SANDBOX_USER_UID")?;
        let gid = match parse_opt::<u32, _>(&lookup, "SANDBOX_USER_GID")? {
            Some(gid) => gid,
            None => uid.unwrap_or_else(|| getegid().as_raw()),
        };
        let identity = SandboxIdentity {
            uid: uid.unwrap_or_else(|| geteuid().as_raw()),
            gid,
        };

        let defaults = Toolchain::default();
        let toolchain = Toolchain {
            compiler_path: lookup("COMPILER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.compiler_path),
            compiler_args: lookup("COMPILER_ARGS")
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or(defaults.compiler_args),
            runner_path: match lookup("RUNNER_PATH") {
                Some(path) if path.trim().is_empty() => None,
                Some(path) => Some(PathBuf::from(path)),
                None => defaults.runner_path,
            },
            source_extension: lookup("SOURCE_EXTENSION").unwrap_or(defaults.source_extension),
            binary_extension: lookup("BINARY_EXTENSION").unwrap_or(defaults.binary_extension),
            success_marker: lookup("COMPILER_SUCCESS_MARKER").unwrap_or(defaults.success_marker),
        };

        let checker = CheckerLimits {
            max_operations: parse_or(
                &lookup,
                "CHECKER_MAX_OPERATIONS",
                CheckerLimits::default().max_operations,
            )?,
            timeout: Duration::from_millis(parse_or(&lookup, "CHECKER_TIMEOUT_MS", 1000)?),
            max_string_size: parse_or(
                &lookup,
                "CHECKER_MAX_STRING_SIZE",
                CheckerLimits::default().max_string_size,
            )?,
        };

        Ok(Config {
            timeout,
            sandbox_dir,
            identity,
            toolchain,
            checker,
        })
    }
}

fn parse_opt<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

fn parse_or<T, F>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, var)?.unwrap_or(default))
}

//! Configuration for the atomic contention benchmark.

use atomic_core::{
    Add, CompareAndSwap, Dec, Exchange, Inc, LogicalAnd, LogicalOr, Max, Min, Operation,
};
use serde::Deserialize;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// General benchmark settings.
#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    /// How long to run the measurement phase.
    #[serde(deserialize_with = "deserialize_duration")]
    pub duration: Duration,
    /// How long to warm up before recording metrics.
    #[serde(deserialize_with = "deserialize_duration")]
    pub warmup: Duration,
    /// Number of worker threads (lanes racing on the slots).
    pub threads: usize,
    /// Optional list of CPU cores to pin workers to (e.g., "0-3,6-8").
    pub cpu_list: Option<String>,
}

/// Workload configuration.
#[derive(Debug, Deserialize)]
pub struct WorkloadConfig {
    /// Execution target the operations are compiled for.
    pub target: TargetName,
    /// Operation applied by every worker.
    pub operation: OperationName,
    /// Scalar type of the slots.
    pub scalar: ScalarName,
    /// Number of distinct slots. Fewer slots means more contention.
    #[serde(default = "default_addresses")]
    pub addresses: usize,
    /// Operands are drawn uniformly from `operand_min..=operand_max`.
    #[serde(default = "default_operand")]
    pub operand_min: i64,
    #[serde(default = "default_operand")]
    pub operand_max: i64,
}

fn default_addresses() -> usize {
    1
}

fn default_operand() -> i64 {
    1
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

/// Execution target.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TargetName {
    Host,
    HostAtomic,
    Cuda,
    Hip,
    Sycl,
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetName::Host => write!(f, "host"),
            TargetName::HostAtomic => write!(f, "host-atomic"),
            TargetName::Cuda => write!(f, "cuda"),
            TargetName::Hip => write!(f, "hip"),
            TargetName::Sycl => write!(f, "sycl"),
        }
    }
}

/// Read-modify-write operation.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationName {
    Add,
    Min,
    Max,
    LogicalOr,
    LogicalAnd,
    Inc,
    Dec,
    Exchange,
    CompareAndSwap,
}

impl OperationName {
    /// The library's name for the operation.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationName::Add => Add::NAME,
            OperationName::Min => Min::NAME,
            OperationName::Max => Max::NAME,
            OperationName::LogicalOr => LogicalOr::NAME,
            OperationName::LogicalAnd => LogicalAnd::NAME,
            OperationName::Inc => Inc::NAME,
            OperationName::Dec => Dec::NAME,
            OperationName::Exchange => Exchange::NAME,
            OperationName::CompareAndSwap => CompareAndSwap::NAME,
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot value type.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScalarName {
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarName {
    pub fn is_integer(self) -> bool {
        !matches!(self, ScalarName::F32 | ScalarName::F64)
    }

    /// Configured operands this scalar holds without wrapping. Floats take
    /// any `i64`.
    pub fn operand_range(self) -> Option<RangeInclusive<i64>> {
        match self {
            ScalarName::I32 => Some(i64::from(i32::MIN)..=i64::from(i32::MAX)),
            ScalarName::U32 => Some(0..=i64::from(u32::MAX)),
            ScalarName::I64 => Some(i64::MIN..=i64::MAX),
            ScalarName::U64 => Some(0..=i64::MAX),
            ScalarName::F32 | ScalarName::F64 => None,
        }
    }
}

impl fmt::Display for ScalarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarName::I32 => write!(f, "i32"),
            ScalarName::U32 => write!(f, "u32"),
            ScalarName::I64 => write!(f, "i64"),
            ScalarName::U64 => write!(f, "u64"),
            ScalarName::F32 => write!(f, "f32"),
            ScalarName::F64 => write!(f, "f64"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let general = &self.general;
        let workload = &self.workload;

        if general.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if workload.addresses == 0 {
            return Err(ConfigError::Invalid("addresses must be at least 1".into()));
        }
        if workload.operand_min > workload.operand_max {
            return Err(ConfigError::Invalid(format!(
                "operand_min ({}) is greater than operand_max ({})",
                workload.operand_min, workload.operand_max
            )));
        }

        if let Some(range) = workload.scalar.operand_range()
            && !(range.contains(&workload.operand_min) && range.contains(&workload.operand_max))
        {
            return Err(ConfigError::Invalid(format!(
                "operands {}..={} do not fit scalar '{}' ({}..={})",
                workload.operand_min,
                workload.operand_max,
                workload.scalar,
                range.start(),
                range.end()
            )));
        }

        let supported = match workload.operation {
            OperationName::LogicalOr | OperationName::LogicalAnd => {
                workload.scalar == ScalarName::I32
            }
            OperationName::Inc | OperationName::Dec => workload.scalar == ScalarName::U32,
            _ => true,
        };
        if !supported {
            return Err(ConfigError::Invalid(format!(
                "operation '{}' is not defined for scalar '{}'",
                workload.operation, workload.scalar
            )));
        }

        if let Some(ref cpu_list) = general.cpu_list {
            parse_cpu_list(cpu_list)
                .map_err(|e| ConfigError::Invalid(format!("invalid cpu_list: {e}")))?;
        }

        Ok(())
    }

    /// Check the workload against the path its kernel compiled to. An
    /// unsynchronized path is only correct for one thread per address.
    pub fn check_path(&self, path: atomic_core::Path) -> Result<(), ConfigError> {
        if !path.is_atomic() && self.general.threads > 1 {
            return Err(ConfigError::Invalid(format!(
                "target '{}' runs '{}' on the unsynchronized '{path}' path and requires \
                 threads = 1 (got {}); use 'host-atomic' for parallel host loops",
                self.workload.target, self.workload.operation, self.general.threads
            )));
        }
        Ok(())
    }

    /// CPU ids to pin workers to, if configured.
    pub fn cpu_affinity(&self) -> Option<Vec<usize>> {
        self.general
            .cpu_list
            .as_ref()
            .and_then(|s| parse_cpu_list(s).ok())
    }

    /// Whether the final slot contents can be checked exactly against the
    /// number of operations applied.
    pub fn verifiable(&self) -> bool {
        self.workload.operation == OperationName::Add
            && self.workload.scalar.is_integer()
            && self.workload.operand_min == 1
            && self.workload.operand_max == 1
    }
}

/// Deserialize a duration from a human-readable string (e.g., "60s", "5m").
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Parse a Linux-style CPU list string into a vector of CPU IDs.
///
/// Examples:
/// - "0-3" -> [0, 1, 2, 3]
/// - "0,2,4" -> [0, 2, 4]
/// - "0-3,8-11,13" -> [0, 1, 2, 3, 8, 9, 10, 11, 13]
pub fn parse_cpu_list(s: &str) -> Result<Vec<usize>, String> {
    let mut cpus = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start
                .trim()
                .parse()
                .map_err(|e| format!("invalid CPU id '{start}': {e}"))?;
            let end: usize = end
                .trim()
                .parse()
                .map_err(|e| format!("invalid CPU id '{end}': {e}"))?;
            if start > end {
                return Err(format!("invalid range {start}-{end}"));
            }
            cpus.extend(start..=end);
        } else {
            let cpu: usize = part
                .parse()
                .map_err(|e| format!("invalid CPU id '{part}': {e}"))?;
            cpus.push(cpu);
        }
    }

    if cpus.is_empty() {
        return Err("empty CPU list".to_string());
    }

    Ok(cpus)
}

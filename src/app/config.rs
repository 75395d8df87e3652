//! Configuration file loading for CLI defaults.
//!
//! The file is a flat `key = value` subset of TOML with `#` comments.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use avfetch_core::pipeline::FetchMode;

/// Values read from the config file. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default output root.
    pub output_dir: Option<PathBuf>,
    /// Attempts per stream (1..=10).
    pub max_attempts: Option<u32>,
    /// Delay between attempts in milliseconds (0..=60000).
    pub retry_delay_ms: Option<u64>,
    /// Video resolution floor in pixel height (144..=4320).
    pub resolution_floor: Option<u32>,
    /// Sequential or parallel fetch.
    pub fetch_mode: Option<FetchMode>,
    /// ffmpeg executable.
    pub ffmpeg_path: Option<PathBuf>,
    /// HTTP connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds (1..=3600).
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates values against the same ranges the CLI enforces.
    pub fn validate(&self) -> Result<()> {
        validate_range("max_attempts", self.max_attempts.map(u64::from), 1, 10)?;
        validate_range("retry_delay_ms", self.retry_delay_ms, 0, 60_000)?;
        validate_range(
            "resolution_floor",
            self.resolution_floor.map(u64::from),
            144,
            4320,
        )?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600)?;
        validate_range("read_timeout_secs", self.read_timeout_secs, 1, 3600)?;
        Ok(())
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/avfetch/config.toml`
/// 2. `$HOME/.config/avfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("avfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("avfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. The default path is optional: when it is
/// missing, an empty config is returned.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "max_attempts" => {
                cfg.max_attempts = Some(parse_integer_u32(value).with_context(invalid)?);
            }
            "retry_delay_ms" => {
                cfg.retry_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "resolution_floor" => {
                cfg.resolution_floor = Some(parse_integer_u32(value).with_context(invalid)?);
            }
            "fetch_mode" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                let mode = parsed
                    .parse::<FetchMode>()
                    .map_err(anyhow::Error::msg)
                    .with_context(invalid)?;
                cfg.fetch_mode = Some(mode);
            }
            "ffmpeg_path" => {
                cfg.ffmpeg_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_integer_u32(raw_value: &str) -> Result<u32> {
    let value = parse_integer_u64(raw_value)?;
    u32::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u32"))
}

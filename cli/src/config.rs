//! `lunette.toml` loading and the settings derived from it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use vm::VmOptions;

pub const CONFIG_FILE: &str = "lunette.toml";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LunetteConfig {
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Resource root for `loadfile`/`dofile`.
    pub script_root: Option<PathBuf>,
    pub max_call_depth: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    pub level: Option<String>,
}

impl LunetteConfig {
    /// Read an explicit config file; a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid toml in '{}'", path.display()))
    }

    /// `explicit` when given, else `lunette.toml` in the working directory
    /// if it exists, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let local = Path::new(CONFIG_FILE);
        if local.is_file() {
            Self::load_from(local)
        } else {
            Ok(Self::default())
        }
    }

    /// Effective log filter: the flag, then the file, then `warn`.
    pub fn log_level(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.log.level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }
}

/// Runtime flags given on the command line; each one overrides the file.
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub script_root: Option<PathBuf>,
    pub max_call_depth: Option<usize>,
}

/// Everything `run` needs to build a VM.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub script_root: PathBuf,
    pub options: VmOptions,
}

impl RunSettings {
    /// Merge flags over the file. Without either, resources resolve against
    /// the script's own directory (the working directory for stdin).
    pub fn resolve(config: &LunetteConfig, overrides: &RunOverrides, script: &str) -> Self {
        let script_root = overrides
            .script_root
            .clone()
            .or_else(|| config.runtime.script_root.clone())
            .unwrap_or_else(|| script_dir(script));
        let mut options = VmOptions::default();
        if let Some(depth) = overrides
            .max_call_depth
            .or(config.runtime.max_call_depth)
        {
            options.max_call_depth = depth;
        }
        Self {
            script_root,
            options,
        }
    }
}

fn script_dir(script: &str) -> PathBuf {
    if script == "-" {
        return PathBuf::from(".");
    }
    match Path::new(script).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_file() {
        let cfg: LunetteConfig = toml::from_str(
            "[runtime]\nscript_root = \"scripts\"\nmax_call_depth = 50\n\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(cfg.runtime.script_root, Some(PathBuf::from("scripts")));
        assert_eq!(cfg.runtime.max_call_depth, Some(50));
        assert_eq!(cfg.log.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_empty_file_is_default() {
        let cfg: LunetteConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, LunetteConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<LunetteConfig>("[runtime]\nstress_gc = true\n").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let cfg = LunetteConfig {
            runtime: RuntimeSection {
                script_root: Some("from_file".into()),
                max_call_depth: Some(10),
            },
            log: LogSection {
                level: Some("info".into()),
            },
        };
        let flags = RunOverrides {
            script_root: Some("from_flag".into()),
            max_call_depth: None,
        };
        let settings = RunSettings::resolve(&cfg, &flags, "a/b.lua");
        assert_eq!(settings.script_root, PathBuf::from("from_flag"));
        assert_eq!(settings.options.max_call_depth, 10);
        assert_eq!(cfg.log_level(Some("trace")), "trace");
        assert_eq!(cfg.log_level(None), "info");
    }

    #[test]
    fn test_defaults_follow_script_location() {
        let cfg = LunetteConfig::default();
        let none = RunOverrides::default();
        assert_eq!(
            RunSettings::resolve(&cfg, &none, "scripts/main.lua").script_root,
            PathBuf::from("scripts")
        );
        assert_eq!(
            RunSettings::resolve(&cfg, &none, "main.lua").script_root,
            PathBuf::from(".")
        );
        assert_eq!(
            RunSettings::resolve(&cfg, &none, "-").script_root,
            PathBuf::from(".")
        );
        assert_eq!(
            RunSettings::resolve(&cfg, &none, "-").options.max_call_depth,
            VmOptions::default().max_call_depth
        );
        assert_eq!(cfg.log_level(None), DEFAULT_LOG_LEVEL);
    }
}

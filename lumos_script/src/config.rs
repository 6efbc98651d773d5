use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use mlua::StdLib;
use serde::Deserialize;

/// Which Lua standard libraries a freshly created state receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibrarySet {
    /// Every standard library `mlua` considers safe (no `debug`, no C
    /// module loading).
    #[default]
    Safe,
    /// Only the base library.
    Base,
}

impl LibrarySet {
    pub(crate) fn std_libs(self) -> StdLib {
        match self {
            LibrarySet::Safe => StdLib::ALL_SAFE,
            LibrarySet::Base => StdLib::NONE,
        }
    }
}

impl fmt::Display for LibrarySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LibrarySet::Safe => "safe",
            LibrarySet::Base => "base",
        })
    }
}

impl FromStr for LibrarySet {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        match text {
            "safe" => Ok(LibrarySet::Safe),
            "base" => Ok(LibrarySet::Base),
            other => Err(anyhow!(
                "unknown library set '{other}' (expected safe or base)"
            )),
        }
    }
}

/// Where scripts live and how their Lua state is prepared.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Directory relative script names are resolved against.
    pub scripts_root: PathBuf,
    /// Script to load; absolute paths bypass `scripts_root`.
    pub script: PathBuf,
    pub libraries: LibrarySet,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            scripts_root: PathBuf::from("scripts"),
            script: PathBuf::from("test.lua"),
            libraries: LibrarySet::default(),
        }
    }
}

impl ScriptConfig {
    pub fn new(scripts_root: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            scripts_root: scripts_root.into(),
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn with_libraries(mut self, libraries: LibrarySet) -> Self {
        self.libraries = libraries;
        self
    }

    /// Reads a JSON config file. Missing keys keep their defaults; a
    /// relative `scripts_root` is taken relative to the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read script config: {}", path.display()))?;
        let mut config: ScriptConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse script config json: {}", path.display()))?;
        if config.scripts_root.is_relative() {
            if let Some(parent) = path.parent() {
                config.scripts_root = parent.join(&config.scripts_root);
            }
        }
        Ok(config)
    }

    /// Full path of the configured script.
    pub fn script_path(&self) -> PathBuf {
        self.resolve(&self.script)
    }

    /// Resolves a script name against `scripts_root`.
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.scripts_root.join(name)
        }
    }
}

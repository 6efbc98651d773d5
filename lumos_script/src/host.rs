use std::fmt;
use std::fs;
use std::path::PathBuf;

use mlua::{Function, Lua, LuaOptions, RegistryKey};
use thiserror::Error;

use crate::config::{LibrarySet, ScriptConfig};
use crate::environment::{LuaEnvironment, ScriptEnvironment};
use crate::stack::LuaStack;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read script {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to initialise Lua state: {0}")]
    Init(#[source] mlua::Error),
    #[error("script {name} failed: {source}")]
    Script {
        name: String,
        #[source]
        source: mlua::Error,
    },
}

struct LoadedState {
    lua: Lua,
    /// The base library's `next`, captured before the script could rebind it.
    iterator: RegistryKey,
}

/// Owns the Lua state a script was executed in.
///
/// A host whose script failed to load stays in that state for good; every
/// environment borrowed from it answers with defaults.
pub struct ScriptHost {
    origin: String,
    state: Result<LoadedState, LoadError>,
}

impl ScriptHost {
    /// Loads the configured script, logging and keeping the failure instead
    /// of returning it.
    pub fn load(config: &ScriptConfig) -> Self {
        let path = config.script_path();
        match Self::try_load(config) {
            Ok(host) => host,
            Err(err) => {
                log::error!("script not loaded ({}): {err}", path.display());
                Self {
                    origin: path.display().to_string(),
                    state: Err(err),
                }
            }
        }
    }

    pub fn try_load(config: &ScriptConfig) -> Result<Self, LoadError> {
        let path = config.script_path();
        let bytes = fs::read(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_chunk(&path.display().to_string(), &bytes, config.libraries)
    }

    /// Runs an in-memory chunk with the safe standard libraries.
    pub fn from_source(name: &str, source: &str) -> Result<Self, LoadError> {
        Self::from_chunk(name, source.as_bytes(), LibrarySet::Safe)
    }

    pub fn from_chunk(name: &str, chunk: &[u8], libraries: LibrarySet) -> Result<Self, LoadError> {
        let lua = Lua::new_with(libraries.std_libs(), LuaOptions::default())
            .map_err(LoadError::Init)?;
        let iterator = {
            let next: Function = lua.globals().raw_get("next").map_err(LoadError::Init)?;
            lua.create_registry_value(next).map_err(LoadError::Init)?
        };
        lua.load(chunk)
            .set_name(name)
            .exec()
            .map_err(|source| LoadError::Script {
                name: name.to_string(),
                source,
            })?;
        log::debug!("loaded script {name} ({} bytes)", chunk.len());
        Ok(Self {
            origin: name.to_string(),
            state: Ok(LoadedState { lua, iterator }),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_ok()
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.state.as_ref().err()
    }

    /// The underlying Lua state, for collaborators that install native
    /// functions or tweak globals after loading.
    pub fn lua(&self) -> Option<&Lua> {
        self.state.as_ref().ok().map(|state| &state.lua)
    }

    /// Borrows the host as a resolver with its own, empty evaluation stack.
    pub fn environment(&self) -> LuaEnvironment<'_> {
        let Ok(state) = self.state.as_ref() else {
            return ScriptEnvironment::unloaded();
        };
        match state.lua.registry_value::<Function>(&state.iterator) {
            Ok(next) => ScriptEnvironment::new(LuaStack::with_iterator(&state.lua, next)),
            Err(err) => {
                log::error!("script {}: table iterator unavailable: {err}", self.origin);
                ScriptEnvironment::unloaded()
            }
        }
    }
}

impl fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptHost")
            .field("origin", &self.origin)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

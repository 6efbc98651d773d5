//! Typed access to values living inside an embedded Lua script.
//!
//! A [`ScriptHost`] owns the Lua state created from a script file. Borrowing
//! it as a [`ScriptEnvironment`] gives a resolver that walks dotted paths such
//! as `"player.stats.hp"` through the interpreter's evaluation stack and
//! hands back plain Rust values. Resolution never fails: undefined paths,
//! unloaded scripts and type mismatches degrade to a per-type default and are
//! reported as [`Diagnostic`]s.
//!
//! An environment drives a single Lua state from a single thread. The stack
//! carries no reentrancy protection; callers that need parallelism load one
//! host per thread.

pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod host;
mod navigator;
pub mod path;
pub mod stack;
pub mod value;

pub use config::{LibrarySet, ScriptConfig};
pub use diagnostics::{Diagnostic, DiagnosticLog, ErrorKind, ResolveError};
pub use environment::{LuaEnvironment, ScriptEnvironment};
pub use host::{LoadError, ScriptHost};
pub use path::ScriptPath;
pub use stack::{LuaStack, ScriptStack, StackError};
pub use value::{Resolvable, ScriptValue, ValueKind};

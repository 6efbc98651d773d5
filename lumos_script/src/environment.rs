use crate::diagnostics::{Diagnostic, DiagnosticLog, ResolveError};
use crate::navigator::{navigate, StackScope};
use crate::path::ScriptPath;
use crate::stack::{LuaStack, ScriptStack};
use crate::value::{Resolvable, ScriptValue, ValueKind};

pub type LuaEnvironment<'lua> = ScriptEnvironment<LuaStack<'lua>>;

/// Resolves dotted paths against a script's globals.
///
/// Every call leaves the evaluation stack at the depth it found it. Calls are
/// total: when a value cannot be produced the type's fallback is returned and
/// a [`Diagnostic`] is recorded.
#[derive(Debug)]
pub struct ScriptEnvironment<S: ScriptStack> {
    stack: Option<S>,
    diagnostics: DiagnosticLog,
}

impl<S: ScriptStack> ScriptEnvironment<S> {
    pub fn new(stack: S) -> Self {
        Self {
            stack: Some(stack),
            diagnostics: DiagnosticLog::new(),
        }
    }

    /// An environment whose script never loaded.
    pub fn unloaded() -> Self {
        Self {
            stack: None,
            diagnostics: DiagnosticLog::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.stack.is_some()
    }

    /// Current evaluation stack depth; `0` for an unloaded environment.
    pub fn stack_depth(&self) -> usize {
        self.stack.as_ref().map_or(0, ScriptStack::depth)
    }

    /// Direct access to the evaluation stack, for callers that push frames of
    /// their own around resolutions.
    pub fn stack_mut(&mut self) -> Option<&mut S> {
        self.stack.as_mut()
    }

    /// Resolves `path` into `T`.
    pub fn resolve<T: Resolvable>(&mut self, path: &str) -> T {
        log::trace!("resolving {path} as {}", T::KIND);
        self.with_target(path, T::fallback, |stack, diagnostics| {
            T::extract(stack, path, diagnostics)
        })
    }

    /// Resolves `path` into the shape named by `kind`.
    pub fn resolve_kind(&mut self, path: &str, kind: ValueKind) -> ScriptValue {
        self.with_target(
            path,
            || kind.fallback(),
            |stack, diagnostics| kind.extract(stack, path, diagnostics),
        )
    }

    /// Collects the integer values of the table at `path`, in the order Lua
    /// iterates them. Unresolvable paths yield an empty vector.
    pub fn int_vector(&mut self, path: &str) -> Vec<i64> {
        self.resolve::<Vec<i64>>(path)
    }

    /// Pops every frame on the evaluation stack.
    pub fn clean(&mut self) {
        if let Some(stack) = self.stack.as_mut() {
            let depth = stack.depth();
            stack.clear();
            if depth > 0 {
                log::debug!("cleared {depth} frame(s) from the evaluation stack");
            }
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Shared resolution skeleton: short-circuit when unloaded, walk the path
    /// inside a scope, extract on success, fall back otherwise.
    fn with_target<T>(
        &mut self,
        path: &str,
        fallback: impl FnOnce() -> T,
        extract: impl FnOnce(&mut S, &mut DiagnosticLog) -> T,
    ) -> T {
        let Some(stack) = self.stack.as_mut() else {
            self.diagnostics.record(path, ResolveError::NotLoaded);
            return fallback();
        };
        let parsed = match ScriptPath::parse(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.diagnostics.record(path, err);
                return fallback();
            }
        };

        let mut scope = StackScope::open(stack);
        match navigate(&mut scope, &parsed, &mut self.diagnostics) {
            Some(_) => extract(&mut *scope, &mut self.diagnostics),
            None => fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::host::ScriptHost;

    const FIXTURE: &str = r#"
        x = 5
        ratio = 2.75
        name = "lumos"
        enabled = true
        t = { a = 1, nested = { deep = -3.5 } }
        list = { 1, 2, 3 }
    "#;

    fn host() -> ScriptHost {
        ScriptHost::from_source("fixture.lua", FIXTURE).expect("fixture loads")
    }

    #[test]
    fn resolves_each_supported_type() {
        let host = host();
        let mut env = host.environment();
        assert_eq!(env.resolve::<i64>("x"), 5);
        assert_eq!(env.resolve::<f64>("ratio"), 2.75);
        assert_eq!(env.resolve::<f32>("ratio"), 2.75);
        assert_eq!(env.resolve::<String>("name"), "lumos");
        assert!(env.resolve::<bool>("enabled"));
        assert_eq!(env.resolve::<i32>("t.nested.deep"), -3);
        assert_eq!(env.resolve::<Vec<i64>>("list"), [1, 2, 3]);
        assert!(env.diagnostics().is_empty());
        assert_eq!(env.stack_depth(), 0);
    }

    #[test]
    fn runtime_kinds_mirror_static_types() {
        let host = host();
        let mut env = host.environment();
        assert_eq!(
            env.resolve_kind("t.a", ValueKind::Integer),
            ScriptValue::Integer(1)
        );
        assert_eq!(
            env.resolve_kind("name", ValueKind::String),
            ScriptValue::String("lumos".to_string())
        );
        assert_eq!(
            env.resolve_kind("list", ValueKind::IntSequence),
            ScriptValue::IntSequence(vec![1, 2, 3])
        );
        assert_eq!(
            env.resolve_kind("missing", ValueKind::Bool),
            ScriptValue::Bool(false)
        );
        assert_eq!(env.diagnostics().len(), 1);
    }

    fn assert_static_matches_runtime<T: Resolvable>(env: &mut LuaEnvironment<'_>, path: &str) {
        let typed: ScriptValue = env.resolve::<T>(path).into();
        assert_eq!(typed.kind(), T::KIND, "{path}");
        assert_eq!(env.resolve_kind(path, T::KIND), typed, "{path}");
    }

    #[test]
    fn static_types_agree_with_their_runtime_kind() {
        let host = host();
        let mut env = host.environment();
        for path in ["x", "ratio", "name", "enabled", "t.nested.deep", "list", "missing"] {
            assert_static_matches_runtime::<bool>(&mut env, path);
            assert_static_matches_runtime::<i32>(&mut env, path);
            assert_static_matches_runtime::<i64>(&mut env, path);
            assert_static_matches_runtime::<f32>(&mut env, path);
            assert_static_matches_runtime::<f64>(&mut env, path);
            assert_static_matches_runtime::<String>(&mut env, path);
            assert_static_matches_runtime::<Vec<i64>>(&mut env, path);
        }
        let diagnostics = env.take_diagnostics();
        assert_eq!(diagnostics.len() % 2, 0);
        assert!(diagnostics.chunks(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(env.stack_depth(), 0);
    }

    #[test]
    fn caller_frames_below_the_resolution_are_preserved() {
        let host = host();
        let mut env = host.environment();
        env.stack_mut()
            .expect("loaded")
            .push_global("t")
            .expect("caller push");
        assert_eq!(env.resolve::<i64>("t.a"), 1);
        assert_eq!(env.resolve::<i64>("t.zzz"), 0);
        assert_eq!(env.stack_depth(), 1);
        env.clean();
        assert_eq!(env.stack_depth(), 0);
    }

    #[test]
    fn malformed_paths_fall_back_without_touching_the_stack() {
        let host = host();
        let mut env = host.environment();
        assert_eq!(env.resolve::<String>(""), "null");
        assert_eq!(env.resolve::<i64>("t..a"), 0);
        let diagnostics = env.take_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|diagnostic| diagnostic.kind() == ErrorKind::PathUndefined));
        assert_eq!(env.stack_depth(), 0);
    }

    #[test]
    fn unloaded_environment_reports_every_call() {
        let mut env: LuaEnvironment<'_> = ScriptEnvironment::unloaded();
        assert_eq!(env.resolve::<i64>("x"), 0);
        assert_eq!(env.int_vector("list"), Vec::<i64>::new());
        env.clean();
        let diagnostics = env.take_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|diagnostic| diagnostic.error == ResolveError::NotLoaded));
    }
}

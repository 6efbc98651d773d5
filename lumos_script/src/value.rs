use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::{DiagnosticLog, ResolveError};
use crate::stack::ScriptStack;

/// Text returned in place of a string that could not be resolved.
pub const NULL_SENTINEL: &str = "null";

/// The value shapes a path can be resolved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    String,
    IntSequence,
}

impl ValueKind {
    pub const ALL: [ValueKind; 5] = [
        ValueKind::Bool,
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::IntSequence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Integer => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::IntSequence => "ints",
        }
    }

    pub fn fallback(self) -> ScriptValue {
        match self {
            ValueKind::Bool => ScriptValue::Bool(bool::fallback()),
            ValueKind::Integer => ScriptValue::Integer(i64::fallback()),
            ValueKind::Float => ScriptValue::Float(f64::fallback()),
            ValueKind::String => ScriptValue::String(String::fallback()),
            ValueKind::IntSequence => ScriptValue::IntSequence(Vec::<i64>::fallback()),
        }
    }

    pub(crate) fn extract<S: ScriptStack>(
        self,
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> ScriptValue {
        match self {
            ValueKind::Bool => ScriptValue::Bool(bool::extract(stack, path, diagnostics)),
            ValueKind::Integer => ScriptValue::Integer(i64::extract(stack, path, diagnostics)),
            ValueKind::Float => ScriptValue::Float(f64::extract(stack, path, diagnostics)),
            ValueKind::String => ScriptValue::String(String::extract(stack, path, diagnostics)),
            ValueKind::IntSequence => {
                ScriptValue::IntSequence(Vec::<i64>::extract(stack, path, diagnostics))
            }
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value kind '{0}' (expected bool, int, float, string or ints)")]
pub struct UnknownKind(pub String);

impl FromStr for ValueKind {
    type Err = UnknownKind;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "int" | "integer" => Ok(ValueKind::Integer),
            "float" | "number" => Ok(ValueKind::Float),
            "string" | "str" => Ok(ValueKind::String),
            "ints" | "int_vector" | "sequence" => Ok(ValueKind::IntSequence),
            _ => Err(UnknownKind(text.to_string())),
        }
    }
}

/// A resolved value selected by a runtime [`ValueKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScriptValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    IntSequence(Vec<i64>),
}

impl ScriptValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ScriptValue::Bool(_) => ValueKind::Bool,
            ScriptValue::Integer(_) => ValueKind::Integer,
            ScriptValue::Float(_) => ValueKind::Float,
            ScriptValue::String(_) => ValueKind::String,
            ScriptValue::IntSequence(_) => ValueKind::IntSequence,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Integer(value.into())
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Integer(value)
    }
}

impl From<f32> for ScriptValue {
    fn from(value: f32) -> Self {
        ScriptValue::Float(value.into())
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Float(value)
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl From<Vec<i64>> for ScriptValue {
    fn from(value: Vec<i64>) -> Self {
        ScriptValue::IntSequence(value)
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Bool(flag) => write!(f, "{flag}"),
            ScriptValue::Integer(value) => write!(f, "{value}"),
            ScriptValue::Float(value) => write!(f, "{value}"),
            ScriptValue::String(text) => f.write_str(text),
            ScriptValue::IntSequence(values) => {
                f.write_str("[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
    impl Sealed for Vec<i64> {}
}

/// Rust types a script path can be resolved into.
///
/// Implemented for `bool`, `i32`, `i64`, `f32`, `f64`, `String` and
/// `Vec<i64>`; the set is closed.
pub trait Resolvable: sealed::Sealed + Sized + Into<ScriptValue> {
    /// Runtime tag whose extraction produces the same value as `extract`.
    const KIND: ValueKind;

    /// Value returned when the path cannot be resolved.
    fn fallback() -> Self;

    /// Converts the value on top of `stack`. Type mismatches are recorded
    /// against `path` and answered with a best-effort or sentinel value.
    fn extract<S: ScriptStack>(
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Self;
}

impl Resolvable for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn fallback() -> Self {
        false
    }

    fn extract<S: ScriptStack>(
        stack: &mut S,
        _path: &str,
        _diagnostics: &mut DiagnosticLog,
    ) -> Self {
        stack.to_boolean(-1)
    }
}

fn read_number<S: ScriptStack>(stack: &S, path: &str, diagnostics: &mut DiagnosticLog) -> f64 {
    if !stack.is_number(-1) {
        diagnostics.record(path, ResolveError::NotANumber);
    }
    stack.to_number(-1)
}

impl Resolvable for i64 {
    const KIND: ValueKind = ValueKind::Integer;

    fn fallback() -> Self {
        0
    }

    fn extract<S: ScriptStack>(
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Self {
        read_number(stack, path, diagnostics) as i64
    }
}

impl Resolvable for i32 {
    const KIND: ValueKind = ValueKind::Integer;

    fn fallback() -> Self {
        0
    }

    fn extract<S: ScriptStack>(
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Self {
        read_number(stack, path, diagnostics) as i32
    }
}

impl Resolvable for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn fallback() -> Self {
        0.0
    }

    fn extract<S: ScriptStack>(
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Self {
        read_number(stack, path, diagnostics)
    }
}

impl Resolvable for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn fallback() -> Self {
        0.0
    }

    fn extract<S: ScriptStack>(
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Self {
        read_number(stack, path, diagnostics) as f32
    }
}

impl Resolvable for String {
    const KIND: ValueKind = ValueKind::String;

    fn fallback() -> Self {
        NULL_SENTINEL.to_string()
    }

    fn extract<S: ScriptStack>(
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Self {
        if stack.is_string(-1) {
            if let Some(text) = stack.to_text(-1) {
                return text;
            }
        }
        diagnostics.record(path, ResolveError::NotAString);
        Self::fallback()
    }
}

impl Resolvable for Vec<i64> {
    const KIND: ValueKind = ValueKind::IntSequence;

    fn fallback() -> Self {
        Vec::new()
    }

    fn extract<S: ScriptStack>(
        stack: &mut S,
        path: &str,
        diagnostics: &mut DiagnosticLog,
    ) -> Self {
        if stack.is_undefined(-1) {
            return Vec::new();
        }
        if !stack.is_table(-1) {
            diagnostics.record(path, ResolveError::NotATable);
            return Vec::new();
        }

        let mut values = Vec::new();
        stack.push_nil();
        loop {
            match stack.next_entry(-2) {
                Ok(true) => {
                    if !stack.is_number(-1) {
                        diagnostics.record(path, ResolveError::NotANumber);
                    }
                    values.push(stack.to_number(-1) as i64);
                    stack.pop(1);
                }
                Ok(false) => break,
                Err(err) => {
                    diagnostics.record(
                        path,
                        ResolveError::IterationFailed {
                            message: err.to_string(),
                        },
                    );
                    break;
                }
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::LuaStack;
    use mlua::Lua;

    fn with_global<R>(
        source: &str,
        name: &str,
        read: impl FnOnce(&mut LuaStack<'_>, &mut DiagnosticLog) -> R,
    ) -> (R, DiagnosticLog) {
        let lua = Lua::new();
        lua.load(source).exec().expect("fixture chunk runs");
        let mut stack = LuaStack::new(&lua).expect("stack");
        stack.push_global(name).expect("push");
        let mut diagnostics = DiagnosticLog::new();
        let value = read(&mut stack, &mut diagnostics);
        (value, diagnostics)
    }

    #[test]
    fn integers_truncate_toward_zero() {
        let (value, diagnostics) =
            with_global("x = -7.9", "x", |stack, log| i64::extract(stack, "x", log));
        assert_eq!(value, -7);
        assert!(diagnostics.is_empty());

        let (value, _) = with_global("x = 7.9", "x", |stack, log| i32::extract(stack, "x", log));
        assert_eq!(value, 7);
    }

    #[test]
    fn numbers_from_text_are_best_effort() {
        let (value, diagnostics) =
            with_global("x = '12.5'", "x", |stack, log| f64::extract(stack, "x", log));
        assert_eq!(value, 12.5);
        assert!(diagnostics.is_empty());

        let (value, diagnostics) =
            with_global("x = 'twelve'", "x", |stack, log| i64::extract(stack, "x", log));
        assert_eq!(value, 0);
        assert_eq!(diagnostics.entries()[0].error, ResolveError::NotANumber);
    }

    #[test]
    fn strings_do_not_coerce_from_numbers() {
        let (value, diagnostics) =
            with_global("x = 5", "x", |stack, log| String::extract(stack, "x", log));
        assert_eq!(value, NULL_SENTINEL);
        assert_eq!(diagnostics.entries()[0].error, ResolveError::NotAString);

        let (value, diagnostics) =
            with_global("x = 'hello'", "x", |stack, log| String::extract(stack, "x", log));
        assert_eq!(value, "hello");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn booleans_never_complain() {
        let (value, diagnostics) =
            with_global("x = {}", "x", |stack, log| bool::extract(stack, "x", log));
        assert!(value);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn sequences_coerce_each_entry_and_restore_the_container() {
        let (value, diagnostics) = with_global("t = { 1, 2.8, 'x', '4' }", "t", |stack, log| {
            let values = Vec::<i64>::extract(stack, "t", log);
            assert_eq!(stack.depth(), 1);
            values
        });
        assert_eq!(value, [1, 2, 0, 4]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.entries()[0].error, ResolveError::NotANumber);
        assert_eq!(diagnostics.entries()[0].path, "t");
    }

    #[test]
    fn sequences_reject_scalars() {
        let (value, diagnostics) =
            with_global("t = 3", "t", |stack, log| Vec::<i64>::extract(stack, "t", log));
        assert!(value.is_empty());
        assert_eq!(diagnostics.entries()[0].error, ResolveError::NotATable);
    }

    #[test]
    fn kind_names_parse_back() {
        for kind in ValueKind::ALL {
            assert_eq!(kind.name().parse::<ValueKind>(), Ok(kind));
            assert_eq!(kind.fallback().kind(), kind);
        }
        let err = "matrix".parse::<ValueKind>().unwrap_err();
        assert_eq!(err, UnknownKind("matrix".to_string()));
        assert_eq!(
            err.to_string(),
            "unknown value kind 'matrix' (expected bool, int, float, string or ints)"
        );
    }

    #[test]
    fn fallbacks_match_the_default_policy() {
        assert_eq!(ValueKind::Bool.fallback(), ScriptValue::Bool(false));
        assert_eq!(ValueKind::Integer.fallback(), ScriptValue::Integer(0));
        assert_eq!(ValueKind::Float.fallback(), ScriptValue::Float(0.0));
        assert_eq!(
            ValueKind::String.fallback(),
            ScriptValue::String("null".to_string())
        );
        assert_eq!(
            ValueKind::IntSequence.fallback(),
            ScriptValue::IntSequence(Vec::new())
        );
    }

    #[test]
    fn sequences_display_as_lists() {
        let value = ScriptValue::IntSequence(vec![1, 2, 3]);
        assert_eq!(value.to_string(), "[1, 2, 3]");
        assert_eq!(
            serde_json::to_string(&value).expect("serialize"),
            "[1,2,3]"
        );
    }
}

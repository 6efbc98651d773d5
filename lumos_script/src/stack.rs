use std::fmt;

use mlua::{Function, Lua, MultiValue, Table, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("stack index {0} does not refer to a live frame")]
    InvalidIndex(i32),
    #[error("value at stack index {0} is not a table")]
    NotATable(i32),
    #[error(transparent)]
    Lua(#[from] mlua::Error),
}

/// The value-inspection protocol the resolver drives.
///
/// Indices follow the Lua C API: negative indices count down from the top
/// (`-1` is the top frame), positive indices count up from the bottom
/// starting at `1`. Queries on an index that is not live behave as if the
/// slot held `nil`.
pub trait ScriptStack {
    /// Number of frames currently on the stack.
    fn depth(&self) -> usize;

    /// Pushes the global bound to `name` (`nil` when unbound).
    fn push_global(&mut self, name: &str) -> Result<(), StackError>;

    /// Pushes field `name` of the value on top of the stack. The container
    /// stays in place underneath the pushed value.
    fn push_field(&mut self, name: &str) -> Result<(), StackError>;

    fn push_nil(&mut self);

    /// Pops a key and pushes the entry following it in the table at
    /// `container` (key then value). Returns `false`, with nothing pushed,
    /// once the table is exhausted. Start an iteration by pushing `nil`.
    fn next_entry(&mut self, container: i32) -> Result<bool, StackError>;

    fn is_undefined(&self, index: i32) -> bool;
    fn is_number(&self, index: i32) -> bool;
    fn is_string(&self, index: i32) -> bool;
    fn is_table(&self, index: i32) -> bool;

    fn to_boolean(&self, index: i32) -> bool;

    /// Numeric coercion; `0.0` when the value has no numeric reading.
    fn to_number(&self, index: i32) -> f64;

    fn to_text(&self, index: i32) -> Option<String>;

    /// Pops up to `count` frames.
    fn pop(&mut self, count: usize);

    /// Pops every frame on the stack.
    fn clear(&mut self) {
        let depth = self.depth();
        self.pop(depth);
    }
}

/// Evaluation stack over a borrowed Lua state.
///
/// Frames hold live `mlua` values, so nothing pushed here can outlive the
/// [`Lua`] it came from.
pub struct LuaStack<'lua> {
    lua: &'lua Lua,
    next: Function<'lua>,
    frames: Vec<Value<'lua>>,
}

impl<'lua> LuaStack<'lua> {
    /// Builds a stack that iterates tables with the state's current global
    /// `next`.
    pub fn new(lua: &'lua Lua) -> Result<Self, StackError> {
        let next: Function = lua.globals().raw_get("next")?;
        Ok(Self::with_iterator(lua, next))
    }

    /// Builds a stack around an explicit table iterator with the signature
    /// of Lua's `next`.
    pub fn with_iterator(lua: &'lua Lua, next: Function<'lua>) -> Self {
        Self {
            lua,
            next,
            frames: Vec::new(),
        }
    }

    fn slot(&self, index: i32) -> Option<usize> {
        let depth = self.frames.len();
        if index > 0 {
            let slot = (index - 1) as usize;
            (slot < depth).then_some(slot)
        } else if index < 0 {
            let back = index.unsigned_abs() as usize;
            depth.checked_sub(back)
        } else {
            None
        }
    }

    fn value(&self, index: i32) -> Option<&Value<'lua>> {
        self.slot(index).map(|slot| &self.frames[slot])
    }

    fn coerce_number(&self, index: i32) -> Option<f64> {
        match self.value(index)? {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            value @ Value::String(_) => self.lua.coerce_number(value.clone()).ok().flatten(),
            _ => None,
        }
    }
}

impl fmt::Debug for LuaStack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.frames.iter().map(Value::type_name).collect();
        f.debug_struct("LuaStack").field("frames", &kinds).finish()
    }
}

impl<'lua> ScriptStack for LuaStack<'lua> {
    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push_global(&mut self, name: &str) -> Result<(), StackError> {
        let value: Value = self.lua.globals().get(name)?;
        self.frames.push(value);
        Ok(())
    }

    fn push_field(&mut self, name: &str) -> Result<(), StackError> {
        let value = match self.frames.last() {
            Some(Value::Table(table)) => table.get::<_, Value>(name)?,
            Some(_) => Value::Nil,
            None => return Err(StackError::InvalidIndex(-1)),
        };
        self.frames.push(value);
        Ok(())
    }

    fn push_nil(&mut self) {
        self.frames.push(Value::Nil);
    }

    fn next_entry(&mut self, container: i32) -> Result<bool, StackError> {
        let table: Table = match self.value(container) {
            Some(Value::Table(table)) => table.clone(),
            Some(_) => return Err(StackError::NotATable(container)),
            None => return Err(StackError::InvalidIndex(container)),
        };
        let key = self.frames.pop().ok_or(StackError::InvalidIndex(-1))?;
        let entry: MultiValue = self.next.call((table, key))?;
        let mut entry = entry.into_iter();
        match (entry.next(), entry.next()) {
            (Some(Value::Nil), _) | (None, _) => Ok(false),
            (Some(key), value) => {
                self.frames.push(key);
                self.frames.push(value.unwrap_or(Value::Nil));
                Ok(true)
            }
        }
    }

    fn is_undefined(&self, index: i32) -> bool {
        matches!(self.value(index), None | Some(Value::Nil))
    }

    fn is_number(&self, index: i32) -> bool {
        self.coerce_number(index).is_some()
    }

    fn is_string(&self, index: i32) -> bool {
        matches!(self.value(index), Some(Value::String(_)))
    }

    fn is_table(&self, index: i32) -> bool {
        matches!(self.value(index), Some(Value::Table(_)))
    }

    fn to_boolean(&self, index: i32) -> bool {
        !matches!(
            self.value(index),
            None | Some(Value::Nil) | Some(Value::Boolean(false))
        )
    }

    fn to_number(&self, index: i32) -> f64 {
        self.coerce_number(index).unwrap_or(0.0)
    }

    fn to_text(&self, index: i32) -> Option<String> {
        match self.value(index)? {
            Value::String(text) => Some(text.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    fn pop(&mut self, count: usize) {
        let keep = self.frames.len().saturating_sub(count);
        self.frames.truncate(keep);
    }
}

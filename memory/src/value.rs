use std::fmt;

/// A guest value.
///
/// Scalars are stored inline; everything else is a `u32` handle into one of
/// the typed arenas of [`crate::Heap`]. Values are `Copy`, so handing one to a
/// closure, a table or a native call never copies the object behind it.
#[derive(Clone, Copy, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Number(f64),
    String(u32),
    Table(u32),
    Closure(u32),
    Native(u32),
}

impl Value {
    // --- Constructors ---

    #[inline]
    pub fn nil() -> Self {
        Value::Nil
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    #[inline]
    pub fn true_val() -> Self {
        Value::Bool(true)
    }

    #[inline]
    pub fn false_val() -> Self {
        Value::Bool(false)
    }

    #[inline]
    pub fn int(val: i64) -> Self {
        Value::Int(val)
    }

    #[inline]
    pub fn number(val: f64) -> Self {
        Value::Number(val)
    }

    #[inline]
    pub fn string(handle: u32) -> Self {
        Value::String(handle)
    }

    #[inline]
    pub fn table(handle: u32) -> Self {
        Value::Table(handle)
    }

    #[inline]
    pub fn closure(handle: u32) -> Self {
        Value::Closure(handle)
    }

    #[inline]
    pub fn native(handle: u32) -> Self {
        Value::Native(handle)
    }

    // --- Checkers ---

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Int or float.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Number(_))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    #[inline]
    pub fn is_closure(&self) -> bool {
        matches!(self, Value::Closure(_))
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self, Value::Native(_))
    }

    #[inline]
    pub fn is_callable(&self) -> bool {
        self.is_closure() || self.is_native()
    }

    #[inline]
    pub fn is_obj(&self) -> bool {
        self.as_handle().is_some()
    }

    /// Only `nil` and `false` are falsey.
    #[inline]
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsey()
    }

    // --- Accessors ---

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of a numeric value. Floats are truncated toward zero;
    /// NaN and out-of-range floats have no integer view.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Number(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Some(f.trunc() as i64)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Value::Int(i) => Some(i as f64),
            Value::Number(f) => Some(f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_handle(&self) -> Option<u32> {
        match *self {
            Value::String(h) | Value::Table(h) | Value::Closure(h) | Value::Native(h) => Some(h),
            _ => None,
        }
    }

    /// Name reported by `type()`-style diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Closure(_) | Value::Native(_) => "function",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(h) => write!(f, "String({})", h),
            Value::Table(h) => write!(f, "Table({})", h),
            Value::Closure(h) => write!(f, "Closure({})", h),
            Value::Native(h) => write!(f, "NativeFn({})", h),
        }
    }
}

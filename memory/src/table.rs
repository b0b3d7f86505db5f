use crate::Value;
use std::collections::HashMap;

/// Normalized table key.
///
/// Floats with an integral value collapse onto `Int` so that `t[1]` and
/// `t[1.0]` address the same slot. Strings are interned by the heap, so the
/// handle alone identifies the content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Float(u64),
    String(u32),
    Table(u32),
    Closure(u32),
    Native(u32),
}

impl Key {
    /// `None` for keys that can never be stored (`nil`, NaN).
    pub fn from_value(value: Value) -> Option<Key> {
        match value {
            Value::Nil => None,
            Value::Bool(b) => Some(Key::Bool(b)),
            Value::Int(i) => Some(Key::Int(i)),
            Value::Number(f) => {
                if f.is_nan() {
                    None
                } else if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(Key::Int(f as i64))
                } else {
                    Some(Key::Float(f.to_bits()))
                }
            }
            Value::String(h) => Some(Key::String(h)),
            Value::Table(h) => Some(Key::Table(h)),
            Value::Closure(h) => Some(Key::Closure(h)),
            Value::Native(h) => Some(Key::Native(h)),
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            Key::Bool(b) => Value::bool(b),
            Key::Int(i) => Value::int(i),
            Key::Float(bits) => Value::number(f64::from_bits(bits)),
            Key::String(h) => Value::string(h),
            Key::Table(h) => Value::table(h),
            Key::Closure(h) => Value::closure(h),
            Key::Native(h) => Value::native(h),
        }
    }
}

/// Associative array with a dense part for keys `1..=n`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    array: Vec<Value>,
    hash: HashMap<Key, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_list(items: Vec<Value>) -> Self {
        let mut t = Table::new();
        for (i, v) in items.into_iter().enumerate() {
            t.set(Key::Int(i as i64 + 1), v);
        }
        t
    }

    pub fn get(&self, key: &Key) -> Value {
        if let Key::Int(i) = *key {
            if i >= 1 && (i as u64) <= self.array.len() as u64 {
                return self.array[(i - 1) as usize];
            }
        }
        self.hash.get(key).copied().unwrap_or_default()
    }

    /// Raw lookup by value; unstorable keys read as `nil`.
    pub fn get_value(&self, key: Value) -> Value {
        match Key::from_value(key) {
            Some(k) => self.get(&k),
            None => Value::nil(),
        }
    }

    pub fn get_int(&self, i: i64) -> Value {
        self.get(&Key::Int(i))
    }

    pub fn set(&mut self, key: Key, value: Value) {
        if let Key::Int(i) = key {
            let len = self.array.len() as i64;
            if i >= 1 && i <= len {
                let idx = (i - 1) as usize;
                self.array[idx] = value;
                if value.is_nil() && i == len {
                    while matches!(self.array.last(), Some(Value::Nil)) {
                        self.array.pop();
                    }
                }
                return;
            }
            if i == len + 1 && !value.is_nil() {
                self.array.push(value);
                self.hash.remove(&key);
                self.migrate_tail();
                return;
            }
        }

        if value.is_nil() {
            self.hash.remove(&key);
        } else {
            self.hash.insert(key, value);
        }
    }

    /// Pull `n+1, n+2, ...` out of the hash part once the array part reaches them.
    fn migrate_tail(&mut self) {
        loop {
            let next = Key::Int(self.array.len() as i64 + 1);
            match self.hash.remove(&next) {
                Some(v) => self.array.push(v),
                None => break,
            }
        }
    }

    /// Border of the array part (`#t`).
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.hash.is_empty()
    }

    /// Number of non-nil entries, both parts.
    pub fn entry_count(&self) -> usize {
        self.array.iter().filter(|v| !v.is_nil()).count() + self.hash.len()
    }

    pub fn push(&mut self, value: Value) {
        let key = Key::Int(self.array.len() as i64 + 1);
        self.set(key, value);
    }
}

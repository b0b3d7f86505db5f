pub mod heap;
pub mod table;
pub mod value;

#[cfg(test)]
mod value_tests;

pub use heap::{Arena, Closure, Function, Heap, UpvalueDesc};
pub use table::{Key, Table};
pub use value::Value;

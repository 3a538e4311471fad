//! Persistent key-value storage for view settings
//!
//! The options menu persists its state as a serialized blob under a fixed
//! key. Storage sits behind [`KeyValueStore`] so the controller can run
//! against [`memory::InMemoryStore`] in tests and [`fs::FileStore`] in the
//! shell.

use anyhow::Result;

pub mod fs;
pub mod memory;

pub trait KeyValueStore {
    /// Raw stored string, or None if the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

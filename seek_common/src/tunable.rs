//! Tunable parameter sources.
//!
//! A [`TunableStore`] exposes named numeric and boolean parameters that an
//! operator may redefine at runtime. The store carries an explicit locked
//! flag: while locked, consumers must ignore stored values and use their
//! compiled defaults (production/competition mode).
//!
//! Reads register the caller's default the first time a key is seen, so a
//! dashboard listing [`MemoryTunableStore::keys`] shows every parameter a
//! mechanism consults, and repeated reads before an external write return
//! the same value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Runtime parameter source consumed by the control core.
///
/// Implementations must be non-blocking on the read path; the control
/// cycle calls these once per field per cycle.
pub trait TunableStore: Send + Sync {
    /// Read a numeric parameter, registering `default` if the key is new.
    fn read_number(&self, key: &str, default: f64) -> f64;

    /// Read a boolean parameter, registering `default` if the key is new.
    fn read_boolean(&self, key: &str, default: bool) -> bool;

    /// True when consumers must use compiled defaults.
    fn is_locked(&self) -> bool;
}

/// A stored parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TunableValue {
    Number(f64),
    Boolean(bool),
}

/// In-process tunable store.
///
/// Interior mutability lets a tuning thread write while the control thread
/// reads; the control thread never holds the lock across a cycle.
#[derive(Debug, Default)]
pub struct MemoryTunableStore {
    values: RwLock<HashMap<String, TunableValue>>,
    locked: AtomicBool,
}

impl MemoryTunableStore {
    /// Create an unlocked, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store in the given locked mode.
    pub fn with_locked(locked: bool) -> Self {
        let store = Self::default();
        store.set_locked(locked);
        store
    }

    /// Enter or leave locked mode.
    pub fn set_locked(&self, locked: bool) {
        let was = self.locked.swap(locked, Ordering::SeqCst);
        if was != locked {
            debug!(locked, "tunable store lock mode changed");
        }
    }

    /// External write of a numeric parameter.
    pub fn set_number(&self, key: &str, value: f64) {
        self.values
            .write()
            .insert(key.to_string(), TunableValue::Number(value));
    }

    /// External write of a boolean parameter.
    pub fn set_boolean(&self, key: &str, value: bool) {
        self.values
            .write()
            .insert(key.to_string(), TunableValue::Boolean(value));
    }

    /// Current stored value of `key`, if registered.
    pub fn get(&self, key: &str) -> Option<TunableValue> {
        self.values.read().get(key).copied()
    }

    /// Remove a parameter; the next read re-registers its default.
    pub fn remove(&self, key: &str) -> Option<TunableValue> {
        self.values.write().remove(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn read_or_register(&self, key: &str, default: TunableValue) -> TunableValue {
        if let Some(value) = self.values.read().get(key) {
            return *value;
        }
        *self
            .values
            .write()
            .entry(key.to_string())
            .or_insert(default)
    }
}

impl TunableStore for MemoryTunableStore {
    fn read_number(&self, key: &str, default: f64) -> f64 {
        match self.read_or_register(key, TunableValue::Number(default)) {
            TunableValue::Number(v) => v,
            TunableValue::Boolean(_) => {
                warn!(key, "tunable holds a boolean where a number is expected");
                default
            }
        }
    }

    fn read_boolean(&self, key: &str, default: bool) -> bool {
        match self.read_or_register(key, TunableValue::Boolean(default)) {
            TunableValue::Boolean(b) => b,
            TunableValue::Number(_) => {
                warn!(key, "tunable holds a number where a boolean is expected");
                default
            }
        }
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

/// A source that is permanently locked and returns the caller's defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockedTunables;

impl TunableStore for LockedTunables {
    #[inline]
    fn read_number(&self, _key: &str, default: f64) -> f64 {
        default
    }

    #[inline]
    fn read_boolean(&self, _key: &str, default: bool) -> bool {
        default
    }

    #[inline]
    fn is_locked(&self) -> bool {
        true
    }
}

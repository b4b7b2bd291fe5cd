//! Preserved original entry points

use crate::core::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An intercepted heap operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookTarget {
    Allocate,
    Free,
}

impl HookTarget {
    pub const ALL: [HookTarget; 2] = [HookTarget::Allocate, HookTarget::Free];
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookTarget::Allocate => write!(f, "allocate"),
            HookTarget::Free => write!(f, "free"),
        }
    }
}

/// Nullable, atomically published address of an original entry point
///
/// Written only while hooks are installed; read on every hook invocation.
#[derive(Default)]
pub struct OriginalSlot(AtomicUsize);

impl OriginalSlot {
    pub const fn empty() -> Self {
        OriginalSlot(AtomicUsize::new(0))
    }

    /// Publishes the original before the export is redirected
    pub fn publish(&self, original: Address) {
        self.0.store(original.as_usize(), Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> Option<Address> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            raw => Some(Address::new(raw)),
        }
    }

    pub fn is_populated(&self) -> bool {
        self.get().is_some()
    }
}

impl fmt::Debug for OriginalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(address) => write!(f, "OriginalSlot({})", address),
            None => write!(f, "OriginalSlot(empty)"),
        }
    }
}

/// One slot per intercepted operation
#[derive(Debug, Default)]
pub struct OriginalTable {
    allocate: OriginalSlot,
    free: OriginalSlot,
}

impl OriginalTable {
    pub const fn new() -> Self {
        OriginalTable {
            allocate: OriginalSlot::empty(),
            free: OriginalSlot::empty(),
        }
    }

    pub fn slot(&self, target: HookTarget) -> &OriginalSlot {
        match target {
            HookTarget::Allocate => &self.allocate,
            HookTarget::Free => &self.free,
        }
    }

    #[inline]
    pub fn get(&self, target: HookTarget) -> Option<Address> {
        self.slot(target).get()
    }

    /// Number of populated slots
    pub fn populated(&self) -> usize {
        HookTarget::ALL
            .iter()
            .filter(|target| self.slot(**target).is_populated())
            .count()
    }
}

//! Telemetry records captured by the trace hooks

use super::address::Address;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire tag distinguishing record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum RecordKind {
    Allocation = 1,
    Free = 2,
}

impl RecordKind {
    /// All known kinds, in tag order
    pub const ALL: [RecordKind; 2] = [RecordKind::Allocation, RecordKind::Free];

    /// The raw wire tag
    pub const fn tag(self) -> u16 {
        self as u16
    }

    /// Look up a kind from its wire tag
    pub const fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(RecordKind::Allocation),
            2 => Some(RecordKind::Free),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Allocation => write!(f, "alloc"),
            RecordKind::Free => write!(f, "free"),
        }
    }
}

/// Captured when an allocation call returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct AllocationRecord {
    pub size: u32,
    pub address: u32,
}

impl AllocationRecord {
    /// Build a record from the requested size and the returned block
    pub const fn new(size: usize, address: Address) -> Self {
        AllocationRecord {
            size: size as u32,
            address: address.to_wire(),
        }
    }
}

/// Captured when a free call returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct FreeRecord {
    pub address: u32,
}

impl FreeRecord {
    /// Build a record from the released block
    pub const fn new(address: Address) -> Self {
        FreeRecord {
            address: address.to_wire(),
        }
    }
}

//! Linux backend
//!
//! libc wrappers for shared-object resolution and page protection, and the
//! global offset table patcher built on them.

pub mod bindings;
pub mod elf;
pub mod got;

pub use got::{got_slots, GotSlot, UnixPlatform};

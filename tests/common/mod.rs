//! Shared fixtures for integration tests

#![allow(dead_code)]

use memtrace::core::types::{Address, TraceError, TraceResult};
use memtrace::hooks::HookSpec;
use memtrace::intercept::{HookTarget, PatchPlatform};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const MODULE_BASE: usize = 0x7100_0000;
pub const ALLOCATE_HOOK: usize = 0x10_0010;
pub const FREE_HOOK: usize = 0x10_0020;

/// A redirect the fake platform was asked to make
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub export: String,
    pub target: Address,
    pub hook: Address,
}

/// Platform that resolves a fixed module and records patches
#[derive(Clone, Default)]
pub struct FakePlatform {
    missing_module: bool,
    rejected: HashSet<String>,
    patches: Arc<Mutex<Vec<Patch>>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        FakePlatform::default()
    }

    pub fn without_module() -> Self {
        FakePlatform {
            missing_module: true,
            ..FakePlatform::default()
        }
    }

    pub fn rejecting(export: &str) -> Self {
        let mut platform = FakePlatform::default();
        platform.rejected.insert(export.to_string());
        platform
    }

    pub fn patches(&self) -> Vec<Patch> {
        self.patches.lock().unwrap().clone()
    }

    /// Address the fake resolves `export` to
    pub fn export_address(export: &str) -> Address {
        let offset = export.bytes().fold(0usize, |acc, b| acc * 31 + b as usize) % 0x10_0000;
        Address::new(MODULE_BASE + 0x1000 + offset * 16)
    }
}

impl PatchPlatform for FakePlatform {
    fn resolve_module(&self, name: &str) -> TraceResult<Address> {
        if self.missing_module {
            Err(TraceError::ModuleNotFound(name.to_string()))
        } else {
            Ok(Address::new(MODULE_BASE))
        }
    }

    fn resolve_export(&self, _module: Address, export: &str) -> TraceResult<Address> {
        Ok(Self::export_address(export))
    }

    unsafe fn install_trampoline(
        &self,
        _module: Address,
        export: &str,
        target: Address,
        hook: Address,
    ) -> TraceResult<usize> {
        if self.rejected.contains(export) {
            return Err(TraceError::patch_rejected(export, "page is not writable"));
        }
        self.patches.lock().unwrap().push(Patch {
            export: export.to_string(),
            target,
            hook,
        });
        Ok(1)
    }
}

/// Hook specs for the default exports with placeholder trampolines
pub fn fake_hook_specs() -> Vec<HookSpec> {
    let hooks = memtrace::TracerConfig::default().hooks;
    vec![
        HookSpec::new(
            HookTarget::Allocate,
            hooks.allocate_export,
            Address::new(ALLOCATE_HOOK),
        ),
        HookSpec::new(HookTarget::Free, hooks.free_export, Address::new(FREE_HOOK)),
    ]
}

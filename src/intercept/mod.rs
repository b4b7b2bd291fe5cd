//! Binary-level interception of exported functions
//!
//! The engine resolves one loaded module, then redirects individual exports
//! of that module to trampolines. The original entry point of every export
//! is published into an [`OriginalSlot`] before the redirect happens, so a
//! trampoline that fires on another thread mid-installation always finds
//! something to call.
//!
//! ```text
//! Uninitialized --init ok--> ModuleResolved --add_hook ok--> HooksInstalled
//!       |
//!       +--init failed--> Unavailable
//! ```

mod platform;
mod slot;

pub use platform::PatchPlatform;
#[cfg(any(windows, target_os = "linux"))]
pub use platform::native_platform;
pub use slot::{HookTarget, OriginalSlot, OriginalTable};

use crate::core::types::{Address, TraceError, TraceResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Interception engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Uninitialized,
    ModuleResolved,
    HooksInstalled,
    /// Module resolution failed; every later hook request is ignored
    Unavailable,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::ModuleResolved => "module resolved",
            EngineState::HooksInstalled => "hooks installed",
            EngineState::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// Registry key of a hook attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HookKey {
    pub module: String,
    pub export: String,
}

/// Outcome of one hook attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookEntry {
    pub hook: Address,
    /// Resolved original entry point, if resolution got that far
    pub original: Option<Address>,
    /// Call sites rewritten to reach the hook
    pub patched_sites: usize,
    pub installed: bool,
}

/// A module whose exports can be redirected
#[derive(Debug, Clone)]
struct ResolvedModule {
    name: String,
    base: Address,
}

/// Redirects exports of one module to trampolines
pub struct InterceptionEngine {
    platform: Box<dyn PatchPlatform>,
    state: EngineState,
    module: Option<ResolvedModule>,
    registry: HashMap<HookKey, HookEntry>,
}

impl InterceptionEngine {
    pub fn new(platform: Box<dyn PatchPlatform>) -> Self {
        InterceptionEngine {
            platform,
            state: EngineState::Uninitialized,
            module: None,
            registry: HashMap::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Name and base of the resolved module
    pub fn module(&self) -> Option<(&str, Address)> {
        self.module.as_ref().map(|m| (m.name.as_str(), m.base))
    }

    /// Resolves and pins `module_name`
    ///
    /// Only the first call has an effect. Returns whether the engine can
    /// install hooks afterwards.
    pub fn init(&mut self, module_name: &str) -> bool {
        if self.state != EngineState::Uninitialized {
            debug!(state = %self.state, "interception engine already initialized");
            return self.can_install();
        }

        match self.platform.resolve_module(module_name) {
            Ok(base) => {
                info!(module = module_name, base = %base, "resolved module");
                self.module = Some(ResolvedModule {
                    name: module_name.to_string(),
                    base,
                });
                self.state = EngineState::ModuleResolved;
                true
            }
            Err(e) => {
                warn!(module = module_name, error = %e, "module resolution failed, hooks disabled");
                self.state = EngineState::Unavailable;
                false
            }
        }
    }

    /// Redirects `export` of the resolved module to `hook`
    ///
    /// The original entry point lands in `slot` before any call site is
    /// rewritten. On failure the slot is cleared again; other hooks are not
    /// affected.
    pub fn add_hook(&mut self, export: &str, hook: Address, slot: &OriginalSlot) -> bool {
        let module = match (self.state, &self.module) {
            (EngineState::ModuleResolved | EngineState::HooksInstalled, Some(module)) => {
                module.clone()
            }
            (EngineState::Unavailable, _) => return false,
            (state, _) => {
                let e = TraceError::InvalidState(format!("cannot hook {} while {}", export, state));
                warn!(error = %e, "hook rejected");
                return false;
            }
        };

        let key = HookKey {
            module: module.name.clone(),
            export: export.to_string(),
        };
        if self.registry.get(&key).is_some_and(|entry| entry.installed) {
            debug!(export, "hook already installed");
            return true;
        }

        let mut entry = HookEntry {
            hook,
            original: None,
            patched_sites: 0,
            installed: false,
        };
        let result = self.install(&module, export, hook, slot, &mut entry);
        match result {
            Ok(()) => {
                info!(
                    module = %module.name,
                    export,
                    original = ?entry.original,
                    sites = entry.patched_sites,
                    "hook installed"
                );
                self.state = EngineState::HooksInstalled;
            }
            Err(e) => {
                slot.clear();
                warn!(module = %module.name, export, error = %e, "hook installation failed");
            }
        }

        let installed = entry.installed;
        self.registry.insert(key, entry);
        installed
    }

    fn install(
        &self,
        module: &ResolvedModule,
        export: &str,
        hook: Address,
        slot: &OriginalSlot,
        entry: &mut HookEntry,
    ) -> TraceResult<()> {
        let original = self.platform.resolve_export(module.base, export)?;
        entry.original = Some(original);
        slot.publish(original);

        // SAFETY: hooks are registered together with the export they stand in
        // for and are plain functions that live as long as the process.
        let sites = unsafe {
            self.platform
                .install_trampoline(module.base, export, original, hook)?
        };
        if sites == 0 {
            return Err(TraceError::NoImportSlots(export.to_string()));
        }

        entry.patched_sites = sites;
        entry.installed = true;
        Ok(())
    }

    /// Every hook attempt made so far
    pub fn hooks(&self) -> impl Iterator<Item = (&HookKey, &HookEntry)> {
        self.registry.iter()
    }

    /// The recorded attempt for `export` of the resolved module
    pub fn hook(&self, export: &str) -> Option<&HookEntry> {
        let module = self.module.as_ref()?;
        self.registry.get(&HookKey {
            module: module.name.clone(),
            export: export.to_string(),
        })
    }

    pub fn installed_count(&self) -> usize {
        self.registry.values().filter(|entry| entry.installed).count()
    }

    fn can_install(&self) -> bool {
        matches!(
            self.state,
            EngineState::ModuleResolved | EngineState::HooksInstalled
        )
    }
}

impl fmt::Debug for InterceptionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionEngine")
            .field("state", &self.state)
            .field("module", &self.module)
            .field("hooks", &self.registry.len())
            .finish()
    }
}

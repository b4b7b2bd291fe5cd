//! Lifecycle controller
//!
//! [`Tracer`] is the process-wide state object: configuration, the collector
//! channel, the interception engine and the table of preserved originals.
//! The loader entry point feeds it [`LifecycleEvent`]s.

#[cfg(feature = "autoattach")]
mod entry;

#[cfg(feature = "autoattach")]
pub use entry::global;

use crate::channel::{ChannelManager, Connector};
use crate::config::TracerConfig;
use crate::hooks::{self, HookSpec};
use crate::intercept::{
    EngineState, HookEntry, HookKey, InterceptionEngine, OriginalTable, PatchPlatform,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Notifications delivered by the OS loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    AttachProcess,
    DetachProcess,
    AttachThread,
    DetachThread,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleEvent::AttachProcess => "process attach",
            LifecycleEvent::DetachProcess => "process detach",
            LifecycleEvent::AttachThread => "thread attach",
            LifecycleEvent::DetachThread => "thread detach",
        };
        f.write_str(name)
    }
}

/// Process-wide tracer state
pub struct Tracer {
    config: TracerConfig,
    connector: Box<dyn Connector>,
    channel: ChannelManager,
    engine: Mutex<InterceptionEngine>,
    originals: OriginalTable,
    hook_specs: Vec<HookSpec>,
    /// The native trampolines are installed and must find this tracer
    binds_native_hooks: bool,
}

impl Tracer {
    pub fn builder() -> TracerBuilder {
        TracerBuilder::new()
    }

    /// Dispatches a loader notification
    ///
    /// Always returns true: tracer failures never fail the host's load.
    pub fn handle(&'static self, event: LifecycleEvent) -> bool {
        debug!(%event, "lifecycle event");
        match event {
            LifecycleEvent::AttachProcess => self.attach_process(),
            LifecycleEvent::DetachProcess => self.detach_process(),
            LifecycleEvent::AttachThread | LifecycleEvent::DetachThread => true,
        }
    }

    /// Connects to the collector, then installs the hooks
    ///
    /// Without a collector, hooks are only installed when
    /// `hooks.require_collector` is off; they then run with a channel that
    /// drops every record.
    pub fn attach_process(&'static self) -> bool {
        info!(version = crate::core::VERSION, "attaching tracer");

        let channel = &self.config.channel;
        let connected = self.channel.connect(
            self.connector.as_ref(),
            &channel.name,
            channel.greeting.as_bytes(),
        );
        if !connected && self.config.hooks.require_collector {
            info!("no collector listening, hooks not installed");
            return true;
        }

        if self.binds_native_hooks && !hooks::native_targets_match(&self.config.hooks) {
            warn!(
                module = %self.config.hooks.module,
                allocate = %self.config.hooks.allocate_export,
                free = %self.config.hooks.free_export,
                "hook targets do not match the native trampolines, hooks not installed"
            );
            return true;
        }

        let mut engine = self.engine();
        if !engine.init(&self.config.hooks.module) {
            return true;
        }

        if self.binds_native_hooks {
            hooks::bind(self);
        }
        for spec in &self.hook_specs {
            engine.add_hook(&spec.export, spec.hook, self.originals.slot(spec.target));
        }

        info!(
            module = %self.config.hooks.module,
            installed = engine.installed_count(),
            requested = self.hook_specs.len(),
            "tracer attached"
        );
        true
    }

    /// Closes the channel; installed hooks stay and stop emitting
    pub fn detach_process(&self) -> bool {
        self.channel.close();
        info!(stats = ?self.channel.stats(), "tracer detached");
        true
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn channel(&self) -> &ChannelManager {
        &self.channel
    }

    pub fn originals(&self) -> &OriginalTable {
        &self.originals
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine().state()
    }

    /// Snapshot of every hook attempt
    pub fn hook_entries(&self) -> Vec<(HookKey, HookEntry)> {
        self.engine()
            .hooks()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Records are being produced and delivered
    pub fn is_tracing(&self) -> bool {
        self.channel.is_connected() && self.originals.populated() > 0
    }

    fn engine(&self) -> MutexGuard<'_, InterceptionEngine> {
        match self.engine.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("config", &self.config)
            .field("connected", &self.channel.is_connected())
            .field("originals", &self.originals)
            .field("hook_specs", &self.hook_specs)
            .finish()
    }
}

/// Builder for [`Tracer`]
///
/// Anything not set falls back to the native implementation for the
/// compilation target.
#[derive(Default)]
pub struct TracerBuilder {
    config: Option<TracerConfig>,
    connector: Option<Box<dyn Connector>>,
    platform: Option<Box<dyn PatchPlatform>>,
    hook_specs: Option<Vec<HookSpec>>,
}

impl TracerBuilder {
    pub fn new() -> Self {
        TracerBuilder::default()
    }

    pub fn config(mut self, config: TracerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn platform(mut self, platform: Box<dyn PatchPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Replaces the native trampolines
    pub fn hook_specs(mut self, specs: Vec<HookSpec>) -> Self {
        self.hook_specs = Some(specs);
        self
    }

    pub fn build(self) -> Tracer {
        let config = self.config.unwrap_or_default();
        let connector = self
            .connector
            .unwrap_or_else(crate::channel::native_connector);
        let platform = self
            .platform
            .unwrap_or_else(crate::intercept::native_platform);
        let binds_native_hooks = self.hook_specs.is_none();
        let hook_specs = self
            .hook_specs
            .unwrap_or_else(hooks::native_hook_specs);

        Tracer {
            config,
            connector,
            channel: ChannelManager::new(),
            engine: Mutex::new(InterceptionEngine::new(platform)),
            originals: OriginalTable::new(),
            hook_specs,
            binds_native_hooks,
        }
    }
}

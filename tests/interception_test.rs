//! Integration tests for the interception engine

mod common;

use common::{FakePlatform, MODULE_BASE};
use memtrace::core::types::Address;
use memtrace::intercept::{EngineState, HookTarget, InterceptionEngine, OriginalTable};
use pretty_assertions::assert_eq;

#[test]
fn test_originals_published_before_redirect() {
    let platform = FakePlatform::new();
    let mut engine = InterceptionEngine::new(Box::new(platform.clone()));
    let table = OriginalTable::new();

    assert!(engine.init("libc.so.6"));
    assert!(engine.add_hook("malloc", Address::new(0xA1), table.slot(HookTarget::Allocate)));
    assert!(engine.add_hook("free", Address::new(0xF1), table.slot(HookTarget::Free)));

    let patches = platform.patches();
    assert_eq!(patches.len(), 2);
    for (patch, target) in patches.iter().zip(HookTarget::ALL) {
        // The redirect targets exactly what the slot preserved
        assert_eq!(table.get(target), Some(patch.target));
        assert_eq!(patch.target, FakePlatform::export_address(&patch.export));
    }
    assert_eq!(engine.state(), EngineState::HooksInstalled);
    assert_eq!(engine.module(), Some(("libc.so.6", Address::new(MODULE_BASE))));
}

#[test]
fn test_rejected_hook_does_not_affect_others() {
    let platform = FakePlatform::rejecting("malloc");
    let mut engine = InterceptionEngine::new(Box::new(platform.clone()));
    let table = OriginalTable::new();

    engine.init("libc.so.6");
    assert!(!engine.add_hook("malloc", Address::new(0xA1), table.slot(HookTarget::Allocate)));
    assert!(engine.add_hook("free", Address::new(0xF1), table.slot(HookTarget::Free)));

    assert_eq!(table.get(HookTarget::Allocate), None);
    assert!(table.get(HookTarget::Free).is_some());
    assert_eq!(engine.installed_count(), 1);
    assert_eq!(engine.hooks().count(), 2);

    let failed = engine.hook("malloc").unwrap();
    assert!(!failed.installed);
    assert_eq!(failed.hook, Address::new(0xA1));
}

#[test]
fn test_unavailable_engine_ignores_hooks() {
    let platform = FakePlatform::without_module();
    let mut engine = InterceptionEngine::new(Box::new(platform.clone()));
    let table = OriginalTable::new();

    assert!(!engine.init("libc.so.6"));
    for target in HookTarget::ALL {
        assert!(!engine.add_hook("malloc", Address::new(0xA1), table.slot(target)));
    }

    assert_eq!(engine.state(), EngineState::Unavailable);
    assert_eq!(table.populated(), 0);
    assert!(platform.patches().is_empty());
}

#[test]
fn test_second_init_keeps_first_module() {
    let mut engine = InterceptionEngine::new(Box::new(FakePlatform::new()));

    assert!(engine.init("libc.so.6"));
    assert!(engine.init("other.so"));
    assert_eq!(engine.module().map(|(name, _)| name), Some("libc.so.6"));
}

#[cfg(target_os = "linux")]
mod native {
    use memtrace::channel::SocketConnector;
    use memtrace::core::types::{Address, AllocationRecord};
    use memtrace::intercept::{EngineState, PatchPlatform};
    use memtrace::unix::UnixPlatform;
    use memtrace::wire::{DecodedRecord, MessageReader};
    use memtrace::{LifecycleEvent, Tracer, TracerConfig};
    use std::ffi::CStr;
    use std::io::Read;
    use std::os::unix::net::UnixListener;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_native_platform_resolves_default_targets() {
        let hooks = memtrace::TracerConfig::default().hooks;
        let platform = UnixPlatform::new();

        let module = platform.resolve_module(&hooks.module).unwrap();
        assert!(platform.resolve_export(module, &hooks.allocate_export).is_ok());
        assert!(platform.resolve_export(module, &hooks.free_export).is_ok());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_libc_allocations_reach_the_collector() {
        let config = TracerConfig::default();
        let temp_dir = TempDir::new().unwrap();
        let connector = SocketConnector::in_dir(temp_dir.path());
        let listener = UnixListener::bind(connector.socket_path(&config.channel.name)).unwrap();

        // Hooks stay installed for the rest of the process
        let tracer: &'static Tracer = Box::leak(Box::new(
            Tracer::builder()
                .config(config.clone())
                .connector(Box::new(connector))
                .build(),
        ));
        assert!(tracer.handle(LifecycleEvent::AttachProcess));
        let (mut stream, _) = listener.accept().unwrap();

        assert_eq!(tracer.engine_state(), EngineState::HooksInstalled);
        let entries = tracer.hook_entries();
        assert_eq!(entries.len(), 2);
        for (key, entry) in &entries {
            assert!(entry.installed, "{} not installed", key.export);
            assert!(entry.patched_sites > 0);
        }
        assert!(tracer.is_tracing());

        // strdup allocates through libc's own GOT entry for malloc
        let source =
            CStr::from_bytes_with_nul(b"traced through the global offset table\0").unwrap();
        let copy = unsafe { libc::strdup(source.as_ptr()) };
        assert!(!copy.is_null());
        let expected = AllocationRecord::new(
            source.to_bytes_with_nul().len(),
            Address::new(copy as usize),
        );

        assert!(tracer.handle(LifecycleEvent::DetachProcess));
        unsafe { libc::free(copy as *mut libc::c_void) };

        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).unwrap();

        let mut reader = MessageReader::new(config.channel.greeting.as_bytes());
        reader.feed(&received);
        let records: Vec<DecodedRecord> = std::iter::from_fn(|| reader.next_record())
            .map_while(Result::ok)
            .collect();

        assert!(reader.greeted());
        assert!(records.contains(&DecodedRecord::Allocation(expected)));
    }
}

#[cfg(windows)]
mod native {
    use memtrace::intercept::PatchPlatform;
    use memtrace::windows::WindowsPlatform;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_native_platform_resolves_default_targets() {
        let hooks = memtrace::TracerConfig::default().hooks;
        let platform = WindowsPlatform::new();

        let module = platform.resolve_module(&hooks.module).unwrap();
        assert!(platform.resolve_export(module, &hooks.allocate_export).is_ok());
        assert!(platform.resolve_export(module, &hooks.free_export).is_ok());
    }
}

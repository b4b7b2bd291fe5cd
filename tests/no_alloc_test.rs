//! The hook path must not touch the heap
//!
//! A counting global allocator records every allocation made by the current
//! thread; the traced path is then run between two readings.

mod common;

use common::{fake_hook_specs, FakePlatform};
use memtrace::channel::memory::MemoryConnector;
use memtrace::core::types::{Address, AllocationRecord};
use memtrace::wire::{serialize, WireMessage};
use memtrace::{LifecycleEvent, Tracer};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

struct CountingAllocator;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn allocations_during<F: FnOnce()>(f: F) -> usize {
    let before = ALLOCATIONS.with(Cell::get);
    f();
    ALLOCATIONS.with(Cell::get) - before
}

#[test]
fn test_serialize_does_not_allocate() {
    let record = AllocationRecord::new(128, Address::new(0xCAFE_0000));
    let count = allocations_during(|| {
        for _ in 0..100 {
            let mut msg = WireMessage::new();
            serialize(&record, &mut msg);
            std::hint::black_box(msg.as_bytes());
        }
    });
    assert_eq!(count, 0);
}

#[test]
fn test_traced_path_does_not_allocate() {
    let connector = MemoryConnector::new(64 * 1024);
    let capture = connector.capture();
    let tracer: &'static Tracer = Box::leak(Box::new(
        Tracer::builder()
            .connector(Box::new(connector))
            .platform(Box::new(FakePlatform::new()))
            .hook_specs(fake_hook_specs())
            .build(),
    ));
    tracer.handle(LifecycleEvent::AttachProcess);
    assert!(tracer.is_tracing());

    let count = allocations_during(|| {
        for i in 0..100 {
            let address = Address::new(0x8000 + i * 16);
            tracer.traced_allocate(16, |_| address);
            tracer.traced_free(address, |_| ());
        }
    });

    assert_eq!(count, 0);
    assert_eq!(tracer.channel().stats().messages_sent, 201);
    assert!(capture.bytes().len() > 200 * 8);
}

#[test]
fn test_dropping_path_does_not_allocate() {
    let tracer: &'static Tracer = Box::leak(Box::new(
        Tracer::builder()
            .config({
                let mut config = memtrace::TracerConfig::default();
                config.hooks.require_collector = false;
                config
            })
            .connector(Box::new(MemoryConnector::unavailable()))
            .platform(Box::new(FakePlatform::new()))
            .hook_specs(fake_hook_specs())
            .build(),
    ));
    tracer.handle(LifecycleEvent::AttachProcess);

    let count = allocations_during(|| {
        for i in 0..100 {
            tracer.traced_allocate(16, |_| Address::new(0x8000 + i * 16));
        }
    });

    assert_eq!(count, 0);
    assert_eq!(tracer.channel().stats().dropped, 100);
}

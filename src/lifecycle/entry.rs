//! Loader entry points
//!
//! Compiled with the `autoattach` feature only. The tracer attaches when the
//! library is loaded into a process and runs on the default configuration:
//! nothing is read from the environment or the file system.

use super::{LifecycleEvent, Tracer};
use crate::config::TracerConfig;
use crate::logging;
use std::sync::OnceLock;
use tracing::warn;

static TRACER: OnceLock<Tracer> = OnceLock::new();

/// The tracer driven by the loader entry points
pub fn global() -> &'static Tracer {
    TRACER.get_or_init(|| Tracer::builder().config(TracerConfig::default()).build())
}

fn dispatch(event: LifecycleEvent) -> bool {
    let tracer = global();
    if event == LifecycleEvent::AttachProcess {
        if let Err(e) = logging::init(&tracer.config().logging) {
            warn!(error = %e, "logging not initialized");
        }
    }
    tracer.handle(event)
}

#[cfg(windows)]
mod native {
    use super::dispatch;
    use crate::lifecycle::LifecycleEvent;
    use winapi::shared::minwindef::{BOOL, DWORD, FALSE, HINSTANCE, LPVOID, TRUE};
    use winapi::um::winnt::{
        DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH, DLL_THREAD_ATTACH, DLL_THREAD_DETACH,
    };

    #[no_mangle]
    #[allow(non_snake_case)]
    pub extern "system" fn DllMain(_module: HINSTANCE, reason: DWORD, _reserved: LPVOID) -> BOOL {
        let event = match reason {
            DLL_PROCESS_ATTACH => LifecycleEvent::AttachProcess,
            DLL_PROCESS_DETACH => LifecycleEvent::DetachProcess,
            DLL_THREAD_ATTACH => LifecycleEvent::AttachThread,
            DLL_THREAD_DETACH => LifecycleEvent::DetachThread,
            _ => return TRUE,
        };
        if dispatch(event) {
            TRUE
        } else {
            FALSE
        }
    }
}

#[cfg(target_os = "linux")]
mod native {
    use super::dispatch;
    use crate::lifecycle::LifecycleEvent;

    extern "C" fn on_load() {
        dispatch(LifecycleEvent::AttachProcess);
    }

    extern "C" fn on_unload() {
        dispatch(LifecycleEvent::DetachProcess);
    }

    #[used]
    #[link_section = ".init_array"]
    static ON_LOAD: extern "C" fn() = on_load;

    #[used]
    #[link_section = ".fini_array"]
    static ON_UNLOAD: extern "C" fn() = on_unload;
}

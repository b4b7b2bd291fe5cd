//! Per-thread reentrancy guard

use std::cell::Cell;

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running hook bookkeeping
///
/// While a guard is alive, nested hook invocations on the same thread (an
/// OS send that allocates, say) only pass through to the original.
#[derive(Debug)]
pub struct ReentrancyGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ReentrancyGuard {
    /// Enters the guarded section, or `None` if this thread is already in it
    ///
    /// Also `None` while the thread's locals are being torn down.
    #[inline]
    pub fn enter() -> Option<Self> {
        let entered = IN_HOOK
            .try_with(|flag| {
                if flag.get() {
                    false
                } else {
                    flag.set(true);
                    true
                }
            })
            .unwrap_or(false);

        entered.then(|| ReentrancyGuard {
            _not_send: std::marker::PhantomData,
        })
    }

    /// Whether the current thread is inside a guarded section
    pub fn is_active() -> bool {
        IN_HOOK.try_with(Cell::get).unwrap_or(true)
    }
}

impl Drop for ReentrancyGuard {
    #[inline]
    fn drop(&mut self) {
        let _ = IN_HOOK.try_with(|flag| flag.set(false));
    }
}

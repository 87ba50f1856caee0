//! Scheduler hooks
//!
//! Drivers never talk to the task scheduler directly. Blocking loops call
//! [`yield_now`], which forwards to whatever the scheduler registered at
//! boot. Before a scheduler is installed the call degrades to a spin hint.
//!
//! Locks held across a blocking loop are taken with [`lock`], so a waiter
//! hands the CPU back to the holder instead of spinning past it.

use spin::{Mutex, MutexGuard, RwLock};

static YIELD_HOOK: RwLock<Option<fn()>> = RwLock::new(None);

/// Install the function that gives up the CPU to another ready task
pub fn set_yield_hook(hook: fn()) {
    *YIELD_HOOK.write() = Some(hook);
}

/// Remove the yield hook (back to spinning)
pub fn clear_yield_hook() {
    *YIELD_HOOK.write() = None;
}

/// Let other tasks run before the caller polls again
#[inline]
pub fn yield_now() {
    let hook = *YIELD_HOOK.read();
    match hook {
        Some(f) => f(),
        None => core::hint::spin_loop(),
    }
}

/// Acquire `mutex`, yielding between attempts while another task holds it
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    loop {
        if let Some(guard) = mutex.try_lock() {
            return guard;
        }
        yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    // Both tests swap the global hook
    static HOOK: Mutex<()> = Mutex::new(());

    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static WAITS: AtomicUsize = AtomicUsize::new(0);

    fn counting_yield() {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn waiting_yield() {
        WAITS.fetch_add(1, Ordering::SeqCst);
        thread::yield_now();
    }

    #[test]
    fn test_yield_hook_is_called() {
        let _hook = HOOK.lock();
        yield_now();
        set_yield_hook(counting_yield);
        yield_now();
        yield_now();
        clear_yield_hook();
        yield_now();
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lock_yields_while_held() {
        let _hook = HOOK.lock();
        set_yield_hook(waiting_yield);

        let shared = Arc::new(Mutex::new(0u32));
        let held = shared.lock();
        let waiter = {
            let shared = shared.clone();
            thread::spawn(move || *lock(&shared) += 1)
        };
        while WAITS.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        drop(held);
        waiter.join().unwrap();

        clear_yield_hook();
        assert_eq!(*lock(&shared), 1);
    }
}

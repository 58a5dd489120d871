//! # Future Bridge
//!
//! Adapter between the native core's callback futures and Rust `async`.
//!
//! The native ABI hands back a `coffer_future_t*` from every asynchronous
//! entry point and invokes a registered continuation exactly once when it
//! resolves, on a thread of the core's choosing. This module turns that
//! contract into awaitable calls:
//!
//! ```text
//!   facade ──▶ dispatcher thread ──▶ native call ──▶ coffer_future_then
//!                                                         │
//!                              (core worker) trampoline ◀─┘
//!                                                │
//!   .await ◀── oneshot channel ◀── dispatcher thread
//! ```
//!
//! Native calls are started on a single dedicated dispatcher thread so the
//! core always sees API calls in submission order, regardless of which
//! async runtime threads the facade runs on. The continuation context is a
//! single-owner `Box` consumed by the trampoline, which queries the error
//! first, takes the value only on success, and destroys the future. The
//! continuation itself then runs back on the dispatcher thread, so result
//! handling for concurrent operations never overlaps: the payload is
//! converted to its owned Rust form there, and only that owned value
//! crosses the oneshot.

use std::any::Any;
use std::os::raw::c_void;
use std::sync::mpsc;
use std::thread;

use once_cell::sync::Lazy;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{self, Error, Result};
use crate::native;

// ============================================================================
// DISPATCHER
// ============================================================================

type Job = Box<dyn FnOnce() + Send>;

/// Serial queue backed by one dedicated thread. Jobs run in submission
/// order; the thread lives for the process lifetime.
struct Dispatcher {
    tx: mpsc::Sender<Job>,
}

impl Dispatcher {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name("coffer-dispatch".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .expect("spawn dispatcher thread");
        Self { tx }
    }

    fn dispatch(&self, job: Job) {
        // The receiver only disappears if the dispatcher thread died, and
        // it never returns while the sender side is alive.
        let _ = self.tx.send(job);
    }
}

static DISPATCHER: Lazy<Dispatcher> = Lazy::new(Dispatcher::spawn);

// ============================================================================
// NATIVE VALUES
// ============================================================================

/// A resolved future's payload. The pointer's meaning is per-operation:
/// null for void results, a pointer-sized integer for status codes, or a
/// core-allocated buffer the caller must free with the matching destructor.
pub(crate) struct NativeValue(*mut c_void);

// Ownership of the payload moves with the wrapper.
unsafe impl Send for NativeValue {}

impl std::fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NativeValue").field(&self.0).finish()
    }
}

impl NativeValue {
    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    pub(crate) fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Copy out a core-allocated string and free it. Null stays `None`.
    pub(crate) fn into_string(self) -> Option<String> {
        if self.0.is_null() {
            return None;
        }
        unsafe {
            let copied = std::ffi::CStr::from_ptr(self.0 as *const std::os::raw::c_char)
                .to_string_lossy()
                .into_owned();
            native::coffer_free_buffer(self.0);
            Some(copied)
        }
    }

    /// Copy out a core-allocated `coffer_buffer_t` and free it.
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        if self.0.is_null() {
            return Vec::new();
        }
        unsafe {
            let buffer = self.0 as *mut native::coffer_buffer_t;
            let copied = if (*buffer).data.is_null() {
                Vec::new()
            } else {
                std::slice::from_raw_parts((*buffer).data, (*buffer).len as usize).to_vec()
            };
            native::coffer_buffer_destroy(buffer);
            copied
        }
    }
}

pub(crate) type CallResult = Result<NativeValue>;

// ============================================================================
// CONTINUATIONS
// ============================================================================

struct Continuation {
    /// Converts the raw outcome and completes the caller's channel.
    complete: Box<dyn FnOnce(CallResult) + Send>,
    /// Keeps whatever the operation depends on (typically the session's
    /// inner state) alive until the continuation has run.
    _guard: Option<Box<dyn Any + Send>>,
}

/// Callback invoked by the core when a future resolves, on a worker
/// thread of the core's choosing. Extracts the outcome error-first and
/// destroys the future there, then hands the continuation back to the
/// dispatcher thread for delivery.
unsafe extern "C" fn trampoline(
    fut: *mut native::coffer_future_t,
    ctx: *mut c_void,
) -> *mut c_void {
    let continuation = Box::from_raw(ctx as *mut Continuation);
    let result = match error::from_raw(native::coffer_future_get_error(fut)) {
        Some(err) => Err(err),
        None => Ok(NativeValue(native::coffer_future_get_voidptr(fut))),
    };
    native::coffer_future_destroy(fut);
    DISPATCHER.dispatch(Box::new(move || {
        let Continuation { complete, _guard } = *continuation;
        // Release the guard before waking the caller, so anything it keeps
        // alive is torn down strictly before the result is observed.
        drop(_guard);
        complete(result);
    }));
    std::ptr::null_mut()
}

/// Start a native call on the dispatcher thread and await its resolution.
///
/// `start` runs on the dispatcher thread and must return the future from
/// exactly one native call. `convert` also runs on the dispatcher thread,
/// while the raw payload is still owned by this side of the channel; it
/// must free any core allocation it is handed, so the payload never
/// outlives the continuation even when the caller stops awaiting. `guard`
/// is held until the continuation fires.
pub(crate) async fn call<S, C, T>(
    start: S,
    convert: C,
    guard: Option<Box<dyn Any + Send>>,
) -> Result<T>
where
    S: FnOnce() -> *mut native::coffer_future_t + Send + 'static,
    C: FnOnce(NativeValue) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let complete: Box<dyn FnOnce(CallResult) + Send> = Box::new(move |result| {
        // A dropped receiver just means the caller gave up waiting; the
        // operation itself already ran and the payload is reclaimed here.
        let _ = tx.send(result.and_then(convert));
    });
    DISPATCHER.dispatch(Box::new(move || {
        let fut = start();
        let ctx = Box::into_raw(Box::new(Continuation {
            complete,
            _guard: guard,
        }));
        trace!(?fut, "attaching continuation");
        unsafe { native::coffer_future_then(fut, trampoline, ctx as *mut c_void) };
    }));
    rx.await
        .unwrap_or_else(|_| Err(Error::internal("native continuation was never invoked")))
}

/// Unwrap a future documented to resolve synchronously ("expected"
/// futures: session creation, resource ids, password prehashing).
///
/// # Safety
///
/// `fut` must come from a native entry point with the ready-future
/// contract; it is consumed by this call.
pub(crate) unsafe fn unwrap_expected(fut: *mut native::coffer_future_t) -> CallResult {
    let result = match error::from_raw(native::coffer_future_get_error(fut)) {
        Some(err) => Err(err),
        None => Ok(NativeValue(native::coffer_future_get_voidptr(fut))),
    };
    native::coffer_future_destroy(fut);
    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn prehash_future(password: &str) -> impl FnOnce() -> *mut native::coffer_future_t {
        let password = CString::new(password).unwrap();
        move || unsafe { native::coffer_prehash_password(password.as_ptr()) }
    }

    #[tokio::test]
    async fn call_delivers_ready_future_value() {
        let hashed = call(
            prehash_future("open sesame"),
            |value| value.into_string().ok_or(Error::internal("no string")),
            None,
        )
        .await
        .expect("prehash succeeds");
        assert!(!hashed.is_empty());
    }

    #[tokio::test]
    async fn call_translates_native_errors() {
        let err = call(prehash_future(""), |value| Ok(value.into_string()), None)
            .await
            .expect_err("empty password is rejected");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn continuations_run_on_the_dispatch_thread() {
        let thread_name = call(
            prehash_future("open sesame"),
            |value| {
                let _ = value.into_string();
                Ok(thread::current().name().map(str::to_owned))
            },
            None,
        )
        .await
        .expect("prehash succeeds");
        assert_eq!(thread_name.as_deref(), Some("coffer-dispatch"));
    }

    #[tokio::test(start_paused = true)]
    async fn payloads_are_reclaimed_when_the_caller_stops_waiting() {
        let converted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&converted);
        let pending = call(
            prehash_future("open sesame"),
            move |value| {
                let hashed = value.into_string();
                flag.store(true, Ordering::SeqCst);
                Ok(hashed)
            },
            None,
        );
        let abandoned = tokio::time::timeout(Duration::ZERO, pending).await;
        assert!(abandoned.is_err());
        // The continuation still runs and frees the native payload.
        for _ in 0..200 {
            if converted.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(converted.load(Ordering::SeqCst));
    }

    #[test]
    fn unwrap_expected_extracts_value_synchronously() {
        let password = CString::new("open sesame").unwrap();
        let value = unsafe {
            unwrap_expected(native::coffer_prehash_password(password.as_ptr()))
        }
        .expect("prehash succeeds");
        assert!(value.into_string().is_some());
    }

    #[test]
    fn unwrap_expected_surfaces_errors() {
        let password = CString::new("").unwrap();
        let err = unsafe { unwrap_expected(native::coffer_prehash_password(password.as_ptr())) }
            .expect_err("empty password is rejected");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn guard_survives_until_resolution_and_drops_on_the_dispatch_thread() {
        struct Flag(Arc<Mutex<Option<String>>>);
        impl Drop for Flag {
            fn drop(&mut self) {
                *self.0.lock().unwrap() = thread::current().name().map(str::to_owned);
            }
        }
        let dropped = Arc::new(Mutex::new(None));
        let _ = call(
            prehash_future("open sesame"),
            |value| Ok(value.into_string()),
            Some(Box::new(Flag(Arc::clone(&dropped)))),
        )
        .await;
        assert_eq!(dropped.lock().unwrap().as_deref(), Some("coffer-dispatch"));
    }
}

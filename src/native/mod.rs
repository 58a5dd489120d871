//! # Native ABI
//!
//! Hand-written declarations for the C interface of the native Coffer core
//! (`libcoffer`). Naming follows the C headers (`coffer_*_t`) so the
//! declarations can be diffed against them.
//!
//! ## Call model
//!
//! Every asynchronous entry point returns an opaque `coffer_future_t`
//! synchronously; the operation is already executing on one of the core's
//! worker threads at that point. `coffer_future_then` registers the sole
//! continuation, invoked exactly once on a worker thread - also when the
//! future is already resolved. The continuation must query
//! `coffer_future_get_error` and (only on success)
//! `coffer_future_get_voidptr` once each, destroy the future, and return
//! null. A handful of entry points return already-resolved "expected"
//! futures that may instead be unwrapped synchronously; they are marked
//! below.
//!
//! ## Wire structs
//!
//! Each struct crossing the boundary carries a version tag checked by the
//! core. The constants below are the agreed ABI versions; a mismatch is a
//! build error between binding and core, never a runtime condition. String
//! fields are borrowed, null-terminated UTF-8 owned by the caller and read
//! only during the one synchronous call that consumes the struct.
//!
//! With the default `stub-core` feature these symbols are provided by an
//! in-process fake core ([`stub`]) so the crate builds and tests without
//! the vendor library.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_void};

#[cfg(feature = "stub-core")]
pub mod stub;

// ============================================================================
// ABI VERSION CONSTANTS
// ============================================================================

/// Version tag of [`coffer_session_options_t`].
pub const COFFER_SESSION_OPTIONS_VERSION: u8 = 1;
/// Version tag of [`coffer_verification_t`].
pub const COFFER_VERIFICATION_VERSION: u8 = 9;
/// Version tag of [`coffer_verification_options_t`].
pub const COFFER_VERIFICATION_OPTIONS_VERSION: u8 = 2;
/// Version tag of [`coffer_encryption_options_t`].
pub const COFFER_ENCRYPTION_OPTIONS_VERSION: u8 = 4;
/// Version tag of [`coffer_sharing_options_t`].
pub const COFFER_SHARING_OPTIONS_VERSION: u8 = 1;

// ============================================================================
// OPAQUE HANDLES
// ============================================================================

/// Opaque native session handle.
#[repr(C)]
pub struct coffer_session_t {
    _private: [u8; 0],
}

/// Opaque native future handle. Resolves exactly once, asynchronously, on
/// a native worker thread; destroyed exactly once by whichever code path
/// observes its resolution.
#[repr(C)]
pub struct coffer_future_t {
    _private: [u8; 0],
}

// ============================================================================
// WIRE STRUCTS
// ============================================================================

/// Native error payload attached to a failed future.
///
/// Owned by the future it was read from; the pointer and its message
/// buffer are invalidated by `coffer_future_destroy`.
#[repr(C)]
pub struct coffer_error_t {
    /// Closed-enumeration error code.
    pub code: u32,
    /// Null-terminated human-readable message.
    pub message: *const c_char,
}

/// Session construction parameters for [`coffer_create`].
#[repr(C)]
pub struct coffer_session_options_t {
    pub version: u8,
    pub app_id: *const c_char,
    pub url: *const c_char,
    pub persistent_path: *const c_char,
    pub cache_path: *const c_char,
    pub sdk_type: *const c_char,
    pub sdk_version: *const c_char,
}

/// Email + code pair inside [`coffer_verification_t`].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct coffer_email_verification_t {
    pub email: *const c_char,
    pub verification_code: *const c_char,
}

/// Phone number + code pair inside [`coffer_verification_t`].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct coffer_phone_number_verification_t {
    pub phone_number: *const c_char,
    pub verification_code: *const c_char,
}

/// Preverified OIDC pair inside [`coffer_verification_t`].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct coffer_preverified_oidc_verification_t {
    pub subject: *const c_char,
    pub provider_id: *const c_char,
}

/// OIDC authorization code triple, used both inside
/// [`coffer_verification_t`] and as the heap-allocated result of
/// [`coffer_authenticate_with_idp`].
#[repr(C)]
pub struct coffer_oidc_authorization_code_verification_t {
    pub provider_id: *const c_char,
    pub authorization_code: *const c_char,
    pub state: *const c_char,
}

/// Versioned verification wire struct.
///
/// `verification_method_type` selects which of the per-variant fields is
/// populated; all other fields stay null. Valid only for the duration of
/// the single synchronous call that consumes it.
#[repr(C)]
pub struct coffer_verification_t {
    pub version: u8,
    pub verification_method_type: u8,
    pub passphrase: *const c_char,
    pub e2e_passphrase: *const c_char,
    pub verification_key: *const c_char,
    pub email_verification: coffer_email_verification_t,
    pub oidc_id_token: *const c_char,
    pub phone_number_verification: coffer_phone_number_verification_t,
    pub preverified_email: *const c_char,
    pub preverified_phone_number: *const c_char,
    pub preverified_oidc_verification: coffer_preverified_oidc_verification_t,
    pub oidc_authorization_code_verification: coffer_oidc_authorization_code_verification_t,
    pub prehashed_and_encrypted_passphrase: *const c_char,
}

impl coffer_verification_t {
    /// All pointer fields null; the codec fills in exactly one variant.
    pub(crate) fn empty() -> Self {
        let null = std::ptr::null();
        Self {
            version: COFFER_VERIFICATION_VERSION,
            verification_method_type: 0,
            passphrase: null,
            e2e_passphrase: null,
            verification_key: null,
            email_verification: coffer_email_verification_t {
                email: null,
                verification_code: null,
            },
            oidc_id_token: null,
            phone_number_verification: coffer_phone_number_verification_t {
                phone_number: null,
                verification_code: null,
            },
            preverified_email: null,
            preverified_phone_number: null,
            preverified_oidc_verification: coffer_preverified_oidc_verification_t {
                subject: null,
                provider_id: null,
            },
            oidc_authorization_code_verification: coffer_oidc_authorization_code_verification_t {
                provider_id: null,
                authorization_code: null,
                state: null,
            },
            prehashed_and_encrypted_passphrase: null,
        }
    }
}

/// Versioned verification options wire struct.
#[repr(C)]
pub struct coffer_verification_options_t {
    pub version: u8,
    pub with_session_token: bool,
    pub allow_e2e_method_switch: bool,
}

/// Versioned encryption options wire struct.
///
/// `padding_step` encodes the padding policy: 0 automatic, 1 off,
/// n >= 2 pad to a multiple of n.
#[repr(C)]
pub struct coffer_encryption_options_t {
    pub version: u8,
    pub share_with_users: *const *const c_char,
    pub nb_users: u32,
    pub share_with_groups: *const *const c_char,
    pub nb_groups: u32,
    pub share_with_self: bool,
    pub padding_step: u32,
}

/// Versioned sharing options wire struct.
#[repr(C)]
pub struct coffer_sharing_options_t {
    pub version: u8,
    pub share_with_users: *const *const c_char,
    pub nb_users: u32,
    pub share_with_groups: *const *const c_char,
    pub nb_groups: u32,
}

/// Byte buffer allocated by the core; freed with [`coffer_buffer_destroy`].
#[repr(C)]
pub struct coffer_buffer_t {
    pub data: *mut u8,
    pub len: u64,
}

/// One log record emitted by the core.
#[repr(C)]
pub struct coffer_log_record_t {
    pub category: *const c_char,
    /// 1 debug, 2 info, 3 warning, 4 error.
    pub level: u32,
    pub file: *const c_char,
    pub line: u32,
    pub message: *const c_char,
}

// ============================================================================
// CALLBACK TYPES
// ============================================================================

/// Continuation registered with [`coffer_future_then`].
///
/// Invoked exactly once, on a native worker thread, when the future
/// resolves. Must query error/value, destroy the future, and return null.
pub type coffer_future_then_cb =
    unsafe extern "C" fn(fut: *mut coffer_future_t, ctx: *mut c_void) -> *mut c_void;

/// Process-wide log sink registered with [`coffer_set_log_handler`].
pub type coffer_log_handler = unsafe extern "C" fn(record: *const coffer_log_record_t);

// ============================================================================
// ENTRY POINTS
// ============================================================================

#[cfg(feature = "stub-core")]
pub use stub::{
    coffer_authenticate_with_idp, coffer_buffer_destroy, coffer_create, coffer_decrypt,
    coffer_encrypt, coffer_free_buffer, coffer_future_destroy, coffer_future_get_error,
    coffer_future_get_voidptr, coffer_future_then, coffer_get_resource_id,
    coffer_oidc_verification_destroy, coffer_prehash_password, coffer_register_identity,
    coffer_session_destroy, coffer_set_log_handler, coffer_set_verification_method,
    coffer_share, coffer_start, coffer_status, coffer_stop, coffer_verify_identity,
    coffer_verify_provisional_identity, coffer_version_string,
};

#[cfg(not(feature = "stub-core"))]
#[link(name = "coffer")]
extern "C" {
    /// Ready expected future; value is `*mut coffer_session_t`.
    pub fn coffer_create(options: *const coffer_session_options_t) -> *mut coffer_future_t;
    pub fn coffer_session_destroy(session: *mut coffer_session_t);
    pub fn coffer_status(session: *mut coffer_session_t) -> u32;
    /// Future value is the session status as a pointer-sized integer.
    pub fn coffer_start(
        session: *mut coffer_session_t,
        identity: *const c_char,
    ) -> *mut coffer_future_t;
    pub fn coffer_stop(session: *mut coffer_session_t) -> *mut coffer_future_t;
    /// Future value is a core-allocated session token string, or null when
    /// no token was requested. Free with [`coffer_free_buffer`].
    pub fn coffer_register_identity(
        session: *mut coffer_session_t,
        verification: *const coffer_verification_t,
        options: *const coffer_verification_options_t,
    ) -> *mut coffer_future_t;
    /// Same result contract as [`coffer_register_identity`].
    pub fn coffer_verify_identity(
        session: *mut coffer_session_t,
        verification: *const coffer_verification_t,
        options: *const coffer_verification_options_t,
    ) -> *mut coffer_future_t;
    pub fn coffer_set_verification_method(
        session: *mut coffer_session_t,
        verification: *const coffer_verification_t,
        options: *const coffer_verification_options_t,
    ) -> *mut coffer_future_t;
    pub fn coffer_verify_provisional_identity(
        session: *mut coffer_session_t,
        verification: *const coffer_verification_t,
    ) -> *mut coffer_future_t;
    /// Future value is `*mut coffer_oidc_authorization_code_verification_t`;
    /// free with [`coffer_oidc_verification_destroy`].
    pub fn coffer_authenticate_with_idp(
        session: *mut coffer_session_t,
        provider_id: *const c_char,
        cookie: *const c_char,
    ) -> *mut coffer_future_t;
    pub fn coffer_oidc_verification_destroy(
        verification: *mut coffer_oidc_authorization_code_verification_t,
    );
    /// Future value is `*mut coffer_buffer_t`.
    pub fn coffer_encrypt(
        session: *mut coffer_session_t,
        data: *const u8,
        data_len: u64,
        options: *const coffer_encryption_options_t,
    ) -> *mut coffer_future_t;
    /// Future value is `*mut coffer_buffer_t`.
    pub fn coffer_decrypt(
        session: *mut coffer_session_t,
        data: *const u8,
        data_len: u64,
    ) -> *mut coffer_future_t;
    pub fn coffer_share(
        session: *mut coffer_session_t,
        resource_ids: *const *const c_char,
        nb_resource_ids: u64,
        options: *const coffer_sharing_options_t,
    ) -> *mut coffer_future_t;
    /// Ready expected future; value is a core-allocated string, free with
    /// [`coffer_free_buffer`].
    pub fn coffer_get_resource_id(data: *const u8, data_len: u64) -> *mut coffer_future_t;
    /// Ready expected future; value is a core-allocated string, free with
    /// [`coffer_free_buffer`].
    pub fn coffer_prehash_password(password: *const c_char) -> *mut coffer_future_t;
    pub fn coffer_buffer_destroy(buffer: *mut coffer_buffer_t);
    /// Free a core-allocated string returned through a future value.
    pub fn coffer_free_buffer(ptr: *mut c_void);
    pub fn coffer_version_string() -> *const c_char;
    pub fn coffer_set_log_handler(handler: Option<coffer_log_handler>);
    pub fn coffer_future_then(
        fut: *mut coffer_future_t,
        cb: coffer_future_then_cb,
        ctx: *mut c_void,
    );
    /// Null when the future resolved successfully.
    pub fn coffer_future_get_error(fut: *mut coffer_future_t) -> *const coffer_error_t;
    /// Only meaningful when [`coffer_future_get_error`] returned null.
    pub fn coffer_future_get_voidptr(fut: *mut coffer_future_t) -> *mut c_void;
    pub fn coffer_future_destroy(fut: *mut coffer_future_t);
}

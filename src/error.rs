//! # Error Handling
//!
//! Structured errors for the Coffer binding.
//!
//! The native core reports failures as a `(code, message)` pair attached to
//! the future that failed. This module translates that pair into [`Error`]
//! without interpretation: the code is copied verbatim into the closed
//! [`ErrorCode`] enumeration and the message is copied verbatim from the
//! native buffer.
//!
//! ```text
//! Native core                   Binding                    Caller
//! ──────────────────────────────────────────────────────────────────
//! coffer_error_t  ──────►  Error { code, message }  ──────►  Err(e)
//! (u32 + char*)            (fixed domain string)
//! ```
//!
//! Two kinds of failures never take this path:
//! - local precondition failures (empty password to `prehash_password`,
//!   interior NUL in a codec input) are built directly with the
//!   constructors below and surface synchronously;
//! - ABI version drift between the binding and the core is a programmer
//!   error and is asserted, never reported as an [`Error`].

use std::ffi::CStr;

use thiserror::Error;

use crate::native;

/// Result type alias for Coffer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fixed domain identifier carried by every error this crate produces.
pub const ERROR_DOMAIN: &str = "CofferErrorDomain";

/// Closed enumeration of native error codes.
///
/// Values are the wire codes of the native core and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// A caller-supplied argument was rejected.
    InvalidArgument = 1,
    /// Unexpected failure inside the native core.
    InternalError = 2,
    /// The core could not reach its backend.
    NetworkError = 3,
    /// The operation is not legal in the current session state.
    PreconditionFailed = 4,
    /// The operation was canceled by the core.
    OperationCanceled = 5,
    /// The data could not be decrypted with the available keys.
    DecryptionFailed = 6,
    /// A recipient group exceeds the size limit.
    GroupTooBig = 7,
    /// The supplied verification did not match the registered method.
    InvalidVerification = 8,
    /// Too many failed verification attempts.
    TooManyAttempts = 9,
    /// The verification code or token has expired.
    ExpiredVerification = 10,
    /// Local I/O failure inside the core.
    IoError = 11,
    /// This device was revoked.
    DeviceRevoked = 12,
    /// Concurrent modification conflict.
    Conflict = 13,
    /// The native core is too old for the server it talks to.
    UpgradeRequired = 14,
    /// The provisional identity was already attached.
    IdentityAlreadyAttached = 15,
}

impl ErrorCode {
    /// Map a raw native code back into the closed set.
    ///
    /// Returns `None` for codes this binding does not know, which callers
    /// degrade to [`ErrorCode::InternalError`] so no failure is ever
    /// silently dropped.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::InvalidArgument,
            2 => Self::InternalError,
            3 => Self::NetworkError,
            4 => Self::PreconditionFailed,
            5 => Self::OperationCanceled,
            6 => Self::DecryptionFailed,
            7 => Self::GroupTooBig,
            8 => Self::InvalidVerification,
            9 => Self::TooManyAttempts,
            10 => Self::ExpiredVerification,
            11 => Self::IoError,
            12 => Self::DeviceRevoked,
            13 => Self::Conflict,
            14 => Self::UpgradeRequired,
            15 => Self::IdentityAlreadyAttached,
            _ => return None,
        })
    }
}

/// An error surfaced to callers of this crate.
///
/// Carries the fixed [`ERROR_DOMAIN`], a code from the closed
/// [`ErrorCode`] enumeration, and a human-readable message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{ERROR_DOMAIN}] {code:?}: {message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    /// Build an error with an explicit code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Local precondition failure, reported without a native round trip.
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    /// Failure originating in the binding itself.
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code, copied verbatim from the native core.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The fixed domain identifier.
    pub fn domain(&self) -> &'static str {
        ERROR_DOMAIN
    }
}

// ============================================================================
// NATIVE TRANSLATION
// ============================================================================

/// Translate a native error pointer read from a resolved future.
///
/// A null pointer means the future resolved successfully. A non-null
/// pointer always yields an [`Error`]; an unknown code degrades to
/// [`ErrorCode::InternalError`] with the original message preserved.
///
/// # Safety
///
/// `ptr` must be null or point to a `coffer_error_t` that stays valid for
/// the duration of this call, with a null-terminated message buffer.
pub(crate) unsafe fn from_raw(ptr: *const native::coffer_error_t) -> Option<Error> {
    if ptr.is_null() {
        return None;
    }
    let raw = &*ptr;
    let message = if raw.message.is_null() {
        String::new()
    } else {
        CStr::from_ptr(raw.message).to_string_lossy().into_owned()
    };
    let code = ErrorCode::from_raw(raw.code).unwrap_or(ErrorCode::InternalError);
    Some(Error { code, message })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn null_pointer_translates_to_no_error() {
        assert_eq!(unsafe { from_raw(std::ptr::null()) }, None);
    }

    #[test]
    fn code_and_message_are_copied_verbatim() {
        let message = CString::new("identity is not registered").unwrap();
        let raw = native::coffer_error_t {
            code: 4,
            message: message.as_ptr(),
        };
        let err = unsafe { from_raw(&raw) }.unwrap();
        assert_eq!(err.code(), ErrorCode::PreconditionFailed);
        assert_eq!(err.message(), "identity is not registered");
        assert_eq!(err.domain(), ERROR_DOMAIN);
    }

    #[test]
    fn unknown_code_degrades_to_internal_error() {
        let message = CString::new("???").unwrap();
        let raw = native::coffer_error_t {
            code: 9999,
            message: message.as_ptr(),
        };
        let err = unsafe { from_raw(&raw) }.unwrap();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "???");
    }

    #[test]
    fn display_includes_domain_code_and_message() {
        let err = Error::new(ErrorCode::DecryptionFailed, "no key for resource");
        let rendered = err.to_string();
        assert!(rendered.contains(ERROR_DOMAIN));
        assert!(rendered.contains("DecryptionFailed"));
        assert!(rendered.contains("no key for resource"));
    }
}

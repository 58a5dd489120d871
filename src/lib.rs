//! # Coffer Core
//!
//! Rust binding for the `libcoffer` native session library: end-to-end
//! encrypted data with identity verification, backed by a C ABI core.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        COFFER CORE MODULES                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌──────────────┐   ┌───────────────┐   ┌────────────────────┐  │
//! │  │   Session    │   │ Verification  │   │      Options       │  │
//! │  │              │   │               │   │                    │  │
//! │  │ - start/stop │   │ - 11 methods  │   │ - Encryption       │  │
//! │  │ - encrypt    │   │ - wire encode │   │ - Sharing          │  │
//! │  │ - share      │   │               │   │ - Verification     │  │
//! │  └──────┬───────┘   └───────┬───────┘   └─────────┬──────────┘  │
//! │         │                   │                     │             │
//! │         └───────────────────┴─────────────────────┘             │
//! │                             │                                   │
//! │  ┌──────────────────────────┴───────────────────────────────┐   │
//! │  │                        Bridge                            │   │
//! │  │  dispatcher thread · callback trampoline · oneshot wake  │   │
//! │  └──────────────────────────┬───────────────────────────────┘   │
//! │                             │                                   │
//! │  ┌──────────────────────────┴───────────────────────────────┐   │
//! │  │                  Native ABI (libcoffer)                  │   │
//! │  │  versioned C structs · callback futures · session core   │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error codes and domain shared with the native core
//! - [`status`] - Session lifecycle states
//! - `bridge` - Callback-future to `async` adapter (internal)
//! - [`verification`] - Typed identity verification inputs
//! - [`options`] - Encryption, sharing, and verification options
//! - [`session`] - The async session facade
//!
//! The default `stub-core` feature replaces the linked native library with
//! an in-process implementation so the whole surface is testable without a
//! vendor binary. Disable default features to link against a real
//! `libcoffer`.
//!
//! ## Example
//!
//! ```no_run
//! use coffer_core::{Session, SessionOptions, Status, Verification, VerificationOptions};
//!
//! # async fn open(identity: &str) -> coffer_core::Result<Session> {
//! let session = Session::create(&SessionOptions::new(
//!     "base64-app-id",
//!     "/data/coffer",
//!     "/cache/coffer",
//! ))?;
//! if session.start(identity).await? == Status::IdentityRegistrationNeeded {
//!     session
//!         .register_identity(
//!             &Verification::Passphrase("correct horse".into()),
//!             &VerificationOptions::default(),
//!         )
//!         .await?;
//! }
//! # Ok(session)
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

mod bridge;
pub mod error;
pub mod native;
pub mod options;
pub mod session;
pub mod status;
pub mod verification;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use error::{Error, ErrorCode, Result, ERROR_DOMAIN};
pub use options::{EncryptionOptions, Padding, SharingOptions, VerificationOptions};
pub use session::{
    resource_id, native_version, prehash_password, OidcAuthorizationCode, Session,
    SessionOptions,
};
pub use status::Status;
pub use verification::{Verification, VerificationKey, VerificationMethodType};

/// Version of this binding, not of the native core; see
/// [`native_version`] for the latter.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #[test]
    fn binding_and_core_versions_are_distinct_strings() {
        assert_eq!(super::version(), env!("CARGO_PKG_VERSION"));
        assert!(!super::native_version().is_empty());
    }
}

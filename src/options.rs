//! # Call Options
//!
//! Owned option types for encryption, sharing, and identity verification,
//! plus their encodings into the versioned wire structs. As with
//! verification, an encoded form owns the `CString`s and pointer arrays
//! its struct points into and must outlive the native call.

use std::ffi::CString;
use std::os::raw::c_char;

use crate::error::{Error, Result};
use crate::native;

/// Padding policy applied to encrypted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// The core picks a padded size.
    #[default]
    Automatic,
    /// No padding; ciphertext length tracks plaintext length.
    Off,
    /// Pad to a multiple of the given step, which must be at least 2.
    Step(u32),
}

impl Padding {
    fn wire_value(self) -> Result<u32> {
        match self {
            Self::Automatic => Ok(0),
            Self::Off => Ok(1),
            Self::Step(step) if step >= 2 => Ok(step),
            Self::Step(step) => Err(Error::invalid_argument(format!(
                "padding step must be at least 2, got {step}"
            ))),
        }
    }
}

/// Recipients and padding for an encryption.
///
/// Defaults to sharing with no one but the encrypting identity, with
/// automatic padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionOptions {
    pub share_with_users: Vec<String>,
    pub share_with_groups: Vec<String>,
    pub share_with_self: bool,
    pub padding: Padding,
}

impl Default for EncryptionOptions {
    fn default() -> Self {
        Self {
            share_with_users: Vec::new(),
            share_with_groups: Vec::new(),
            share_with_self: true,
            padding: Padding::Automatic,
        }
    }
}

impl EncryptionOptions {
    pub(crate) fn encode(&self) -> Result<EncodedEncryptionOptions> {
        let mut strings = Vec::new();
        let users = encode_string_list(&self.share_with_users, &mut strings)?;
        let groups = encode_string_list(&self.share_with_groups, &mut strings)?;
        let raw = Box::new(native::coffer_encryption_options_t {
            version: native::COFFER_ENCRYPTION_OPTIONS_VERSION,
            share_with_users: users.as_ptr(),
            nb_users: users.len() as u32,
            share_with_groups: groups.as_ptr(),
            nb_groups: groups.len() as u32,
            share_with_self: self.share_with_self,
            padding_step: self.padding.wire_value()?,
        });
        Ok(EncodedEncryptionOptions {
            raw,
            _users: users,
            _groups: groups,
            _strings: strings,
        })
    }
}

/// Recipients for sharing already-encrypted resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharingOptions {
    pub share_with_users: Vec<String>,
    pub share_with_groups: Vec<String>,
}

impl SharingOptions {
    pub(crate) fn encode(&self) -> Result<EncodedSharingOptions> {
        let mut strings = Vec::new();
        let users = encode_string_list(&self.share_with_users, &mut strings)?;
        let groups = encode_string_list(&self.share_with_groups, &mut strings)?;
        let raw = Box::new(native::coffer_sharing_options_t {
            version: native::COFFER_SHARING_OPTIONS_VERSION,
            share_with_users: users.as_ptr(),
            nb_users: users.len() as u32,
            share_with_groups: groups.as_ptr(),
            nb_groups: groups.len() as u32,
        });
        Ok(EncodedSharingOptions {
            raw,
            _users: users,
            _groups: groups,
            _strings: strings,
        })
    }
}

/// Options accepted by identity registration and verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationOptions {
    /// Ask the core for a session token proving the verification.
    pub with_session_token: bool,
    /// Allow switching to or from an end-to-end passphrase method.
    pub allow_e2e_method_switch: bool,
}

impl VerificationOptions {
    pub(crate) fn encode(&self) -> EncodedVerificationOptions {
        EncodedVerificationOptions {
            raw: Box::new(native::coffer_verification_options_t {
                version: native::COFFER_VERIFICATION_OPTIONS_VERSION,
                with_session_token: self.with_session_token,
                allow_e2e_method_switch: self.allow_e2e_method_switch,
            }),
        }
    }
}

fn encode_string_list(
    values: &[String],
    strings: &mut Vec<CString>,
) -> Result<Vec<*const c_char>> {
    let mut pointers = Vec::with_capacity(values.len());
    for value in values {
        let stored = CString::new(value.as_str())
            .map_err(|_| Error::invalid_argument("string contains an interior NUL byte"))?;
        pointers.push(stored.as_ptr());
        strings.push(stored);
    }
    Ok(pointers)
}

pub(crate) struct EncodedEncryptionOptions {
    raw: Box<native::coffer_encryption_options_t>,
    _users: Vec<*const c_char>,
    _groups: Vec<*const c_char>,
    _strings: Vec<CString>,
}

// The encoded structs' pointers target storage owned by the same value.
unsafe impl Send for EncodedEncryptionOptions {}
unsafe impl Send for EncodedSharingOptions {}

impl EncodedEncryptionOptions {
    pub(crate) fn as_ptr(&self) -> *const native::coffer_encryption_options_t {
        &*self.raw
    }
}

impl std::fmt::Debug for EncodedEncryptionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedEncryptionOptions").finish_non_exhaustive()
    }
}

pub(crate) struct EncodedSharingOptions {
    raw: Box<native::coffer_sharing_options_t>,
    _users: Vec<*const c_char>,
    _groups: Vec<*const c_char>,
    _strings: Vec<CString>,
}

impl EncodedSharingOptions {
    pub(crate) fn as_ptr(&self) -> *const native::coffer_sharing_options_t {
        &*self.raw
    }
}

impl std::fmt::Debug for EncodedSharingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedSharingOptions").finish_non_exhaustive()
    }
}

pub(crate) struct EncodedVerificationOptions {
    raw: Box<native::coffer_verification_options_t>,
}

impl EncodedVerificationOptions {
    pub(crate) fn as_ptr(&self) -> *const native::coffer_verification_options_t {
        &*self.raw
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn default_encryption_options_encode_to_the_wire_defaults() {
        let encoded = EncryptionOptions::default().encode().expect("encodes");
        let raw = unsafe { &*encoded.as_ptr() };
        assert_eq!(raw.version, native::COFFER_ENCRYPTION_OPTIONS_VERSION);
        assert_eq!(raw.nb_users, 0);
        assert_eq!(raw.nb_groups, 0);
        assert!(raw.share_with_self);
        assert_eq!(raw.padding_step, 0);
    }

    #[test]
    fn recipient_lists_are_encoded_in_order() {
        let options = EncryptionOptions {
            share_with_users: vec!["alice-id".into(), "bob-id".into()],
            share_with_groups: vec!["team-id".into()],
            share_with_self: false,
            padding: Padding::Off,
        };
        let encoded = options.encode().expect("encodes");
        let raw = unsafe { &*encoded.as_ptr() };
        assert_eq!(raw.nb_users, 2);
        assert_eq!(raw.nb_groups, 1);
        assert!(!raw.share_with_self);
        assert_eq!(raw.padding_step, 1);
        let first = unsafe { CStr::from_ptr(*raw.share_with_users) };
        let second = unsafe { CStr::from_ptr(*raw.share_with_users.add(1)) };
        let group = unsafe { CStr::from_ptr(*raw.share_with_groups) };
        assert_eq!(first.to_str(), Ok("alice-id"));
        assert_eq!(second.to_str(), Ok("bob-id"));
        assert_eq!(group.to_str(), Ok("team-id"));
    }

    #[test]
    fn padding_steps_below_two_are_rejected() {
        for step in [0, 1] {
            let options = EncryptionOptions {
                padding: Padding::Step(step),
                ..Default::default()
            };
            let err = options.encode().expect_err("step below 2 is invalid");
            assert_eq!(err.code(), crate::ErrorCode::InvalidArgument);
        }
        let options = EncryptionOptions {
            padding: Padding::Step(2),
            ..Default::default()
        };
        assert_eq!(
            unsafe { (*options.encode().expect("encodes").as_ptr()).padding_step },
            2
        );
    }

    #[test]
    fn sharing_options_carry_their_own_version() {
        let encoded = SharingOptions {
            share_with_users: vec!["carol-id".into()],
            share_with_groups: Vec::new(),
        }
        .encode()
        .expect("encodes");
        let raw = unsafe { &*encoded.as_ptr() };
        assert_eq!(raw.version, native::COFFER_SHARING_OPTIONS_VERSION);
        assert_eq!(raw.nb_users, 1);
    }

    #[test]
    fn verification_options_encode_both_flags() {
        let encoded = VerificationOptions {
            with_session_token: true,
            allow_e2e_method_switch: true,
        }
        .encode();
        let raw = unsafe { &*encoded.as_ptr() };
        assert_eq!(raw.version, native::COFFER_VERIFICATION_OPTIONS_VERSION);
        assert!(raw.with_session_token);
        assert!(raw.allow_e2e_method_switch);

        let defaults = VerificationOptions::default().encode();
        let raw = unsafe { &*defaults.as_ptr() };
        assert!(!raw.with_session_token);
        assert!(!raw.allow_e2e_method_switch);
    }
}

//! # Identity Verification
//!
//! Typed verification inputs and their encoding into the flat
//! `coffer_verification_t` wire struct. The wire struct is only valid for
//! the duration of the native call that receives it, so the encoded form
//! keeps ownership of every `CString` it points into.

use std::ffi::CString;
use std::os::raw::c_char;

use crate::error::{Error, Result};
use crate::native;

/// Discriminant carried in `coffer_verification_t.verification_method_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VerificationMethodType {
    Email = 1,
    Passphrase = 2,
    VerificationKey = 3,
    OidcIdToken = 4,
    PhoneNumber = 5,
    PreverifiedEmail = 6,
    PreverifiedPhoneNumber = 7,
    E2ePassphrase = 8,
    PreverifiedOidc = 9,
    OidcAuthorizationCode = 10,
    PrehashedAndEncryptedPassphrase = 11,
}

/// An exported identity verification key, opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey(String);

impl VerificationKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One way of proving an identity to the core.
///
/// Exactly one variant is encoded per call; the core dispatches on the
/// method type discriminant and reads only that variant's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Passphrase(String),
    E2ePassphrase(String),
    VerificationKey(VerificationKey),
    Email {
        email: String,
        verification_code: String,
    },
    OidcIdToken(String),
    PhoneNumber {
        phone_number: String,
        verification_code: String,
    },
    PreverifiedEmail(String),
    PreverifiedPhoneNumber(String),
    PreverifiedOidc {
        subject: String,
        provider_id: String,
    },
    OidcAuthorizationCode {
        provider_id: String,
        authorization_code: String,
        state: String,
    },
    PrehashedAndEncryptedPassphrase(String),
}

impl Verification {
    pub fn method_type(&self) -> VerificationMethodType {
        match self {
            Self::Passphrase(_) => VerificationMethodType::Passphrase,
            Self::E2ePassphrase(_) => VerificationMethodType::E2ePassphrase,
            Self::VerificationKey(_) => VerificationMethodType::VerificationKey,
            Self::Email { .. } => VerificationMethodType::Email,
            Self::OidcIdToken(_) => VerificationMethodType::OidcIdToken,
            Self::PhoneNumber { .. } => VerificationMethodType::PhoneNumber,
            Self::PreverifiedEmail(_) => VerificationMethodType::PreverifiedEmail,
            Self::PreverifiedPhoneNumber(_) => VerificationMethodType::PreverifiedPhoneNumber,
            Self::PreverifiedOidc { .. } => VerificationMethodType::PreverifiedOidc,
            Self::OidcAuthorizationCode { .. } => VerificationMethodType::OidcAuthorizationCode,
            Self::PrehashedAndEncryptedPassphrase(_) => {
                VerificationMethodType::PrehashedAndEncryptedPassphrase
            }
        }
    }

    /// Encode into the wire struct. The returned value owns the string
    /// storage the struct points into; keep it alive across the native
    /// call that reads it.
    pub(crate) fn encode(&self) -> Result<EncodedVerification> {
        let mut strings = Vec::new();
        let mut keep = |value: &str| -> Result<*const c_char> {
            let stored = CString::new(value)
                .map_err(|_| Error::invalid_argument("string contains an interior NUL byte"))?;
            let ptr = stored.as_ptr();
            strings.push(stored);
            Ok(ptr)
        };

        let mut raw = native::coffer_verification_t::empty();
        raw.verification_method_type = self.method_type() as u8;
        match self {
            Self::Passphrase(passphrase) => {
                raw.passphrase = keep(passphrase)?;
            }
            Self::E2ePassphrase(passphrase) => {
                raw.e2e_passphrase = keep(passphrase)?;
            }
            Self::VerificationKey(key) => {
                raw.verification_key = keep(key.as_str())?;
            }
            Self::Email {
                email,
                verification_code,
            } => {
                raw.email_verification.email = keep(email)?;
                raw.email_verification.verification_code = keep(verification_code)?;
            }
            Self::OidcIdToken(token) => {
                raw.oidc_id_token = keep(token)?;
            }
            Self::PhoneNumber {
                phone_number,
                verification_code,
            } => {
                raw.phone_number_verification.phone_number = keep(phone_number)?;
                raw.phone_number_verification.verification_code = keep(verification_code)?;
            }
            Self::PreverifiedEmail(email) => {
                raw.preverified_email = keep(email)?;
            }
            Self::PreverifiedPhoneNumber(phone_number) => {
                raw.preverified_phone_number = keep(phone_number)?;
            }
            Self::PreverifiedOidc {
                subject,
                provider_id,
            } => {
                raw.preverified_oidc_verification.subject = keep(subject)?;
                raw.preverified_oidc_verification.provider_id = keep(provider_id)?;
            }
            Self::OidcAuthorizationCode {
                provider_id,
                authorization_code,
                state,
            } => {
                raw.oidc_authorization_code_verification.provider_id = keep(provider_id)?;
                raw.oidc_authorization_code_verification.authorization_code =
                    keep(authorization_code)?;
                raw.oidc_authorization_code_verification.state = keep(state)?;
            }
            Self::PrehashedAndEncryptedPassphrase(payload) => {
                raw.prehashed_and_encrypted_passphrase = keep(payload)?;
            }
        }
        Ok(EncodedVerification {
            raw: Box::new(raw),
            _strings: strings,
        })
    }
}

/// A `coffer_verification_t` plus the string storage it borrows.
pub(crate) struct EncodedVerification {
    raw: Box<native::coffer_verification_t>,
    _strings: Vec<CString>,
}

// The struct's pointers target storage owned by the same value.
unsafe impl Send for EncodedVerification {}

impl EncodedVerification {
    pub(crate) fn as_ptr(&self) -> *const native::coffer_verification_t {
        &*self.raw
    }
}

impl std::fmt::Debug for EncodedVerification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedVerification").finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::stub::{decode_verification, DecodedVerification};
    use crate::native::COFFER_VERIFICATION_VERSION;

    fn decoded(verification: &Verification) -> DecodedVerification {
        let encoded = verification.encode().expect("encodes");
        assert_eq!(unsafe { (*encoded.as_ptr()).version }, COFFER_VERIFICATION_VERSION);
        unsafe { decode_verification(encoded.as_ptr()) }.expect("decodes")
    }

    #[test]
    fn passphrase_round_trips() {
        assert_eq!(
            decoded(&Verification::Passphrase("hunter2".into())),
            DecodedVerification::Passphrase("hunter2".into()),
        );
        assert_eq!(
            decoded(&Verification::E2ePassphrase("hunter2".into())),
            DecodedVerification::E2ePassphrase("hunter2".into()),
        );
        assert_eq!(
            decoded(&Verification::PrehashedAndEncryptedPassphrase("b64blob".into())),
            DecodedVerification::PrehashedAndEncryptedPassphrase("b64blob".into()),
        );
    }

    #[test]
    fn verification_key_round_trips() {
        assert_eq!(
            decoded(&Verification::VerificationKey(VerificationKey::new("exported-key"))),
            DecodedVerification::VerificationKey("exported-key".into()),
        );
    }

    #[test]
    fn code_based_methods_round_trip() {
        assert_eq!(
            decoded(&Verification::Email {
                email: "alice@example.com".into(),
                verification_code: "12345678".into(),
            }),
            DecodedVerification::Email {
                email: "alice@example.com".into(),
                verification_code: "12345678".into(),
            },
        );
        assert_eq!(
            decoded(&Verification::PhoneNumber {
                phone_number: "+33639982233".into(),
                verification_code: "12345678".into(),
            }),
            DecodedVerification::PhoneNumber {
                phone_number: "+33639982233".into(),
                verification_code: "12345678".into(),
            },
        );
    }

    #[test]
    fn oidc_methods_round_trip() {
        assert_eq!(
            decoded(&Verification::OidcIdToken("header.payload.sig".into())),
            DecodedVerification::OidcIdToken("header.payload.sig".into()),
        );
        assert_eq!(
            decoded(&Verification::PreverifiedOidc {
                subject: "subject".into(),
                provider_id: "provider".into(),
            }),
            DecodedVerification::PreverifiedOidc {
                subject: "subject".into(),
                provider_id: "provider".into(),
            },
        );
        assert_eq!(
            decoded(&Verification::OidcAuthorizationCode {
                provider_id: "provider".into(),
                authorization_code: "code".into(),
                state: "state".into(),
            }),
            DecodedVerification::OidcAuthorizationCode {
                provider_id: "provider".into(),
                authorization_code: "code".into(),
                state: "state".into(),
            },
        );
    }

    #[test]
    fn preverified_contact_methods_round_trip() {
        assert_eq!(
            decoded(&Verification::PreverifiedEmail("alice@example.com".into())),
            DecodedVerification::PreverifiedEmail("alice@example.com".into()),
        );
        assert_eq!(
            decoded(&Verification::PreverifiedPhoneNumber("+33639982233".into())),
            DecodedVerification::PreverifiedPhoneNumber("+33639982233".into()),
        );
    }

    #[test]
    fn interior_nul_is_rejected_before_the_native_call() {
        let err = Verification::Passphrase("bad\0byte".into())
            .encode()
            .expect_err("interior NUL must not reach the core");
        assert_eq!(err.code(), crate::ErrorCode::InvalidArgument);
    }

    #[test]
    fn only_the_selected_variant_is_populated() {
        let encoded = Verification::Passphrase("hunter2".into()).encode().expect("encodes");
        let raw = unsafe { &*encoded.as_ptr() };
        assert_eq!(raw.verification_method_type, VerificationMethodType::Passphrase as u8);
        assert!(!raw.passphrase.is_null());
        assert!(raw.e2e_passphrase.is_null());
        assert!(raw.email_verification.email.is_null());
        assert!(raw.oidc_id_token.is_null());
    }
}

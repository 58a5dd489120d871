//! # Session Facade
//!
//! The owned, async surface over a native `coffer_session_t`. A [`Session`]
//! is a cheaply clonable handle; the underlying native session is destroyed
//! when the last clone drops *and* no operation is still in flight, since
//! every started operation holds its own reference until its continuation
//! has run.
//!
//! All asynchronous operations funnel through [`crate::bridge`], so the
//! core sees them in submission order on one thread.

use std::any::Any;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::Arc;
use std::sync::Once;

use tracing::{debug, error, info, warn};

use crate::bridge;
use crate::error::{Error, Result};
use crate::native;
use crate::options::{EncryptionOptions, SharingOptions, VerificationOptions};
use crate::status::Status;
use crate::verification::Verification;

/// Identifies this binding to the core.
const SDK_TYPE: &str = "client-rust";

/// Everything needed to open a session against an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// The app id, base64 as issued at app creation.
    pub app_id: String,
    /// Server endpoint override; `None` uses the core's default.
    pub url: Option<String>,
    /// Where this device's keys and local storage live. Two sessions with
    /// the same path are the same device.
    pub persistent_path: String,
    /// Cache storage location.
    pub cache_path: String,
}

impl SessionOptions {
    pub fn new(
        app_id: impl Into<String>,
        persistent_path: impl Into<String>,
        cache_path: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            url: None,
            persistent_path: persistent_path.into(),
            cache_path: cache_path.into(),
        }
    }
}

/// Result of a successful OIDC authorization-code flow, usable as a
/// [`Verification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcAuthorizationCode {
    pub provider_id: String,
    pub authorization_code: String,
    pub state: String,
}

impl From<OidcAuthorizationCode> for Verification {
    fn from(code: OidcAuthorizationCode) -> Self {
        Verification::OidcAuthorizationCode {
            provider_id: code.provider_id,
            authorization_code: code.authorization_code,
            state: code.state,
        }
    }
}

struct SessionInner {
    handle: *mut native::coffer_session_t,
}

// The handle is only passed to a core whose entry points are thread-safe;
// all mutation happens on the core's side behind it.
unsafe impl Send for SessionInner {}
unsafe impl Sync for SessionInner {}

impl Drop for SessionInner {
    fn drop(&mut self) {
        debug!("destroying native session");
        unsafe { native::coffer_session_destroy(self.handle) };
    }
}

/// Handle to one native session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Open a session. The native call resolves synchronously; no network
    /// traffic happens before [`Session::start`].
    pub fn create(options: &SessionOptions) -> Result<Self> {
        init_log_forwarding();
        let app_id = cstring(&options.app_id)?;
        let url = options.url.as_deref().map(cstring).transpose()?;
        let persistent_path = cstring(&options.persistent_path)?;
        let cache_path = cstring(&options.cache_path)?;
        let sdk_type = cstring(SDK_TYPE)?;
        let sdk_version = cstring(env!("CARGO_PKG_VERSION"))?;
        let raw = native::coffer_session_options_t {
            version: native::COFFER_SESSION_OPTIONS_VERSION,
            app_id: app_id.as_ptr(),
            url: url.as_ref().map_or(std::ptr::null(), |u| u.as_ptr()),
            persistent_path: persistent_path.as_ptr(),
            cache_path: cache_path.as_ptr(),
            sdk_type: sdk_type.as_ptr(),
            sdk_version: sdk_version.as_ptr(),
        };
        let value = unsafe { bridge::unwrap_expected(native::coffer_create(&raw)) }?;
        let handle = value.as_ptr() as *mut native::coffer_session_t;
        if handle.is_null() {
            return Err(Error::internal("core returned a null session"));
        }
        info!(app_id = %options.app_id, "session created");
        Ok(Self {
            inner: Arc::new(SessionInner { handle }),
        })
    }

    /// Current session status, read synchronously from the core.
    pub fn status(&self) -> Status {
        let raw = unsafe { native::coffer_status(self.inner.handle) };
        // Unknown values would mean an ABI drift; collapse them to Stopped
        // rather than panicking in a getter.
        Status::from_raw(raw).unwrap_or(Status::Stopped)
    }

    /// Start the session for an identity. The returned status tells the
    /// caller what the identity still needs: registration, verification,
    /// or nothing ([`Status::Ready`]).
    pub async fn start(&self, identity: &str) -> Result<Status> {
        let identity = cstring(identity)?;
        self.call_native(
            move |session| unsafe { native::coffer_start(session, identity.as_ptr()) },
            |value| {
                Status::from_raw(value.as_usize() as u32)
                    .ok_or_else(|| Error::internal("core returned an unknown status"))
            },
        )
        .await
    }

    /// Stop the session and drop its connection. Local storage stays; a
    /// later [`Session::start`] on the same path resumes the device.
    pub async fn stop(&self) -> Result<()> {
        self.call_native(|session| unsafe { native::coffer_stop(session) }, |_| Ok(()))
            .await
    }

    /// Register the identity's first verification method. Only valid in
    /// [`Status::IdentityRegistrationNeeded`].
    ///
    /// Returns a session token when `options.with_session_token` is set.
    pub async fn register_identity(
        &self,
        verification: &Verification,
        options: &VerificationOptions,
    ) -> Result<Option<String>> {
        let verification = verification.encode()?;
        let options = options.encode();
        self.call_native(
            move |session| unsafe {
                native::coffer_register_identity(session, verification.as_ptr(), options.as_ptr())
            },
            |value| Ok(value.into_string()),
        )
        .await
    }

    /// Prove the identity on a new device. Only valid in
    /// [`Status::IdentityVerificationNeeded`].
    pub async fn verify_identity(
        &self,
        verification: &Verification,
        options: &VerificationOptions,
    ) -> Result<Option<String>> {
        let verification = verification.encode()?;
        let options = options.encode();
        self.call_native(
            move |session| unsafe {
                native::coffer_verify_identity(session, verification.as_ptr(), options.as_ptr())
            },
            |value| Ok(value.into_string()),
        )
        .await
    }

    /// Replace or add a verification method on a ready session.
    pub async fn set_verification_method(
        &self,
        verification: &Verification,
        options: &VerificationOptions,
    ) -> Result<()> {
        let verification = verification.encode()?;
        let options = options.encode();
        self.call_native(
            move |session| unsafe {
                native::coffer_set_verification_method(
                    session,
                    verification.as_ptr(),
                    options.as_ptr(),
                )
            },
            |_| Ok(()),
        )
        .await
    }

    /// Claim a provisional identity attached to an email address or phone
    /// number.
    pub async fn verify_provisional_identity(&self, verification: &Verification) -> Result<()> {
        let verification = verification.encode()?;
        self.call_native(
            move |session| unsafe {
                native::coffer_verify_provisional_identity(session, verification.as_ptr())
            },
            |_| Ok(()),
        )
        .await
    }

    /// Run the OIDC authorization-code flow against a configured provider.
    pub async fn authenticate_with_idp(
        &self,
        provider_id: &str,
        cookie: &str,
    ) -> Result<OidcAuthorizationCode> {
        let provider_id = cstring(provider_id)?;
        let cookie = cstring(cookie)?;
        self.call_native(
            move |session| unsafe {
                native::coffer_authenticate_with_idp(session, provider_id.as_ptr(), cookie.as_ptr())
            },
            |value| {
                let raw =
                    value.as_ptr() as *mut native::coffer_oidc_authorization_code_verification_t;
                if raw.is_null() {
                    return Err(Error::internal("core returned no oidc verification"));
                }
                unsafe {
                    let code = OidcAuthorizationCode {
                        provider_id: copy_cstr((*raw).provider_id),
                        authorization_code: copy_cstr((*raw).authorization_code),
                        state: copy_cstr((*raw).state),
                    };
                    native::coffer_oidc_verification_destroy(raw);
                    Ok(code)
                }
            },
        )
        .await
    }

    /// Encrypt `data` for the recipients in `options`. The session must be
    /// [`Status::Ready`].
    pub async fn encrypt(&self, data: &[u8], options: &EncryptionOptions) -> Result<Vec<u8>> {
        let options = options.encode()?;
        let data = data.to_vec();
        self.call_native(
            move |session| unsafe {
                native::coffer_encrypt(session, data.as_ptr(), data.len() as u64, options.as_ptr())
            },
            |value| Ok(value.into_bytes()),
        )
        .await
    }

    /// Decrypt data previously produced by [`Session::encrypt`].
    pub async fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let data = data.to_vec();
        self.call_native(
            move |session| unsafe {
                native::coffer_decrypt(session, data.as_ptr(), data.len() as u64)
            },
            |value| Ok(value.into_bytes()),
        )
        .await
    }

    /// Share already-encrypted resources with more recipients.
    pub async fn share(&self, resource_ids: &[String], options: &SharingOptions) -> Result<()> {
        let ids: Vec<CString> = resource_ids
            .iter()
            .map(|id| cstring(id))
            .collect::<Result<_>>()?;
        let options = options.encode()?;
        self.call_native(
            move |session| {
                let pointers: Vec<*const c_char> = ids.iter().map(|id| id.as_ptr()).collect();
                unsafe {
                    native::coffer_share(
                        session,
                        pointers.as_ptr(),
                        pointers.len() as u64,
                        options.as_ptr(),
                    )
                }
            },
            |_| Ok(()),
        )
        .await
    }

    /// Start a native call against this session on the dispatcher thread.
    /// The inner state is kept alive until the call's continuation runs,
    /// so dropping every [`Session`] clone mid-operation is safe.
    async fn call_native<S, C, T>(&self, start: S, convert: C) -> Result<T>
    where
        S: FnOnce(*mut native::coffer_session_t) -> *mut native::coffer_future_t + Send + 'static,
        C: FnOnce(bridge::NativeValue) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let guard: Box<dyn Any + Send> = Box::new(Arc::clone(&self.inner));
        bridge::call(move || start(inner.handle), convert, Some(guard)).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("status", &self.status()).finish()
    }
}

// ============================================================================
// SESSION-LESS OPERATIONS
// ============================================================================

/// Hash a password client-side before sending it to an application server,
/// so the server never learns a value usable as a verification passphrase.
pub fn prehash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(Error::invalid_argument("Cannot hash empty password"));
    }
    let password = cstring(password)?;
    let value =
        unsafe { bridge::unwrap_expected(native::coffer_prehash_password(password.as_ptr())) }?;
    value
        .into_string()
        .ok_or_else(|| Error::internal("core returned no hash"))
}

/// Extract the resource id of encrypted data without decrypting it.
pub fn resource_id(encrypted_data: &[u8]) -> Result<String> {
    let value = unsafe {
        bridge::unwrap_expected(native::coffer_get_resource_id(
            encrypted_data.as_ptr(),
            encrypted_data.len() as u64,
        ))
    }?;
    value
        .into_string()
        .ok_or_else(|| Error::internal("core returned no resource id"))
}

/// Version string reported by the native core.
pub fn native_version() -> &'static str {
    unsafe {
        CStr::from_ptr(native::coffer_version_string())
            .to_str()
            .unwrap_or("unknown")
    }
}

// ============================================================================
// LOG FORWARDING
// ============================================================================

static LOG_FORWARDING: Once = Once::new();

/// Route the core's log records into `tracing`. Installed once, on first
/// session creation.
fn init_log_forwarding() {
    LOG_FORWARDING.call_once(|| unsafe {
        native::coffer_set_log_handler(Some(forward_log));
    });
}

unsafe extern "C" fn forward_log(record: *const native::coffer_log_record_t) {
    if record.is_null() {
        return;
    }
    let record = &*record;
    let category = copy_cstr(record.category);
    let file = copy_cstr(record.file);
    let message = copy_cstr(record.message);
    match record.level {
        1 => debug!(target: "coffer::native", %category, %file, line = record.line, "{message}"),
        2 => info!(target: "coffer::native", %category, %file, line = record.line, "{message}"),
        3 => warn!(target: "coffer::native", %category, %file, line = record.line, "{message}"),
        _ => error!(target: "coffer::native", %category, %file, line = record.line, "{message}"),
    }
}

fn cstring(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::invalid_argument("string contains an interior NUL byte"))
}

unsafe fn copy_cstr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::options::Padding;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    fn app_options(app_tag: &str, device_tag: &str) -> SessionOptions {
        SessionOptions::new(
            BASE64.encode(app_tag),
            format!("/tmp/coffer-test/{app_tag}/{device_tag}"),
            format!("/tmp/coffer-test/{app_tag}/{device_tag}/cache"),
        )
    }

    fn passphrase() -> Verification {
        Verification::Passphrase("correct horse battery staple".into())
    }

    async fn ready_session(app_tag: &str, identity: &str) -> Session {
        let session = Session::create(&app_options(app_tag, "device-1")).expect("create");
        assert_eq!(session.status(), Status::Stopped);
        let status = session.start(identity).await.expect("start");
        assert_eq!(status, Status::IdentityRegistrationNeeded);
        session
            .register_identity(&passphrase(), &VerificationOptions::default())
            .await
            .expect("register");
        assert_eq!(session.status(), Status::Ready);
        session
    }

    #[tokio::test]
    async fn lifecycle_reaches_ready_and_back_to_stopped() {
        let app = unique("lifecycle");
        let session = ready_session(&app, &unique("alice")).await;
        session.stop().await.expect("stop");
        assert_eq!(session.status(), Status::Stopped);
    }

    #[tokio::test]
    async fn restarting_a_known_device_skips_verification() {
        let app = unique("restart");
        let identity = unique("alice");
        let session = ready_session(&app, &identity).await;
        session.stop().await.expect("stop");

        let again = Session::create(&app_options(&app, "device-1")).expect("create");
        let status = again.start(&identity).await.expect("start");
        assert_eq!(status, Status::Ready);
    }

    #[tokio::test]
    async fn a_new_device_must_verify_and_wrong_passphrases_are_rejected() {
        let app = unique("device");
        let identity = unique("alice");
        let first = ready_session(&app, &identity).await;
        drop(first);

        let second = Session::create(&app_options(&app, "device-2")).expect("create");
        let status = second.start(&identity).await.expect("start");
        assert_eq!(status, Status::IdentityVerificationNeeded);

        let err = second
            .verify_identity(
                &Verification::Passphrase("not it".into()),
                &VerificationOptions::default(),
            )
            .await
            .expect_err("wrong passphrase");
        assert_eq!(err.code(), ErrorCode::InvalidVerification);
        assert_eq!(second.status(), Status::IdentityVerificationNeeded);

        second
            .verify_identity(&passphrase(), &VerificationOptions::default())
            .await
            .expect("right passphrase");
        assert_eq!(second.status(), Status::Ready);
    }

    #[tokio::test]
    async fn registration_can_request_a_session_token() {
        let app = unique("token");
        let session = Session::create(&app_options(&app, "device-1")).expect("create");
        session.start(&unique("alice")).await.expect("start");
        let token = session
            .register_identity(
                &passphrase(),
                &VerificationOptions {
                    with_session_token: true,
                    ..Default::default()
                },
            )
            .await
            .expect("register");
        assert!(token.is_some());

        let second = Session::create(&app_options(&unique("token2"), "device-1")).expect("create");
        second.start(&unique("bob")).await.expect("start");
        let token = second
            .register_identity(&passphrase(), &VerificationOptions::default())
            .await
            .expect("register");
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn registering_twice_fails_a_precondition() {
        let app = unique("twice");
        let session = ready_session(&app, &unique("alice")).await;
        let err = session
            .register_identity(&passphrase(), &VerificationOptions::default())
            .await
            .expect_err("already registered");
        assert_eq!(err.code(), ErrorCode::PreconditionFailed);
    }

    #[tokio::test]
    async fn set_verification_method_switches_the_accepted_passphrase() {
        let app = unique("switch");
        let identity = unique("alice");
        let session = ready_session(&app, &identity).await;
        session
            .set_verification_method(
                &Verification::Passphrase("new passphrase".into()),
                &VerificationOptions::default(),
            )
            .await
            .expect("switch method");
        drop(session);

        let second = Session::create(&app_options(&app, "device-2")).expect("create");
        second.start(&identity).await.expect("start");
        let err = second
            .verify_identity(&passphrase(), &VerificationOptions::default())
            .await
            .expect_err("old passphrase no longer matches");
        assert_eq!(err.code(), ErrorCode::InvalidVerification);
        second
            .verify_identity(
                &Verification::Passphrase("new passphrase".into()),
                &VerificationOptions::default(),
            )
            .await
            .expect("new passphrase matches");
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips() {
        let app = unique("roundtrip");
        let session = ready_session(&app, &unique("alice")).await;
        let plaintext = b"attack at dawn".to_vec();
        let encrypted = session
            .encrypt(&plaintext, &EncryptionOptions::default())
            .await
            .expect("encrypt");
        assert_ne!(encrypted, plaintext);
        let decrypted = session.decrypt(&encrypted).await.expect("decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[tokio::test]
    async fn padding_policies_shape_the_ciphertext() {
        let app = unique("padding");
        let session = ready_session(&app, &unique("alice")).await;
        let plaintext = vec![0x42u8; 10];

        let stepped = session
            .encrypt(
                &plaintext,
                &EncryptionOptions {
                    padding: Padding::Step(500),
                    ..Default::default()
                },
            )
            .await
            .expect("encrypt");
        assert!(stepped.len() > 500);
        assert_eq!(
            session.decrypt(&stepped).await.expect("decrypt"),
            plaintext
        );

        let unpadded = session
            .encrypt(
                &plaintext,
                &EncryptionOptions {
                    padding: Padding::Off,
                    ..Default::default()
                },
            )
            .await
            .expect("encrypt");
        assert!(unpadded.len() < stepped.len());
        assert_eq!(
            session.decrypt(&unpadded).await.expect("decrypt"),
            plaintext
        );
    }

    #[tokio::test]
    async fn decrypting_with_another_app_fails() {
        let session = ready_session(&unique("appa"), &unique("alice")).await;
        let other = ready_session(&unique("appb"), &unique("bob")).await;
        let encrypted = session
            .encrypt(b"secret", &EncryptionOptions::default())
            .await
            .expect("encrypt");
        let err = other.decrypt(&encrypted).await.expect_err("wrong app");
        assert_eq!(err.code(), ErrorCode::DecryptionFailed);
    }

    #[tokio::test]
    async fn encrypting_before_ready_fails_a_precondition() {
        let app = unique("notready");
        let session = Session::create(&app_options(&app, "device-1")).expect("create");
        let err = session
            .encrypt(b"too soon", &EncryptionOptions::default())
            .await
            .expect_err("session is stopped");
        assert_eq!(err.code(), ErrorCode::PreconditionFailed);
    }

    #[tokio::test]
    async fn resource_ids_are_stable_and_shareable() {
        let app = unique("share");
        let session = ready_session(&app, &unique("alice")).await;
        let encrypted = session
            .encrypt(b"shared secret", &EncryptionOptions::default())
            .await
            .expect("encrypt");
        let id = resource_id(&encrypted).expect("resource id");
        assert_eq!(resource_id(&encrypted).expect("again"), id);

        session
            .share(
                &[id],
                &SharingOptions {
                    share_with_users: vec!["bob-public-identity".into()],
                    share_with_groups: Vec::new(),
                },
            )
            .await
            .expect("share");
    }

    #[tokio::test]
    async fn sharing_with_no_recipients_is_rejected() {
        let app = unique("sharenone");
        let session = ready_session(&app, &unique("alice")).await;
        let encrypted = session
            .encrypt(b"x", &EncryptionOptions::default())
            .await
            .expect("encrypt");
        let resource_id = resource_id(&encrypted).expect("resource id");
        let err = session
            .share(&[resource_id], &SharingOptions::default())
            .await
            .expect_err("no recipients");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn oidc_authorization_codes_convert_into_verifications() {
        let app = unique("oidc");
        let session = ready_session(&app, &unique("alice")).await;
        let code = session
            .authenticate_with_idp("idp-provider", "cookie=value")
            .await
            .expect("authenticate");
        assert_eq!(code.provider_id, "idp-provider");
        assert!(!code.authorization_code.is_empty());
        let verification: Verification = code.clone().into();
        assert_eq!(
            verification,
            Verification::OidcAuthorizationCode {
                provider_id: code.provider_id,
                authorization_code: code.authorization_code,
                state: code.state,
            }
        );
    }

    #[tokio::test]
    async fn operations_survive_dropping_the_caller_handle() {
        let app = unique("drop");
        let session = Session::create(&app_options(&app, "device-1")).expect("create");
        let identity = unique("alice");
        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.start(&identity).await })
        };
        drop(session);
        let status = task.await.expect("join").expect("start");
        assert_eq!(status, Status::IdentityRegistrationNeeded);
    }

    #[tokio::test]
    async fn operations_in_flight_still_resolve_across_stop() {
        let app = unique("stoprace");
        let session = ready_session(&app, &unique("alice")).await;
        let task = {
            let session = session.clone();
            tokio::spawn(async move {
                session.encrypt(b"mid-flight", &EncryptionOptions::default()).await
            })
        };
        session.stop().await.expect("stop");
        // Exactly one outcome arrives either way: the ciphertext if the
        // encryption won the race, a precondition error if stop did.
        match task.await.expect("join") {
            Ok(encrypted) => assert!(!encrypted.is_empty()),
            Err(err) => assert_eq!(err.code(), ErrorCode::PreconditionFailed),
        }
    }

    #[cfg(feature = "stub-core")]
    #[test]
    fn prehash_password_pins_the_stub_vectors() {
        assert_eq!(
            prehash_password("super secretive password").expect("hash"),
            "sDuPV+qGNLtw7KULt9gCcd+pPI66ECk673icoW04B4M=",
        );
        assert_eq!(
            prehash_password("test éå 한국어 😃").expect("hash"),
            "Tvs6WDC5CACtmRI/BYFUgRDvffJ/Rd5ZmsEQ0P8fw5o=",
        );
    }

    // The vendor core prehashes with a keyed construction the stub does
    // not reproduce; these are its published known-answer vectors.
    #[cfg(not(feature = "stub-core"))]
    #[test]
    fn prehash_password_matches_the_vendor_vectors() {
        assert_eq!(
            prehash_password("super secretive password").expect("hash"),
            "UYNRgDLSClFWKsJ7dl9uPJjhpIoEzadksv/Mf44gSHI=",
        );
        assert_eq!(
            prehash_password("test éå 한국어 😃").expect("hash"),
            "Pkn/pjub2uwkBDpt2HUieWOXP5xLn0Zlen16ID4C7jI=",
        );
    }

    #[test]
    fn prehash_password_rejects_empty_input_locally() {
        let err = prehash_password("").expect_err("empty password");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.message(), "Cannot hash empty password");
    }

    #[test]
    fn invalid_app_ids_are_rejected_at_creation() {
        let options = SessionOptions::new("not base64 !!!", "/tmp/x", "/tmp/x/cache");
        let err = Session::create(&options).expect_err("bad app id");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn native_version_is_exposed() {
        assert!(!native_version().is_empty());
    }
}

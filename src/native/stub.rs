//! # Stub Native Core
//!
//! An in-process stand-in for `libcoffer`, compiled in by the default
//! `stub-core` feature. It implements the full ABI of [`super`] with the
//! same observable semantics the binding relies on:
//!
//! - every asynchronous entry point returns its future synchronously and
//!   resolves it later on a worker thread;
//! - a future's continuation runs exactly once, also when it is attached
//!   after resolution;
//! - wire structs are read only during the synchronous call that receives
//!   them (everything needed later is copied out before returning);
//! - session state survives from the worker threads' point of view even if
//!   the handle is destroyed mid-flight.
//!
//! The crypto is real (AES-256-GCM, BLAKE2b-256) so encrypt/decrypt and
//! prehash tests exercise actual round trips, but identity registration is
//! a process-local registry keyed by identity string, with "devices"
//! distinguished by their persistent path.

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine as _;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::RngCore;

use super::*;
use crate::verification::VerificationMethodType;

unsafe fn copy_bytes(data: *const u8, len: u64) -> Vec<u8> {
    if data.is_null() || len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(data, len as usize).to_vec()
    }
}

type Blake2b256 = Blake2b<U32>;

/// How long worker threads pretend to work before resolving.
const WORKER_LATENCY: Duration = Duration::from_millis(3);

const STATUS_STOPPED: u32 = 0;
const STATUS_READY: u32 = 1;
const STATUS_IDENTITY_REGISTRATION_NEEDED: u32 = 2;
const STATUS_IDENTITY_VERIFICATION_NEEDED: u32 = 3;

const CODE_INVALID_ARGUMENT: u32 = 1;
const CODE_PRECONDITION_FAILED: u32 = 4;
const CODE_DECRYPTION_FAILED: u32 = 6;
const CODE_INVALID_VERIFICATION: u32 = 8;

const RESOURCE_ID_LEN: usize = 16;
const NONCE_LEN: usize = 12;

// ============================================================================
// FUTURES
// ============================================================================

/// Raw pointer wrapper so callback contexts can hop threads. Ownership is
/// transferred with the wrapper; the contract serializes all access.
struct SendPtr(*mut c_void);
unsafe impl Send for SendPtr {}

struct StoredError {
    // Boxed so the pointer handed out by `coffer_future_get_error` stays
    // stable however the containing state moves.
    raw: Box<coffer_error_t>,
    _message: CString,
}

impl StoredError {
    fn new(code: u32, message: &str) -> Self {
        let message = CString::new(message).unwrap_or_default();
        let raw = Box::new(coffer_error_t {
            code,
            message: message.as_ptr(),
        });
        Self {
            raw,
            _message: message,
        }
    }
}

struct Outcome {
    value: *mut c_void,
    error: Option<StoredError>,
}

impl Outcome {
    fn ok(value: *mut c_void) -> Self {
        Self { value, error: None }
    }

    fn ok_void() -> Self {
        Self::ok(std::ptr::null_mut())
    }

    fn err(code: u32, message: &str) -> Self {
        Self {
            value: std::ptr::null_mut(),
            error: Some(StoredError::new(code, message)),
        }
    }
}

struct Registered {
    cb: coffer_future_then_cb,
    ctx: SendPtr,
}

struct FutureState {
    inner: Mutex<FutureInner>,
}

struct FutureInner {
    outcome: Option<Outcome>,
    callback: Option<Registered>,
}

// Outcome carries owned heap payloads as raw pointers; the resolution
// protocol guarantees single-threaded hand-off.
unsafe impl Send for FutureState {}
unsafe impl Sync for FutureState {}

impl FutureState {
    fn pending() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(FutureInner {
                outcome: None,
                callback: None,
            }),
        })
    }

    fn into_raw(self: Arc<Self>) -> *mut coffer_future_t {
        Arc::into_raw(self) as *mut coffer_future_t
    }
}

unsafe fn future_ref<'a>(fut: *mut coffer_future_t) -> &'a FutureState {
    &*(fut as *const FutureState)
}

/// Store the outcome and fire the continuation if one is waiting.
/// Runs on the worker thread that finished the operation.
fn resolve(state: &Arc<FutureState>, outcome: Outcome) {
    let registered = {
        let mut inner = state.inner.lock();
        debug_assert!(inner.outcome.is_none(), "future resolved twice");
        inner.outcome = Some(outcome);
        inner.callback.take()
    };
    if let Some(registered) = registered {
        let fut = Arc::as_ptr(state) as *mut coffer_future_t;
        let _ret = unsafe { (registered.cb)(fut, registered.ctx.0) };
        debug_assert!(_ret.is_null());
    }
}

/// An already-resolved "expected" future.
fn ready_future(outcome: Outcome) -> *mut coffer_future_t {
    let state = FutureState::pending();
    state.inner.lock().outcome = Some(outcome);
    state.into_raw()
}

/// Spawn a worker that computes `op` after a short latency, resolving the
/// returned future with its outcome.
fn async_future<F>(op: F) -> *mut coffer_future_t
where
    F: FnOnce() -> Outcome + Send + 'static,
{
    let state = FutureState::pending();
    let worker_state = Arc::clone(&state);
    thread::Builder::new()
        .name("coffer-worker".into())
        .spawn(move || {
            thread::sleep(WORKER_LATENCY);
            let outcome = op();
            resolve(&worker_state, outcome);
        })
        .expect("spawn stub worker thread");
    state.into_raw()
}

pub unsafe extern "C" fn coffer_future_then(
    fut: *mut coffer_future_t,
    cb: coffer_future_then_cb,
    ctx: *mut c_void,
) {
    let already_resolved = {
        let mut inner = future_ref(fut).inner.lock();
        debug_assert!(inner.callback.is_none(), "future already has a continuation");
        if inner.outcome.is_some() {
            true
        } else {
            inner.callback = Some(Registered {
                cb,
                ctx: SendPtr(ctx),
            });
            false
        }
    };
    if already_resolved {
        // Still delivered from a worker thread, never inline.
        let fut = SendPtr(fut as *mut c_void);
        let ctx = SendPtr(ctx);
        thread::Builder::new()
            .name("coffer-worker".into())
            .spawn(move || {
                // Capture the Send wrappers whole, not their pointer fields.
                let (fut, ctx) = (fut, ctx);
                let _ret = unsafe { cb(fut.0 as *mut coffer_future_t, ctx.0) };
                debug_assert!(_ret.is_null());
            })
            .expect("spawn stub worker thread");
    }
}

pub unsafe extern "C" fn coffer_future_get_error(
    fut: *mut coffer_future_t,
) -> *const coffer_error_t {
    let inner = future_ref(fut).inner.lock();
    match inner.outcome.as_ref().and_then(|o| o.error.as_ref()) {
        Some(stored) => &*stored.raw,
        None => std::ptr::null(),
    }
}

pub unsafe extern "C" fn coffer_future_get_voidptr(fut: *mut coffer_future_t) -> *mut c_void {
    let mut inner = future_ref(fut).inner.lock();
    match inner.outcome.as_mut() {
        // Ownership of the payload passes to the caller.
        Some(outcome) => std::mem::replace(&mut outcome.value, std::ptr::null_mut()),
        None => std::ptr::null_mut(),
    }
}

pub unsafe extern "C" fn coffer_future_destroy(fut: *mut coffer_future_t) {
    if !fut.is_null() {
        drop(Arc::from_raw(fut as *const FutureState));
    }
}

// ============================================================================
// SESSIONS & IDENTITY REGISTRY
// ============================================================================

struct SessionCore {
    app_id: String,
    persistent_path: String,
    state: Mutex<SessionState>,
}

struct SessionState {
    status: u32,
    identity: Option<String>,
}

struct StubSession {
    core: Arc<SessionCore>,
}

#[derive(Clone)]
enum RegisteredMethod {
    Passphrase(String),
    E2ePassphrase(String),
    Other(u8),
}

struct IdentityRecord {
    method: RegisteredMethod,
    /// Persistent paths ("devices") that already hold a key.
    devices: HashSet<String>,
}

static REGISTRY: Lazy<Mutex<HashMap<String, IdentityRecord>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

unsafe fn session_core(session: *mut coffer_session_t) -> Arc<SessionCore> {
    Arc::clone(&(*(session as *const StubSession)).core)
}

unsafe fn copy_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

pub unsafe extern "C" fn coffer_create(
    options: *const coffer_session_options_t,
) -> *mut coffer_future_t {
    assert!(!options.is_null());
    let options = &*options;
    assert_eq!(
        options.version, COFFER_SESSION_OPTIONS_VERSION,
        "session options ABI version drift"
    );

    let app_id = copy_cstr(options.app_id).unwrap_or_default();
    if BASE64.decode(&app_id).is_err() {
        return ready_future(Outcome::err(CODE_INVALID_ARGUMENT, "app_id is not base64"));
    }
    let persistent_path = copy_cstr(options.persistent_path).unwrap_or_default();

    emit_log(2, &format!("session created for app {app_id}"));
    let session = Box::new(StubSession {
        core: Arc::new(SessionCore {
            app_id,
            persistent_path,
            state: Mutex::new(SessionState {
                status: STATUS_STOPPED,
                identity: None,
            }),
        }),
    });
    ready_future(Outcome::ok(Box::into_raw(session) as *mut c_void))
}

pub unsafe extern "C" fn coffer_session_destroy(session: *mut coffer_session_t) {
    if !session.is_null() {
        // Workers hold their own Arc to the core state, so a destroy racing
        // an in-flight operation only drops this handle's reference.
        drop(Box::from_raw(session as *mut StubSession));
    }
}

pub unsafe extern "C" fn coffer_status(session: *mut coffer_session_t) -> u32 {
    session_core(session).state.lock().status
}

pub unsafe extern "C" fn coffer_start(
    session: *mut coffer_session_t,
    identity: *const c_char,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let identity = copy_cstr(identity);
    async_future(move || {
        let identity = match identity {
            Some(id) if !id.is_empty() => id,
            _ => return Outcome::err(CODE_INVALID_ARGUMENT, "identity is empty"),
        };
        let status = {
            let registry = REGISTRY.lock();
            match registry.get(&identity) {
                None => STATUS_IDENTITY_REGISTRATION_NEEDED,
                Some(record) if record.devices.contains(&core.persistent_path) => STATUS_READY,
                Some(_) => STATUS_IDENTITY_VERIFICATION_NEEDED,
            }
        };
        let mut state = core.state.lock();
        state.identity = Some(identity);
        state.status = status;
        emit_log(1, &format!("session started, status {status}"));
        Outcome::ok(status as usize as *mut c_void)
    })
}

pub unsafe extern "C" fn coffer_stop(session: *mut coffer_session_t) -> *mut coffer_future_t {
    let core = session_core(session);
    async_future(move || {
        let mut state = core.state.lock();
        state.status = STATUS_STOPPED;
        state.identity = None;
        emit_log(1, "session stopped");
        Outcome::ok_void()
    })
}

// ============================================================================
// VERIFICATION DECODE
// ============================================================================

/// Owned copy of a `coffer_verification_t`, taken before the synchronous
/// call returns. Also serves as the receiver side for codec tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecodedVerification {
    Passphrase(String),
    E2ePassphrase(String),
    VerificationKey(String),
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

/// Read a verification wire struct into owned form.
///
/// # Safety
///
/// `verification` must point to a struct whose populated string fields are
/// valid null-terminated buffers for the duration of the call.
pub(crate) unsafe fn decode_verification(
    verification: *const coffer_verification_t,
) -> Result<DecodedVerification, DecodeError> {
    if verification.is_null() {
        return Err(DecodeError::new(CODE_INVALID_ARGUMENT, "verification is null"));
    }
    let v = &*verification;
    assert_eq!(
        v.version, COFFER_VERIFICATION_VERSION,
        "verification ABI version drift"
    );
    let required = |ptr: *const c_char, what: &str| {
        unsafe { copy_cstr(ptr) }.ok_or_else(|| DecodeError::new(CODE_INVALID_ARGUMENT, what))
    };
    let decoded = match v.verification_method_type {
        t if t == VerificationMethodType::Passphrase as u8 => {
            DecodedVerification::Passphrase(required(v.passphrase, "passphrase is null")?)
        }
        t if t == VerificationMethodType::E2ePassphrase as u8 => DecodedVerification::E2ePassphrase(
            required(v.e2e_passphrase, "e2e_passphrase is null")?,
        ),
        t if t == VerificationMethodType::VerificationKey as u8 => {
            DecodedVerification::VerificationKey(required(
                v.verification_key,
                "verification_key is null",
            )?)
        }
        t if t == VerificationMethodType::Email as u8 => DecodedVerification::Email {
            email: required(v.email_verification.email, "email is null")?,
            verification_code: required(
                v.email_verification.verification_code,
                "verification_code is null",
            )?,
        },
        t if t == VerificationMethodType::OidcIdToken as u8 => {
            DecodedVerification::OidcIdToken(required(v.oidc_id_token, "oidc_id_token is null")?)
        }
        t if t == VerificationMethodType::PhoneNumber as u8 => DecodedVerification::PhoneNumber {
            phone_number: required(
                v.phone_number_verification.phone_number,
                "phone_number is null",
            )?,
            verification_code: required(
                v.phone_number_verification.verification_code,
                "verification_code is null",
            )?,
        },
        t if t == VerificationMethodType::PreverifiedEmail as u8 => {
            DecodedVerification::PreverifiedEmail(required(
                v.preverified_email,
                "preverified_email is null",
            )?)
        }
        t if t == VerificationMethodType::PreverifiedPhoneNumber as u8 => {
            DecodedVerification::PreverifiedPhoneNumber(required(
                v.preverified_phone_number,
                "preverified_phone_number is null",
            )?)
        }
        t if t == VerificationMethodType::PreverifiedOidc as u8 => {
            DecodedVerification::PreverifiedOidc {
                subject: required(v.preverified_oidc_verification.subject, "subject is null")?,
                provider_id: required(
                    v.preverified_oidc_verification.provider_id,
                    "provider_id is null",
                )?,
            }
        }
        t if t == VerificationMethodType::OidcAuthorizationCode as u8 => {
            DecodedVerification::OidcAuthorizationCode {
                provider_id: required(
                    v.oidc_authorization_code_verification.provider_id,
                    "provider_id is null",
                )?,
                authorization_code: required(
                    v.oidc_authorization_code_verification.authorization_code,
                    "authorization_code is null",
                )?,
                state: required(v.oidc_authorization_code_verification.state, "state is null")?,
            }
        }
        t if t == VerificationMethodType::PrehashedAndEncryptedPassphrase as u8 => {
            DecodedVerification::PrehashedAndEncryptedPassphrase(required(
                v.prehashed_and_encrypted_passphrase,
                "prehashed_and_encrypted_passphrase is null",
            )?)
        }
        other => {
            return Err(DecodeError::new(
                CODE_INVALID_ARGUMENT,
                &format!("unknown verification method type {other}"),
            ))
        }
    };
    Ok(decoded)
}

/// Owned error parts, movable into worker closures (unlike [`Outcome`],
/// which carries raw pointers).
#[derive(Debug)]
pub(crate) struct DecodeError {
    code: u32,
    message: String,
}

impl DecodeError {
    fn new(code: u32, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }

    fn into_outcome(self) -> Outcome {
        Outcome::err(self.code, &self.message)
    }

    #[cfg(test)]
    pub(crate) fn code(&self) -> u32 {
        self.code
    }
}

impl DecodedVerification {
    fn registered_method(&self) -> RegisteredMethod {
        match self {
            Self::Passphrase(p) => RegisteredMethod::Passphrase(p.clone()),
            Self::E2ePassphrase(p) => RegisteredMethod::E2ePassphrase(p.clone()),
            other => RegisteredMethod::Other(other.method_type_code()),
        }
    }

    fn method_type_code(&self) -> u8 {
        let ty = match self {
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
        };
        ty as u8
    }

    /// Does a verification attempt match what was registered?
    fn matches(&self, registered: &RegisteredMethod) -> bool {
        match (self, registered) {
            (Self::Passphrase(given), RegisteredMethod::Passphrase(stored)) => given == stored,
            (Self::E2ePassphrase(given), RegisteredMethod::E2ePassphrase(stored)) => {
                given == stored
            }
            // Code-based methods are checked server-side in the real core;
            // the stub accepts any matching method type.
            (given, RegisteredMethod::Other(code)) => given.method_type_code() == *code,
            _ => false,
        }
    }
}

unsafe fn decode_verification_options(
    options: *const coffer_verification_options_t,
) -> (bool, bool) {
    if options.is_null() {
        return (false, false);
    }
    let options = &*options;
    assert_eq!(
        options.version, COFFER_VERIFICATION_OPTIONS_VERSION,
        "verification options ABI version drift"
    );
    (options.with_session_token, options.allow_e2e_method_switch)
}

fn session_token_outcome(with_session_token: bool) -> Outcome {
    if with_session_token {
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        let token =
            CString::new(format!("sess-{}", BASE64_URL.encode(raw))).expect("base64 has no NUL");
        Outcome::ok(token.into_raw() as *mut c_void)
    } else {
        Outcome::ok_void()
    }
}

pub unsafe extern "C" fn coffer_register_identity(
    session: *mut coffer_session_t,
    verification: *const coffer_verification_t,
    options: *const coffer_verification_options_t,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let decoded = decode_verification(verification);
    let (with_session_token, _) = decode_verification_options(options);
    async_future(move || {
        let decoded = match decoded {
            Ok(d) => d,
            Err(e) => return e.into_outcome(),
        };
        let mut state = core.state.lock();
        if state.status != STATUS_IDENTITY_REGISTRATION_NEEDED {
            return Outcome::err(CODE_PRECONDITION_FAILED, "identity is already registered");
        }
        let identity = state.identity.clone().unwrap_or_default();
        let mut registry = REGISTRY.lock();
        let record = registry.entry(identity).or_insert_with(|| IdentityRecord {
            method: decoded.registered_method(),
            devices: HashSet::new(),
        });
        record.method = decoded.registered_method();
        record.devices.insert(core.persistent_path.clone());
        state.status = STATUS_READY;
        session_token_outcome(with_session_token)
    })
}

pub unsafe extern "C" fn coffer_verify_identity(
    session: *mut coffer_session_t,
    verification: *const coffer_verification_t,
    options: *const coffer_verification_options_t,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let decoded = decode_verification(verification);
    let (with_session_token, _) = decode_verification_options(options);
    async_future(move || {
        let decoded = match decoded {
            Ok(d) => d,
            Err(e) => return e.into_outcome(),
        };
        let mut state = core.state.lock();
        if state.status != STATUS_IDENTITY_VERIFICATION_NEEDED {
            return Outcome::err(
                CODE_PRECONDITION_FAILED,
                "session does not need identity verification",
            );
        }
        let identity = state.identity.clone().unwrap_or_default();
        let mut registry = REGISTRY.lock();
        let record = match registry.get_mut(&identity) {
            Some(r) => r,
            None => return Outcome::err(CODE_PRECONDITION_FAILED, "identity is not registered"),
        };
        if !decoded.matches(&record.method) {
            return Outcome::err(CODE_INVALID_VERIFICATION, "verification does not match");
        }
        record.devices.insert(core.persistent_path.clone());
        state.status = STATUS_READY;
        session_token_outcome(with_session_token)
    })
}

pub unsafe extern "C" fn coffer_set_verification_method(
    session: *mut coffer_session_t,
    verification: *const coffer_verification_t,
    options: *const coffer_verification_options_t,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let decoded = decode_verification(verification);
    let _ = decode_verification_options(options);
    async_future(move || {
        let decoded = match decoded {
            Ok(d) => d,
            Err(e) => return e.into_outcome(),
        };
        let state = core.state.lock();
        if state.status != STATUS_READY {
            return Outcome::err(CODE_PRECONDITION_FAILED, "session is not ready");
        }
        let identity = state.identity.clone().unwrap_or_default();
        let mut registry = REGISTRY.lock();
        match registry.get_mut(&identity) {
            Some(record) => {
                record.method = decoded.registered_method();
                Outcome::ok_void()
            }
            None => Outcome::err(CODE_PRECONDITION_FAILED, "identity is not registered"),
        }
    })
}

pub unsafe extern "C" fn coffer_verify_provisional_identity(
    session: *mut coffer_session_t,
    verification: *const coffer_verification_t,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let decoded = decode_verification(verification);
    async_future(move || {
        if let Err(e) = decoded {
            return e.into_outcome();
        }
        let state = core.state.lock();
        if state.status != STATUS_READY {
            return Outcome::err(CODE_PRECONDITION_FAILED, "session is not ready");
        }
        Outcome::ok_void()
    })
}

pub unsafe extern "C" fn coffer_authenticate_with_idp(
    session: *mut coffer_session_t,
    provider_id: *const c_char,
    cookie: *const c_char,
) -> *mut coffer_future_t {
    let _core = session_core(session);
    let provider_id = copy_cstr(provider_id);
    let cookie = copy_cstr(cookie);
    async_future(move || {
        let provider_id = match provider_id {
            Some(p) if !p.is_empty() => p,
            _ => return Outcome::err(CODE_INVALID_ARGUMENT, "provider_id is empty"),
        };
        if cookie.is_none() {
            return Outcome::err(CODE_INVALID_ARGUMENT, "cookie is null");
        }
        let mut raw = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut raw);
        let result = Box::new(coffer_oidc_authorization_code_verification_t {
            provider_id: CString::new(provider_id).unwrap_or_default().into_raw(),
            authorization_code: CString::new(format!("code-{}", BASE64_URL.encode(raw)))
                .expect("base64 has no NUL")
                .into_raw(),
            state: CString::new(format!("state-{}", BASE64_URL.encode(raw)))
                .expect("base64 has no NUL")
                .into_raw(),
        });
        Outcome::ok(Box::into_raw(result) as *mut c_void)
    })
}

pub unsafe extern "C" fn coffer_oidc_verification_destroy(
    verification: *mut coffer_oidc_authorization_code_verification_t,
) {
    if verification.is_null() {
        return;
    }
    let boxed = Box::from_raw(verification);
    for ptr in [boxed.provider_id, boxed.authorization_code, boxed.state] {
        if !ptr.is_null() {
            drop(CString::from_raw(ptr as *mut c_char));
        }
    }
}

// ============================================================================
// ENCRYPTION
// ============================================================================

fn app_key(app_id: &str) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(b"coffer-stub-app-key");
    hasher.update(app_id.as_bytes());
    hasher.finalize().into()
}

fn pad(plaintext: &[u8], step: usize) -> Vec<u8> {
    let mut padded = plaintext.to_vec();
    padded.push(0x80);
    while padded.len() % step != 0 {
        padded.push(0);
    }
    padded
}

fn unpad(mut padded: Vec<u8>) -> Result<Vec<u8>, ()> {
    while let Some(&0) = padded.last() {
        padded.pop();
    }
    match padded.pop() {
        Some(0x80) => Ok(padded),
        _ => Err(()),
    }
}

fn boxed_buffer(data: Vec<u8>) -> Outcome {
    let len = data.len() as u64;
    let mut slice = data.into_boxed_slice();
    let ptr = slice.as_mut_ptr();
    std::mem::forget(slice);
    Outcome::ok(Box::into_raw(Box::new(coffer_buffer_t { data: ptr, len })) as *mut c_void)
}

pub unsafe extern "C" fn coffer_encrypt(
    session: *mut coffer_session_t,
    data: *const u8,
    data_len: u64,
    options: *const coffer_encryption_options_t,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let plaintext = copy_bytes(data, data_len);
    let padding_step = if options.is_null() {
        0
    } else {
        let options = &*options;
        assert_eq!(
            options.version, COFFER_ENCRYPTION_OPTIONS_VERSION,
            "encryption options ABI version drift"
        );
        options.padding_step
    };
    async_future(move || {
        if core.state.lock().status != STATUS_READY {
            return Outcome::err(CODE_PRECONDITION_FAILED, "session is not ready");
        }
        // auto = pad to a 16-byte multiple; off = marker only; n = multiple of n
        let padded = match padding_step {
            0 => pad(&plaintext, 16),
            1 => plaintext,
            n => pad(&plaintext, n as usize),
        };
        let cipher = Aes256Gcm::new_from_slice(&app_key(&core.app_id)).expect("key size");
        let mut resource_id = [0u8; RESOURCE_ID_LEN];
        rand::thread_rng().fill_bytes(&mut resource_id);
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = match cipher.encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &padded,
                aad: &resource_id,
            },
        ) {
            Ok(ct) => ct,
            Err(_) => return Outcome::err(CODE_DECRYPTION_FAILED, "encryption failed"),
        };
        let padded_flag = u8::from(padding_step != 1);
        let mut out = Vec::with_capacity(RESOURCE_ID_LEN + 1 + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&resource_id);
        out.push(padded_flag);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        boxed_buffer(out)
    })
}

pub unsafe extern "C" fn coffer_decrypt(
    session: *mut coffer_session_t,
    data: *const u8,
    data_len: u64,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let encrypted = copy_bytes(data, data_len);
    async_future(move || {
        if core.state.lock().status != STATUS_READY {
            return Outcome::err(CODE_PRECONDITION_FAILED, "session is not ready");
        }
        if encrypted.len() < RESOURCE_ID_LEN + 1 + NONCE_LEN {
            return Outcome::err(CODE_INVALID_ARGUMENT, "truncated encrypted data");
        }
        let (resource_id, rest) = encrypted.split_at(RESOURCE_ID_LEN);
        let (padded_flag, rest) = rest.split_first().expect("length checked");
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&app_key(&core.app_id)).expect("key size");
        let padded = match cipher.decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: resource_id,
            },
        ) {
            Ok(pt) => pt,
            Err(_) => return Outcome::err(CODE_DECRYPTION_FAILED, "could not decrypt resource"),
        };
        let plaintext = if *padded_flag == 1 {
            match unpad(padded) {
                Ok(pt) => pt,
                Err(()) => return Outcome::err(CODE_DECRYPTION_FAILED, "invalid padding"),
            }
        } else {
            padded
        };
        boxed_buffer(plaintext)
    })
}

static SHARES: Lazy<Mutex<HashMap<String, Vec<String>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

pub unsafe extern "C" fn coffer_share(
    session: *mut coffer_session_t,
    resource_ids: *const *const c_char,
    nb_resource_ids: u64,
    options: *const coffer_sharing_options_t,
) -> *mut coffer_future_t {
    let core = session_core(session);
    let ids: Vec<Option<String>> = (0..nb_resource_ids as usize)
        .map(|i| unsafe { copy_cstr(*resource_ids.add(i)) })
        .collect();
    let recipients: Vec<String> = if options.is_null() {
        Vec::new()
    } else {
        let options = &*options;
        assert_eq!(
            options.version, COFFER_SHARING_OPTIONS_VERSION,
            "sharing options ABI version drift"
        );
        let users = (0..options.nb_users as usize)
            .map(|i| unsafe { copy_cstr(*options.share_with_users.add(i)) }.unwrap_or_default());
        let groups = (0..options.nb_groups as usize)
            .map(|i| unsafe { copy_cstr(*options.share_with_groups.add(i)) }.unwrap_or_default());
        users.chain(groups).collect()
    };
    async_future(move || {
        if core.state.lock().status != STATUS_READY {
            return Outcome::err(CODE_PRECONDITION_FAILED, "session is not ready");
        }
        if recipients.is_empty() {
            return Outcome::err(CODE_INVALID_ARGUMENT, "no recipients");
        }
        let mut shares = SHARES.lock();
        for id in ids {
            match id {
                Some(id) if BASE64.decode(&id).map(|b| b.len()) == Ok(RESOURCE_ID_LEN) => {
                    shares.entry(id).or_default().extend(recipients.clone());
                }
                _ => return Outcome::err(CODE_INVALID_ARGUMENT, "malformed resource id"),
            }
        }
        Outcome::ok_void()
    })
}

pub unsafe extern "C" fn coffer_get_resource_id(
    data: *const u8,
    data_len: u64,
) -> *mut coffer_future_t {
    let encrypted = copy_bytes(data, data_len);
    if encrypted.len() < RESOURCE_ID_LEN {
        return ready_future(Outcome::err(CODE_INVALID_ARGUMENT, "truncated encrypted data"));
    }
    let encoded = CString::new(BASE64.encode(&encrypted[..RESOURCE_ID_LEN]))
        .expect("base64 has no NUL");
    ready_future(Outcome::ok(encoded.into_raw() as *mut c_void))
}

// ============================================================================
// PREHASH & MISC
// ============================================================================

pub unsafe extern "C" fn coffer_prehash_password(
    password: *const c_char,
) -> *mut coffer_future_t {
    let password = match copy_cstr(password) {
        Some(p) if !p.is_empty() => p,
        _ => return ready_future(Outcome::err(CODE_INVALID_ARGUMENT, "password is empty")),
    };
    let digest = Blake2b256::digest(password.as_bytes());
    let encoded = CString::new(BASE64.encode(digest)).expect("base64 has no NUL");
    ready_future(Outcome::ok(encoded.into_raw() as *mut c_void))
}

pub unsafe extern "C" fn coffer_buffer_destroy(buffer: *mut coffer_buffer_t) {
    if buffer.is_null() {
        return;
    }
    let buffer = Box::from_raw(buffer);
    if !buffer.data.is_null() {
        drop(Vec::from_raw_parts(
            buffer.data,
            buffer.len as usize,
            buffer.len as usize,
        ));
    }
}

pub unsafe extern "C" fn coffer_free_buffer(ptr: *mut c_void) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

pub unsafe extern "C" fn coffer_version_string() -> *const c_char {
    static VERSION: &[u8] = b"9.9.0-stub\0";
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// LOGGING
// ============================================================================

static LOG_HANDLER: Mutex<Option<coffer_log_handler>> = Mutex::new(None);

pub unsafe extern "C" fn coffer_set_log_handler(handler: Option<coffer_log_handler>) {
    *LOG_HANDLER.lock() = handler;
}

fn emit_log(level: u32, message: &str) {
    let handler = *LOG_HANDLER.lock();
    if let Some(handler) = handler {
        let category = CString::new("session").expect("no NUL");
        let file = CString::new("stub.rs").expect("no NUL");
        let message = CString::new(message).unwrap_or_default();
        let record = coffer_log_record_t {
            category: category.as_ptr(),
            level,
            file: file.as_ptr(),
            line: line!(),
            message: message.as_ptr(),
        };
        unsafe { handler(&record) };
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn unknown_method_types_are_rejected_at_decode() {
        let mut raw = coffer_verification_t::empty();
        raw.verification_method_type = 42;
        let err = unsafe { decode_verification(&raw) }.expect_err("unknown type");
        assert_eq!(err.code(), CODE_INVALID_ARGUMENT);
    }

    unsafe extern "C" fn counting_cb(fut: *mut coffer_future_t, ctx: *mut c_void) -> *mut c_void {
        let calls = &*(ctx as *const AtomicU32);
        calls.fetch_add(1, Ordering::SeqCst);
        coffer_future_destroy(fut);
        std::ptr::null_mut()
    }

    #[test]
    fn continuations_attached_after_resolution_run_exactly_once() {
        let calls: &'static AtomicU32 = Box::leak(Box::new(AtomicU32::new(0)));
        let fut = ready_future(Outcome::ok_void());
        unsafe { coffer_future_then(fut, counting_cb, calls as *const _ as *mut c_void) };
        for _ in 0..200 {
            if calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn padding_round_trips_through_unpad() {
        let padded = pad(b"hello", 500);
        assert_eq!(padded.len(), 500);
        assert_eq!(unpad(padded).expect("valid padding"), b"hello".to_vec());
        assert!(unpad(vec![0, 0, 0]).is_err());
    }
}

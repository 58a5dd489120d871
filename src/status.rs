//! # Session Status
//!
//! The closed set of states a session reports after `start`, `register`,
//! `verify` and `set-method` calls. Values are the native wire codes.

/// Lifecycle state of a [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    /// No session is running.
    Stopped = 0,
    /// The session is open and all operations are available.
    Ready = 1,
    /// The identity has never been registered; call
    /// [`register_identity`](crate::Session::register_identity).
    IdentityRegistrationNeeded = 2,
    /// The identity is registered but this device holds no key; call
    /// [`verify_identity`](crate::Session::verify_identity).
    IdentityVerificationNeeded = 3,
}

impl Status {
    /// Map a raw native status code back into the closed set.
    ///
    /// The set is closed by contract; an out-of-range value can only come
    /// from ABI drift, which the caller treats as a programmer error.
    pub(crate) fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Stopped,
            1 => Self::Ready,
            2 => Self::IdentityRegistrationNeeded,
            3 => Self::IdentityVerificationNeeded,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_round_trip() {
        for status in [
            Status::Stopped,
            Status::Ready,
            Status::IdentityRegistrationNeeded,
            Status::IdentityVerificationNeeded,
        ] {
            assert_eq!(Status::from_raw(status as u32), Some(status));
        }
        assert_eq!(Status::from_raw(4), None);
    }
}

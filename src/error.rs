use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything the handshake and transport layers can fail with.
///
/// Configuration variants are raised before any state is created. `Decrypt` is
/// the only authentication failure; fallback logic should match on it (see
/// [`Error::is_decrypt`]) and nothing else.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("handshake pattern {pattern} requires a local static key")]
    MissingLocalStatic { pattern: String },
    #[error("handshake pattern {pattern} does not use a local static key")]
    UnexpectedLocalStatic { pattern: String },
    #[error("handshake pattern {pattern} requires the remote static public key")]
    MissingRemoteStatic { pattern: String },
    #[error("handshake pattern {pattern} does not take a remote static public key")]
    UnexpectedRemoteStatic { pattern: String },
    #[error("expected {expected} preshared keys, got {actual}")]
    PskCount { expected: usize, actual: usize },
    #[error("preshared keys must be 32 bytes, got {0}")]
    PskLength(usize),
    #[error("fallback patterns start only via HandshakeState::fallback")]
    FallbackModifier,
    #[error("modifiers {modifiers} cannot be applied to pattern {pattern}")]
    InvalidModifiers {
        pattern: &'static str,
        modifiers: String,
    },
    #[error("private key must be {expected} bytes, got {actual}")]
    InvalidPrivateKey { expected: usize, actual: usize },
    #[error("public key must be {expected} bytes, got {actual}")]
    InvalidPublicKey { expected: usize, actual: usize },
    #[error("protocol name is {0} bytes, the limit is 255")]
    ProtocolNameTooLong(usize),
    #[error("fallback rejected: {0}")]
    InvalidFallback(&'static str),

    #[error("decryption failed")]
    Decrypt,

    #[error("nonce space exhausted, the session must be rekeyed or dropped")]
    NonceExhausted,

    #[error("out of turn: expected a call to {expected}")]
    OutOfTurn { expected: &'static str },
    #[error("handshake already completed")]
    HandshakeComplete,
    #[error("handshake failed earlier, only fallback is possible")]
    HandshakeFailed,
    #[error("transport is one-way, this direction does not exist")]
    OneWay,
    #[error("missing {0} for the current token")]
    MissingKey(&'static str),

    #[error("message is {actual} bytes, at least {expected} are required")]
    MessageTooShort { expected: usize, actual: usize },
    #[error("message of {0} bytes exceeds the 65535 byte limit")]
    MessageTooLong(usize),

    #[error("cipher state has no key")]
    NoKey,
}

impl Error {
    /// True for AEAD authentication failures, the trigger for protocol fallback.
    pub fn is_decrypt(&self) -> bool {
        matches!(self, Error::Decrypt)
    }

    /// True for argument validation failures detected before any state exists.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::MissingLocalStatic { .. }
                | Error::UnexpectedLocalStatic { .. }
                | Error::MissingRemoteStatic { .. }
                | Error::UnexpectedRemoteStatic { .. }
                | Error::PskCount { .. }
                | Error::PskLength(_)
                | Error::FallbackModifier
                | Error::InvalidModifiers { .. }
                | Error::InvalidPrivateKey { .. }
                | Error::InvalidPublicKey { .. }
                | Error::ProtocolNameTooLong(_)
                | Error::InvalidFallback(_)
        )
    }
}

use std::{fmt, marker::PhantomData};

use zeroize::Zeroizing;

use crate::{
    error::{Error, Result},
    hs_state::HandshakeState,
    pattern::{HandshakePattern, PatternModifiers, ResolvedPattern, Role},
    primitives::{Cipher, Dh, Hash},
};

/// Largest handshake or transport message, framing excluded.
pub const MAX_MESSAGE_LEN: usize = 65535;
pub const PSK_LEN: usize = 32;
pub const MAX_PROTOCOL_NAME_LEN: usize = 255;

/// Key material and options for one side of a handshake.
#[derive(Clone, Default)]
pub struct ProtocolConfig {
    pub initiator: bool,
    pub prologue: Vec<u8>,
    pub local_static: Option<Zeroizing<Vec<u8>>>,
    pub remote_static: Option<Vec<u8>>,
    pub preshared_keys: Vec<Zeroizing<Vec<u8>>>,
}

impl ProtocolConfig {
    pub fn initiator() -> Self {
        Self {
            initiator: true,
            ..Self::default()
        }
    }

    pub fn responder() -> Self {
        Self::default()
    }

    pub fn with_prologue(mut self, prologue: &[u8]) -> Self {
        self.prologue = prologue.to_vec();
        self
    }

    /// The local static private key; the public half is derived from it.
    pub fn with_local_static(mut self, private_key: &[u8]) -> Self {
        self.local_static = Some(Zeroizing::new(private_key.to_vec()));
        self
    }

    pub fn with_remote_static(mut self, public_key: &[u8]) -> Self {
        self.remote_static = Some(public_key.to_vec());
        self
    }

    /// Appends one preshared key; keys are consumed in the order the psk tokens appear.
    pub fn with_preshared_key(mut self, psk: &[u8]) -> Self {
        self.preshared_keys.push(Zeroizing::new(psk.to_vec()));
        self
    }

    pub(crate) fn role(&self) -> Role {
        if self.initiator {
            Role::Initiator
        } else {
            Role::Responder
        }
    }
}

impl fmt::Debug for ProtocolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolConfig")
            .field("initiator", &self.initiator)
            .field("prologue", &self.prologue)
            .field("has_local_static", &self.local_static.is_some())
            .field("remote_static", &self.remote_static)
            .field("preshared_keys", &self.preshared_keys.len())
            .finish()
    }
}

/// A concrete Noise protocol: pattern, modifiers and the three primitives, e.g.
/// `Protocol::<ChaChaPoly, Curve25519, Blake2s>::new(HandshakePattern::XX, PatternModifiers::NONE)`
/// is `Noise_XX_25519_ChaChaPoly_BLAKE2s`.
///
/// Immutable once built; one value can create any number of handshakes.
pub struct Protocol<C, D, H> {
    pattern: HandshakePattern,
    modifiers: PatternModifiers,
    resolved: ResolvedPattern,
    name: String,
    primitives: PhantomData<fn() -> (C, D, H)>,
}

impl<C, D, H> Clone for Protocol<C, D, H> {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern,
            modifiers: self.modifiers,
            resolved: self.resolved.clone(),
            name: self.name.clone(),
            primitives: PhantomData,
        }
    }
}

impl<C, D, H> fmt::Debug for Protocol<C, D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Protocol").field(&self.name).finish()
    }
}

impl<C: Cipher, D: Dh, H: Hash> Protocol<C, D, H> {
    /// Fails when a modifier refers to a message the pattern does not have, when `fallback`
    /// cannot apply to the pattern, or when the name would not fit in 255 bytes.
    pub fn new(pattern: HandshakePattern, modifiers: PatternModifiers) -> Result<Self> {
        let resolved = ResolvedPattern::resolve(pattern, modifiers)?;
        let name = format!(
            "Noise_{}{}_{}_{}_{}",
            pattern.name(),
            modifiers.name(),
            D::NAME,
            C::NAME,
            H::NAME
        );
        if name.len() > MAX_PROTOCOL_NAME_LEN {
            return Err(Error::ProtocolNameTooLong(name.len()));
        }
        Ok(Self {
            pattern,
            modifiers,
            resolved,
            name,
            primitives: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> HandshakePattern {
        self.pattern
    }

    pub fn modifiers(&self) -> PatternModifiers {
        self.modifiers
    }

    pub(crate) fn resolved(&self) -> &ResolvedPattern {
        &self.resolved
    }

    pub fn requires_local_static(&self, initiator: bool) -> bool {
        self.resolved.requires_local_static(role(initiator))
    }

    pub fn requires_remote_static(&self, initiator: bool) -> bool {
        self.resolved.requires_remote_static(role(initiator))
    }

    pub fn psk_count(&self) -> usize {
        self.modifiers.psk_count()
    }

    /// Starts a handshake for one side. `local_static` is a private key, `remote_static` the
    /// peer's public key.
    pub fn create_handshake_state(
        &self,
        initiator: bool,
        prologue: &[u8],
        local_static: Option<&[u8]>,
        remote_static: Option<&[u8]>,
        preshared_keys: &[&[u8]],
    ) -> Result<HandshakeState<C, D, H>> {
        let mut config = ProtocolConfig {
            initiator,
            prologue: prologue.to_vec(),
            ..ProtocolConfig::default()
        };
        if let Some(key) = local_static {
            config = config.with_local_static(key);
        }
        if let Some(key) = remote_static {
            config = config.with_remote_static(key);
        }
        for psk in preshared_keys {
            config = config.with_preshared_key(psk);
        }
        self.create_handshake_state_with(&config)
    }

    pub fn create_handshake_state_with(
        &self,
        config: &ProtocolConfig,
    ) -> Result<HandshakeState<C, D, H>> {
        HandshakeState::new(self, config)
    }
}

fn role(initiator: bool) -> Role {
    if initiator {
        Role::Initiator
    } else {
        Role::Responder
    }
}

use std::{collections::VecDeque, fmt, marker::PhantomData};

use bytes::BytesMut;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    error::{Error, Result},
    pattern::{MessagePattern, PatternModifiers, ResolvedPattern, Role, Token},
    primitives::{Cipher, Dh, Hash, KeyPair, TAG_LEN},
    protocol::{Protocol, ProtocolConfig, MAX_MESSAGE_LEN, PSK_LEN},
    segments::Segments,
    symm_state::SymmState,
    transport::TransportPair,
};

#[derive(Zeroize, ZeroizeOnDrop)]
struct Psk([u8; PSK_LEN]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Handshaking,
    Completed,
    Failed,
}

/// What a handshake message call produced. `handshake_hash` and `transport` are only set by the
/// call that completes the handshake.
#[derive(Debug)]
pub struct HandshakeOutput<C> {
    /// Bytes appended to the output buffer.
    pub len: usize,
    pub handshake_hash: Option<Vec<u8>>,
    pub transport: Option<TransportPair<C>>,
}

/// One side of a handshake in progress.
pub struct HandshakeState<C, D, H> {
    symm_state: SymmState<C, H>,
    protocol_name: String,
    role: Role,
    local_static: Option<KeyPair>,
    local_ephemeral: Option<KeyPair>,
    remote_static: Option<Vec<u8>>,
    remote_ephemeral: Option<Vec<u8>>,
    psks: VecDeque<Psk>,
    message_patterns: VecDeque<MessagePattern>,
    first_sender: Role,
    messages_started: usize,
    is_psk: bool,
    is_one_way: bool,
    fell_back: bool,
    status: Status,
    fixed_ephemeral: Option<KeyPair>,
    dh: PhantomData<fn() -> D>,
}

impl<C, D, H> fmt::Debug for HandshakeState<C, D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeState")
            .field("protocol", &self.protocol_name)
            .field("role", &self.role)
            .field("remaining_messages", &self.message_patterns.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn take_psks(expected: usize, keys: &[Zeroizing<Vec<u8>>]) -> Result<VecDeque<Psk>> {
    if keys.len() != expected {
        return Err(Error::PskCount {
            expected,
            actual: keys.len(),
        });
    }
    keys.iter()
        .map(|key| {
            let bytes: [u8; PSK_LEN] = key
                .as_slice()
                .try_into()
                .map_err(|_| Error::PskLength(key.len()))?;
            Ok(Psk(bytes))
        })
        .collect()
}

fn local_static_for<D: Dh>(
    resolved: &ResolvedPattern,
    role: Role,
    pattern: &str,
    private_key: Option<&[u8]>,
) -> Result<Option<KeyPair>> {
    match (resolved.requires_local_static(role), private_key) {
        (true, Some(key)) => Ok(Some(D::keypair_from_private(key)?)),
        (false, None) => Ok(None),
        (true, None) => Err(Error::MissingLocalStatic {
            pattern: pattern.to_owned(),
        }),
        (false, Some(_)) => Err(Error::UnexpectedLocalStatic {
            pattern: pattern.to_owned(),
        }),
    }
}

fn remote_static_for<D: Dh>(
    resolved: &ResolvedPattern,
    role: Role,
    pattern: &str,
    public_key: Option<&[u8]>,
) -> Result<Option<Vec<u8>>> {
    match (resolved.requires_remote_static(role), public_key) {
        (true, Some(key)) if key.len() != D::DH_LEN => Err(Error::InvalidPublicKey {
            expected: D::DH_LEN,
            actual: key.len(),
        }),
        (true, Some(key)) => Ok(Some(key.to_vec())),
        (false, None) => Ok(None),
        (true, None) => Err(Error::MissingRemoteStatic {
            pattern: pattern.to_owned(),
        }),
        (false, Some(_)) => Err(Error::UnexpectedRemoteStatic {
            pattern: pattern.to_owned(),
        }),
    }
}

impl<C: Cipher, D: Dh, H: Hash> HandshakeState<C, D, H> {
    pub(crate) fn new(protocol: &Protocol<C, D, H>, config: &ProtocolConfig) -> Result<Self> {
        if protocol.modifiers().contains(PatternModifiers::FALLBACK) {
            return Err(Error::FallbackModifier);
        }
        let resolved = protocol.resolved();
        let role = config.role();
        let pattern = protocol.pattern().name();

        let psks = take_psks(protocol.psk_count(), &config.preshared_keys)?;
        let local_static = local_static_for::<D>(
            resolved,
            role,
            pattern,
            config.local_static.as_ref().map(|k| k.as_slice()),
        )?;
        let remote_static =
            remote_static_for::<D>(resolved, role, pattern, config.remote_static.as_deref())?;

        let mut state = Self {
            symm_state: SymmState::init(protocol.name().as_bytes()),
            protocol_name: protocol.name().to_owned(),
            role,
            local_static,
            local_ephemeral: None,
            remote_static,
            remote_ephemeral: None,
            psks,
            message_patterns: resolved.messages.iter().cloned().collect(),
            first_sender: resolved.first_sender(),
            messages_started: 0,
            is_psk: resolved.is_psk,
            is_one_way: resolved.is_one_way,
            fell_back: false,
            status: Status::Handshaking,
            fixed_ephemeral: None,
            dh: PhantomData,
        };
        state.symm_state.mix_hash(&config.prologue);
        state.mix_pre_messages(resolved)?;

        tracing::debug!(protocol = %state.protocol_name, role = ?role, "handshake created");
        Ok(state)
    }

    /// Uses `private_key` for the next `e` token instead of a fresh random key. Intended for
    /// replaying known-answer vectors.
    pub fn set_fixed_ephemeral(&mut self, private_key: &[u8]) -> Result<()> {
        self.fixed_ephemeral = Some(D::keypair_from_private(private_key)?);
        Ok(())
    }

    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    pub fn is_initiator(&self) -> bool {
        self.role == Role::Initiator
    }

    pub fn is_one_way(&self) -> bool {
        self.is_one_way
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// True when the next call must be `write_message`.
    pub fn is_my_turn(&self) -> bool {
        self.status == Status::Handshaking
            && self
                .message_patterns
                .front()
                .is_some_and(|m| m.sender == self.role)
    }

    /// The transcript hash that binds the session. `None` until the handshake has completed.
    pub fn handshake_hash(&self) -> Option<&[u8]> {
        match self.status {
            Status::Completed => Some(self.symm_state.handshake_hash()),
            _ => None,
        }
    }

    /// The peer's static public key, once known.
    pub fn remote_static_public_key(&self) -> Option<&[u8]> {
        self.remote_static.as_deref()
    }

    pub fn local_static_public_key(&self) -> Option<&[u8]> {
        self.local_static.as_ref().map(KeyPair::public_key)
    }

    fn mix_pre_messages(&mut self, resolved: &ResolvedPattern) -> Result<()> {
        for owner in [Role::Initiator, Role::Responder] {
            for token in resolved.pre_message(owner) {
                let key = match (token, owner == self.role) {
                    (Token::E, true) => self.local_ephemeral.as_ref().map(|k| k.public_key()),
                    (Token::E, false) => self.remote_ephemeral.as_deref(),
                    (Token::S, true) => self.local_static.as_ref().map(|k| k.public_key()),
                    (Token::S, false) => self.remote_static.as_deref(),
                    _ => unreachable!("Invariant broken: pre-messages only carry e and s"),
                }
                .ok_or(Error::MissingKey("pre-message key"))?;
                self.symm_state.mix_hash(key);
                if *token == Token::E && self.is_psk {
                    self.symm_state.mix_key(key);
                }
            }
        }
        Ok(())
    }

    /// The next message pattern, if `writing` matches whose turn it is.
    fn next_message(&self, writing: bool) -> Result<MessagePattern> {
        match self.status {
            Status::Completed => return Err(Error::HandshakeComplete),
            Status::Failed => return Err(Error::HandshakeFailed),
            Status::Handshaking => {}
        }
        let next = self
            .message_patterns
            .front()
            .ok_or(Error::HandshakeComplete)?;
        let mine = next.sender == self.role;
        if mine != writing {
            return Err(Error::OutOfTurn {
                expected: if mine { "write_message" } else { "read_message" },
            });
        }
        Ok(next.clone())
    }

    /// DH for one of `ee`, `es`, `se`, `ss`. The first letter is Alice's key, the second Bob's.
    fn mix_dh(&mut self, token: Token) -> Result<()> {
        let (alice_static, bob_static) = match token {
            Token::EE => (false, false),
            Token::ES => (false, true),
            Token::SE => (true, false),
            Token::SS => (true, true),
            _ => unreachable!("Invariant broken: {token:?} is not a DH token"),
        };
        let (local_is_static, remote_is_static) = match self.role {
            Role::Initiator => (alice_static, bob_static),
            Role::Responder => (bob_static, alice_static),
        };

        let local = if local_is_static {
            self.local_static
                .as_ref()
                .ok_or(Error::MissingKey("local static key"))?
        } else {
            self.local_ephemeral
                .as_ref()
                .ok_or(Error::MissingKey("local ephemeral key"))?
        };
        let remote = if remote_is_static {
            self.remote_static
                .as_deref()
                .ok_or(Error::MissingKey("remote static key"))?
        } else {
            self.remote_ephemeral
                .as_deref()
                .ok_or(Error::MissingKey("remote ephemeral key"))?
        };

        let mut shared = Zeroizing::new(vec![0; D::DH_LEN]);
        D::dh(local, remote, &mut shared)?;
        self.symm_state.mix_key(&shared);
        Ok(())
    }

    fn mix_psk(&mut self) -> Result<()> {
        let psk = self
            .psks
            .pop_front()
            .ok_or(Error::MissingKey("preshared key"))?;
        self.symm_state.mix_key_and_hash(&psk.0);
        Ok(())
    }

    pub fn write_message(
        &mut self,
        payload: &[u8],
        out: &mut BytesMut,
    ) -> Result<HandshakeOutput<C>> {
        self.write_message_vectored(&[payload], out)
    }

    /// Appends the next handshake message to `out`, carrying `payload` (encrypted once a key
    /// has been established).
    pub fn write_message_vectored(
        &mut self,
        payload: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<HandshakeOutput<C>> {
        let message = self.next_message(true)?;
        let payload = Segments::new(payload);
        let total =
            message.overhead(D::DH_LEN, self.symm_state.has_key(), self.is_psk) + payload.len();
        if total > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLong(total));
        }

        self.message_patterns.pop_front();
        self.messages_started += 1;
        let start = out.len();
        if let Err(e) = self.write_tokens(&message.tokens, &payload, out) {
            out.truncate(start);
            self.status = Status::Failed;
            return Err(e);
        }
        self.finish(out.len() - start)
    }

    fn write_tokens(
        &mut self,
        tokens: &[Token],
        payload: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<()> {
        for token in tokens {
            match token {
                Token::E => {
                    let pair = self
                        .fixed_ephemeral
                        .take()
                        .unwrap_or_else(D::generate_keypair);
                    out.extend_from_slice(pair.public_key());
                    self.symm_state.mix_hash(pair.public_key());
                    if self.is_psk {
                        self.symm_state.mix_key(pair.public_key());
                    }
                    self.local_ephemeral = Some(pair);
                }
                Token::S => {
                    let pair = self
                        .local_static
                        .as_ref()
                        .ok_or(Error::MissingKey("local static key"))?;
                    self.symm_state
                        .encrypt_and_hash(&Segments::single(pair.public_key()), out)?;
                }
                Token::Psk => self.mix_psk()?,
                dh => self.mix_dh(*dh)?,
            }
        }
        self.symm_state.encrypt_and_hash(payload, out)?;
        Ok(())
    }

    pub fn read_message(
        &mut self,
        message: &[u8],
        out: &mut BytesMut,
    ) -> Result<HandshakeOutput<C>> {
        self.read_message_vectored(&[message], out)
    }

    /// Consumes the peer's next handshake message and appends its payload to `out`.
    ///
    /// An authentication failure fails the handshake: after it only
    /// [`HandshakeState::fallback`] is accepted.
    pub fn read_message_vectored(
        &mut self,
        message: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<HandshakeOutput<C>> {
        let pattern = self.next_message(false)?;
        let message = Segments::new(message);
        if message.len() > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLong(message.len()));
        }
        let overhead = pattern.overhead(D::DH_LEN, self.symm_state.has_key(), self.is_psk);
        if message.len() < overhead {
            return Err(Error::MessageTooShort {
                expected: overhead,
                actual: message.len(),
            });
        }

        self.message_patterns.pop_front();
        self.messages_started += 1;
        let start = out.len();
        if let Err(e) = self.read_tokens(&pattern.tokens, message, out) {
            out.truncate(start);
            self.status = Status::Failed;
            if e.is_decrypt() {
                tracing::warn!(
                    protocol = %self.protocol_name,
                    message = self.messages_started,
                    "handshake message failed to authenticate"
                );
            }
            return Err(e);
        }
        self.finish(out.len() - start)
    }

    fn read_tokens(
        &mut self,
        tokens: &[Token],
        message: Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<()> {
        let mut rest = message;
        for token in tokens {
            match token {
                Token::E => {
                    let (key, tail) = rest.split_at(D::DH_LEN);
                    let key = key.to_vec();
                    rest = tail;
                    self.symm_state.mix_hash(&key);
                    if self.is_psk {
                        self.symm_state.mix_key(&key);
                    }
                    self.remote_ephemeral = Some(key);
                }
                Token::S => {
                    let has_key = self.symm_state.has_key();
                    let len = D::DH_LEN + if has_key { TAG_LEN } else { 0 };
                    let (sealed, tail) = rest.split_at(len);
                    rest = tail;
                    let mut key = BytesMut::with_capacity(D::DH_LEN);
                    self.symm_state.decrypt_and_hash(&sealed, &mut key)?;
                    self.remote_static = Some(key.to_vec());
                }
                Token::Psk => self.mix_psk()?,
                dh => self.mix_dh(*dh)?,
            }
        }
        self.symm_state.decrypt_and_hash(&rest, out)?;
        Ok(())
    }

    fn finish(&mut self, len: usize) -> Result<HandshakeOutput<C>> {
        tracing::trace!(
            protocol = %self.protocol_name,
            message = self.messages_started,
            len,
            "handshake message processed"
        );
        if !self.message_patterns.is_empty() {
            return Ok(HandshakeOutput {
                len,
                handshake_hash: None,
                transport: None,
            });
        }

        self.status = Status::Completed;
        self.local_ephemeral = None;
        self.remote_ephemeral = None;
        let (c1, c2) = self.symm_state.split();
        let transport = TransportPair::new(self.role == self.first_sender, c1, c2, self.is_one_way);
        tracing::debug!(protocol = %self.protocol_name, role = ?self.role, "handshake complete");
        Ok(HandshakeOutput {
            len,
            handshake_hash: Some(self.symm_state.handshake_hash().to_vec()),
            transport: Some(transport),
        })
    }

    /// Restarts the handshake as `protocol`, which must carry the `fallback` modifier, after
    /// exactly one message has been sent or attempted. The first message's ephemeral key
    /// becomes the new pattern's pre-message and the remaining messages start with Bob.
    ///
    /// `config.prologue`, `config.local_static` and `config.preshared_keys` replace the old
    /// values. A remote static key the new pattern needs up front is taken from
    /// `config.remote_static`, or else from what the first message revealed. `config.initiator`
    /// is ignored: both sides keep their roles.
    pub fn fallback(
        &mut self,
        protocol: &Protocol<C, D, H>,
        config: &ProtocolConfig,
    ) -> Result<()> {
        if !protocol.modifiers().contains(PatternModifiers::FALLBACK) {
            return Err(Error::InvalidFallback(
                "target protocol lacks the fallback modifier",
            ));
        }
        if self.fell_back {
            return Err(Error::InvalidFallback("handshake already fell back"));
        }
        if self.status == Status::Completed {
            return Err(Error::HandshakeComplete);
        }
        if self.messages_started != 1 {
            return Err(Error::InvalidFallback(
                "fallback must follow exactly one handshake message",
            ));
        }

        let resolved = protocol.resolved();
        let role = self.role;
        let name = protocol.name();
        let pattern = protocol.pattern().name();

        let psks = take_psks(protocol.psk_count(), &config.preshared_keys)?;
        let local_static = local_static_for::<D>(
            resolved,
            role,
            pattern,
            config.local_static.as_ref().map(|k| k.as_slice()),
        )?;
        let remote_candidate = match config.remote_static.as_deref() {
            Some(key) => Some(key),
            None if resolved.requires_remote_static(role) => self.remote_static.as_deref(),
            None => None,
        };
        let remote_static = remote_static_for::<D>(resolved, role, pattern, remote_candidate)?;

        let alice_ephemeral = match role {
            Role::Initiator => self.local_ephemeral.is_some(),
            Role::Responder => self.remote_ephemeral.is_some(),
        };
        if resolved.initiator_pre.contains(&Token::E) && !alice_ephemeral {
            return Err(Error::InvalidFallback(
                "the first message carried no ephemeral key",
            ));
        }

        self.symm_state = SymmState::init(name.as_bytes());
        self.symm_state.mix_hash(&config.prologue);
        self.protocol_name = name.to_owned();
        self.local_static = local_static;
        self.remote_static = remote_static;
        self.psks = psks;
        self.message_patterns = resolved.messages.iter().cloned().collect();
        self.first_sender = resolved.first_sender();
        self.messages_started = 0;
        self.is_psk = resolved.is_psk;
        self.is_one_way = false;
        self.fell_back = true;
        self.status = Status::Handshaking;
        self.mix_pre_messages(resolved)?;

        tracing::debug!(protocol = %self.protocol_name, role = ?role, "handshake fell back");
        Ok(())
    }
}

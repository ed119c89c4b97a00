//! Handshake patterns and modifiers.
//!
//! Every pattern is stored in its Alice-initiated form. DH tokens name keys by party: the first
//! letter is Alice's key, the second Bob's, so `es` is always Alice's ephemeral with Bob's static.
//! Alice is the [`Role::Initiator`] of the unmodified pattern and keeps that role through a
//! fallback, where Bob sends first.
use std::{fmt, ops};

use crate::{
    error::{Error, Result},
    primitives::TAG_LEN,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    E,
    S,
    EE,
    ES,
    SE,
    SS,
    Psk,
}

use Token::{Psk, E, EE, ES, S, SE, SS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Alice.
    Initiator,
    /// Bob.
    Responder,
}

impl Role {
    pub fn peer(self) -> Self {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    fn alternate(first: Role, index: usize) -> Self {
        if index % 2 == 0 {
            first
        } else {
            first.peer()
        }
    }
}

/// A handshake pattern: pre-messages plus the scripted messages, Alice first.
///
/// Fundamental patterns key:
/// # First character
/// N: **N**o static key for initiator
/// K: Static key for initiator **K**nown to responder
/// X: Static key for initiator **X**mitted to responder
/// I: Static key for initiator **I**mmediately transmitted to responder, despite reduced or absent
/// ID hiding
///
/// # Second character
/// N: **N**o static key for responder
/// K: Static key for responder **K**nown to initiator
/// X: Static key for responder **X**mitted to initiator
///
/// A `1` after a character defers the corresponding DH to a later message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandshakePattern {
    name: &'static str,
    initiator_pre: &'static [Token],
    responder_pre: &'static [Token],
    messages: &'static [&'static [Token]],
}

macro_rules! patterns {
    (
        $(
            $(#[$doc:meta])*
            $id:ident: [$($ipre:expr),*], [$($rpre:expr),*], [$([$($tok:expr),*]),+];
        )+
    ) => {
        impl HandshakePattern {
            $(
                $(#[$doc])*
                pub const $id: Self = Self {
                    name: stringify!($id),
                    initiator_pre: &[$($ipre),*],
                    responder_pre: &[$($rpre),*],
                    messages: &[$(&[$($tok),*]),+],
                };
            )+

            /// Every pattern, one-way patterns first.
            pub const ALL: &'static [Self] = &[$(Self::$id),+];
        }
    };
}

patterns! {
    N: [], [S], [[E, ES]];
    K: [S], [S], [[E, ES, SS]];
    X: [], [S], [[E, ES, S, SS]];

    NN: [], [], [[E], [E, EE]];
    NK: [], [S], [[E, ES], [E, EE]];
    NX: [], [], [[E], [E, EE, S, ES]];
    KN: [S], [], [[E], [E, EE, SE]];
    KK: [S], [S], [[E, ES, SS], [E, EE, SE]];
    KX: [S], [], [[E], [E, EE, SE, S, ES]];
    XN: [], [], [[E], [E, EE], [S, SE]];
    XK: [], [S], [[E, ES], [E, EE], [S, SE]];
    XX: [], [], [[E], [E, EE, S, ES], [S, SE]];
    IN: [], [], [[E, S], [E, EE, SE]];
    IK: [], [S], [[E, ES, S, SS], [E, EE, SE]];
    IX: [], [], [[E, S], [E, EE, SE, S, ES]];

    NK1: [], [S], [[E], [E, EE, ES]];
    NX1: [], [], [[E], [E, EE, S], [ES]];
    X1N: [], [], [[E], [E, EE], [S], [SE]];
    X1K: [], [S], [[E, ES], [E, EE], [S], [SE]];
    XK1: [], [S], [[E], [E, EE, ES], [S, SE]];
    X1K1: [], [S], [[E], [E, EE, ES], [S], [SE]];
    X1X: [], [], [[E], [E, EE, S, ES], [S], [SE]];
    XX1: [], [], [[E], [E, EE, S], [ES, S, SE]];
    X1X1: [], [], [[E], [E, EE, S], [ES, S], [SE]];
    K1N: [S], [], [[E], [E, EE], [SE]];
    K1K: [S], [S], [[E, ES], [E, EE], [SE]];
    KK1: [S], [S], [[E], [E, EE, SE, ES]];
    K1K1: [S], [S], [[E], [E, EE, ES], [SE]];
    K1X: [S], [], [[E], [E, EE, S, ES], [SE]];
    KX1: [S], [], [[E], [E, EE, SE, S], [ES]];
    K1X1: [S], [], [[E], [E, EE, S], [SE, ES]];
    I1N: [], [], [[E, S], [E, EE], [SE]];
    I1K: [], [S], [[E, ES, S], [E, EE], [SE]];
    IK1: [], [S], [[E, S], [E, EE, SE, ES]];
    I1K1: [], [S], [[E, S], [E, EE, ES], [SE]];
    I1X: [], [], [[E, S], [E, EE, S, ES], [SE]];
    IX1: [], [], [[E, S], [E, EE, SE, S], [ES]];
    I1X1: [], [], [[E, S], [E, EE, S], [SE, ES]];
}

impl HandshakePattern {
    /// Looks a pattern up by its bare name (`"XX"`, `"IK1"`), without modifiers.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name == name)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn initiator_pre_message(&self) -> &'static [Token] {
        self.initiator_pre
    }

    pub fn responder_pre_message(&self) -> &'static [Token] {
        self.responder_pre
    }

    pub fn messages(&self) -> &'static [&'static [Token]] {
        self.messages
    }

    /// One-way patterns have a single message and only protect traffic from Alice to Bob.
    pub fn is_one_way(&self) -> bool {
        self.messages.len() == 1
    }
}

impl fmt::Display for HandshakePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Set of pattern modifiers. Names render in the fixed order `fallback`, `psk0` .. `psk3`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PatternModifiers(u8);

impl PatternModifiers {
    pub const NONE: Self = Self(0);
    pub const FALLBACK: Self = Self(1);
    pub const PSK0: Self = Self(1 << 1);
    pub const PSK1: Self = Self(1 << 2);
    pub const PSK2: Self = Self(1 << 3);
    pub const PSK3: Self = Self(1 << 4);

    const NAMED: [(Self, &'static str); 5] = [
        (Self::FALLBACK, "fallback"),
        (Self::PSK0, "psk0"),
        (Self::PSK1, "psk1"),
        (Self::PSK2, "psk2"),
        (Self::PSK3, "psk3"),
    ];

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Positions of the psk modifiers present, ascending.
    pub fn psk_positions(self) -> impl Iterator<Item = usize> {
        [Self::PSK0, Self::PSK1, Self::PSK2, Self::PSK3]
            .into_iter()
            .enumerate()
            .filter(move |(_, m)| self.contains(*m))
            .map(|(i, _)| i)
    }

    pub fn psk_count(self) -> usize {
        self.psk_positions().count()
    }

    pub fn is_psk(self) -> bool {
        self.psk_count() > 0
    }

    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// The `+`-joined name, empty when no modifier is set.
    pub fn name(self) -> String {
        Self::NAMED
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, n)| *n)
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl ops::BitOr for PatternModifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for PatternModifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PatternModifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// One message of a resolved pattern and who sends it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MessagePattern {
    pub(crate) sender: Role,
    pub(crate) tokens: Vec<Token>,
}

impl MessagePattern {
    /// Minimum wire length of this message for an empty payload, given whether the symmetric
    /// state is keyed when the message starts.
    pub(crate) fn overhead(&self, dh_len: usize, mut has_key: bool, is_psk: bool) -> usize {
        let mut len = 0;
        for token in &self.tokens {
            match token {
                E => {
                    len += dh_len;
                    has_key |= is_psk;
                }
                S => len += dh_len + if has_key { TAG_LEN } else { 0 },
                EE | ES | SE | SS | Psk => has_key = true,
            }
        }
        len + if has_key { TAG_LEN } else { 0 }
    }
}

/// A pattern with its modifiers applied: the token script both sides run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedPattern {
    pub(crate) initiator_pre: Vec<Token>,
    pub(crate) responder_pre: Vec<Token>,
    pub(crate) messages: Vec<MessagePattern>,
    pub(crate) is_psk: bool,
    pub(crate) is_one_way: bool,
}

impl ResolvedPattern {
    /// Applies `fallback` first, then the psk modifiers against the resulting message list.
    pub(crate) fn resolve(pattern: HandshakePattern, modifiers: PatternModifiers) -> Result<Self> {
        let invalid = || Error::InvalidModifiers {
            pattern: pattern.name,
            modifiers: modifiers.name(),
        };

        let mut initiator_pre = pattern.initiator_pre.to_vec();
        let mut scripted: &[&[Token]] = pattern.messages;
        let mut first_sender = Role::Initiator;

        if modifiers.contains(PatternModifiers::FALLBACK) {
            let (first, rest) = scripted.split_first().ok_or_else(invalid)?;
            if pattern.is_one_way() {
                return Err(invalid());
            }
            initiator_pre.extend_from_slice(first);
            if !matches!(initiator_pre.as_slice(), [E] | [S] | [E, S]) {
                return Err(invalid());
            }
            scripted = rest;
            first_sender = Role::Responder;
        }

        let mut messages: Vec<MessagePattern> = scripted
            .iter()
            .enumerate()
            .map(|(i, tokens)| MessagePattern {
                sender: Role::alternate(first_sender, i),
                tokens: tokens.to_vec(),
            })
            .collect();

        for position in modifiers.psk_positions() {
            if position == 0 {
                messages
                    .first_mut()
                    .ok_or_else(invalid)?
                    .tokens
                    .insert(0, Psk);
            } else {
                messages
                    .get_mut(position - 1)
                    .ok_or_else(invalid)?
                    .tokens
                    .push(Psk);
            }
        }

        Ok(Self {
            initiator_pre,
            responder_pre: pattern.responder_pre.to_vec(),
            messages,
            is_psk: modifiers.is_psk(),
            is_one_way: pattern.is_one_way(),
        })
    }

    pub(crate) fn pre_message(&self, role: Role) -> &[Token] {
        match role {
            Role::Initiator => &self.initiator_pre,
            Role::Responder => &self.responder_pre,
        }
    }

    /// `role` needs its own static key pair when it declared one in a pre-message or sends one.
    pub(crate) fn requires_local_static(&self, role: Role) -> bool {
        self.pre_message(role).contains(&S)
            || self
                .messages
                .iter()
                .any(|m| m.sender == role && m.tokens.contains(&S))
    }

    /// `role` must be given the peer's static key up front when the peer's pre-message has one.
    pub(crate) fn requires_remote_static(&self, role: Role) -> bool {
        self.pre_message(role.peer()).contains(&S)
    }

    /// Who sends the first message, and so encrypts with the first transport key.
    pub(crate) fn first_sender(&self) -> Role {
        self.messages.first().map_or(Role::Initiator, |m| m.sender)
    }
}

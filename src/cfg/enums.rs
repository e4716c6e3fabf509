// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// The WSP "Protocol Options" capability (identifier 0x02): a bitfield
    /// the server advertises to declare which optional session-layer
    /// features it supports. The negotiator never lets a client *enable* a
    /// bit the server lacks; it simply overrides whatever the client sent
    /// with this set (`spec.md` §4.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProtocolOptions: u8 {
        /// Confirmed push facility. Out of scope for this core (see
        /// Non-goals); kept so the bit has a name when logged.
        const CONFIRMED_PUSH   = 0b0000_0001;
        /// Push facility.
        const PUSH             = 0b0000_0010;
        /// Session resume.
        const SESSION_RESUME   = 0b0000_0100;
        /// Acknowledgement headers.
        const ACKNOWLEDGEMENT_HEADERS = 0b0000_1000;
    }
}

impl ProtocolOptions {
    pub fn from_u8(raw: u8) -> Self {
        // `from_bits_truncate` drops unrecognized bits rather than erroring,
        // matching the "unknown → logged and ignored" policy used for
        // capability identifiers generally.
        Self::from_bits_truncate(raw)
    }

    pub fn to_u8(self) -> u8 {
        self.bits()
    }
}

// Interop with serde: stored on the wire/in config as a plain `u8`.
impl Serialize for ProtocolOptions {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(self.to_u8())
    }
}

impl<'de> Deserialize<'de> for ProtocolOptions {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(d)?;
        Ok(ProtocolOptions::from_u8(raw))
    }
}

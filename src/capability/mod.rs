// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The capability negotiator (C3, `spec.md` §4.3): parses a Connect PDU's
//! capability block as a sequence of `(length, identifier, payload)`
//! triples and applies a clamp-then-accept policy against the server's
//! configured ceilings.

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::{cfg::config::ServerConfig, cfg::enums::ProtocolOptions, error::CapabilityError, octet::Cursor};

bitflags! {
    /// Tracks which capability fields a session has actually negotiated.
    /// Mirrors `set_caps` from `spec.md` §3: once a bit is set it is never
    /// cleared, and a repeated occurrence of the same identifier in one
    /// Connect block is a no-op.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SetCaps: u8 {
        const CLIENT_SDU       = 0b0000_0001;
        const SERVER_SDU       = 0b0000_0010;
        const PROTOCOL_OPTIONS = 0b0000_0100;
        const MOR_METHOD       = 0b0000_1000;
        const MOR_PUSH         = 0b0001_0000;
    }
}

/// The negotiated capability set for one session (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    pub client_sdu_size: u32,
    pub server_sdu_size: u32,
    pub protocol_options: ProtocolOptions,
    pub mor_method: u8,
    pub mor_push: u8,
    pub set_caps: SetCaps,
}

impl CapabilitySet {
    /// The defaults `spec.md` §3 names before any negotiation happens.
    pub fn defaults() -> Self {
        Self {
            client_sdu_size: 1400,
            server_sdu_size: 1400,
            protocol_options: ProtocolOptions::empty(),
            mor_method: 1,
            mor_push: 1,
            set_caps: SetCaps::empty(),
        }
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::defaults()
    }
}

const CAP_CLIENT_SDU: u8 = 0x00;
const CAP_SERVER_SDU: u8 = 0x01;
const CAP_PROTOCOL_OPTIONS: u8 = 0x02;
const CAP_MOR_METHOD: u8 = 0x03;
const CAP_MOR_PUSH: u8 = 0x04;
const CAP_EXTENDED_METHODS: u8 = 0x05;
const CAP_HEADER_CODE_PAGES: u8 = 0x06;
const CAP_ALIASES: u8 = 0x07;

/// Motorola Timeport / phone.com interop quirk (`spec.md` §4.3, §8): a
/// client SDU size of exactly 3 means 1350, not 3.
const CLIENT_SDU_QUIRK_VALUE: u64 = 3;
const CLIENT_SDU_QUIRK_REWRITE: u32 = 1350;

/// Parses `caps` as a sequence of `(length, identifier, payload)` triples
/// and clamps each recognized capability into `caps_out` against `cfg`'s
/// ceilings. Capabilities already present in `caps_out.set_caps` are
/// skipped (negotiable at most once per session). Protocol options are
/// always overridden to the server's supported set the first time the
/// identifier is seen, regardless of what the client sent.
///
/// Unlike the codec's `PduCodecError`-returning functions, a malformed
/// individual triple does not abort the whole block: every other capability
/// example in this corpus (and `spec.md` §7 item 5, "capability clamp ...
/// never fatal") treats bad input as something to log and skip, not a
/// reason to fail the Connect. A block that's truncated at the outermost
/// framing level — not enough bytes even for one more triple — stops the
/// scan and returns what was negotiated so far.
pub fn negotiate(caps: &[u8], cfg: &ServerConfig, caps_out: &mut CapabilitySet) {
    let mut c = Cursor::new(caps);
    while !c.is_empty() {
        let length = match c.read_uintvar() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "truncated capability length, stopping scan");
                return;
            },
        };
        if length == 0 {
            warn!("zero-length capability triple, stopping scan");
            return;
        }
        let before_identifier = c.remaining();
        let identifier = match c.read_u8() {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "truncated capability identifier, stopping scan");
                return;
            },
        };
        let payload_len = (length as usize).saturating_sub(1);
        if length as usize > before_identifier {
            warn!(length, available = before_identifier, "capability length exceeds remaining buffer, stopping scan");
            return;
        }
        let payload = match c.read_octets(payload_len) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, identifier, "truncated capability payload, stopping scan");
                return;
            },
        };

        apply(identifier, payload, cfg, caps_out);
    }
}

fn apply(identifier: u8, payload: &[u8], cfg: &ServerConfig, out: &mut CapabilitySet) {
    match identifier {
        CAP_CLIENT_SDU => {
            if out.set_caps.contains(SetCaps::CLIENT_SDU) {
                return;
            }
            let Some(value) = read_cap_uintvar(payload) else {
                return;
            };
            let value = if value == CLIENT_SDU_QUIRK_VALUE {
                CLIENT_SDU_QUIRK_REWRITE
            } else {
                value as u32
            };
            if value <= cfg.max_client_sdu_size {
                out.client_sdu_size = value;
                out.set_caps.insert(SetCaps::CLIENT_SDU);
            } else {
                debug!(value, ceiling = cfg.max_client_sdu_size, "client SDU size exceeds ceiling, ignored");
            }
        },
        CAP_SERVER_SDU => {
            if out.set_caps.contains(SetCaps::SERVER_SDU) {
                return;
            }
            let Some(value) = read_cap_uintvar(payload) else {
                return;
            };
            if value as u32 <= cfg.max_server_sdu_size {
                out.server_sdu_size = value as u32;
                out.set_caps.insert(SetCaps::SERVER_SDU);
            } else {
                debug!(value, ceiling = cfg.max_server_sdu_size, "server SDU size exceeds ceiling, ignored");
            }
        },
        CAP_PROTOCOL_OPTIONS => {
            if out.set_caps.contains(SetCaps::PROTOCOL_OPTIONS) {
                return;
            }
            // Always overridden: whatever the client proposed is irrelevant.
            out.protocol_options = cfg.supported_protocol_options;
            out.set_caps.insert(SetCaps::PROTOCOL_OPTIONS);
        },
        CAP_MOR_METHOD => {
            if out.set_caps.contains(SetCaps::MOR_METHOD) {
                return;
            }
            if let Some(&raw) = payload.first() {
                out.mor_method = raw.min(cfg.max_mor_method);
                out.set_caps.insert(SetCaps::MOR_METHOD);
            }
        },
        CAP_MOR_PUSH => {
            if out.set_caps.contains(SetCaps::MOR_PUSH) {
                return;
            }
            if let Some(&raw) = payload.first() {
                out.mor_push = raw.min(cfg.max_mor_push);
                out.set_caps.insert(SetCaps::MOR_PUSH);
            }
        },
        CAP_EXTENDED_METHODS | CAP_HEADER_CODE_PAGES | CAP_ALIASES => {
            debug!(identifier, "capability parsed and ignored (out of scope)");
        },
        other => {
            debug!(identifier = other, "unknown capability identifier, skipped");
        },
    }
}

fn read_cap_uintvar(payload: &[u8]) -> Option<u64> {
    let mut c = Cursor::new(payload);
    match c.read_uintvar() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, "malformed uintvar capability payload, skipped");
            None
        },
    }
}

/// Serializes only the capabilities recorded in `caps.set_caps`, for
/// inclusion in a ConnectReply (`spec.md` §4.2, §4.3: "only accepted caps
/// are echoed").
///
/// Both the negotiated `client_sdu_size` and `server_sdu_size` are tagged
/// with `CAP_SERVER_SDU` on the wire, never `CAP_CLIENT_SDU` — this
/// reproduces `make_connectreply_pdu`'s `WSP_CSDU_SET` branch
/// (`examples/original_source/gw/wsp.c`), which emits
/// `WSP_CAPS_SERVER_SDU_SIZE` for both fields. `spec.md` §8 Scenario 2
/// requires the client's SDU size to come back tagged this way, so the
/// mistagging is preserved rather than "fixed".
pub fn encode_negotiated(caps: &CapabilitySet) -> Vec<u8> {
    use crate::octet::Encoder;

    let mut out = Encoder::new();

    if caps.set_caps.contains(SetCaps::CLIENT_SDU) {
        encode_triple(&mut out, CAP_SERVER_SDU, |e| {
            e.write_uintvar(u64::from(caps.client_sdu_size))
        });
    }
    if caps.set_caps.contains(SetCaps::SERVER_SDU) {
        encode_triple(&mut out, CAP_SERVER_SDU, |e| {
            e.write_uintvar(u64::from(caps.server_sdu_size))
        });
    }
    if caps.set_caps.contains(SetCaps::PROTOCOL_OPTIONS) {
        encode_triple(&mut out, CAP_PROTOCOL_OPTIONS, |e| {
            e.write_u8(caps.protocol_options.to_u8())
        });
    }
    if caps.set_caps.contains(SetCaps::MOR_METHOD) {
        encode_triple(&mut out, CAP_MOR_METHOD, |e| e.write_u8(caps.mor_method));
    }
    if caps.set_caps.contains(SetCaps::MOR_PUSH) {
        encode_triple(&mut out, CAP_MOR_PUSH, |e| e.write_u8(caps.mor_push));
    }

    out.into_bytes()
}

fn encode_triple(out: &mut crate::octet::Encoder, identifier: u8, write_payload: impl FnOnce(&mut crate::octet::Encoder)) {
    let mut payload = crate::octet::Encoder::new();
    write_payload(&mut payload);
    let payload = payload.into_bytes();
    out.write_uintvar((payload.len() + 1) as u64);
    out.write_u8(identifier);
    out.append_octets(&payload);
}

/// Decodes a standalone capability triple's leading length+identifier,
/// surfacing [`CapabilityError`] instead of silently stopping — used by
/// tests and by callers that want strict validation of a single triple
/// rather than the lenient whole-block scan `negotiate` performs.
pub fn read_triple_header(bytes: &[u8]) -> Result<(u64, u8), CapabilityError> {
    let mut c = Cursor::new(bytes);
    let length = c.read_uintvar()?;
    if length == 0 {
        return Err(CapabilityError::ShortTriple { length });
    }
    let identifier = c.read_u8()?;
    Ok((length, identifier))
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire layouts for the PDUs this core speaks (`spec.md` §4.2). Every
//! `decode_*` function borrows from its input via [`Cursor`] and only
//! copies the slices it needs to hand back (url, headers, body, caps);
//! every `encode_*` function appends to a fresh [`Encoder`].

use crate::{
    error::PduCodecError,
    octet::{Cursor, Encoder},
    wsp::opcode::PduType,
};

/// A decoded **Connect** PDU (`spec.md` §4.2): `type(0x01) · version ·
/// caps_len · hdrs_len · caps · headers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPdu {
    pub version: u8,
    pub caps: Vec<u8>,
    pub headers: Vec<u8>,
}

fn malformed(pdu: &'static str) -> impl Fn(crate::error::OctetCodecError) -> PduCodecError {
    move |source| PduCodecError::Malformed { pdu, source }
}

pub fn decode_connect(bytes: &[u8]) -> Result<ConnectPdu, PduCodecError> {
    let mut c = Cursor::new(bytes);
    let ty = c.read_u8().map_err(malformed("Connect"))?;
    if PduType::from_u8(ty) != Some(PduType::Connect) {
        return Err(PduCodecError::UnknownType(ty));
    }
    let version = c.read_u8().map_err(malformed("Connect"))?;
    let caps_len = c.read_uintvar().map_err(malformed("Connect"))?;
    let hdrs_len = c.read_uintvar().map_err(malformed("Connect"))?;

    if caps_len as usize > c.remaining() {
        return Err(PduCodecError::LengthOverflow {
            pdu: "Connect",
            field: "caps_len",
            value: caps_len,
            remaining: c.remaining(),
        });
    }
    let caps = c
        .read_octets(caps_len as usize)
        .map_err(malformed("Connect"))?
        .to_vec();

    if hdrs_len as usize > c.remaining() {
        return Err(PduCodecError::LengthOverflow {
            pdu: "Connect",
            field: "hdrs_len",
            value: hdrs_len,
            remaining: c.remaining(),
        });
    }
    let headers = c
        .read_octets(hdrs_len as usize)
        .map_err(malformed("Connect"))?
        .to_vec();

    Ok(ConnectPdu {
        version,
        caps,
        headers,
    })
}

/// Emits a Connect PDU. The core never sends Connect (it only receives
/// one), but this is required for the `encode(decode(P)) = P` round-trip
/// law in `spec.md` §8 and is handy for tests that simulate a WTP peer.
pub fn encode_connect(pdu: &ConnectPdu) -> Vec<u8> {
    let mut e = Encoder::new();
    e.write_u8(PduType::Connect.to_u8().expect("Connect has a wire value"));
    e.write_u8(pdu.version);
    e.write_uintvar(pdu.caps.len() as u64);
    e.write_uintvar(pdu.headers.len() as u64);
    e.append_octets(&pdu.caps);
    e.append_octets(&pdu.headers);
    e.into_bytes()
}

/// A **ConnectReply** PDU ready to emit: `type(0x02) · session_id · caps_len
/// · headers_len · caps · headers`. Caps are omitted entirely (length 0)
/// when the session negotiated none (`spec.md` §4.2).
pub fn encode_connect_reply(session_id: u64, caps: Option<&[u8]>, headers: &[u8]) -> Vec<u8> {
    let caps = caps.unwrap_or(&[]);
    let mut e = Encoder::new();
    e.write_u8(
        PduType::ConnectReply
            .to_u8()
            .expect("ConnectReply has a wire value"),
    );
    e.write_uintvar(session_id);
    e.write_uintvar(caps.len() as u64);
    e.write_uintvar(headers.len() as u64);
    e.append_octets(caps);
    e.append_octets(headers);
    e.into_bytes()
}

/// A decoded **Get** PDU: `type(0x40) · url_len · url · [headers]`. Trailing
/// headers are optional; `headers` is `None` when absent, not an empty
/// `Some(vec![])` — the distinction matters because `spec.md` §8 requires a
/// Get with no trailing headers to yield "a null header list, not an
/// error."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPdu {
    pub url: Vec<u8>,
    pub headers: Option<Vec<u8>>,
}

pub fn decode_get(bytes: &[u8]) -> Result<GetPdu, PduCodecError> {
    let mut c = Cursor::new(bytes);
    let ty = c.read_u8().map_err(malformed("Get"))?;
    if PduType::from_u8(ty) != Some(PduType::Get) {
        return Err(PduCodecError::UnknownType(ty));
    }
    let url_len = c.read_uintvar().map_err(malformed("Get"))?;
    if url_len as usize > c.remaining() {
        return Err(PduCodecError::LengthOverflow {
            pdu: "Get",
            field: "url_len",
            value: url_len,
            remaining: c.remaining(),
        });
    }
    let url = c
        .read_octets(url_len as usize)
        .map_err(malformed("Get"))?
        .to_vec();

    let headers = if c.is_empty() {
        None
    } else {
        Some(c.rest().to_vec())
    };

    Ok(GetPdu { url, headers })
}

/// A decoded **Post** PDU: `type(0x60) · url_len · param_len · url ·
/// headers(param_len) · body(remaining)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPdu {
    pub url: Vec<u8>,
    pub headers: Vec<u8>,
    pub body: Vec<u8>,
}

impl PostPdu {
    /// Concatenates `url`, `?`, and `body` into a single request URL,
    /// discarding the header block. This is the source's behavior,
    /// preserved for wire compatibility — `spec.md` §9 flags it as a known
    /// defect (loses content-type, user agent, any body that isn't
    /// form-encoded); do not "fix" it here without also changing how the
    /// HTTP collaborator is invoked.
    pub fn request_url(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.url.len() + 1 + self.body.len());
        out.extend_from_slice(&self.url);
        out.push(b'?');
        out.extend_from_slice(&self.body);
        out
    }
}

pub fn decode_post(bytes: &[u8]) -> Result<PostPdu, PduCodecError> {
    let mut c = Cursor::new(bytes);
    let ty = c.read_u8().map_err(malformed("Post"))?;
    if PduType::from_u8(ty) != Some(PduType::Post) {
        return Err(PduCodecError::UnknownType(ty));
    }
    let url_len = c.read_uintvar().map_err(malformed("Post"))?;
    let param_len = c.read_uintvar().map_err(malformed("Post"))?;

    if url_len as usize > c.remaining() {
        return Err(PduCodecError::LengthOverflow {
            pdu: "Post",
            field: "url_len",
            value: url_len,
            remaining: c.remaining(),
        });
    }
    let url = c
        .read_octets(url_len as usize)
        .map_err(malformed("Post"))?
        .to_vec();

    if param_len as usize > c.remaining() {
        return Err(PduCodecError::LengthOverflow {
            pdu: "Post",
            field: "param_len",
            value: param_len,
            remaining: c.remaining(),
        });
    }
    let headers = c
        .read_octets(param_len as usize)
        .map_err(malformed("Post"))?
        .to_vec();

    let body = c.rest().to_vec();

    Ok(PostPdu { url, headers, body })
}

/// Emits a **Reply** PDU: `type(0x04) · status · content_type_len(=1) ·
/// content_type(short-form, high bit set) · body`.
pub fn encode_reply(status: u8, content_type_short_form: u8, body: &[u8]) -> Vec<u8> {
    let mut e = Encoder::new();
    e.write_u8(PduType::Reply.to_u8().expect("Reply has a wire value"));
    e.write_u8(status);
    e.write_uintvar(1);
    e.write_u8(content_type_short_form | 0x80);
    e.append_octets(body);
    e.into_bytes()
}

/// A decoded **Disconnect** PDU: `type(0x05) · hdrs_len · headers`. WAP-230
/// says Disconnect carries only the type octet plus an optional
/// connection-id header block; `hdrs_len = 0` is the overwhelmingly common
/// case for a server-initiated teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectPdu {
    pub headers: Vec<u8>,
}

pub fn decode_disconnect(bytes: &[u8]) -> Result<DisconnectPdu, PduCodecError> {
    let mut c = Cursor::new(bytes);
    let ty = c.read_u8().map_err(malformed("Disconnect"))?;
    if PduType::from_u8(ty) != Some(PduType::Disconnect) {
        return Err(PduCodecError::UnknownType(ty));
    }
    let hdrs_len = c.read_uintvar().unwrap_or(0);
    let headers = if hdrs_len == 0 {
        Vec::new()
    } else {
        if hdrs_len as usize > c.remaining() {
            return Err(PduCodecError::LengthOverflow {
                pdu: "Disconnect",
                field: "hdrs_len",
                value: hdrs_len,
                remaining: c.remaining(),
            });
        }
        c.read_octets(hdrs_len as usize)
            .map_err(malformed("Disconnect"))?
            .to_vec()
    };
    Ok(DisconnectPdu { headers })
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The WSP PDU type octet.
//!
//! Unlike the iSCSI BHS opcode byte this crate's teacher decodes (6-bit
//! opcode plus an Immediate flag packed into one octet), a WSP PDU type is
//! the *entire* first octet of a connection-oriented PDU (or the second
//! octet of a connectionless one — `spec.md` §4.2). There is no flag bit to
//! split out, so [`PduType`] is a plain closed enum rather than a
//! `flags + opcode` pair.

use crate::octet::Cursor;

/// All PDU types defined by `spec.md` §3. `Bad` is not a wire value; it's
/// the sentinel `deduce_pdu_type` returns for empty input or an
/// unrecognized type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduType {
    Bad,
    Connect,
    ConnectReply,
    Redirect,
    Reply,
    Disconnect,
    Push,
    ConfirmedPush,
    Suspend,
    Resume,
    Get,
    Options,
    Head,
    Delete,
    Trace,
    Post,
    Put,
}

impl PduType {
    /// Maps a raw wire type octet to a [`PduType`]. Returns `None` for
    /// unrecognized values so callers can distinguish "empty buffer" from
    /// "unknown type" if they want to (`deduce_pdu_type` collapses both to
    /// `Bad`).
    pub fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => PduType::Connect,
            0x02 => PduType::ConnectReply,
            0x03 => PduType::Redirect,
            0x04 => PduType::Reply,
            0x05 => PduType::Disconnect,
            0x06 => PduType::Push,
            0x07 => PduType::ConfirmedPush,
            0x08 => PduType::Suspend,
            0x09 => PduType::Resume,
            0x40 => PduType::Get,
            0x41 => PduType::Options,
            0x42 => PduType::Head,
            0x43 => PduType::Delete,
            0x44 => PduType::Trace,
            0x60 => PduType::Post,
            0x61 => PduType::Put,
            _ => return None,
        })
    }

    pub fn to_u8(self) -> Option<u8> {
        Some(match self {
            PduType::Bad => return None,
            PduType::Connect => 0x01,
            PduType::ConnectReply => 0x02,
            PduType::Redirect => 0x03,
            PduType::Reply => 0x04,
            PduType::Disconnect => 0x05,
            PduType::Push => 0x06,
            PduType::ConfirmedPush => 0x07,
            PduType::Suspend => 0x08,
            PduType::Resume => 0x09,
            PduType::Get => 0x40,
            PduType::Options => 0x41,
            PduType::Head => 0x42,
            PduType::Delete => 0x43,
            PduType::Trace => 0x44,
            PduType::Post => 0x60,
            PduType::Put => 0x61,
        })
    }
}

/// Reads the type octet at offset 0 (connection-oriented) or offset 1
/// (connectionless), returning `Bad` on empty input or an unrecognized
/// byte. This is the only piece of connectionless-WSP handling this core
/// implements — see `spec.md` Non-goals.
pub fn deduce_pdu_type(bytes: &[u8], connectionless: bool) -> PduType {
    let offset = if connectionless { 1 } else { 0 };
    let mut c = Cursor::with_offset(bytes, offset);
    match c.read_u8() {
        Ok(b) => PduType::from_u8(b).unwrap_or(PduType::Bad),
        Err(_) => PduType::Bad,
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Leaf error types for each codec component.
//!
//! These are intentionally narrow: they carry just enough context (offset,
//! expected length, the offending byte) to be logged or mapped to a WSP
//! status without the caller re-parsing anything. Component glue code
//! collects these with `anyhow::Context` the same way the rest of the crate
//! does; nothing here is meant to cross the public API unwrapped.

use thiserror::Error;

/// Errors from the octet-level codec (C1).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum OctetCodecError {
    #[error("truncated buffer: need byte at offset {offset}, len is {len}")]
    Truncated { offset: usize, len: usize },

    #[error("uintvar exceeds maximum length of 5 bytes starting at offset {offset}")]
    UintvarTooLong { offset: usize },

    #[error(
        "truncated buffer: need {n} octets at offset {offset}, only {available} \
         available"
    )]
    TruncatedOctets {
        offset: usize,
        n: usize,
        available: usize,
    },
}

/// Errors from the PDU codec (C2).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PduCodecError {
    #[error("empty PDU")]
    Empty,

    #[error("unknown PDU type byte 0x{0:02x}")]
    UnknownType(u8),

    #[error("malformed {pdu}: {source}")]
    Malformed {
        pdu: &'static str,
        source: OctetCodecError,
    },

    #[error("{pdu}: length field {field} = {value} exceeds remaining buffer ({remaining})")]
    LengthOverflow {
        pdu: &'static str,
        field: &'static str,
        value: u64,
        remaining: usize,
    },
}

/// Errors from the capability negotiator (C3).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CapabilityError {
    #[error("truncated capability block: {0}")]
    Truncated(OctetCodecError),

    #[error("capability triple length {length} shorter than identifier octet")]
    ShortTriple { length: u64 },
}

impl From<OctetCodecError> for CapabilityError {
    fn from(e: OctetCodecError) -> Self {
        CapabilityError::Truncated(e)
    }
}

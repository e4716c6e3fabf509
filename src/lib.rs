// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Session-layer core of a Wireless Session Protocol (WAP) gateway:
//! the PDU codec, capability negotiator, session state machine and
//! registry, and the DLR store. See `DESIGN.md` for how each module is
//! grounded and `SPEC_FULL.md` for the full requirements this crate
//! implements.

pub mod capability;
pub mod cfg;
pub mod dlr;
pub mod error;
pub mod headers;
pub mod http;
pub mod octet;
pub mod session;
pub mod wsp;
pub mod wtp;

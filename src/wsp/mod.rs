// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The PDU codec (C2): the type octet (`opcode`), the individual PDU
//! layouts (`pdu`), and the HTTP-to-WSP status mapping used when emitting a
//! Reply (`status`).

pub mod opcode;
pub mod pdu;
pub mod status;

pub use opcode::{PduType, deduce_pdu_type};
pub use pdu::{
    ConnectPdu, DisconnectPdu, GetPdu, PostPdu, decode_connect, decode_disconnect, decode_get,
    decode_post, encode_connect, encode_connect_reply, encode_reply,
};
pub use status::{WSP_STATUS_INTERNAL_SERVER_ERROR, http_status_to_wsp};

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! HTTP-status → WSP-status mapping (`spec.md` §4.4).

use tracing::warn;

/// WSP "Internal Server Error", the fallback for any HTTP status this
/// table doesn't recognize.
pub const WSP_STATUS_INTERNAL_SERVER_ERROR: u8 = 0x60;

/// Maps an HTTP status code to the corresponding WSP status byte. Anything
/// not in the exact-match table is logged as anomalous and mapped to
/// [`WSP_STATUS_INTERNAL_SERVER_ERROR`].
pub fn http_status_to_wsp(http_status: u16) -> u8 {
    match http_status {
        200 => 0x20,
        413 => 0x4D,
        415 => 0x4F,
        500 => 0x60,
        other => {
            warn!(http_status = other, "unmapped HTTP status, using 0x60");
            WSP_STATUS_INTERNAL_SERVER_ERROR
        },
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The WSP event union (`spec.md` §3, §4.4) and the outcomes a transition
//! can produce.

use crate::{
    http::HttpResponse,
    wtp::{AbortReason, AbortType, TransactionClass},
};

/// A tagged event delivered to a session's `dispatch`. Each variant carries
/// exactly the fields its transitions need.
#[derive(Debug, Clone)]
pub enum WspEvent {
    /// `TR-Invoke.ind`: a user-data PDU arrived from WTP.
    TrInvokeInd {
        tcl: TransactionClass,
        user_data: Vec<u8>,
    },
    /// `TR-Result.cnf`: our `TR-Result.req` was delivered.
    TrResultCnf,
    /// `TR-Abort.ind`: the transaction was aborted underneath us.
    TrAbortInd {
        abort_type: AbortType,
        abort_reason: AbortReason,
    },
    /// The HTTP collaborator finished fetching content for an in-flight
    /// Get/Post.
    HttpFetchCompleted { response: HttpResponse },
    /// `Release`: WTP released the underlying transport resource.
    Release,
    /// `S-Disconnect.req`: the session-layer user above this core asked for
    /// a clean teardown.
    SDisconnectReq,
    /// Internal housekeeping (e.g. a future reaper tick); carries no data
    /// today but keeps the event union exhaustive-matchable the way
    /// `spec.md` §3 names it.
    Housekeeping,
}

impl WspEvent {
    /// Whether this is a `TR-Invoke.ind`, the one event kind whose
    /// "unmatched in this state" handling differs from every other event
    /// (`spec.md` §4.4: unmatched invokes abort with PROTOERR, everything
    /// else is logged and dropped).
    pub fn is_invoke(&self) -> bool {
        matches!(self, WspEvent::TrInvokeInd { .. })
    }
}

/// What a transition decided to do, reported back up to the dispatcher
/// (which talks to the registry and the WTP collaborator) so the
/// transition logic itself stays free of registry/collaborator
/// dependencies.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Nothing further to do; the session stays as-is.
    Continue,
    /// Abort the transaction and destroy the session
    /// (`spec.md` §4.4, §7: unmatched invoke, malformed PDU, unknown type,
    /// or encode failure all collapse to this one shape).
    Abort { reason: AbortReason },
    /// The session reached NULL via Disconnect or Release and should be
    /// unlinked from the registry (`spec.md` §9: fixing the
    /// `wsp_machine_destroy` leak).
    Destroy,
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The downward WTP collaborator (`spec.md` §6). The core never opens a
//! socket itself; it is handed indications from WTP and emits requests back
//! through [`WtpSink`]. This crate's teacher never needed a trait here
//! because its transport collaborator (`ClientConnection`) was a concrete
//! struct it owned outright — this core is a library embedded in a gateway
//! that supplies its own WTP stack, so the boundary has to be an injected
//! trait instead (`async-trait`, per `SPEC_FULL.md` §6).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::FourTuple;

/// Transaction class, `spec.md` §9 glossary: 0 = unacknowledged, 1 =
/// reliable-invoke, 2 = reliable-invoke-with-result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionClass {
    Unacknowledged = 0,
    ReliableInvoke = 1,
    ReliableInvokeWithResult = 2,
}

/// WTP abort type (`spec.md` §6): `Provider` aborts originate below WSP,
/// `User` aborts (e.g. PROTOERR) originate from this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortType {
    Provider,
    User,
}

/// Abort reason codes this core ever issues or receives. `ProtoErr` is the
/// one the state machine emits for malformed PDUs, unknown types, and
/// unexpected events in the current state (`spec.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    ProtoErr,
    Disconnect,
    Other(u8),
}

/// `TR-Invoke.ind`: WTP has delivered a user-data PDU for this session.
#[derive(Debug, Clone)]
pub struct TrInvokeIndication {
    pub four_tuple: FourTuple,
    pub tcl: TransactionClass,
    pub user_data: Vec<u8>,
}

/// `TR-Result.cnf`: WTP confirms our `TR-Result.req` was delivered.
#[derive(Debug, Clone)]
pub struct TrResultConfirmation {
    pub four_tuple: FourTuple,
}

/// `TR-Abort.ind`: WTP (or the peer, relayed through WTP) aborted the
/// transaction this session was waiting on.
#[derive(Debug, Clone)]
pub struct TrAbortIndication {
    pub four_tuple: FourTuple,
    pub abort_type: AbortType,
    pub abort_reason: AbortReason,
}

/// Requests this core sends down to WTP.
#[async_trait]
pub trait WtpSink: Send + Sync {
    /// `TR-Invoke.req` — used only if this core ever originates a
    /// transaction itself (push acknowledgement); present for interface
    /// completeness per `spec.md` §6.
    async fn invoke_req(&self, four_tuple: &FourTuple, user_data: &[u8]) -> anyhow::Result<()>;

    /// `TR-Result.req` — carries an encoded Reply or ConnectReply PDU back
    /// to the peer.
    async fn result_req(&self, four_tuple: &FourTuple, user_data: &[u8]) -> anyhow::Result<()>;

    /// `TR-Abort.req` — issued on malformed input, unexpected events, or
    /// encode failure (`spec.md` §7 items 1-3, 6).
    async fn abort_req(
        &self,
        four_tuple: &FourTuple,
        abort_type: AbortType,
        reason: AbortReason,
    ) -> anyhow::Result<()>;
}

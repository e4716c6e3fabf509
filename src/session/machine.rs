// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The per-session state machine (`spec.md` §4.4).
//!
//! The teacher expresses a state machine as a `trait StateMachine<Ctx,
//! RespCtx> { async fn step(...) }` over an owned `Ctx`
//! (`state_machine/common.rs`). This core's machine is shaped differently
//! because its dispatch discipline — non-blocking try-lock, FIFO
//! queue-on-contention — is itself part of the spec, not left to the
//! caller, so `SessionMachine::dispatch` *is* the `step` equivalent and
//! owns the locking in addition to the transition logic.

use std::{sync::Arc, time::Instant};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, instrument, warn};

use crate::{
    capability::{self, CapabilitySet},
    cfg::config::ServerConfig,
    headers::HeaderCodec,
    http::{HttpFetcher, HttpMethod, HttpResponse},
    session::{
        FourTuple, SessionState,
        event::{SessionOutcome, WspEvent},
    },
    wsp::{self, PduType},
    wtp::{AbortReason, AbortType, TransactionClass, WtpSink},
};

/// A synthetic response standing in for a failed upstream fetch, so Get and
/// Post failures flow through the same `on_http_fetch_completed` transition
/// as a real response instead of building a Reply PDU by hand.
fn internal_server_error_response() -> HttpResponse {
    HttpResponse {
        status: 500,
        headers: Vec::new(),
        body: Vec::new(),
    }
}

/// A default WSP well-known short-form content type (`text/plain`, 0x03)
/// used when emitting a Reply. Real content-type derivation belongs to the
/// header codec collaborator, which this core treats as opaque
/// (`spec.md` §1 "out of scope") — see `headers.rs`.
const DEFAULT_REPLY_CONTENT_TYPE: u8 = 0x03;

/// Collaborators and shared counters a dispatch call needs. Built once by
/// whatever owns the [`Registry`](crate::session::Registry) and borrowed
/// for the lifetime of one `dispatch` call.
pub struct DispatchCtx<'a> {
    pub cfg: &'a ServerConfig,
    pub wtp: &'a dyn WtpSink,
    pub http: &'a dyn HttpFetcher,
    pub headers: &'a dyn HeaderCodec,
    pub session_ids: &'a crate::session::IdGenerator,
}

/// The mutable fields guarded by [`SessionMachine`]'s handler mutex.
#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    caps: CapabilitySet,
    session_id: Option<u64>,
    created_at: Instant,
    last_activity: Instant,
}

/// One session's state, mailbox, and serialization gate.
///
/// `gate` is the non-blocking try-lock from `spec.md` §4.4's dispatch
/// algorithm; `inner` is the actual mutable state, locked (uncontended, by
/// construction) only by whichever caller currently holds `gate`. Keeping
/// them as two separate mutexes rather than one matches
/// `SPEC_FULL.md` §4.4's "mutex-guarded queue plus a currently-draining
/// flag" framing: `gate` is the flag, `queue` is the queue, `inner` is the
/// data the draining thread is allowed to touch.
pub struct SessionMachine {
    pub four_tuple: FourTuple,
    inner: Mutex<SessionInner>,
    gate: Mutex<()>,
    queue_tx: mpsc::Sender<WspEvent>,
    queue_rx: Mutex<mpsc::Receiver<WspEvent>>,
}

impl SessionMachine {
    pub fn new(four_tuple: FourTuple, queue_capacity: usize) -> Arc<Self> {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity);
        let now = Instant::now();
        Arc::new(Self {
            four_tuple,
            inner: Mutex::new(SessionInner {
                state: SessionState::Null,
                caps: CapabilitySet::defaults(),
                session_id: None,
                created_at: now,
                last_activity: now,
            }),
            gate: Mutex::new(()),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
        })
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn created_at(&self) -> Instant {
        self.inner.lock().await.created_at
    }

    pub async fn last_activity(&self) -> Instant {
        self.inner.lock().await.last_activity
    }

    /// `spec.md` §4.4's `dispatch(session, event)` algorithm: try the gate;
    /// on success, drain the event plus anything already queued; on
    /// failure, enqueue and return immediately for the current holder to
    /// pick up.
    #[instrument(skip(self, event, ctx), fields(client = %self.four_tuple.client_addr, port = self.four_tuple.client_port))]
    pub async fn dispatch(self: &Arc<Self>, event: WspEvent, ctx: &DispatchCtx<'_>) -> SessionOutcome {
        let Ok(_permit) = self.gate.try_lock() else {
            if self.queue_tx.try_send(event).is_err() {
                warn!("session mailbox full, dropping event");
            }
            return SessionOutcome::Continue;
        };

        let mut outcome = self.handle_one(event, ctx).await;
        loop {
            let next = self.queue_rx.lock().await.try_recv();
            match next {
                Ok(ev) => outcome = self.handle_one(ev, ctx).await,
                Err(_) => break,
            }
        }
        outcome
    }

    async fn handle_one(&self, event: WspEvent, ctx: &DispatchCtx<'_>) -> SessionOutcome {
        let mut guard = self.inner.lock().await;
        guard.last_activity = Instant::now();
        let state = guard.state;

        let outcome = match (state, &event) {
            (SessionState::Null, WspEvent::TrInvokeInd { tcl, user_data })
                if *tcl == TransactionClass::ReliableInvokeWithResult =>
            {
                self.handle_connect(&mut guard, user_data, ctx).await
            },
            (SessionState::Connected, WspEvent::TrInvokeInd { tcl, user_data })
                if *tcl == TransactionClass::ReliableInvokeWithResult =>
            {
                self.handle_connected_invoke(&mut guard, user_data, ctx).await
            },
            (_, WspEvent::TrAbortInd { .. }) => {
                debug!(?state, "TR-Abort.ind, tearing down session");
                guard.state = SessionState::Null;
                SessionOutcome::Destroy
            },
            (_, WspEvent::SDisconnectReq) | (_, WspEvent::Release) => {
                guard.state = SessionState::Null;
                SessionOutcome::Destroy
            },
            (_, WspEvent::TrResultCnf) => {
                debug!(?state, "TR-Result.cnf, delivery of our last TR-Result.req confirmed");
                SessionOutcome::Continue
            },
            (_, WspEvent::Housekeeping) => {
                debug!(?state, "housekeeping sweep reclaiming idle session");
                guard.state = SessionState::Null;
                SessionOutcome::Destroy
            },
            (_, event) if event.is_invoke() => {
                warn!(?state, "unmatched TR-Invoke.ind, aborting with PROTOERR");
                if let Err(e) = ctx
                    .wtp
                    .abort_req(&self.four_tuple, AbortType::User, AbortReason::ProtoErr)
                    .await
                {
                    warn!(error = %e, "failed to send TR-Abort.req");
                }
                SessionOutcome::Abort {
                    reason: AbortReason::ProtoErr,
                }
            },
            (_, other) => {
                debug!(?state, event = ?other, "unmatched non-invoke event, dropped");
                SessionOutcome::Continue
            },
        };

        outcome
    }

    async fn handle_connect(
        &self,
        guard: &mut SessionInner,
        user_data: &[u8],
        ctx: &DispatchCtx<'_>,
    ) -> SessionOutcome {
        let connect = match wsp::decode_connect(user_data) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "malformed Connect PDU");
                return self.abort(ctx, AbortReason::ProtoErr).await;
            },
        };

        let mut caps = CapabilitySet::defaults();
        capability::negotiate(&connect.caps, ctx.cfg, &mut caps);

        let session_id = ctx.session_ids.next();
        let caps_bytes = capability::encode_negotiated(&caps);
        let reply = wsp::encode_connect_reply(session_id, Some(&caps_bytes), &[]);

        if let Err(e) = ctx.wtp.result_req(&self.four_tuple, &reply).await {
            warn!(error = %e, "failed to send ConnectReply");
            return self.abort(ctx, AbortReason::ProtoErr).await;
        }

        guard.state = SessionState::Connected;
        guard.caps = caps;
        guard.session_id = Some(session_id);
        SessionOutcome::Continue
    }

    async fn handle_connected_invoke(
        &self,
        guard: &mut SessionInner,
        user_data: &[u8],
        ctx: &DispatchCtx<'_>,
    ) -> SessionOutcome {
        match wsp::deduce_pdu_type(user_data, false) {
            PduType::Get => self.handle_get(user_data, ctx).await,
            PduType::Post => self.handle_post(user_data, ctx).await,
            PduType::Disconnect => {
                if wsp::decode_disconnect(user_data).is_err() {
                    warn!("malformed Disconnect PDU");
                    return self.abort(ctx, AbortReason::ProtoErr).await;
                }
                guard.state = SessionState::Null;
                SessionOutcome::Destroy
            },
            other => {
                warn!(?other, "unsupported PDU type in CONNECTED state");
                self.abort(ctx, AbortReason::ProtoErr).await
            },
        }
    }

    async fn handle_get(&self, user_data: &[u8], ctx: &DispatchCtx<'_>) -> SessionOutcome {
        let get = match wsp::decode_get(user_data) {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "malformed Get PDU");
                return self.abort(ctx, AbortReason::ProtoErr).await;
            },
        };

        let headers = get.headers.unwrap_or_default();
        let response = match ctx
            .http
            .fetch(HttpMethod::Get, &get.url, &headers, &[])
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "upstream HTTP fetch failed");
                internal_server_error_response()
            },
        };

        self.on_http_fetch_completed(WspEvent::HttpFetchCompleted { response }, ctx)
            .await
    }

    async fn handle_post(&self, user_data: &[u8], ctx: &DispatchCtx<'_>) -> SessionOutcome {
        let post = match wsp::decode_post(user_data) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "malformed Post PDU");
                return self.abort(ctx, AbortReason::ProtoErr).await;
            },
        };

        // `request_url()` concatenates url + "?" + body; the header block
        // is discarded entirely, matching the preserved (if lossy) source
        // behavior `spec.md` §9 documents.
        let url = post.request_url();
        let response = match ctx.http.fetch(HttpMethod::Post, &url, &[], &[]).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "upstream HTTP fetch failed");
                internal_server_error_response()
            },
        };

        self.on_http_fetch_completed(WspEvent::HttpFetchCompleted { response }, ctx)
            .await
    }

    /// Turns an `HTTP-completed` event (`spec.md` §3, §4.4's
    /// `CONNECTED ──[HTTP-completed]──► CONNECTED` transition) into an
    /// encoded Reply and hands it to WTP. Get and Post both drive their
    /// fetch to completion synchronously (`spec.md` §4.4: the HTTP
    /// collaborator is "synchronous from the state machine's viewpoint"),
    /// then feed the result through this one shared transition.
    async fn on_http_fetch_completed(&self, event: WspEvent, ctx: &DispatchCtx<'_>) -> SessionOutcome {
        let WspEvent::HttpFetchCompleted { response } = event else {
            unreachable!("on_http_fetch_completed is only ever called with HttpFetchCompleted");
        };
        let status = wsp::http_status_to_wsp(response.status);
        let reply = wsp::encode_reply(status, DEFAULT_REPLY_CONTENT_TYPE, &response.body);

        if let Err(e) = ctx.wtp.result_req(&self.four_tuple, &reply).await {
            warn!(error = %e, "failed to send Reply");
        }
        SessionOutcome::Continue
    }

    async fn abort(&self, ctx: &DispatchCtx<'_>, reason: AbortReason) -> SessionOutcome {
        if let Err(e) = ctx
            .wtp
            .abort_req(&self.four_tuple, AbortType::User, reason)
            .await
        {
            warn!(error = %e, "failed to send TR-Abort.req");
        }
        SessionOutcome::Abort { reason }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The session registry (C5, `spec.md` §4.5). Grounded on the teacher's
//! `client::pool_sessions::Pool`: a `DashMap` of `Arc<Session>` keyed by an
//! identifier, with lookup/insert held only long enough to find or create
//! the entry before any lengthy work runs. This registry swaps the
//! teacher's `u16` TSIH key for the [`FourTuple`] `spec.md` uses, and
//! `wsp_handle_event`-equivalent work (`SessionMachine::dispatch`) runs
//! after the map borrow is dropped, exactly as the spec requires ("the
//! registry mutex ... is released before `wsp_handle_event` runs").

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::{
    session::{
        FourTuple, SessionMachine,
        event::{SessionOutcome, WspEvent},
        machine::DispatchCtx,
    },
    wtp::{TrAbortIndication, TrInvokeIndication, TrResultConfirmation, TransactionClass},
    wsp::{self, PduType},
};

/// Process-wide collection of active sessions, keyed by 4-tuple
/// (`spec.md` §3, §4.5).
pub struct Registry {
    sessions: DashMap<FourTuple, Arc<SessionMachine>>,
    queue_capacity: usize,
}

impl Registry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            queue_capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// `find_or_create` (`spec.md` §4.5): a Connect-bearing `tcl=2`
    /// invocation always creates a fresh session, superseding whatever
    /// session previously occupied the same 4-tuple. The superseded
    /// session (if any) is returned alongside the new one so the caller can
    /// release it properly (`spec.md` §4.5: "existing sessions ... are left
    /// untouched [until] the state machine will Release old sessions as new
    /// Connects supersede them") instead of it being silently dropped. Any
    /// other invocation looks up the existing session by 4-tuple or creates
    /// a fresh NULL-state one.
    pub fn find_or_create(&self, ind: &TrInvokeIndication) -> (Arc<SessionMachine>, Option<Arc<SessionMachine>>) {
        let is_connect_bearing = ind.tcl == TransactionClass::ReliableInvokeWithResult
            && wsp::deduce_pdu_type(&ind.user_data, false) == PduType::Connect;

        if is_connect_bearing {
            let machine = SessionMachine::new(ind.four_tuple.clone(), self.queue_capacity);
            let superseded = self.sessions.insert(ind.four_tuple.clone(), machine.clone());
            debug!(four_tuple = ?ind.four_tuple, superseded = superseded.is_some(), "new session created for Connect");
            return (machine, superseded);
        }

        let machine = self
            .sessions
            .entry(ind.four_tuple.clone())
            .or_insert_with(|| SessionMachine::new(ind.four_tuple.clone(), self.queue_capacity))
            .clone();
        (machine, None)
    }

    /// Looks up an existing session by 4-tuple without creating one —
    /// used for events that aren't `TR-Invoke.ind` (e.g. `TR-Abort.ind`),
    /// which should never spontaneously create a session.
    pub fn get(&self, four_tuple: &FourTuple) -> Option<Arc<SessionMachine>> {
        self.sessions.get(four_tuple).map(|e| e.clone())
    }

    /// Removes a session from the registry, but only if the entry currently
    /// at `four_tuple` is still `machine` — this is the fix for the
    /// `wsp_machine_destroy` leak `spec.md` §9 flags: the source's destroy
    /// function never unlinked the session from the global list. The
    /// identity check guards against the entry having already been
    /// superseded by a newer Connect: without it, a slow dispatch on a
    /// just-superseded session could complete after the new session was
    /// inserted at the same key and delete the wrong (new, healthy) entry.
    pub fn unlink(&self, four_tuple: &FourTuple, machine: &Arc<SessionMachine>) {
        if self
            .sessions
            .remove_if(four_tuple, |_, v| Arc::ptr_eq(v, machine))
            .is_some()
        {
            debug!(?four_tuple, "session unlinked from registry");
        }
    }

    /// Dispatches a `TR-Invoke.ind`, finding or creating the target
    /// session, releasing any session it supersedes, running its state
    /// machine, and unlinking it from the registry if the outcome calls for
    /// destruction.
    pub async fn dispatch_invoke(
        &self,
        ind: TrInvokeIndication,
        ctx: &DispatchCtx<'_>,
    ) -> SessionOutcome {
        let (machine, superseded) = self.find_or_create(&ind);
        if let Some(old) = superseded {
            // The old session is no longer reachable through the registry
            // (the new one already occupies its key), so deliver Release
            // directly rather than through `dispatch_invoke` recursion.
            old.dispatch(WspEvent::Release, ctx).await;
        }
        let outcome = machine
            .dispatch(
                WspEvent::TrInvokeInd {
                    tcl: ind.tcl,
                    user_data: ind.user_data,
                },
                ctx,
            )
            .await;
        self.unlink_if_terminal(&ind.four_tuple, &machine, &outcome);
        outcome
    }

    /// Dispatches a `TR-Abort.ind` to the session it targets, if one
    /// exists; an abort for an unknown 4-tuple is a no-op (the session is
    /// already gone).
    pub async fn dispatch_abort(
        &self,
        ind: TrAbortIndication,
        ctx: &DispatchCtx<'_>,
    ) -> Option<SessionOutcome> {
        let machine = self.get(&ind.four_tuple)?;
        let outcome = machine
            .dispatch(
                WspEvent::TrAbortInd {
                    abort_type: ind.abort_type,
                    abort_reason: ind.abort_reason,
                },
                ctx,
            )
            .await;
        self.unlink_if_terminal(&ind.four_tuple, &machine, &outcome);
        Some(outcome)
    }

    /// Dispatches a `TR-Result.cnf` — WTP confirming our last
    /// `TR-Result.req` was delivered — to the session it targets, if one
    /// still exists. A confirmation for an unknown 4-tuple is a no-op.
    pub async fn dispatch_result_cnf(
        &self,
        ind: TrResultConfirmation,
        ctx: &DispatchCtx<'_>,
    ) -> Option<SessionOutcome> {
        let machine = self.get(&ind.four_tuple)?;
        let outcome = machine.dispatch(WspEvent::TrResultCnf, ctx).await;
        self.unlink_if_terminal(&ind.four_tuple, &machine, &outcome);
        Some(outcome)
    }

    /// Sweeps every registered session and delivers a `Housekeeping` event
    /// to any whose `last_activity` is older than `idle_after`
    /// (`SPEC_FULL.md` §3: the core exposes `last_activity` for "a
    /// gateway-level reaper", since it runs no background timer itself).
    /// Returns the number of sessions the sweep reclaimed.
    pub async fn sweep_idle(&self, idle_after: std::time::Duration, ctx: &DispatchCtx<'_>) -> usize {
        let candidates: Vec<(FourTuple, Arc<SessionMachine>)> = self
            .sessions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut reclaimed = 0;
        for (four_tuple, machine) in candidates {
            if machine.last_activity().await.elapsed() < idle_after {
                continue;
            }
            let outcome = machine.dispatch(WspEvent::Housekeeping, ctx).await;
            if matches!(outcome, SessionOutcome::Destroy | SessionOutcome::Abort { .. }) {
                self.unlink(&four_tuple, &machine);
                reclaimed += 1;
            }
        }
        reclaimed
    }

    fn unlink_if_terminal(&self, four_tuple: &FourTuple, machine: &Arc<SessionMachine>, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Destroy | SessionOutcome::Abort { .. } => self.unlink(four_tuple, machine),
            SessionOutcome::Continue => {},
        }
    }
}

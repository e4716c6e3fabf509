// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Exercises the concurrency invariants `spec.md` §8 states in words: at
//! most one thread executes a session's event handler at any instant, and
//! events delivered in order e1-before-e2 have e1's handler fully return
//! before e2's handler starts. `SessionMachine::dispatch`'s try-lock + FIFO
//! mailbox (`spec.md` §4.4) is what's supposed to guarantee this even when
//! two callers race to dispatch concurrently.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use wsp_session_core::{
    cfg::config::ServerConfig,
    http::{HttpFetcher, HttpMethod, HttpResponse},
    session::{DispatchCtx, IdGenerator, SessionMachine, WspEvent},
    wtp::TransactionClass,
};

use crate::unit_tests::support::{NullHeaders, RecordingWtp, four_tuple};

/// An `HttpFetcher` that sleeps before answering, letting a second
/// concurrent dispatch collide with the gate while the first is mid-fetch,
/// and that records (via a shared counter) whether two fetches were ever
/// in flight at once.
struct TrackingHttp {
    in_flight: Arc<AtomicUsize>,
    max_observed: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl HttpFetcher for TrackingHttp {
    async fn fetch(
        &self,
        _method: HttpMethod,
        url: &[u8],
        _headers: &[u8],
        _body: &[u8],
    ) -> anyhow::Result<HttpResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: url.to_vec(),
        })
    }
}

fn get_pdu(path: &str) -> Vec<u8> {
    let mut bytes = vec![0x40, path.len() as u8];
    bytes.extend_from_slice(path.as_bytes());
    bytes
}

#[tokio::test]
async fn concurrent_dispatches_never_overlap_and_preserve_fifo_order() {
    let cfg = ServerConfig::default();
    let wtp = RecordingWtp::default();
    let headers = NullHeaders;
    let session_ids = IdGenerator::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));
    let http = TrackingHttp {
        in_flight: in_flight.clone(),
        max_observed: max_observed.clone(),
        delay: Duration::from_millis(30),
    };
    let ctx = DispatchCtx {
        cfg: &cfg,
        wtp: &wtp,
        http: &http,
        headers: &headers,
        session_ids: &session_ids,
    };

    let machine = SessionMachine::new(four_tuple(), 8);
    machine
        .dispatch(
            WspEvent::TrInvokeInd {
                tcl: TransactionClass::ReliableInvokeWithResult,
                user_data: vec![0x01, 0x10, 0x00, 0x00],
            },
            &ctx,
        )
        .await;

    let first = machine.dispatch(
        WspEvent::TrInvokeInd {
            tcl: TransactionClass::ReliableInvokeWithResult,
            user_data: get_pdu("/first"),
        },
        &ctx,
    );
    let second = machine.dispatch(
        WspEvent::TrInvokeInd {
            tcl: TransactionClass::ReliableInvokeWithResult,
            user_data: get_pdu("/second"),
        },
        &ctx,
    );
    tokio::join!(first, second);

    assert_eq!(
        max_observed.load(Ordering::SeqCst),
        1,
        "two events on the same session must never be handled concurrently"
    );

    let results = wtp.results.lock().expect("mutex").clone();
    // connect reply + two Get replies
    assert_eq!(results.len(), 3);
    assert!(results[1].ends_with(b"/first"));
    assert!(results[2].ends_with(b"/second"));
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end scenarios from `spec.md` §8, driven through the full
//! `Registry::dispatch_invoke`/`dispatch_abort` path rather than a single
//! component in isolation — this is the layer the teacher's
//! `tests/unit_tests/test_login.rs` exercises for its own login PDU (decode
//! a fixture, drive the behavior under test, assert on the resulting
//! structure) scaled up to this core's session-plus-registry boundary.

use wsp_session_core::{
    cfg::config::ServerConfig,
    session::{DispatchCtx, IdGenerator, Registry, SessionState},
    wsp,
    wtp::{AbortType, TrAbortIndication, TrInvokeIndication, TransactionClass},
};

use crate::unit_tests::support::{EchoHttp, FailingHttp, NullHeaders, RecordingWtp, four_tuple};

fn ctx<'a>(
    cfg: &'a ServerConfig,
    wtp: &'a RecordingWtp,
    http: &'a dyn wsp_session_core::http::HttpFetcher,
    headers: &'a NullHeaders,
    session_ids: &'a IdGenerator,
) -> DispatchCtx<'a> {
    DispatchCtx {
        cfg,
        wtp,
        http,
        headers,
        session_ids,
    }
}

#[tokio::test]
async fn scenario_1_connect_no_caps_then_get() {
    let registry = Registry::new(8);
    let cfg = ServerConfig::default();
    let wtp = RecordingWtp::default();
    let http = EchoHttp;
    let headers = NullHeaders;
    let session_ids = IdGenerator::new();
    let dispatch_ctx = ctx(&cfg, &wtp, &http, &headers, &session_ids);

    let connect = TrInvokeIndication {
        four_tuple: four_tuple(),
        tcl: TransactionClass::ReliableInvokeWithResult,
        user_data: vec![0x01, 0x10, 0x00, 0x00],
    };
    registry.dispatch_invoke(connect, &dispatch_ctx).await;

    let session = registry.get(&four_tuple()).expect("session must exist after Connect");
    assert_eq!(session.state().await, SessionState::Connected);

    let reply_bytes = wtp.results.lock().expect("mutex").clone();
    assert_eq!(reply_bytes.len(), 1);
    assert_eq!(reply_bytes[0][0], 0x02); // ConnectReply type octet

    let get = TrInvokeIndication {
        four_tuple: four_tuple(),
        tcl: TransactionClass::ReliableInvokeWithResult,
        user_data: b"\x40\x0Ahttp://a/b".to_vec(),
    };
    registry.dispatch_invoke(get, &dispatch_ctx).await;

    let results = wtp.results.lock().expect("mutex").clone();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1][0], 0x04); // Reply type octet
    // EchoHttp echoes the fetched URL back as the body.
    assert!(results[1].ends_with(b"http://a/b"));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn scenario_2_connect_with_client_sdu_cap_negotiated_down() {
    let registry = Registry::new(8);
    let cfg = ServerConfig::default();
    let wtp = RecordingWtp::default();
    let http = EchoHttp;
    let headers = NullHeaders;
    let session_ids = IdGenerator::new();
    let dispatch_ctx = ctx(&cfg, &wtp, &http, &headers, &session_ids);

    // caps block: one triple, length=3, identifier 0x00 (client SDU),
    // uintvar payload 0x89 0x34 (1204). 1204 is under the default 1400
    // ceiling, so it's accepted and echoed back, not clamped.
    let connect = TrInvokeIndication {
        four_tuple: four_tuple(),
        tcl: TransactionClass::ReliableInvokeWithResult,
        user_data: vec![0x01, 0x10, 0x04, 0x00, 0x03, 0x00, 0x89, 0x34],
    };
    registry.dispatch_invoke(connect, &dispatch_ctx).await;

    let reply = wtp.results.lock().expect("mutex")[0].clone();
    // ConnectReply: type(0x02), session_id(1), caps_len(4), hdrs_len(0),
    // then a single triple tagged CAP_SERVER_SDU (0x01) — not
    // CAP_CLIENT_SDU — echoing the client's 1204 uintvar unchanged. This
    // mistagging reproduces `make_connectreply_pdu`'s `WSP_CSDU_SET`
    // branch in `examples/original_source/gw/wsp.c`.
    assert_eq!(
        reply,
        vec![0x02, 0x01, 0x04, 0x00, 0x03, 0x01, 0x89, 0x34]
    );
}

#[tokio::test]
async fn scenario_5_post_body_becomes_query_string() {
    let registry = Registry::new(8);
    let cfg = ServerConfig::default();
    let wtp = RecordingWtp::default();
    let http = EchoHttp;
    let headers = NullHeaders;
    let session_ids = IdGenerator::new();
    let dispatch_ctx = ctx(&cfg, &wtp, &http, &headers, &session_ids);

    registry
        .dispatch_invoke(
            TrInvokeIndication {
                four_tuple: four_tuple(),
                tcl: TransactionClass::ReliableInvokeWithResult,
                user_data: vec![0x01, 0x10, 0x00, 0x00],
            },
            &dispatch_ctx,
        )
        .await;

    // url_len=4 ("/foo"), param_len=0, remaining bytes ("a=1") are the body.
    let post_bytes = [0x60, 0x04, 0x00, b'/', b'f', b'o', b'o', b'a', b'=', b'1'];
    registry
        .dispatch_invoke(
            TrInvokeIndication {
                four_tuple: four_tuple(),
                tcl: TransactionClass::ReliableInvokeWithResult,
                user_data: post_bytes.to_vec(),
            },
            &dispatch_ctx,
        )
        .await;

    let results = wtp.results.lock().expect("mutex").clone();
    assert_eq!(results.len(), 2);
    // EchoHttp echoes back whatever URL the Post handler built, which must
    // be the body folded into the query string per the preserved defect.
    assert!(results[1].ends_with(b"/foo?a=1"));
}

#[tokio::test]
async fn http_fetch_failure_falls_back_to_internal_server_error() {
    let registry = Registry::new(8);
    let cfg = ServerConfig::default();
    let wtp = RecordingWtp::default();
    let http = FailingHttp;
    let headers = NullHeaders;
    let session_ids = IdGenerator::new();
    let dispatch_ctx = ctx(&cfg, &wtp, &http, &headers, &session_ids);

    registry
        .dispatch_invoke(
            TrInvokeIndication {
                four_tuple: four_tuple(),
                tcl: TransactionClass::ReliableInvokeWithResult,
                user_data: vec![0x01, 0x10, 0x00, 0x00],
            },
            &dispatch_ctx,
        )
        .await;
    registry
        .dispatch_invoke(
            TrInvokeIndication {
                four_tuple: four_tuple(),
                tcl: TransactionClass::ReliableInvokeWithResult,
                user_data: b"\x40\x01/".to_vec(),
            },
            &dispatch_ctx,
        )
        .await;

    let results = wtp.results.lock().expect("mutex").clone();
    assert_eq!(results[1][1], wsp::WSP_STATUS_INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn scenario_6_truncated_connect_aborts_and_leaves_no_session() {
    let registry = Registry::new(8);
    let cfg = ServerConfig::default();
    let wtp = RecordingWtp::default();
    let http = EchoHttp;
    let headers = NullHeaders;
    let session_ids = IdGenerator::new();
    let dispatch_ctx = ctx(&cfg, &wtp, &http, &headers, &session_ids);

    registry
        .dispatch_invoke(
            TrInvokeIndication {
                four_tuple: four_tuple(),
                tcl: TransactionClass::ReliableInvokeWithResult,
                user_data: vec![0x01],
            },
            &dispatch_ctx,
        )
        .await;

    assert_eq!(registry.len(), 0, "aborted Connect must not leave a session behind");
    assert_eq!(wtp.aborts.lock().expect("mutex").len(), 1);
}

#[tokio::test]
async fn tr_abort_ind_for_unknown_session_is_a_no_op() {
    let registry = Registry::new(8);
    let cfg = ServerConfig::default();
    let wtp = RecordingWtp::default();
    let http = EchoHttp;
    let headers = NullHeaders;
    let session_ids = IdGenerator::new();
    let dispatch_ctx = ctx(&cfg, &wtp, &http, &headers, &session_ids);

    let outcome = registry
        .dispatch_abort(
            TrAbortIndication {
                four_tuple: four_tuple(),
                abort_type: AbortType::Provider,
                abort_reason: wsp_session_core::wtp::AbortReason::Disconnect,
            },
            &dispatch_ctx,
        )
        .await;
    assert!(outcome.is_none());
    assert_eq!(registry.len(), 0);
}

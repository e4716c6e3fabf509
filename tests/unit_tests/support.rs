// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared collaborators for the scenario tests in this directory, playing
//! the same role the teacher's `load_fixture`/`parse_imm`/`parse_mut`
//! helpers in `tests/_unit_entry.rs` play for its own fixtures: defined once,
//! reused by every `pub mod` sibling declared in `_unit_entry.rs`.

use std::sync::Mutex;

use async_trait::async_trait;
use wsp_session_core::{
    headers::{HeaderCodec, HeaderList},
    http::{HttpFetcher, HttpMethod, HttpResponse},
    session::FourTuple,
    wtp::{AbortReason, AbortType, WtpSink},
};

/// A [`WtpSink`] that records every `TR-Result.req`/`TR-Abort.req` it's
/// asked to send, so a test can assert on what the session actually wrote
/// back to the peer instead of only on the returned [`SessionOutcome`].
#[derive(Default)]
pub struct RecordingWtp {
    pub results: Mutex<Vec<Vec<u8>>>,
    pub aborts: Mutex<Vec<AbortReason>>,
}

#[async_trait]
impl WtpSink for RecordingWtp {
    async fn invoke_req(&self, _four_tuple: &FourTuple, _user_data: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn result_req(&self, _four_tuple: &FourTuple, user_data: &[u8]) -> anyhow::Result<()> {
        self.results
            .lock()
            .expect("recording mutex poisoned")
            .push(user_data.to_vec());
        Ok(())
    }

    async fn abort_req(
        &self,
        _four_tuple: &FourTuple,
        _abort_type: AbortType,
        reason: AbortReason,
    ) -> anyhow::Result<()> {
        self.aborts
            .lock()
            .expect("recording mutex poisoned")
            .push(reason);
        Ok(())
    }
}

/// An [`HttpFetcher`] that always answers 200 with a fixed body, echoing
/// back the URL it was asked to fetch so a test can see what the Get/Post
/// handler actually built (in particular, the Post URL/body-as-query-string
/// concatenation `spec.md` §9 documents).
pub struct EchoHttp;

#[async_trait]
impl HttpFetcher for EchoHttp {
    async fn fetch(
        &self,
        _method: HttpMethod,
        url: &[u8],
        _headers: &[u8],
        _body: &[u8],
    ) -> anyhow::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: url.to_vec(),
        })
    }
}

/// An [`HttpFetcher`] that always fails, for exercising the
/// internal-server-error fallback path (`spec.md` §7 item 4).
pub struct FailingHttp;

#[async_trait]
impl HttpFetcher for FailingHttp {
    async fn fetch(
        &self,
        _method: HttpMethod,
        _url: &[u8],
        _headers: &[u8],
        _body: &[u8],
    ) -> anyhow::Result<HttpResponse> {
        Err(anyhow::anyhow!("upstream unreachable"))
    }
}

/// A no-op [`HeaderCodec`]; none of these scenarios exercise header
/// encoding, which `spec.md` §1 puts out of scope for this core.
pub struct NullHeaders;

impl HeaderCodec for NullHeaders {
    fn decode(&self, _bytes: &[u8]) -> anyhow::Result<HeaderList> {
        Ok(Vec::new())
    }

    fn encode(&self, _headers: &HeaderList) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn pack(&self, headers: &HeaderList) -> HeaderList {
        headers.clone()
    }
}

pub fn four_tuple() -> FourTuple {
    FourTuple {
        client_addr: "192.0.2.1".into(),
        client_port: 9200,
        server_addr: "192.0.2.254".into(),
        server_port: 9201,
    }
}

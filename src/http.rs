// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The upward HTTP collaborator (`spec.md` §6): content fetching for WSP
//! Get/Post is entirely delegated. `spec.md` describes it as "synchronous
//! from the state machine's viewpoint; the collaborator may be internally
//! async" — this core's state machine is itself async (the teacher's
//! `StateMachine::step` is already an `async fn` in a trait, see
//! `state_machine/common.rs`), so the fetch is simply `.await`ed in place
//! rather than round-tripped through a completion event and a re-dispatch.

use async_trait::async_trait;

/// An HTTP method as named on the wire by a Get/Post/Head/... PDU type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Options,
    Head,
    Delete,
    Trace,
    Put,
}

/// The collaborator's response: status plus whatever header/body bytes the
/// header codec (`HeaderCodec`, `headers.rs`) already packed.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<u8>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(
        &self,
        method: HttpMethod,
        url: &[u8],
        headers: &[u8],
        body: &[u8],
    ) -> anyhow::Result<HttpResponse>;
}

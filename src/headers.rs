// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The sideways WSP header codec collaborator (`spec.md` §6, §1
//! "out of scope"): multibyte-encoded MIME headers are treated as an
//! opaque dependency by this core. A decoded header list is represented as
//! `Vec<(Vec<u8>, Vec<u8>)>` (name/value pairs) purely so the core has
//! something concrete to pass to `HttpFetcher`; the actual WSP header
//! code-page encoding lives entirely behind the trait.

/// A decoded header list: ordered name/value pairs.
pub type HeaderList = Vec<(Vec<u8>, Vec<u8>)>;

pub trait HeaderCodec: Send + Sync {
    /// Decodes a WSP-encoded header block into a header list.
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<HeaderList>;

    /// Encodes a header list back into WSP wire form.
    fn encode(&self, headers: &HeaderList) -> anyhow::Result<Vec<u8>>;

    /// Compacts a decoded list for storage (e.g. deduplicating code-page
    /// shifts); opaque per `spec.md` §6.
    fn pack(&self, headers: &HeaderList) -> HeaderList;
}

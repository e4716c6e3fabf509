// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::ProtocolOptions;

/// Server-side capability limits and negotiation/store policy knobs.
///
/// This is the parameter set the gateway hands to the capability negotiator
/// (C3), the session state machine (C4) and the DLR store (C6); it plays
/// the same role this crate's teacher assigns to `Config` for login
/// negotiation, except nothing here ever goes out on the wire verbatim —
/// it's the *ceiling* the client's requested values get clamped against.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerConfig {
    /// Ceiling for a negotiated `client_sdu_size` (capability 0x00).
    #[serde(default = "default_sdu_size")]
    pub max_client_sdu_size: u32,
    /// Ceiling for a negotiated `server_sdu_size` (capability 0x01).
    #[serde(default = "default_sdu_size")]
    pub max_server_sdu_size: u32,
    /// Ceiling for a negotiated `mor_method` (capability 0x03).
    #[serde(default = "default_mor")]
    pub max_mor_method: u8,
    /// Ceiling for a negotiated `mor_push` (capability 0x04).
    #[serde(default = "default_mor")]
    pub max_mor_push: u8,
    /// Protocol options (capability 0x02) this server actually implements;
    /// always overrides whatever the client proposed.
    #[serde(default)]
    pub supported_protocol_options: ProtocolOptions,
    /// Bound on the per-session event mailbox (`spec.md` §4.4).
    #[serde(default = "default_queue_capacity")]
    pub session_queue_capacity: usize,
    /// §9 open question: whether the DLR store's `get`/`remove` should
    /// participate destination in the match key. Defaults to the source's
    /// current (destination-ignored) behavior.
    #[serde(default)]
    pub dlr_match_destination: bool,
}

fn default_sdu_size() -> u32 {
    1400
}

fn default_mor() -> u8 {
    1
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_client_sdu_size: default_sdu_size(),
            max_server_sdu_size: default_sdu_size(),
            max_mor_method: default_mor(),
            max_mor_push: default_mor(),
            supported_protocol_options: ProtocolOptions::empty(),
            session_queue_capacity: default_queue_capacity(),
            dlr_match_destination: false,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: ServerConfig =
            serde_yaml::from_str(&s).context("failed to parse server config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates invariants that the negotiator and DLR store rely on.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_client_sdu_size > 0, "max_client_sdu_size must be > 0");
        ensure!(self.max_server_sdu_size > 0, "max_server_sdu_size must be > 0");
        ensure!(self.max_mor_method > 0, "max_mor_method must be > 0");
        ensure!(self.max_mor_push > 0, "max_mor_push must be > 0");
        ensure!(
            self.session_queue_capacity > 0,
            "session_queue_capacity must be > 0"
        );
        Ok(())
    }
}

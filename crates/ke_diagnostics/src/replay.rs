//! Input-command capture and periodic state-hash checkpoints.

use std::path::{Path, PathBuf};

use crate::hub::DiagnosticHub;
use crate::REPLAY_SESSION_SCHEMA;

const REPLAY_VERSION: u32 = 1;

/// One captured input command, recorded before module dispatch.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReplayCommand {
    pub tick: u64,
    #[serde(rename = "type")]
    pub command_type: String,
    pub payload: serde_json::Value,
}

/// One state-hash checkpoint.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReplayCheckpoint {
    pub tick: u64,
    pub hash: serde_json::Value,
}

/// Summary of a recording, without the command list.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ReplayManifest {
    pub schema_version: String,
    pub replay_version: u32,
    pub seed: Option<i64>,
    pub build_info: serde_json::Map<String, serde_json::Value>,
    pub command_count: usize,
    pub first_tick: Option<u64>,
    pub last_tick: Option<u64>,
}

/// Records every input command plus periodic module state hashes.
///
/// Nothing is dropped: the in-memory command list is unbounded by design,
/// the host decides when a session ends.
pub struct ReplayRecorder {
    enabled: bool,
    seed: Option<i64>,
    build_info: serde_json::Map<String, serde_json::Value>,
    hash_interval: u64,
    commands: Vec<ReplayCommand>,
    state_hashes: Vec<ReplayCheckpoint>,
    hub: Option<DiagnosticHub>,
}

impl ReplayRecorder {
    pub fn new(
        enabled: bool,
        seed: Option<i64>,
        build_info: serde_json::Map<String, serde_json::Value>,
        hash_interval: u64,
        hub: Option<DiagnosticHub>,
    ) -> Self {
        Self {
            enabled,
            seed,
            build_info,
            hash_interval: hash_interval.max(1),
            commands: Vec::new(),
            state_hashes: Vec::new(),
            hub,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one input command at the host's current frame index.
    pub fn record_command(&mut self, tick: u64, command_type: &str, payload: serde_json::Value) {
        if !self.enabled {
            return;
        }
        if let Some(hub) = &self.hub {
            let mut metadata = serde_json::Map::new();
            metadata.insert("type".to_owned(), command_type.into());
            hub.emit_fast("replay", "replay.command", tick, payload.clone(), metadata);
        }
        self.commands.push(ReplayCommand {
            tick,
            command_type: command_type.to_owned(),
            payload,
        });
    }

    /// Called once per frame after dispatch; appends a checkpoint every
    /// `hash_interval` ticks when the module provides a state hash.
    pub fn mark_frame(&mut self, tick: u64, state_hash: Option<serde_json::Value>) {
        if !self.enabled {
            return;
        }
        if tick % self.hash_interval != 0 {
            return;
        }
        let Some(hash) = state_hash else {
            return;
        };
        if let Some(hub) = &self.hub {
            hub.emit_fast(
                "replay",
                "replay.state_hash",
                tick,
                hash.clone(),
                serde_json::Map::new(),
            );
        }
        self.state_hashes.push(ReplayCheckpoint { tick, hash });
    }

    pub fn commands(&self) -> &[ReplayCommand] {
        &self.commands
    }

    pub fn state_hashes(&self) -> &[ReplayCheckpoint] {
        &self.state_hashes
    }

    pub fn manifest(&self) -> ReplayManifest {
        ReplayManifest {
            schema_version: REPLAY_SESSION_SCHEMA.to_owned(),
            replay_version: REPLAY_VERSION,
            seed: self.seed,
            build_info: self.build_info.clone(),
            command_count: self.commands.len(),
            first_tick: self.commands.first().map(|command| command.tick),
            last_tick: self.commands.last().map(|command| command.tick),
        }
    }

    /// Write the full session as `diag.replay_session.v1` JSON.
    pub fn export_json(&self, path: &Path) -> anyhow::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let manifest = self.manifest();
        let payload = serde_json::json!({
            "schema_version": manifest.schema_version,
            "replay_version": manifest.replay_version,
            "seed": manifest.seed,
            "build_info": manifest.build_info,
            "commands": self.commands,
            "state_hashes": self.state_hashes,
            "command_count": manifest.command_count,
            "first_tick": manifest.first_tick,
            "last_tick": manifest.last_tick,
        });
        std::fs::write(path, serde_json::to_vec_pretty(&payload)?)?;
        Ok(path.to_owned())
    }
}

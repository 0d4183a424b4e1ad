//! Replay recording and playback for desync debugging.
//!
//! A [`ReplayLog`] starts from a serialized engine and records every command
//! submission and tick. Playing it back against a fresh world reproduces the
//! same state hashes; the first divergence from a recorded checkpoint is
//! reported.
//!
//! The world collaborators are not part of the log. Playback must run
//! against a context in the same state the recording started from.

use crate::command_queue::Command;
use crate::context::Context;
use crate::engine::Engine;
use crate::serialize::{DeserializeError, SerializeError};
use serde::{Deserialize, Serialize};

/// One recorded input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayCommand {
    /// Queue a command for the next tick.
    Submit(Command),
    Step,
}

/// Where playback diverged from the recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub command_index: usize,
    pub expected_hash: u64,
    pub actual_hash: u64,
}

/// A recorded sequence of inputs starting from a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    pub initial_snapshot: Vec<u8>,
    pub commands: Vec<ReplayCommand>,
    /// (command_index, state_hash) pairs, in command order.
    pub hash_checkpoints: Vec<(usize, u64)>,
}

impl ReplayLog {
    /// Start recording from the current engine state.
    pub fn new(engine: &Engine) -> Result<Self, SerializeError> {
        Ok(Self {
            initial_snapshot: engine.serialize()?,
            commands: Vec::new(),
            hash_checkpoints: Vec::new(),
        })
    }

    pub fn record(&mut self, cmd: ReplayCommand) {
        self.commands.push(cmd);
    }

    /// Record a command together with the state hash observed after it.
    pub fn record_with_hash(&mut self, cmd: ReplayCommand, hash: u64) {
        let index = self.commands.len();
        self.commands.push(cmd);
        self.hash_checkpoints.push((index, hash));
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
    }
}

/// Outcome of [`replay_and_verify`].
#[derive(Debug)]
pub struct ReplayResult {
    pub commands_executed: usize,
    pub is_verified: bool,
    pub first_mismatch: Option<ReplayMismatch>,
    /// Engine state after the last command.
    pub engine: Engine,
}

fn apply(engine: &mut Engine, cmd: &ReplayCommand, ctx: &mut Context<'_>) {
    match cmd {
        ReplayCommand::Submit(command) => engine.commands.push(command.clone()),
        ReplayCommand::Step => {
            engine.step(ctx);
        }
    }
}

/// Replay `log` and compare every hash checkpoint.
pub fn replay_and_verify(log: &ReplayLog, ctx: &mut Context<'_>) -> Result<ReplayResult, DeserializeError> {
    let mut engine = Engine::deserialize(&log.initial_snapshot)?;
    let mut first_mismatch = None;
    let mut checkpoints = log.hash_checkpoints.iter().peekable();

    for (i, cmd) in log.commands.iter().enumerate() {
        apply(&mut engine, cmd, ctx);

        while let Some(&&(index, expected_hash)) = checkpoints.peek() {
            if index != i {
                break;
            }
            checkpoints.next();
            let actual_hash = engine.state_hash();
            if actual_hash != expected_hash && first_mismatch.is_none() {
                tracing::warn!(command_index = i, expected_hash, actual_hash, "replay diverged");
                first_mismatch = Some(ReplayMismatch {
                    command_index: i,
                    expected_hash,
                    actual_hash,
                });
            }
        }
    }

    Ok(ReplayResult {
        commands_executed: log.commands.len(),
        is_verified: first_mismatch.is_none(),
        first_mismatch,
        engine,
    })
}

/// Replay `log` without verification.
pub fn replay(log: &ReplayLog, ctx: &mut Context<'_>) -> Result<Engine, DeserializeError> {
    let mut engine = Engine::deserialize(&log.initial_snapshot)?;
    for cmd in &log.commands {
        apply(&mut engine, cmd, ctx);
    }
    Ok(engine)
}

//! Wire Envelopes
//!
//! An [`Envelope`] is one batch plus its origin. It is the unit queued on a
//! bus inbox and the unit that crosses a host boundary, so it must stay
//! plain data: no functions, no cycles.

use serde::{Deserialize, Serialize};

use super::signal::{Batch, PeerId};
use crate::error::WireError;

/// A batch addressed from one origin peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: PeerId,
    pub batch: Batch,
}

impl Envelope {
    pub fn new(origin: impl Into<PeerId>, batch: Batch) -> Self {
        Self {
            origin: origin.into(),
            batch,
        }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(json)?)
    }

    /// MessagePack with named fields, matching the JSON shape.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, WireError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

// ABOUTME: Common data models shared across routes and storage
// ABOUTME: Normalizes entity references that arrive as plain ids or embedded objects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reference to another entity as supplied by clients
///
/// Historically clients have sent either a plain id string or the whole
/// embedded object carrying an `id` field. Both shapes deserialize here and
/// are compared only after normalization through [`Reference::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    /// Plain identifier
    Id(Uuid),
    /// Embedded object with an identifier field
    Embedded {
        /// Identifier of the referenced entity
        #[serde(alias = "_id")]
        id: Uuid,
    },
}

impl Reference {
    /// Normalized identifier of the referenced entity
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Id(id) | Self::Embedded { id } => *id,
        }
    }
}

impl From<Uuid> for Reference {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

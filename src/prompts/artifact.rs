//! Artifact kinds rendered beside the conversation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CODE_PROMPT, SHEET_PROMPT};

/// Kind of document artifact produced by the assistant.
///
/// `Image` is part of the chat application's artifact set but has no text
/// templates; prompt functions treat it as the unhandled case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Text,
    Code,
    Image,
    Sheet,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Text,
        ArtifactKind::Code,
        ArtifactKind::Image,
        ArtifactKind::Sheet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Text => "text",
            ArtifactKind::Code => "code",
            ArtifactKind::Image => "image",
            ArtifactKind::Sheet => "sheet",
        }
    }

    /// Parse a wire tag. Unknown tags yield `None`.
    pub fn parse_lossy(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ArtifactKind::Text),
            "code" => Some(ArtifactKind::Code),
            "image" => Some(ArtifactKind::Image),
            "sheet" => Some(ArtifactKind::Sheet),
            _ => None,
        }
    }

    /// Instruction prompt used when a new document of this kind is generated.
    pub fn creation_prompt(&self) -> Option<&'static str> {
        match self {
            ArtifactKind::Code => Some(CODE_PROMPT),
            ArtifactKind::Sheet => Some(SHEET_PROMPT),
            ArtifactKind::Text | ArtifactKind::Image => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown artifact kind: {0}")]
pub struct UnknownArtifactKind(pub String);

impl FromStr for ArtifactKind {
    type Err = UnknownArtifactKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lossy(s).ok_or_else(|| UnknownArtifactKind(s.to_string()))
    }
}

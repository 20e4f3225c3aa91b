//! Pass planning and source selection module

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::EncodingProfile;

pub mod strategy;

pub use strategy::{CompletedRenditions, SourceChoice, SourceSelector};

/// Role of one pass in a multi-pass encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    /// Discards output, writes statistics
    Analysis,
    /// Discards output, reads and rewrites statistics
    Refinement,
    /// Writes the rendition, reading statistics when any exist
    Final,
}

impl PassKind {
    pub fn writes_stats(&self) -> bool {
        !matches!(self, PassKind::Final)
    }
}

/// One scheduled pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPass {
    /// 1-based
    pub index: u8,
    pub kind: PassKind,
}

/// Ordered pass sequence for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    passes: Vec<PlannedPass>,
}

impl PassPlan {
    /// Pass sequence for 1 to 3 passes
    pub fn new(pass_count: u8) -> Result<Self, DomainError> {
        let kinds: &[PassKind] = match pass_count {
            1 => &[PassKind::Final],
            2 => &[PassKind::Analysis, PassKind::Final],
            3 => &[PassKind::Analysis, PassKind::Refinement, PassKind::Final],
            n => {
                return Err(DomainError::BadArgs(format!(
                    "pass count must be 1-3, got {}",
                    n
                )))
            }
        };
        let passes = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| PlannedPass {
                index: i as u8 + 1,
                kind,
            })
            .collect();
        Ok(Self { passes })
    }

    pub fn for_profile(profile: &EncodingProfile) -> Result<Self, DomainError> {
        Self::new(profile.pass_count)
    }

    pub fn passes(&self) -> &[PlannedPass] {
        &self.passes
    }

    pub fn total(&self) -> u8 {
        self.passes.len() as u8
    }
}

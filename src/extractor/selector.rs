//! Deterministic format selection

use crate::extractor::models::{FormatDescriptor, SelectionCriteria};
use crate::utils::error::{Result, TubeloaderError};
use tracing::debug;

/// Picks exactly one format from a catalog.
///
/// Policy, in order:
/// 1. `criteria.id` set: the descriptor with that id.
/// 2. `criteria.quality` set: first exact label match, else first label that
///    contains the requested value.
/// 3. Nothing set: first combined (video+audio) format, else the first format.
pub struct FormatSelector;

impl FormatSelector {
    pub fn select<'a>(
        catalog: &'a [FormatDescriptor],
        criteria: &SelectionCriteria,
    ) -> Result<&'a FormatDescriptor> {
        let chosen = if let Some(id) = criteria.id {
            catalog.iter().find(|f| f.id == id)
        } else if let Some(quality) = criteria.quality.as_deref() {
            Self::by_quality(catalog, quality)
        } else {
            Self::default_choice(catalog)
        };

        match chosen {
            Some(format) => {
                debug!(
                    "Selected itag {} ({}, {}) for {:?}",
                    format.id,
                    format.quality,
                    format.kind(),
                    criteria
                );
                Ok(format)
            }
            None => Err(TubeloaderError::FormatNotFound {
                criteria: criteria.clone(),
            }),
        }
    }

    fn by_quality<'a>(catalog: &'a [FormatDescriptor], quality: &str) -> Option<&'a FormatDescriptor> {
        catalog
            .iter()
            .find(|f| f.quality == quality)
            .or_else(|| catalog.iter().find(|f| f.quality.contains(quality)))
    }

    fn default_choice(catalog: &[FormatDescriptor]) -> Option<&FormatDescriptor> {
        catalog
            .iter()
            .find(|f| f.is_combined())
            .or_else(|| catalog.first())
    }
}

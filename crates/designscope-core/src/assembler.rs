use crate::complexity::score_layout;
use crate::extractor::{Extraction, TreeExtractor};
use crate::host::SceneGraph;
use crate::tokens::harvest_tokens;
use crate::types::{AnalysisPayload, DesignTokenSet, ImageAttachment};
use designscope_common::Result;
use tracing::{info, warn};

/// Caps on the side collections so one huge file cannot blow up the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    pub max_components: usize,
    pub max_instances: usize,
    pub max_interactions: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_components: 50,
            max_instances: 200,
            max_interactions: 100,
        }
    }
}

/// Runs extraction, token harvest and scoring over a selection and merges them
/// into one [`AnalysisPayload`].
pub fn assemble_payload<G: SceneGraph + ?Sized>(
    graph: &G,
    selection: &[String],
    images: &[ImageAttachment],
    limits: PayloadLimits,
) -> Result<AnalysisPayload> {
    let extraction = TreeExtractor::new(graph).extract(selection)?;
    let styles = harvest_tokens(graph)?;
    Ok(merge(extraction, styles, images, limits))
}

/// Merges already-computed parts; exposed for callers that extract with a
/// custom classifier.
pub fn merge(
    extraction: Extraction,
    styles: DesignTokenSet,
    images: &[ImageAttachment],
    limits: PayloadLimits,
) -> AnalysisPayload {
    let (layout, responsive) = score_layout(extraction.roots());
    let Extraction {
        pages,
        mut components,
        mut instances,
        mut interactions,
    } = extraction;

    // most reused first, so truncation keeps what matters
    components.sort_by(|a, b| b.instance_count.cmp(&a.instance_count));
    truncate("components", &mut components, limits.max_components);
    truncate("instances", &mut instances, limits.max_instances);
    truncate("interactive elements", &mut interactions, limits.max_interactions);

    let payload = AnalysisPayload {
        pages,
        components,
        instances,
        styles,
        interactions,
        layout,
        responsive,
        images: if images.is_empty() {
            None
        } else {
            Some(images.to_vec())
        },
    };
    info!(
        "Payload ready: {} nodes, layout score {}, {} image(s)",
        payload.node_count(),
        payload.layout.score,
        images.len()
    );
    payload
}

fn truncate<T>(what: &str, items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        warn!("Truncating {} from {} to {}", what, items.len(), max);
        items.truncate(max);
    }
}

use crate::host::{EffectKind, HostError, HostNode, Paint, PaintKind, SceneGraph};
use crate::types::{DesignToken, DesignTokenSet, TokenUsage};
use designscope_common::{AnalysisError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Reduces the document's shared style catalogs to summary tokens.
///
/// Works on the whole document and ignores the selection.
pub fn harvest_tokens<G: SceneGraph + ?Sized>(graph: &G) -> Result<DesignTokenSet> {
    let catalog = graph.style_catalog().map_err(document_error)?;
    let nodes = graph
        .find_all(&|n: &HostNode| n.has_style_reference() || n.has_visual_value())
        .map_err(document_error)?;

    let mut usage_by_style: HashMap<&str, usize> = HashMap::new();
    let mut system_tokens = 0;
    let mut custom_values = 0;
    for node in &nodes {
        if node.has_style_reference() {
            system_tokens += 1;
        } else {
            custom_values += 1;
        }
        for style_id in [&node.fill_style_id, &node.text_style_id, &node.effect_style_id]
            .into_iter()
            .flatten()
        {
            *usage_by_style.entry(style_id.as_str()).or_default() += 1;
        }
    }
    let usage_of = |id: &str| usage_by_style.get(id).copied().unwrap_or(0);

    let colors = catalog
        .paints
        .iter()
        .map(|style| DesignToken {
            name: style.name.clone(),
            value: paint_value(&style.paints),
            usage_count: usage_of(&style.id),
        })
        .collect();

    let typography = catalog
        .texts
        .iter()
        .map(|style| DesignToken {
            name: style.name.clone(),
            value: format!("{} {} {}px", style.font_family, style.font_style, style.font_size),
            usage_count: usage_of(&style.id),
        })
        .collect();

    let effects = catalog
        .effects
        .iter()
        .map(|style| DesignToken {
            name: style.name.clone(),
            value: style
                .effects
                .iter()
                .map(|e| format!("{} {}px", effect_label(e.kind), e.radius))
                .collect::<Vec<_>>()
                .join(", "),
            usage_count: usage_of(&style.id),
        })
        .collect();

    let tokens = DesignTokenSet {
        colors,
        typography,
        effects,
        usage: TokenUsage::new(system_tokens, custom_values),
    };
    debug!(
        "Harvested {} color, {} typography, {} effect tokens (consistency {:.2})",
        tokens.colors.len(),
        tokens.typography.len(),
        tokens.effects.len(),
        tokens.usage.consistency_score
    );
    Ok(tokens)
}

fn document_error(err: HostError) -> AnalysisError {
    AnalysisError::Extraction {
        node_id: err.node_id().unwrap_or("document").to_string(),
        reason: err.to_string(),
    }
}

/// Hex of the first solid paint, otherwise the kind of the first paint.
fn paint_value(paints: &[Paint]) -> String {
    if let Some(color) = paints
        .iter()
        .find(|p| p.kind == PaintKind::Solid)
        .and_then(|p| p.color)
    {
        return color.to_hex();
    }
    match paints.first().map(|p| p.kind) {
        Some(PaintKind::Solid) | None => "none".to_string(),
        Some(PaintKind::GradientLinear) => "gradient-linear".to_string(),
        Some(PaintKind::GradientRadial) => "gradient-radial".to_string(),
        Some(PaintKind::GradientAngular) => "gradient-angular".to_string(),
        Some(PaintKind::GradientDiamond) => "gradient-diamond".to_string(),
        Some(PaintKind::Image) => "image".to_string(),
        Some(PaintKind::Video) => "video".to_string(),
    }
}

fn effect_label(kind: EffectKind) -> &'static str {
    match kind {
        EffectKind::DropShadow => "drop-shadow",
        EffectKind::InnerShadow => "inner-shadow",
        EffectKind::LayerBlur => "layer-blur",
        EffectKind::BackgroundBlur => "background-blur",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::JsonDocument;

    const DOC: &str = r##"{
        "pages": [{
            "id": "0:1", "name": "Page", "type": "PAGE",
            "children": [
                { "id": "1:1", "name": "Card", "type": "FRAME", "fillStyleId": "S:brand",
                  "fills": [{ "type": "SOLID", "color": { "r": 0, "g": 0.4, "b": 1 } }] },
                { "id": "1:2", "name": "Title", "type": "TEXT", "textStyleId": "S:h1",
                  "text": { "characters": "Hi" } },
                { "id": "1:3", "name": "Badge", "type": "RECTANGLE",
                  "fills": [{ "type": "SOLID", "color": { "r": 1, "g": 0, "b": 0 } }] },
                { "id": "1:4", "name": "Empty", "type": "FRAME" }
            ]
        }],
        "styles": {
            "paints": [
                { "id": "S:brand", "name": "Brand/Primary",
                  "paints": [{ "type": "SOLID", "color": { "r": 0, "g": 0.4, "b": 1 } }] },
                { "id": "S:hero", "name": "Hero gradient", "paints": [{ "type": "GRADIENT_LINEAR" }] }
            ],
            "texts": [
                { "id": "S:h1", "name": "Heading/H1", "fontFamily": "Inter", "fontStyle": "Bold", "fontSize": 32 }
            ],
            "effects": [
                { "id": "S:shadow", "name": "Elevation/1",
                  "effects": [{ "type": "DROP_SHADOW", "radius": 4 }, { "type": "LAYER_BLUR", "radius": 2 }] }
            ]
        }
    }"##;

    #[test]
    fn test_harvest_values_and_usage() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let tokens = harvest_tokens(&doc).unwrap();

        assert_eq!(tokens.colors.len(), 2);
        assert_eq!(tokens.colors[0].value, "#0066FF");
        assert_eq!(tokens.colors[0].usage_count, 1);
        assert_eq!(tokens.colors[1].value, "gradient-linear");
        assert_eq!(tokens.colors[1].usage_count, 0);

        assert_eq!(tokens.typography[0].value, "Inter Bold 32px");
        assert_eq!(tokens.effects[0].value, "drop-shadow 4px, layer-blur 2px");

        assert_eq!(tokens.usage.system_tokens, 2);
        assert_eq!(tokens.usage.custom_values, 1);
        assert!((tokens.usage.consistency_score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_catalog() {
        let doc = JsonDocument::from_json(r#"{ "pages": [] }"#).unwrap();
        let tokens = harvest_tokens(&doc).unwrap();
        assert!(tokens.colors.is_empty());
        assert_eq!(tokens.usage, TokenUsage::default());
    }
}

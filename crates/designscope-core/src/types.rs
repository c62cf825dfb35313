use crate::host::{Bounds, Constraints, LayoutMode, NodeKind, Padding, Paint, SizingMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extracted, immutable view of one scene node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNodeRecord {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub visible: bool,
    pub locked: bool,
    pub bounds: Bounds,
    pub constraints: Constraints,
    /// Whether the host exposed constraint data for this node (vs. the LEFT/TOP default).
    pub has_constraints: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_layout: Option<AutoLayoutRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fills: Option<Vec<Paint>>,
    #[serde(default)]
    pub stroke_count: usize,
    #[serde(default)]
    pub effect_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextRecord>,
    /// Hop count from the selected root this node was reached from.
    pub depth: usize,
    #[serde(default)]
    pub children: Vec<SceneNodeRecord>,
}

impl SceneNodeRecord {
    /// Number of nodes in this subtree, itself included.
    pub fn subtree_size(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order iterator over this node and all descendants.
    pub fn iter(&self) -> SceneNodeIter<'_> {
        SceneNodeIter { stack: vec![self] }
    }
}

pub struct SceneNodeIter<'a> {
    stack: Vec<&'a SceneNodeRecord>,
}

impl<'a> Iterator for SceneNodeIter<'a> {
    type Item = &'a SceneNodeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLayoutRecord {
    pub mode: LayoutMode,
    pub spacing: f64,
    pub padding: Padding,
    pub primary_sizing: SizingMode,
    pub counter_sizing: SizingMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRecord {
    pub characters: String,
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u16,
    pub line_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentComplexity {
    pub structure: u8,
    pub interactions: u8,
    pub variants: u8,
    pub overall: u8,
}

impl ComponentComplexity {
    /// Scores a component from its descendant count, whether anything inside looks
    /// interactive, and how many variant axes it declares.
    pub fn score(descendants: usize, has_interactive: bool, variant_axes: usize) -> Self {
        let structure = (descendants / 5 + 1).min(10) as u8;
        let interactions = if has_interactive { 3 } else { 1 };
        let variants = variant_axes.clamp(1, 3) as u8;
        let overall = ((structure + interactions + variants) / 3).clamp(1, 10);
        Self {
            structure,
            interactions,
            variants,
            overall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub instance_count: usize,
    pub complexity: ComponentComplexity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub id: String,
    pub name: String,
    pub component_id: Option<String>,
    pub is_nested: bool,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractiveKind {
    Button,
    Input,
    Link,
    Form,
    Navigation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    pub has_alt_text: bool,
    pub focusable: bool,
    pub aria_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveElementRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InteractiveKind,
    pub accessibility: Accessibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignToken {
    pub name: String,
    pub value: String,
    pub usage_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub system_tokens: usize,
    pub custom_values: usize,
    pub consistency_score: f64,
}

impl TokenUsage {
    pub fn new(system_tokens: usize, custom_values: usize) -> Self {
        let total = system_tokens + custom_values;
        let consistency_score = if total == 0 {
            0.0
        } else {
            system_tokens as f64 / total as f64
        };
        Self {
            system_tokens,
            custom_values,
            consistency_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignTokenSet {
    pub colors: Vec<DesignToken>,
    pub typography: Vec<DesignToken>,
    pub effects: Vec<DesignToken>,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutComplexity {
    pub nesting_depth: usize,
    pub auto_layout_usage: usize,
    pub responsive_elements: usize,
    pub score: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveSummary {
    pub constrained_elements: usize,
    /// Constraint pattern (`"H/V"`) to the number of nodes using it.
    pub patterns: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: String,
    pub name: String,
    pub nodes: Vec<SceneNodeRecord>,
}

/// Rendered snapshot handed over by the host, already base64-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub label: String,
    pub media_type: String,
    pub data: String,
}

/// The bounded, self-contained summary sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    pub pages: Vec<PageRecord>,
    pub components: Vec<ComponentRecord>,
    pub instances: Vec<InstanceRecord>,
    pub styles: DesignTokenSet,
    pub interactions: Vec<InteractiveElementRecord>,
    pub layout: LayoutComplexity,
    pub responsive: ResponsiveSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageAttachment>>,
}

impl AnalysisPayload {
    /// Payload as JSON text, without image data.
    pub fn to_structured_text(&self) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("images");
        }
        serde_json::to_string_pretty(&value)
    }

    pub fn node_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.nodes.iter())
            .map(|n| n.subtree_size())
            .sum()
    }
}

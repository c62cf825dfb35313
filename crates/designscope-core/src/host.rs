use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only access to a design document's scene graph.
///
/// The document is always passed explicitly; nothing in the extractor reaches for
/// an ambient "current document".
pub trait SceneGraph {
    /// Snapshot of a single node.
    fn node(&self, id: &str) -> Result<HostNode, HostError>;

    /// Document-wide search over every node (pages included).
    fn find_all(&self, filter: &dyn Fn(&HostNode) -> bool) -> Result<Vec<HostNode>, HostError>;

    /// Shared paint, text and effect style catalogs.
    fn style_catalog(&self) -> Result<StyleCatalog, HostError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("node {0} does not exist")]
    NodeNotFound(String),

    #[error("node {id} is unavailable: {reason}")]
    Unavailable { id: String, reason: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl HostError {
    /// Id of the node the error concerns, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            HostError::NodeNotFound(id) => Some(id),
            HostError::Unavailable { id, .. } => Some(id),
            HostError::InvalidDocument(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Document,
    Page,
    Frame,
    Group,
    Section,
    Text,
    Rectangle,
    Ellipse,
    Line,
    Polygon,
    Star,
    Vector,
    BooleanOperation,
    Component,
    ComponentSet,
    Instance,
    Slice,
    #[serde(other)]
    Other,
}

impl NodeKind {
    pub fn is_component_definition(&self) -> bool {
        matches!(self, NodeKind::Component | NodeKind::ComponentSet)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    Min,
    Center,
    Max,
    Stretch,
    Scale,
    Left,
    Right,
    Top,
    Bottom,
    LeftRight,
    TopBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraints {
    pub horizontal: ConstraintKind,
    pub vertical: ConstraintKind,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            horizontal: ConstraintKind::Left,
            vertical: ConstraintKind::Top,
        }
    }
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Min => "MIN",
            ConstraintKind::Center => "CENTER",
            ConstraintKind::Max => "MAX",
            ConstraintKind::Stretch => "STRETCH",
            ConstraintKind::Scale => "SCALE",
            ConstraintKind::Left => "LEFT",
            ConstraintKind::Right => "RIGHT",
            ConstraintKind::Top => "TOP",
            ConstraintKind::Bottom => "BOTTOM",
            ConstraintKind::LeftRight => "LEFT_RIGHT",
            ConstraintKind::TopBottom => "TOP_BOTTOM",
        }
    }
}

impl Constraints {
    /// `"H/V"` label used to group constraint patterns.
    pub fn pattern(&self) -> String {
        format!("{}/{}", self.horizontal.as_str(), self.vertical.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingMode {
    #[default]
    Fixed,
    Auto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostAutoLayout {
    pub mode: LayoutMode,
    pub item_spacing: f64,
    pub padding: Padding,
    pub primary_axis_sizing: SizingMode,
    pub counter_axis_sizing: SizingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaintKind {
    Solid,
    GradientLinear,
    GradientRadial,
    GradientAngular,
    GradientDiamond,
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

impl Rgba {
    /// `#RRGGBB` from 0..1 channels.
    pub fn to_hex(&self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paint {
    #[serde(rename = "type")]
    pub kind: PaintKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default = "visible_default")]
    pub visible: bool,
}

fn visible_default() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectKind {
    DropShadow,
    InnerShadow,
    LayerBlur,
    BackgroundBlur,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    #[serde(default)]
    pub radius: f64,
    #[serde(default = "visible_default")]
    pub visible: bool,
}

/// Text content as exposed by the host. Font metrics are optional: many hosts
/// only hand out characters and a size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostText {
    pub characters: String,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub font_weight: Option<u16>,
    pub line_height: Option<f64>,
}

/// Snapshot of one scene-graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct HostNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub visible: bool,
    pub locked: bool,
    pub bounds: Bounds,
    pub constraints: Option<Constraints>,
    pub auto_layout: Option<HostAutoLayout>,
    pub fills: Option<Vec<Paint>>,
    pub stroke_count: usize,
    pub effect_count: usize,
    pub text: Option<HostText>,
    pub description: String,
    /// Resolved main component id, for instances.
    pub component_id: Option<String>,
    /// Variant axes and their values, for component sets.
    pub variant_axes: BTreeMap<String, Vec<String>>,
    pub fill_style_id: Option<String>,
    pub text_style_id: Option<String>,
    pub effect_style_id: Option<String>,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

impl HostNode {
    pub fn references_style(&self, style_id: &str) -> bool {
        [&self.fill_style_id, &self.text_style_id, &self.effect_style_id]
            .iter()
            .any(|s| s.as_deref() == Some(style_id))
    }

    pub fn has_style_reference(&self) -> bool {
        self.fill_style_id.is_some() || self.text_style_id.is_some() || self.effect_style_id.is_some()
    }

    /// Carries a visual value (fill, text or effect) of its own.
    pub fn has_visual_value(&self) -> bool {
        self.fills.as_ref().is_some_and(|f| !f.is_empty()) || self.text.is_some() || self.effect_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintStyle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub paints: Vec<Paint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub id: String,
    pub name: String,
    pub font_family: String,
    #[serde(default = "regular")]
    pub font_style: String,
    pub font_size: f64,
}

fn regular() -> String {
    "Regular".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectStyle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleCatalog {
    pub paints: Vec<PaintStyle>,
    pub texts: Vec<TextStyle>,
    pub effects: Vec<EffectStyle>,
}

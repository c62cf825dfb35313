use crate::host::{
    Bounds, Constraints, HostAutoLayout, HostError, HostNode, HostText, NodeKind, Paint, SceneGraph,
    StyleCatalog,
};
use crate::types::ImageAttachment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Node as it appears in a document file, children nested inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default)]
    pub auto_layout: Option<HostAutoLayout>,
    #[serde(default)]
    pub fills: Option<Vec<Paint>>,
    #[serde(default)]
    pub stroke_count: usize,
    #[serde(default)]
    pub effect_count: usize,
    #[serde(default)]
    pub text: Option<HostText>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub component_id: Option<String>,
    #[serde(default)]
    pub variant_axes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub fill_style_id: Option<String>,
    #[serde(default)]
    pub text_style_id: Option<String>,
    #[serde(default)]
    pub effect_style_id: Option<String>,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

fn yes() -> bool {
    true
}

/// On-disk document: pages, style catalogs, the current selection and optional
/// rendered snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub pages: Vec<DocumentNode>,
    #[serde(default)]
    pub styles: StyleCatalog,
    #[serde(default)]
    pub selection: Vec<String>,
    #[serde(default)]
    pub snapshots: Vec<ImageAttachment>,
}

/// In-memory scene graph built from a [`DocumentFile`].
#[derive(Debug, Clone)]
pub struct JsonDocument {
    nodes: HashMap<String, HostNode>,
    /// Every node id in document pre-order, so searches are deterministic.
    order: Vec<String>,
    styles: StyleCatalog,
    selection: Vec<String>,
    snapshots: Vec<ImageAttachment>,
}

impl JsonDocument {
    pub fn from_file(file: DocumentFile) -> Result<Self, HostError> {
        let mut doc = Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            styles: file.styles,
            selection: file.selection,
            snapshots: file.snapshots,
        };

        for page in file.pages {
            if page.kind != NodeKind::Page {
                return Err(HostError::InvalidDocument(format!(
                    "top-level node {} is {:?}, expected PAGE",
                    page.id, page.kind
                )));
            }
            doc.insert(page)?;
        }

        debug!("Loaded document with {} nodes", doc.nodes.len());
        Ok(doc)
    }

    /// Parses a document file. serde_json stops at 128 levels of JSON nesting,
    /// and every layer costs two (the node object and its `children` array), so
    /// files nested deeper than about 63 layers are rejected as invalid. Build the
    /// [`DocumentFile`] another way and use [`JsonDocument::from_file`] for those.
    pub fn from_json(json: &str) -> Result<Self, HostError> {
        let file: DocumentFile =
            serde_json::from_str(json).map_err(|e| HostError::InvalidDocument(e.to_string()))?;
        Self::from_file(file)
    }

    pub fn load(path: &Path) -> Result<Self, HostError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| HostError::InvalidDocument(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Ids selected in the document file.
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn snapshots(&self) -> &[ImageAttachment] {
        &self.snapshots
    }

    /// Indexes a page and everything under it in pre-order, recording parent links.
    fn insert(&mut self, page: DocumentNode) -> Result<(), HostError> {
        let mut stack: Vec<(DocumentNode, Option<String>)> = vec![(page, None)];

        while let Some((mut node, parent)) = stack.pop() {
            if self.nodes.contains_key(&node.id) {
                return Err(HostError::InvalidDocument(format!("duplicate node id {}", node.id)));
            }

            let children = std::mem::take(&mut node.children);
            let id = node.id.clone();
            let host = HostNode {
                id: node.id,
                name: node.name,
                kind: node.kind,
                visible: node.visible,
                locked: node.locked,
                bounds: Bounds {
                    x: node.x,
                    y: node.y,
                    width: node.width,
                    height: node.height,
                },
                constraints: node.constraints,
                auto_layout: node.auto_layout,
                fills: node.fills,
                stroke_count: node.stroke_count,
                effect_count: node.effect_count,
                text: node.text,
                description: node.description,
                component_id: node.component_id,
                variant_axes: node.variant_axes,
                fill_style_id: node.fill_style_id,
                text_style_id: node.text_style_id,
                effect_style_id: node.effect_style_id,
                parent,
                children: children.iter().map(|c| c.id.clone()).collect(),
            };
            self.nodes.insert(id.clone(), host);
            self.order.push(id.clone());

            stack.extend(children.into_iter().rev().map(|c| (c, Some(id.clone()))));
        }
        Ok(())
    }
}

impl SceneGraph for JsonDocument {
    fn node(&self, id: &str) -> Result<HostNode, HostError> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| HostError::NodeNotFound(id.to_string()))
    }

    fn find_all(&self, filter: &dyn Fn(&HostNode) -> bool) -> Result<Vec<HostNode>, HostError> {
        Ok(self
            .order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|n| filter(n))
            .cloned()
            .collect())
    }

    fn style_catalog(&self) -> Result<StyleCatalog, HostError> {
        Ok(self.styles.clone())
    }
}

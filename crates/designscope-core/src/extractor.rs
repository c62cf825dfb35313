use crate::host::{HostError, HostNode, LayoutMode, NodeKind, SceneGraph};
use crate::interaction::{self, Classifier};
use crate::types::*;
use designscope_common::{AnalysisError, Result};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";
pub const DEFAULT_FONT_SIZE: f64 = 16.0;
pub const DEFAULT_FONT_WEIGHT: u16 = 400;
pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;

/// Page name used when a selected node is not attached to any page.
const DETACHED_PAGE: &str = "Detached";

/// Output of one extraction call. Built all-or-nothing: any accessor failure
/// discards everything collected so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub pages: Vec<PageRecord>,
    pub components: Vec<ComponentRecord>,
    pub instances: Vec<InstanceRecord>,
    pub interactions: Vec<InteractiveElementRecord>,
}

impl Extraction {
    pub fn roots(&self) -> impl Iterator<Item = &SceneNodeRecord> {
        self.pages.iter().flat_map(|p| p.nodes.iter())
    }
}

/// Walks a selection of a [`SceneGraph`] into [`SceneNodeRecord`] trees and the
/// document-level side collections.
pub struct TreeExtractor<'g, G: SceneGraph + ?Sized> {
    graph: &'g G,
    classifier: Classifier,
}

impl<'g, G: SceneGraph + ?Sized> TreeExtractor<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            classifier: interaction::classify_name,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn extract(&self, selection: &[String]) -> Result<Extraction> {
        if selection.is_empty() {
            return Err(AnalysisError::NoSelection);
        }

        let roots = self.normalize_selection(selection)?;
        info!("Extracting {} selected root(s)", roots.len());

        let mut visited = HashSet::new();
        let mut instances = Vec::new();
        let mut pages: Vec<PageRecord> = Vec::new();

        for root in roots {
            let page = self.containing_page(&root)?;
            let record = self.walk(root, &mut visited, &mut instances)?;

            let (page_id, page_name) = match page {
                Some(p) => (p.id, p.name),
                None => (String::new(), DETACHED_PAGE.to_string()),
            };
            match pages.iter_mut().find(|p| p.id == page_id) {
                Some(existing) => existing.nodes.push(record),
                None => pages.push(PageRecord {
                    id: page_id,
                    name: page_name,
                    nodes: vec![record],
                }),
            }
        }

        let interactions = collect_interactions(pages.iter().flat_map(|p| p.nodes.iter()), self.classifier);
        let components = self.components()?;

        info!(
            "Extracted {} nodes, {} components, {} instances, {} interactive elements",
            visited.len(),
            components.len(),
            instances.len(),
            interactions.len()
        );

        Ok(Extraction {
            pages,
            components,
            instances,
            interactions,
        })
    }

    fn lookup(&self, id: &str) -> Result<HostNode> {
        self.graph.node(id).map_err(|e| extraction_error(e, id))
    }

    /// Drops duplicate ids and nodes whose ancestor is also selected, so every
    /// node is walked from exactly one root.
    fn normalize_selection(&self, selection: &[String]) -> Result<Vec<HostNode>> {
        let selected: HashSet<&str> = selection.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut roots = Vec::new();

        for id in selection {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let node = self.lookup(id)?;
            if self.has_selected_ancestor(&node, &selected)? {
                debug!("Skipping {} - already covered by a selected ancestor", id);
                continue;
            }
            roots.push(node);
        }
        Ok(roots)
    }

    fn has_selected_ancestor(&self, node: &HostNode, selected: &HashSet<&str>) -> Result<bool> {
        let mut cursor = node.parent.clone();
        while let Some(parent_id) = cursor {
            if selected.contains(parent_id.as_str()) {
                return Ok(true);
            }
            cursor = self.lookup(&parent_id)?.parent;
        }
        Ok(false)
    }

    fn containing_page(&self, node: &HostNode) -> Result<Option<HostNode>> {
        if node.kind == NodeKind::Page {
            return Ok(Some(node.clone()));
        }
        let mut cursor = node.parent.clone();
        while let Some(parent_id) = cursor {
            let parent = self.lookup(&parent_id)?;
            if parent.kind == NodeKind::Page {
                return Ok(Some(parent));
            }
            cursor = parent.parent;
        }
        Ok(None)
    }

    /// Depth-first walk with an explicit stack. Nodes are flattened in pre-order
    /// (parents before children), then records are assembled bottom-up.
    fn walk(
        &self,
        root: HostNode,
        visited: &mut HashSet<String>,
        instances: &mut Vec<InstanceRecord>,
    ) -> Result<SceneNodeRecord> {
        let root_id = root.id.clone();
        let mut flat: Vec<(HostNode, usize, Option<usize>)> = Vec::new();
        let mut stack: Vec<(HostNode, usize, Option<usize>)> = vec![(root, 0, None)];

        while let Some((node, depth, parent)) = stack.pop() {
            if !visited.insert(node.id.clone()) {
                return Err(AnalysisError::Extraction {
                    node_id: node.id,
                    reason: "node reached twice; the scene graph is not a tree".to_string(),
                });
            }
            if node.kind == NodeKind::Instance {
                instances.push(self.instance_record(&node)?);
            }

            let index = flat.len();
            let mut children = Vec::with_capacity(node.children.len());
            for child_id in &node.children {
                children.push(self.lookup(child_id)?);
            }
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1, Some(index))));
            flat.push((node, depth, parent));
        }

        // children always sit after their parent in `flat`
        let mut built: Vec<Vec<SceneNodeRecord>> = (0..flat.len()).map(|_| Vec::new()).collect();
        let mut root_record = None;
        for (index, (node, depth, parent)) in flat.into_iter().enumerate().rev() {
            let mut children = std::mem::take(&mut built[index]);
            children.reverse();
            let record = node_record(node, depth, children);
            match parent {
                Some(p) => built[p].push(record),
                None => root_record = Some(record),
            }
        }

        root_record.ok_or_else(|| AnalysisError::Extraction {
            node_id: root_id,
            reason: "selected root produced no record".to_string(),
        })
    }

    fn instance_record(&self, node: &HostNode) -> Result<InstanceRecord> {
        let mut is_nested = false;
        let mut depth = 0;
        let mut cursor = node.parent.clone();

        while let Some(parent_id) = cursor {
            let parent = self.lookup(&parent_id)?;
            depth += 1;
            if matches!(parent.kind, NodeKind::Page | NodeKind::Document) {
                break;
            }
            if parent.kind == NodeKind::Instance {
                is_nested = true;
            }
            cursor = parent.parent;
        }

        Ok(InstanceRecord {
            id: node.id.clone(),
            name: node.name.clone(),
            component_id: node.component_id.clone(),
            is_nested,
            depth,
        })
    }

    /// Every component definition in the document, not only the selected ones:
    /// reuse across the whole file drives implementation effort.
    fn components(&self) -> Result<Vec<ComponentRecord>> {
        let definitions = self
            .graph
            .find_all(&|n: &HostNode| n.kind.is_component_definition())
            .map_err(|e| extraction_error(e, "document"))?;
        if definitions.is_empty() {
            return Ok(Vec::new());
        }

        let mut instance_counts: HashMap<String, usize> = HashMap::new();
        for instance in self
            .graph
            .find_all(&|n: &HostNode| n.kind == NodeKind::Instance)
            .map_err(|e| extraction_error(e, "document"))?
        {
            if let Some(component_id) = instance.component_id {
                *instance_counts.entry(component_id).or_default() += 1;
            }
        }

        let mut records = Vec::with_capacity(definitions.len());
        for def in definitions {
            let (descendants, has_interactive) = self.subtree_stats(&def)?;
            let instance_count = if def.kind == NodeKind::ComponentSet {
                // instances point at a variant, never at the set itself
                def.children
                    .iter()
                    .map(|id| instance_counts.get(id).copied().unwrap_or(0))
                    .sum()
            } else {
                instance_counts.get(&def.id).copied().unwrap_or(0)
            };

            records.push(ComponentRecord {
                complexity: ComponentComplexity::score(descendants, has_interactive, def.variant_axes.len()),
                id: def.id,
                name: def.name,
                description: def.description,
                instance_count,
            });
        }
        debug!("Scored {} component definitions", records.len());
        Ok(records)
    }

    /// Descendant count (excluding the node) and whether any descendant looks interactive.
    fn subtree_stats(&self, node: &HostNode) -> Result<(usize, bool)> {
        let mut count = 0;
        let mut has_interactive = false;
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = node.children.iter().rev().cloned().collect();

        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                warn!("Node {} reached twice under component {}", id, node.id);
                continue;
            }
            let child = self.lookup(&id)?;
            count += 1;
            has_interactive |= (self.classifier)(&child.name).is_some();
            stack.extend(child.children.iter().rev().cloned());
        }
        Ok((count, has_interactive))
    }
}

fn extraction_error(err: HostError, fallback_id: &str) -> AnalysisError {
    AnalysisError::Extraction {
        node_id: err.node_id().unwrap_or(fallback_id).to_string(),
        reason: err.to_string(),
    }
}

fn node_record(node: HostNode, depth: usize, children: Vec<SceneNodeRecord>) -> SceneNodeRecord {
    let auto_layout = node
        .auto_layout
        .filter(|l| l.mode != LayoutMode::None)
        .map(|l| AutoLayoutRecord {
            mode: l.mode,
            spacing: l.item_spacing,
            padding: l.padding,
            primary_sizing: l.primary_axis_sizing,
            counter_sizing: l.counter_axis_sizing,
        });

    // Hosts rarely expose full font metrics; fixed fallbacks keep extraction cheap.
    let text = if node.kind == NodeKind::Text {
        node.text.map(|t| TextRecord {
            characters: t.characters,
            font_family: t.font_family.unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            font_size: t.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            font_weight: t.font_weight.unwrap_or(DEFAULT_FONT_WEIGHT),
            line_height: t.line_height.unwrap_or(DEFAULT_LINE_HEIGHT),
        })
    } else {
        None
    };

    SceneNodeRecord {
        id: node.id,
        name: node.name,
        kind: node.kind,
        visible: node.visible,
        locked: node.locked,
        bounds: node.bounds,
        constraints: node.constraints.unwrap_or_default(),
        has_constraints: node.constraints.is_some(),
        auto_layout,
        fills: node.fills,
        stroke_count: node.stroke_count,
        effect_count: node.effect_count,
        text,
        depth,
        children,
    }
}

/// Interactive-looking nodes across the given trees, in pre-order.
pub fn collect_interactions<'a>(
    roots: impl Iterator<Item = &'a SceneNodeRecord>,
    classifier: Classifier,
) -> Vec<InteractiveElementRecord> {
    roots
        .flat_map(|root| root.iter())
        .filter_map(|node| {
            let kind = classifier(&node.name)?;
            let has_alt_text = node
                .iter()
                .any(|n| n.text.as_ref().is_some_and(|t| !t.characters.trim().is_empty()));
            Some(InteractiveElementRecord {
                id: node.id.clone(),
                name: node.name.clone(),
                kind,
                accessibility: Accessibility {
                    has_alt_text,
                    focusable: matches!(
                        kind,
                        InteractiveKind::Button | InteractiveKind::Input | InteractiveKind::Link
                    ),
                    aria_label: Some(node.name.trim().to_string()).filter(|s| !s.is_empty()),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::JsonDocument;

    const DOC: &str = r#"{
        "pages": [{
            "id": "0:1", "name": "Home", "type": "PAGE",
            "children": [
                {
                    "id": "1:1", "name": "Header", "type": "FRAME",
                    "constraints": { "horizontal": "LEFT_RIGHT", "vertical": "TOP" },
                    "autoLayout": { "mode": "HORIZONTAL", "itemSpacing": 8 },
                    "children": [
                        { "id": "1:2", "name": "Nav link", "type": "TEXT",
                          "text": { "characters": "Docs", "fontSize": 14 } },
                        { "id": "1:3", "name": "Cta", "type": "INSTANCE", "componentId": "2:1",
                          "children": [
                              { "id": "1:4", "name": "Icon", "type": "INSTANCE", "componentId": "2:5" }
                          ] }
                    ]
                },
                { "id": "1:9", "name": "Body", "type": "FRAME",
                  "autoLayout": { "mode": "NONE" } }
            ]
        }, {
            "id": "0:2", "name": "Components", "type": "PAGE",
            "children": [
                {
                    "id": "2:1", "name": "Button", "type": "COMPONENT", "description": "Primary CTA",
                    "children": [
                        { "id": "2:2", "name": "Label", "type": "TEXT", "text": { "characters": "Go" } },
                        { "id": "2:3", "name": "Press state", "type": "RECTANGLE" }
                    ]
                },
                {
                    "id": "2:4", "name": "Icon", "type": "COMPONENT_SET",
                    "variantAxes": { "size": ["sm", "lg"], "tone": ["dark", "light"] },
                    "children": [ { "id": "2:5", "name": "size=sm, tone=dark", "type": "COMPONENT" } ]
                },
                { "id": "2:6", "name": "Stray", "type": "INSTANCE", "componentId": "2:1" }
            ]
        }]
    }"#;

    fn doc() -> JsonDocument {
        JsonDocument::from_json(DOC).unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_selection_fails() {
        let doc = doc();
        let err = TreeExtractor::new(&doc).extract(&[]).unwrap_err();
        assert_eq!(err, AnalysisError::NoSelection);
    }

    #[test]
    fn test_single_text_node() {
        let doc = doc();
        let out = TreeExtractor::new(&doc).extract(&ids(&["1:2"])).unwrap();
        let root = &out.pages[0].nodes[0];

        assert_eq!(out.pages[0].name, "Home");
        assert_eq!(root.depth, 0);
        assert!(root.children.is_empty());
        assert!(!root.has_constraints);
        assert_eq!(root.constraints, crate::host::Constraints::default());

        let text = root.text.as_ref().unwrap();
        assert_eq!(text.characters, "Docs");
        assert_eq!(text.font_size, 14.0);
        assert_eq!(text.font_weight, DEFAULT_FONT_WEIGHT);
        assert_eq!(text.line_height, DEFAULT_LINE_HEIGHT);
        assert_eq!(text.font_family, DEFAULT_FONT_FAMILY);
    }

    #[test]
    fn test_tree_shape_and_layout_capture() {
        let doc = doc();
        let out = TreeExtractor::new(&doc).extract(&ids(&["1:1", "1:9"])).unwrap();
        let header = &out.pages[0].nodes[0];
        let body = &out.pages[0].nodes[1];

        assert_eq!(header.subtree_size(), 4);
        assert!(header.has_constraints);
        assert_eq!(header.auto_layout.as_ref().unwrap().spacing, 8.0);
        assert_eq!(header.children[1].children[0].depth, 2);
        assert!(body.auto_layout.is_none());
    }

    #[test]
    fn test_overlapping_selection_walks_each_node_once() {
        let doc = doc();
        let out = TreeExtractor::new(&doc)
            .extract(&ids(&["1:3", "1:1", "1:1"]))
            .unwrap();
        assert_eq!(out.pages.len(), 1);
        assert_eq!(out.pages[0].nodes.len(), 1);
        assert_eq!(out.pages[0].nodes[0].id, "1:1");
        assert_eq!(out.instances.len(), 2);
    }

    #[test]
    fn test_instances_nesting_and_depth() {
        let doc = doc();
        let out = TreeExtractor::new(&doc).extract(&ids(&["1:1"])).unwrap();

        let cta = out.instances.iter().find(|i| i.id == "1:3").unwrap();
        assert!(!cta.is_nested);
        assert_eq!(cta.depth, 2);
        assert_eq!(cta.component_id.as_deref(), Some("2:1"));

        let icon = out.instances.iter().find(|i| i.id == "1:4").unwrap();
        assert!(icon.is_nested);
        assert_eq!(icon.depth, 3);
    }

    #[test]
    fn test_components_are_document_wide() {
        let doc = doc();
        let out = TreeExtractor::new(&doc).extract(&ids(&["1:2"])).unwrap();
        assert_eq!(out.components.len(), 3);

        let button = out.components.iter().find(|c| c.id == "2:1").unwrap();
        assert_eq!(button.instance_count, 2);
        assert_eq!(button.description, "Primary CTA");
        assert_eq!(button.complexity.interactions, 3);
        assert_eq!(button.complexity.structure, 1);

        let set = out.components.iter().find(|c| c.id == "2:4").unwrap();
        assert_eq!(set.instance_count, 1);
        assert_eq!(set.complexity.variants, 2);
    }

    #[test]
    fn test_interactions_from_names() {
        let doc = doc();
        let out = TreeExtractor::new(&doc).extract(&ids(&["1:1"])).unwrap();
        assert_eq!(out.interactions.len(), 1);
        let link = &out.interactions[0];
        assert_eq!(link.id, "1:2");
        assert_eq!(link.kind, InteractiveKind::Link);
        assert!(link.accessibility.has_alt_text);
        assert!(link.accessibility.focusable);
    }

    #[test]
    fn test_custom_classifier() {
        fn everything(_: &str) -> Option<InteractiveKind> {
            Some(InteractiveKind::Form)
        }
        let doc = doc();
        let out = TreeExtractor::new(&doc)
            .with_classifier(everything)
            .extract(&ids(&["1:1"]))
            .unwrap();
        assert_eq!(out.interactions.len(), 4);
    }

    #[test]
    fn test_missing_node_is_extraction_error() {
        let doc = doc();
        let err = TreeExtractor::new(&doc).extract(&ids(&["7:7"])).unwrap_err();
        assert!(matches!(err, AnalysisError::Extraction { ref node_id, .. } if node_id == "7:7"));
    }

    #[test]
    fn test_sibling_subtrees_are_disjoint() {
        let doc = doc();
        let out = TreeExtractor::new(&doc).extract(&ids(&["0:1"])).unwrap();
        let page = &out.pages[0].nodes[0];
        let child_total: usize = page.children.iter().map(|c| c.subtree_size()).sum();
        assert_eq!(child_total, page.subtree_size() - 1);

        let mut seen = HashSet::new();
        assert!(page.iter().all(|n| seen.insert(n.id.clone())));
    }

    /// Wraps a document and makes one leaf point back at an ancestor.
    struct Looping(JsonDocument);

    impl SceneGraph for Looping {
        fn node(&self, id: &str) -> std::result::Result<HostNode, HostError> {
            let mut node = self.0.node(id)?;
            if id == "1:4" {
                node.children.push("1:1".to_string());
            }
            Ok(node)
        }

        fn find_all(&self, filter: &dyn Fn(&HostNode) -> bool) -> std::result::Result<Vec<HostNode>, HostError> {
            self.0.find_all(filter)
        }

        fn style_catalog(&self) -> std::result::Result<crate::host::StyleCatalog, HostError> {
            self.0.style_catalog()
        }
    }

    #[test]
    fn test_cycle_is_extraction_error() {
        let graph = Looping(doc());
        let err = TreeExtractor::new(&graph).extract(&ids(&["1:1"])).unwrap_err();
        assert!(matches!(err, AnalysisError::Extraction { ref node_id, .. } if node_id == "1:1"));
    }

    #[test]
    fn test_deep_tree_walks_without_recursion() {
        let layer = |id: &str, kind: &str| -> crate::document::DocumentNode {
            serde_json::from_value(serde_json::json!({ "id": id, "name": id, "type": kind })).unwrap()
        };
        let mut node = layer("leaf", "TEXT");
        for i in (0..1000).rev() {
            let mut parent = layer(&format!("f{}", i), "FRAME");
            parent.children.push(node);
            node = parent;
        }
        let mut page = layer("page", "PAGE");
        page.children.push(node);
        let doc = JsonDocument::from_file(crate::document::DocumentFile {
            pages: vec![page],
            styles: Default::default(),
            selection: Vec::new(),
            snapshots: Vec::new(),
        })
        .unwrap();

        let out = TreeExtractor::new(&doc).extract(&ids(&["f0"])).unwrap();
        let root = &out.pages[0].nodes[0];
        assert_eq!(out.pages[0].name, "page");
        assert_eq!(root.subtree_size(), 1001);
        let leaf = root.iter().last().unwrap();
        assert_eq!(leaf.id, "leaf");
        assert_eq!(leaf.depth, 1000);
    }
}

use crate::types::{LayoutComplexity, ResponsiveSummary, SceneNodeRecord};
use std::collections::BTreeMap;

/// Raw signals the composite layout score is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutSignals {
    pub nesting_depth: usize,
    pub auto_layout_usage: usize,
    pub constraint_patterns: usize,
    pub responsive_elements: usize,
}

impl LayoutSignals {
    /// Composite score in `1..=10`, non-decreasing in every signal.
    pub fn score(&self) -> u8 {
        let depth = (self.nesting_depth / 3).min(3);
        let auto_layout = (self.auto_layout_usage / 5).min(2);
        let diversity = self.constraint_patterns.saturating_sub(1).min(2);
        let density = (self.responsive_elements / 3).min(2);
        (1 + depth + auto_layout + diversity + density).min(10) as u8
    }
}

/// Gathers layout signals over every node of the extracted trees.
pub fn layout_signals<'a>(roots: impl IntoIterator<Item = &'a SceneNodeRecord>) -> (LayoutSignals, ResponsiveSummary) {
    let mut signals = LayoutSignals::default();
    let mut patterns: BTreeMap<String, usize> = BTreeMap::new();

    for node in roots.into_iter().flat_map(|r| r.iter()) {
        signals.nesting_depth = signals.nesting_depth.max(node.depth);
        if node.auto_layout.is_some() {
            signals.auto_layout_usage += 1;
        }
        if node.has_constraints {
            signals.responsive_elements += 1;
            *patterns.entry(node.constraints.pattern()).or_default() += 1;
        }
    }
    signals.constraint_patterns = patterns.len();

    let responsive = ResponsiveSummary {
        constrained_elements: signals.responsive_elements,
        patterns,
    };
    (signals, responsive)
}

/// Scores layout complexity for the extracted trees.
pub fn score_layout<'a>(roots: impl IntoIterator<Item = &'a SceneNodeRecord>) -> (LayoutComplexity, ResponsiveSummary) {
    let (signals, responsive) = layout_signals(roots);
    let layout = LayoutComplexity {
        nesting_depth: signals.nesting_depth,
        auto_layout_usage: signals.auto_layout_usage,
        responsive_elements: signals.responsive_elements,
        score: signals.score(),
    };
    (layout, responsive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Bounds, ConstraintKind, Constraints, LayoutMode, NodeKind, Padding, SizingMode};
    use crate::types::{AutoLayoutRecord, TextRecord};
    use proptest::prelude::*;

    fn node(id: &str, depth: usize, children: Vec<SceneNodeRecord>) -> SceneNodeRecord {
        SceneNodeRecord {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Frame,
            visible: true,
            locked: false,
            bounds: Bounds::default(),
            constraints: Constraints::default(),
            has_constraints: false,
            auto_layout: None,
            fills: None,
            stroke_count: 0,
            effect_count: 0,
            text: None,
            depth,
            children,
        }
    }

    #[test]
    fn test_single_text_node_scores_one() {
        let mut text = node("t", 0, vec![]);
        text.kind = NodeKind::Text;
        text.text = Some(TextRecord {
            characters: "Hello".to_string(),
            font_family: "sans-serif".to_string(),
            font_size: 16.0,
            font_weight: 400,
            line_height: 1.2,
        });

        let (layout, responsive) = score_layout([&text]);
        assert_eq!(layout.score, 1);
        assert_eq!(layout.auto_layout_usage, 0);
        assert_eq!(layout.nesting_depth, 0);
        assert_eq!(responsive.constrained_elements, 0);
    }

    #[test]
    fn test_signals_over_tree() {
        let mut stretched = node("c", 2, vec![]);
        stretched.has_constraints = true;
        stretched.constraints = Constraints {
            horizontal: ConstraintKind::LeftRight,
            vertical: ConstraintKind::Top,
        };
        let mut pinned = node("b", 1, vec![stretched]);
        pinned.has_constraints = true;
        pinned.auto_layout = Some(AutoLayoutRecord {
            mode: LayoutMode::Vertical,
            spacing: 4.0,
            padding: Padding::default(),
            primary_sizing: SizingMode::Auto,
            counter_sizing: SizingMode::Fixed,
        });
        let root = node("a", 0, vec![pinned]);

        let (signals, responsive) = layout_signals([&root]);
        assert_eq!(signals.nesting_depth, 2);
        assert_eq!(signals.auto_layout_usage, 1);
        assert_eq!(signals.responsive_elements, 2);
        assert_eq!(signals.constraint_patterns, 2);
        assert_eq!(responsive.patterns.get("LEFT/TOP"), Some(&1));
        assert_eq!(responsive.patterns.get("LEFT_RIGHT/TOP"), Some(&1));
        // only the pattern-diversity bonus applies
        assert_eq!(signals.score(), 2);
    }

    #[test]
    fn test_score_saturates() {
        let busy = LayoutSignals {
            nesting_depth: 100,
            auto_layout_usage: 100,
            constraint_patterns: 100,
            responsive_elements: 100,
        };
        assert_eq!(busy.score(), 10);
    }

    proptest! {
        #[test]
        fn prop_score_bounded(d in 0usize..1000, a in 0usize..1000, p in 0usize..50, r in 0usize..1000) {
            let s = LayoutSignals { nesting_depth: d, auto_layout_usage: a, constraint_patterns: p, responsive_elements: r }.score();
            prop_assert!((1..=10).contains(&s));
        }

        #[test]
        fn prop_score_monotonic(d in 0usize..100, a in 0usize..100, p in 0usize..20, r in 0usize..100, bump in 1usize..20) {
            let base = LayoutSignals { nesting_depth: d, auto_layout_usage: a, constraint_patterns: p, responsive_elements: r };
            let s = base.score();
            let deeper = LayoutSignals { nesting_depth: d + bump, ..base };
            let more_auto = LayoutSignals { auto_layout_usage: a + bump, ..base };
            let more_patterns = LayoutSignals { constraint_patterns: p + bump, ..base };
            let more_responsive = LayoutSignals { responsive_elements: r + bump, ..base };
            prop_assert!(deeper.score() >= s);
            prop_assert!(more_auto.score() >= s);
            prop_assert!(more_patterns.score() >= s);
            prop_assert!(more_responsive.score() >= s);
        }
    }
}

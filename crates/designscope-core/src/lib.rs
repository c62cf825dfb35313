//! Scene-graph extraction and summarization.
//!
//! Turns a selection of a design document into a bounded, self-contained
//! [`AnalysisPayload`]: node trees, document-wide components, instances,
//! interactive elements, design tokens and layout complexity.

pub mod assembler;
pub mod complexity;
pub mod document;
pub mod extractor;
pub mod host;
pub mod interaction;
pub mod tokens;
pub mod types;

pub use assembler::{assemble_payload, merge, PayloadLimits};
pub use complexity::{layout_signals, score_layout, LayoutSignals};
pub use document::{DocumentFile, DocumentNode, JsonDocument};
pub use extractor::{collect_interactions, Extraction, TreeExtractor};
pub use host::{HostError, HostNode, NodeKind, SceneGraph, StyleCatalog};
pub use interaction::{classify_name, looks_interactive, Classifier};
pub use tokens::harvest_tokens;
pub use types::*;

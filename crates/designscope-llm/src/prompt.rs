use designscope_common::{AnalysisError, Result};
use designscope_core::AnalysisPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Bumped whenever the instruction text or the requested JSON shape changes.
pub const PROMPT_TEMPLATE_VERSION: &str = "2024-11-01";

const ANALYSIS_TEMPLATE: &str = r#"You are a senior engineering lead reviewing a design before implementation.
Template version: {version}

The design was extracted from a design tool into the structured summary below:
pages with their layer trees, document-wide components with reuse counts,
component instances, design tokens, interactive elements, layout complexity and
responsive constraints. Rendered snapshots of the selection may follow.

Analysis scope: {analysis_type}
Focus: {priority}

Design data:
```json
{payload}
```

Assess the engineering effort to build this design. Respond with a single JSON
object ONLY, no extra commentary, matching exactly this schema:
{
  "feasibility": {
    "score": 1-10,
    "technical": "summary of the technical approach",
    "challenges": ["string"],
    "alternatives": ["string"]
  },
  "effort": {
    "hours": number,
    "storyPoints": number,
    "complexity": "low|medium|high",
    "breakdown": [{ "task": "string", "hours": number }]
  },
  "coordination": {
    "teams": ["string"],
    "dependencies": ["string"],
    "timeline": "string",
    "criticalPath": ["string"]
  },
  "recommendations": [{ "title": "string", "description": "string", "priority": "low|medium|high" }],
  "risks": [{ "title": "string", "severity": "low|medium|high", "mitigation": "string" }],
  "confidence": 0.0-1.0
}"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Full,
    Component,
    Layout,
}

impl AnalysisType {
    fn scope(&self) -> &'static str {
        match self {
            AnalysisType::Full => "the complete selection: structure, components, styling and interactions",
            AnalysisType::Component => "component architecture: reuse, variants and component API surface",
            AnalysisType::Layout => "layout: nesting, auto-layout flows and responsive behaviour",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Feasibility,
    Effort,
    Coordination,
    #[default]
    All,
}

impl Priority {
    fn focus(&self) -> &'static str {
        match self {
            Priority::Feasibility => "technical feasibility first; keep effort and coordination brief",
            Priority::Effort => "effort estimation first; give a detailed hour breakdown",
            Priority::Coordination => "cross-team coordination first; dependencies and critical path",
            Priority::All => "feasibility, effort and coordination with equal weight",
        }
    }
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Full => "full",
            AnalysisType::Component => "component",
            AnalysisType::Layout => "layout",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(AnalysisType::Full),
            "component" => Ok(AnalysisType::Component),
            "layout" => Ok(AnalysisType::Layout),
            other => Err(AnalysisError::Config(format!("unknown analysis type '{}'", other))),
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Feasibility => "feasibility",
            Priority::Effort => "effort",
            Priority::Coordination => "coordination",
            Priority::All => "all",
        }
    }
}

impl FromStr for Priority {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "feasibility" => Ok(Priority::Feasibility),
            "effort" => Ok(Priority::Effort),
            "coordination" => Ok(Priority::Coordination),
            "all" => Ok(Priority::All),
            other => Err(AnalysisError::Config(format!("unknown priority '{}'", other))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

/// One block of a user message, in the messages API wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    /// Snapshots beyond this are dropped to bound request cost.
    pub max_images: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { max_images: 3 }
    }
}

pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    /// Snapshots attached per request at most.
    pub fn max_images(&self) -> usize {
        self.config.max_images
    }

    /// Instruction text with the payload embedded, images excluded.
    pub fn instruction_text(
        &self,
        payload: &AnalysisPayload,
        analysis_type: AnalysisType,
        priority: Priority,
    ) -> Result<String> {
        let structured = payload
            .to_structured_text()
            .map_err(|e| AnalysisError::Config(format!("payload is not serializable: {}", e)))?;

        Ok(ANALYSIS_TEMPLATE
            .replace("{version}", PROMPT_TEMPLATE_VERSION)
            .replace("{analysis_type}", analysis_type.scope())
            .replace("{priority}", priority.focus())
            .replace("{payload}", &structured))
    }

    /// Content blocks for one request: the instruction text, then a label and an
    /// image block per attached snapshot.
    pub fn build(
        &self,
        payload: &AnalysisPayload,
        analysis_type: AnalysisType,
        priority: Priority,
    ) -> Result<Vec<ContentBlock>> {
        let mut blocks = vec![ContentBlock::text(self.instruction_text(payload, analysis_type, priority)?)];

        let images = payload.images.as_deref().unwrap_or_default();
        if images.len() > self.config.max_images {
            warn!(
                "Attaching {} of {} snapshots (cap {})",
                self.config.max_images,
                images.len(),
                self.config.max_images
            );
        }
        for (i, image) in images.iter().take(self.config.max_images).enumerate() {
            blocks.push(ContentBlock::text(format!("Snapshot {}: {}", i + 1, image.label)));
            blocks.push(ContentBlock::Image {
                source: ImageSource {
                    kind: "base64".to_string(),
                    media_type: image.media_type.clone(),
                    data: image.data.clone(),
                },
            });
        }

        debug!("Built prompt with {} content blocks", blocks.len());
        Ok(blocks)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptConfig::default())
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feasibility {
    /// 1 (impractical) to 10 (straightforward).
    pub score: f64,
    pub technical: String,
    pub challenges: Vec<String>,
    pub alternatives: Vec<String>,
}

impl Default for Feasibility {
    fn default() -> Self {
        Self {
            score: 5.0,
            technical: "Analysis incomplete".to_string(),
            challenges: Vec::new(),
            alternatives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffortItem {
    pub task: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Effort {
    pub hours: f64,
    pub story_points: f64,
    pub complexity: String,
    pub breakdown: Vec<EffortItem>,
}

impl Default for Effort {
    fn default() -> Self {
        Self {
            hours: 0.0,
            story_points: 0.0,
            complexity: "medium".to_string(),
            breakdown: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Coordination {
    pub teams: Vec<String>,
    pub dependencies: Vec<String>,
    pub timeline: String,
    pub critical_path: Vec<String>,
}

impl Default for Coordination {
    fn default() -> Self {
        Self {
            teams: Vec::new(),
            dependencies: Vec::new(),
            timeline: "Unknown".to_string(),
            critical_path: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Risk {
    pub title: String,
    pub severity: String,
    pub mitigation: String,
}

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Fully populated engineering assessment. Produced only by the response
/// validator, which guarantees every field is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub feasibility: Feasibility,
    pub effort: Effort,
    pub coordination: Coordination,
    pub recommendations: Vec<Recommendation>,
    pub risks: Vec<Risk>,
    /// Model's self-reported confidence, in `[0, 1]`.
    pub confidence: f64,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            feasibility: Feasibility::default(),
            effort: Effort::default(),
            coordination: Coordination::default(),
            recommendations: Vec::new(),
            risks: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Body of `POST /api/analyze-project`. Everything except the description is
/// optional; missing attributes are rendered as "Not specified" in the prompt.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeProjectRequest {
    pub project_type: Option<String>,
    pub borough: Option<String>,
    pub square_footage: Option<String>,
    pub budget_range: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeProjectResponse {
    pub analysis: String,
}

/// Body of `POST /api/estimate-cost`. The optional `baseEstimate` is a
/// client-computed baseline; when absent the server derives one from the
/// cost model tables.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateCostRequest {
    pub project_type: Option<String>,
    pub borough: Option<String>,
    pub square_footage: Option<String>,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
    pub description: Option<String>,
    pub base_estimate: Option<BaseEstimate>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct BaseEstimate {
    pub min: f64,
    pub max: f64,
}

/// A cost range in whole USD, both bounds rounded to the nearest 1000.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub min: i64,
    pub max: i64,
    pub reasoning: String,
}

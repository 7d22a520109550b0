//! Orchestrates the two AI endpoints: project analysis and cost estimation.
//!
//! Every provider attempt is metered into the [`UsageStore`], success or not.
//! Transport failures (provider never reached) degrade to deterministic
//! fallbacks so the client always gets a usable answer; provider rejections
//! surface as upstream errors, with the raw body attached only in development.

use log::{error, warn};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::clients::chat_client::{ChatClient, ChatError};
use crate::error::{AppError, AppResult};
use crate::models::quote::{
    AnalyzeProjectRequest, AnalyzeProjectResponse, CostEstimate, EstimateCostRequest,
};
use crate::models::usage::UsageLogInput;
use crate::services::cost_model;
use crate::services::usage_store::{UsageStore, calculate_cost};
use crate::utils::request_meta::RequestMeta;

const ANALYZE_ENDPOINT: &str = "/api/analyze-project";
const ESTIMATE_ENDPOINT: &str = "/api/estimate-cost";

const ANALYZE_MAX_TOKENS: u32 = 500;
const ANALYZE_TEMPERATURE: f32 = 0.7;
const ESTIMATE_MAX_TOKENS: u32 = 300;
const ESTIMATE_TEMPERATURE: f32 = 0.3;

const ANALYZE_SYSTEM_PROMPT: &str = "You are RenoBot, an AI renovation assistant for NYC Renovation Experts. Analyze renovation project descriptions and provide:
1. A brief scope of work
2. Key considerations
3. Suggested timeline
4. Cost factors to consider

Be helpful, professional, and concise. Focus on renovation in NYC context.";

pub struct EstimationService {
    client: ChatClient,
    store: Arc<UsageStore>,
    development: bool,
}

impl EstimationService {
    pub fn new(client: ChatClient, store: Arc<UsageStore>, development: bool) -> Self {
        Self {
            client,
            store,
            development,
        }
    }

    /// Free-form project analysis. Falls back to a canned analysis when the
    /// provider cannot be reached, so the endpoint still succeeds offline.
    pub async fn analyze_project(
        &self,
        request: &AnalyzeProjectRequest,
        meta: &RequestMeta,
    ) -> AppResult<AnalyzeProjectResponse> {
        let description = required_description(request.description.as_deref())?;
        let started = Instant::now();

        let user_prompt = format!(
            "Project Type: {}\nLocation: {}\nSquare Footage: {}\nBudget: {}\n\nProject Description: {}",
            or_not_specified(request.project_type.as_deref()),
            or_not_specified(request.borough.as_deref()),
            or_not_specified(request.square_footage.as_deref()),
            or_not_specified(request.budget_range.as_deref()),
            description,
        );

        let result = self
            .client
            .chat_completion(
                ANALYZE_SYSTEM_PROMPT,
                &user_prompt,
                ANALYZE_MAX_TOKENS,
                ANALYZE_TEMPERATURE,
            )
            .await;

        match result {
            Ok(completion) => {
                self.record(
                    ANALYZE_ENDPOINT,
                    meta,
                    request.project_type.clone(),
                    completion.total_tokens,
                    true,
                    None,
                    started,
                )
                .await;
                Ok(AnalyzeProjectResponse {
                    analysis: completion.content,
                })
            }
            Err(ChatError::Transport(e)) => {
                warn!("Provider unreachable, serving fallback analysis: {}", e);
                self.record(
                    ANALYZE_ENDPOINT,
                    meta,
                    request.project_type.clone(),
                    0,
                    false,
                    Some(e.to_string()),
                    started,
                )
                .await;
                Ok(AnalyzeProjectResponse {
                    analysis: fallback_analysis(request),
                })
            }
            Err(err @ ChatError::Provider { .. }) => {
                error!("Provider rejected analysis request: {}", err);
                self.record(
                    ANALYZE_ENDPOINT,
                    meta,
                    request.project_type.clone(),
                    0,
                    false,
                    Some(err.to_string()),
                    started,
                )
                .await;
                Err(self.provider_error("Failed to analyze project", &err))
            }
        }
    }

    /// AI-backed cost range. The deterministic model supplies the baseline in
    /// the prompt and stands in entirely when the provider is unreachable.
    pub async fn estimate_cost(
        &self,
        request: &EstimateCostRequest,
        meta: &RequestMeta,
    ) -> AppResult<CostEstimate> {
        let description = required_description(request.description.as_deref())?;
        let started = Instant::now();

        let baseline = cost_model::estimate(
            request.project_type.as_deref(),
            request.square_footage.as_deref(),
            request.borough.as_deref(),
            request.budget_range.as_deref(),
        );
        // A client-computed baseline takes precedence in the prompt.
        let (baseline_min, baseline_max) = match request.base_estimate {
            Some(base) => (base.min, base.max),
            None => (baseline.min as f64, baseline.max as f64),
        };

        let system_prompt = estimate_system_prompt(baseline_min, baseline_max);
        let user_prompt = format!(
            "Project Type: {}\nBorough: {}\nSquare Footage: {}\nBudget Range: {}\nTimeline: {}\n\nProject Description: {}\n\nAnalyze this project and provide an accurate cost estimate range considering NYC market rates, project complexity, and materials likely needed.",
            or_not_specified(request.project_type.as_deref()),
            or_not_specified(request.borough.as_deref()),
            or_not_specified(request.square_footage.as_deref()),
            or_not_specified(request.budget_range.as_deref()),
            or_not_specified(request.timeline.as_deref()),
            description,
        );

        let result = self
            .client
            .chat_completion(
                &system_prompt,
                &user_prompt,
                ESTIMATE_MAX_TOKENS,
                ESTIMATE_TEMPERATURE,
            )
            .await;

        match result {
            Ok(completion) => {
                let parsed = parse_json_estimate(&completion.content)
                    .or_else(|| parse_numeric_estimate(&completion.content));

                match parsed {
                    Some(estimate) => {
                        self.record(
                            ESTIMATE_ENDPOINT,
                            meta,
                            request.project_type.clone(),
                            completion.total_tokens,
                            true,
                            None,
                            started,
                        )
                        .await;
                        Ok(estimate)
                    }
                    None => {
                        error!("Could not parse estimate from provider response");
                        self.record(
                            ESTIMATE_ENDPOINT,
                            meta,
                            request.project_type.clone(),
                            0,
                            false,
                            Some("Could not parse AI response".to_string()),
                            started,
                        )
                        .await;
                        Err(AppError::Internal(
                            "Could not parse AI response".to_string(),
                        ))
                    }
                }
            }
            Err(ChatError::Transport(e)) => {
                warn!("Provider unreachable, serving model baseline estimate: {}", e);
                self.record(
                    ESTIMATE_ENDPOINT,
                    meta,
                    request.project_type.clone(),
                    0,
                    false,
                    Some(e.to_string()),
                    started,
                )
                .await;
                Ok(baseline)
            }
            Err(err @ ChatError::Provider { .. }) => {
                error!("Provider rejected estimate request: {}", err);
                self.record(
                    ESTIMATE_ENDPOINT,
                    meta,
                    request.project_type.clone(),
                    0,
                    false,
                    Some(err.to_string()),
                    started,
                )
                .await;
                Err(self.provider_error("Failed to estimate cost", &err))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        endpoint: &str,
        meta: &RequestMeta,
        project_type: Option<String>,
        tokens_used: i64,
        success: bool,
        error: Option<String>,
        started: Instant,
    ) {
        let model = self.client.model().to_string();
        self.store
            .record(UsageLogInput {
                endpoint: endpoint.to_string(),
                ip: meta.ip.clone(),
                source: meta.source.clone(),
                project_type,
                tokens_used,
                cost: calculate_cost(tokens_used, &model),
                model,
                success,
                error,
                response_time_ms: started.elapsed().as_millis() as i64,
            })
            .await;
    }

    fn provider_error(&self, message: &str, err: &ChatError) -> AppError {
        let status = match err {
            ChatError::Provider { status, .. } => *status,
            ChatError::Transport(_) => 502,
        };
        let message = if self.development {
            format!("{}: {}", message, err)
        } else {
            message.to_string()
        };
        AppError::External { status, message }
    }
}

fn required_description(description: Option<&str>) -> AppResult<&str> {
    match description {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::BadRequest(
            "Project description is required".to_string(),
        )),
    }
}

fn or_not_specified(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => "Not specified",
    }
}

fn estimate_system_prompt(baseline_min: f64, baseline_max: f64) -> String {
    format!(
        "You are an expert renovation cost estimator for NYC. Based on project descriptions, analyze the complexity, materials, and scope to provide accurate cost estimates. \n\nNYC Average Costs:\n- Kitchen: $15K-$75K ($150/sqft base)\n- Bathroom: $8K-$35K ($200/sqft base)\n- Full Home: $50K-$200K ($100/sqft base)\n- Basement: $20K-$80K ($80/sqft base)\n\nBorough Multipliers:\n- Manhattan: +30%\n- Brooklyn: +10%\n- Queens: Base\n- Bronx: -10%\n- Staten Island: -10%\n\nFactors to consider:\n- Luxury finishes add 50-100%\n- Custom work adds 30-50%\n- Permit complexity affects timeline/cost\n- Structural changes significantly increase cost\n- High-end appliances/materials increase cost\n\nRespond ONLY with a JSON object in this exact format:\n{{\"min\": 25000, \"max\": 45000, \"reasoning\": \"Brief explanation of estimate\"}}\n\nBase estimate provided: ${} - ${}",
        format_usd(baseline_min),
        format_usd(baseline_max),
    )
}

/// Templated analysis served when the provider is unreachable.
fn fallback_analysis(request: &AnalyzeProjectRequest) -> String {
    let project_type = request.project_type.as_deref().unwrap_or("renovation");
    let borough = request.borough.as_deref().unwrap_or("NYC");
    let sqft = request.square_footage.as_deref().unwrap_or("500");

    format!(
        "Scope of Work: Based on your {} project in {} ({} sq ft), I've identified the following key components:\n\
         - Design and planning phase\n\
         - Permits and approvals\n\
         - Material selection and procurement\n\
         - Construction and installation\n\
         - Final inspection and cleanup\n\n\
         Key Considerations: Your project will require attention to NYC building codes, proper permits, and quality materials suited for NYC's climate.\n\n\
         Estimated Timeline: 4-12 weeks depending on project complexity and permit processing time.",
        project_type, borough, sqft
    )
}

/// Integer part with thousands separators, matching how the baseline appears
/// in the prompt ("$45,000").
fn format_usd(value: f64) -> String {
    let whole = value.round() as i64;
    let digits = whole.abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if whole < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

#[derive(serde::Deserialize)]
struct RawEstimate {
    min: f64,
    max: f64,
    #[serde(default)]
    reasoning: String,
}

/// Primary parse: the substring from the first `{` to the last `}` as JSON.
fn parse_json_estimate(text: &str) -> Option<CostEstimate> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    let raw: RawEstimate = serde_json::from_str(&text[start..=end]).ok()?;
    Some(finalize_estimate(raw.min, raw.max, raw.reasoning))
}

/// Secondary parse: the first two dollar figures anywhere in the text. The
/// whole response becomes the reasoning since there is no structured field.
fn parse_numeric_estimate(text: &str) -> Option<CostEstimate> {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    let re = AMOUNT.get_or_init(|| Regex::new(r"\$?([\d,]+)").expect("valid amount regex"));

    let mut amounts = re.captures_iter(text).filter_map(|caps| {
        caps.get(1)
            .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
    });
    let min = amounts.next()?;
    let max = amounts.next()?;
    Some(finalize_estimate(min, max, text.to_string()))
}

/// Rounds both bounds to the nearest 1000 and orders them.
fn finalize_estimate(min: f64, max: f64, reasoning: String) -> CostEstimate {
    let a = cost_model::round_to_thousand(min);
    let b = cost_model::round_to_thousand(max);
    CostEstimate {
        min: a.min(b),
        max: a.max(b),
        reasoning,
    }
}

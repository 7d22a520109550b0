//! Public AI endpoints: project analysis and cost estimation.

use actix_web::{HttpRequest, HttpResponse, web};

use crate::error::AppResult;
use crate::models::quote::{AnalyzeProjectRequest, EstimateCostRequest};
use crate::services::estimation::EstimationService;
use crate::utils::request_meta::RequestMeta;

pub async fn analyze_project(
    req: HttpRequest,
    body: web::Json<AnalyzeProjectRequest>,
    service: web::Data<EstimationService>,
) -> AppResult<HttpResponse> {
    let meta = RequestMeta::from_request(&req);
    let response = service.analyze_project(&body, &meta).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn estimate_cost(
    req: HttpRequest,
    body: web::Json<EstimateCostRequest>,
    service: web::Data<EstimationService>,
) -> AppResult<HttpResponse> {
    let meta = RequestMeta::from_request(&req);
    let estimate = service.estimate_cost(&body, &meta).await?;
    Ok(HttpResponse::Ok().json(estimate))
}

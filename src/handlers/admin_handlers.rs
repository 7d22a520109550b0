//! Admin endpoints for inspecting and resetting the usage log. All of these
//! sit behind the bearer-password middleware.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::usage::UsageLogEntry;
use crate::services::usage_store::UsageStore;

const DEFAULT_LOG_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub source: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<UsageLogEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct ClearLogsResponse {
    pub message: String,
}

pub async fn get_stats(store: web::Data<UsageStore>) -> AppResult<HttpResponse> {
    let data = store.stats().await;
    Ok(HttpResponse::Ok().json(data))
}

pub async fn get_logs(
    query: web::Query<LogsQuery>,
    store: web::Data<UsageStore>,
) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let logs = store.recent_entries(limit, query.source.as_deref()).await;
    Ok(HttpResponse::Ok().json(LogsResponse { logs }))
}

pub async fn clear_logs(store: web::Data<UsageStore>) -> AppResult<HttpResponse> {
    store.clear().await;
    Ok(HttpResponse::Ok().json(ClearLogsResponse {
        message: "Logs cleared successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usage::{UsageLogFile, UsageLogInput};
    use actix_web::{App, test};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(source: &str, tokens: i64) -> UsageLogInput {
        UsageLogInput {
            endpoint: "/api/estimate-cost".to_string(),
            ip: "127.0.0.1".to_string(),
            source: source.to_string(),
            project_type: None,
            tokens_used: tokens,
            cost: 0.0,
            model: "deepseek-chat".to_string(),
            success: true,
            error: None,
            response_time_ms: 10,
        }
    }

    async fn store_with_entries(dir: &TempDir) -> Arc<UsageStore> {
        let store = Arc::new(UsageStore::new(dir.path().join("usage.json")));
        store.record(entry("quote.html", 10)).await;
        store.record(entry("other", 20)).await;
        store.record(entry("quote.html", 30)).await;
        store
    }

    #[actix_web::test]
    async fn stats_returns_full_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = store_with_entries(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(store))
                .route("/admin/stats", web::get().to(get_stats)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/admin/stats").to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let body: UsageLogFile = test::read_body_json(resp).await;
        assert_eq!(body.stats.total_calls, 3);
        assert_eq!(body.stats.total_tokens, 60);
        assert_eq!(body.logs.len(), 3);
    }

    #[actix_web::test]
    async fn logs_honors_limit_and_source_filter() {
        let dir = TempDir::new().unwrap();
        let store = store_with_entries(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(store))
                .route("/admin/logs", web::get().to(get_logs)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/logs?limit=1&source=quote.html")
                .to_request(),
        )
        .await;
        let body: LogsResponse = test::read_body_json(resp).await;
        assert_eq!(body.logs.len(), 1);
        assert_eq!(body.logs[0].source, "quote.html");
        assert_eq!(body.logs[0].tokens_used, 30);
    }

    #[actix_web::test]
    async fn clear_empties_the_store() {
        let dir = TempDir::new().unwrap();
        let store = store_with_entries(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(Arc::clone(&store)))
                .route("/admin/clear-logs", web::post().to(clear_logs)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/admin/clear-logs")
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        assert_eq!(store.stats().await, UsageLogFile::default());
    }
}

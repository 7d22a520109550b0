//! Fixed-window per-IP rate limiting for the public AI endpoints.

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use dashmap::DashMap;
use futures_util::future::{Ready, ok};
use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::config::settings::RateLimitConfig;
use crate::error::AppError;
use crate::utils::request_meta::client_ip;

/// Per-client fixed window: `count` requests admitted so far, reset when
/// `reset_at` passes.
#[derive(Debug, Clone)]
struct ClientWindow {
    count: u64,
    reset_at: Instant,
}

/// In-memory rate limit state, shared by every worker and the sweep task.
#[derive(Clone)]
pub struct RateLimitStorage {
    windows: Arc<DashMap<String, ClientWindow>>,
}

impl RateLimitStorage {
    pub fn new() -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Admits or rejects one request for `key`. The DashMap entry API keeps
    /// the check-and-increment atomic per key under concurrency.
    pub fn check(&self, key: &str, max_requests: u64, window: Duration) -> bool {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| ClientWindow {
                count: 0,
                reset_at: now + window,
            });

        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + window;
        }

        if entry.count < max_requests {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    /// Drops windows whose reset point is more than `grace` in the past.
    /// Entries still inside (or just past) their window are kept; `check`
    /// resets those in place.
    pub fn sweep_expired(&self, grace: Duration) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| now < window.reset_at + grace);
        let removed = before - self.windows.len();
        if removed > 0 {
            debug!("Swept {} expired rate limit windows", removed);
        }
    }

    #[cfg(test)]
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimitStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    storage: RateLimitStorage,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig, storage: RateLimitStorage) -> Self {
        Self { config, storage }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitService {
            service: Arc::new(service),
            config: self.config.clone(),
            storage: self.storage.clone(),
        })
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    service: Arc<S>,
    config: RateLimitConfig,
    storage: RateLimitStorage,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();
        let storage = self.storage.clone();

        Box::pin(async move {
            // CORS preflight is never rate limited.
            if req.method() == actix_web::http::Method::OPTIONS {
                return service.call(req).await;
            }

            let ip = client_ip(req.headers(), req.peer_addr());
            let allowed = storage.check(
                &ip,
                config.max_requests,
                Duration::from_millis(config.window_ms),
            );

            if !allowed {
                warn!("Rate limit exceeded for {} on {}", ip, req.path());
                return Err(Error::from(AppError::TooManyRequests(
                    "Too many requests. Please try again later.".to_string(),
                )));
            }

            service.call(req).await
        })
    }
}

/// Background task that periodically evicts stale client windows so the map
/// does not grow without bound. Windows get one full window of grace past
/// their reset point before eviction.
pub async fn start_window_sweep_task(storage: RateLimitStorage, config: RateLimitConfig) {
    const SWEEP_INTERVAL: Duration = Duration::from_secs(300);
    let grace = Duration::from_millis(config.window_ms);
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    info!(
        "Starting rate limit sweep task (interval: {}s)",
        SWEEP_INTERVAL.as_secs()
    );

    loop {
        interval.tick().await;
        storage.sweep_expired(grace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use pretty_assertions::assert_eq;

    fn config(max_requests: u64, window_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            window_ms,
            max_requests,
        }
    }

    #[actix_web::test]
    async fn window_admits_up_to_max_then_rejects() {
        let storage = RateLimitStorage::new();
        let window = Duration::from_secs(60);

        assert!(storage.check("1.2.3.4", 2, window));
        assert!(storage.check("1.2.3.4", 2, window));
        assert!(!storage.check("1.2.3.4", 2, window));
        // Other clients are unaffected.
        assert!(storage.check("5.6.7.8", 2, window));
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let storage = RateLimitStorage::new();
        let window = Duration::from_millis(20);

        assert!(storage.check("1.2.3.4", 1, window));
        assert!(!storage.check("1.2.3.4", 1, window));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(storage.check("1.2.3.4", 1, window));
    }

    #[tokio::test]
    async fn sweep_drops_only_stale_windows() {
        let storage = RateLimitStorage::new();

        storage.check("stale", 5, Duration::from_millis(1));
        storage.check("fresh", 5, Duration::from_secs(60));
        assert_eq!(storage.tracked_clients(), 2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        storage.sweep_expired(Duration::from_millis(1));
        assert_eq!(storage.tracked_clients(), 1);
    }

    #[actix_web::test]
    async fn middleware_returns_429_past_the_limit() {
        let storage = RateLimitStorage::new();
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(config(2, 60_000), storage))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/ping")
                .insert_header(("x-forwarded-for", "203.0.113.9"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header(("x-forwarded-for", "203.0.113.9"))
            .to_request();
        let resp = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(
            resp.as_response_error().status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[actix_web::test]
    async fn anonymous_clients_share_the_unknown_bucket() {
        let storage = RateLimitStorage::new();
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(config(1, 60_000), storage.clone()))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        // TestRequest has no peer address and no proxy headers, so both
        // requests land in the same "unknown" window.
        let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp =
            test::try_call_service(&app, test::TestRequest::get().uri("/ping").to_request())
                .await
                .unwrap_err();
        assert_eq!(
            resp.as_response_error().status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[actix_web::test]
    async fn options_requests_bypass_the_limiter() {
        let storage = RateLimitStorage::new();
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(config(1, 60_000), storage))
                .route("/ping", web::route().to(HttpResponse::Ok)),
        )
        .await;

        for _ in 0..5 {
            let req = test::TestRequest::with_uri("/ping")
                .method(actix_web::http::Method::OPTIONS)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }
}

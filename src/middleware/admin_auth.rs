//! Bearer-password authentication for the admin endpoints.

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use futures_util::future::{Ready, ok};
use log::warn;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::AppError;

#[derive(Clone)]
pub struct AdminAuth {
    password: Arc<String>,
}

impl AdminAuth {
    pub fn new(password: &str) -> Self {
        Self {
            password: Arc::new(password.trim().to_string()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AdminAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminAuthService {
            service: Arc::new(service),
            password: self.password.clone(),
        })
    }
}

#[derive(Clone)]
pub struct AdminAuthService<S> {
    service: Arc<S>,
    password: Arc<String>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthService<S>
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
        let password = self.password.clone();

        Box::pin(async move {
            // CORS preflight carries no credentials.
            if req.method() == actix_web::http::Method::OPTIONS {
                return service.call(req).await;
            }

            let expected = format!("Bearer {}", password);
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(|header| header.trim() == expected)
                .unwrap_or(false);

            if !authorized {
                warn!("Rejected admin request to {}", req.path());
                return Err(Error::from(AppError::Unauthorized(
                    "Unauthorized. Admin password required.".to_string(),
                )));
            }

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use pretty_assertions::assert_eq;

    async fn call(auth_header: Option<&str>) -> StatusCode {
        let app = test::init_service(
            App::new()
                .wrap(AdminAuth::new("secret-pass"))
                .route("/stats", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let mut req = test::TestRequest::get().uri("/stats");
        if let Some(value) = auth_header {
            req = req.insert_header(("authorization", value));
        }
        match test::try_call_service(&app, req.to_request()).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        }
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        assert_eq!(call(None).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        assert_eq!(
            call(Some("Bearer wrong-pass")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn correct_password_passes() {
        assert_eq!(call(Some("Bearer secret-pass")).await, StatusCode::OK);
    }

    #[actix_web::test]
    async fn header_whitespace_is_tolerated() {
        assert_eq!(call(Some("  Bearer secret-pass  ")).await, StatusCode::OK);
    }

    #[actix_web::test]
    async fn options_requests_skip_auth() {
        let app = test::init_service(
            App::new()
                .wrap(AdminAuth::new("secret-pass"))
                .route("/stats", web::route().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::with_uri("/stats")
            .method(actix_web::http::Method::OPTIONS)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

use actix_web::web;

use crate::handlers;

/// Routes mounted under the rate-limited "/api" scope in main.rs.
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/analyze-project",
        web::post().to(handlers::quote_handlers::analyze_project),
    );
    cfg.route(
        "/estimate-cost",
        web::post().to(handlers::quote_handlers::estimate_cost),
    );
}

/// Routes mounted under the password-protected "/admin" scope in main.rs.
pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/stats", web::get().to(handlers::admin_handlers::get_stats));
    cfg.route("/logs", web::get().to(handlers::admin_handlers::get_logs));
    cfg.route(
        "/clear-logs",
        web::post().to(handlers::admin_handlers::clear_logs),
    );
}

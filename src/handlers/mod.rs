pub mod admin_handlers;
pub mod health;
pub mod quote_handlers;

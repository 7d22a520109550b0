pub mod cost_model;
pub mod estimation;
pub mod usage_store;

pub mod quote;
pub mod usage;

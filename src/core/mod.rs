pub mod cache;
pub mod elapsed;
pub mod models;
pub mod query;
pub mod settings;

pub mod config;
pub mod filewatcher;
pub mod http;
pub mod reload;
pub mod resource;
pub mod schema;

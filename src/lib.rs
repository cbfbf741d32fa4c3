pub mod api;
pub mod backend_client;
pub mod chart;
pub mod config;
pub mod http_client;
pub mod middleware;
pub mod services;

pub use services::auth_gate;
pub use services::password_reset;

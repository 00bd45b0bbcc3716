pub mod auth;
pub mod rate_limit;

pub use auth::BearerAuth;
pub use rate_limit::RateLimit;

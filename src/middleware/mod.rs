pub mod auth;
pub mod rate_limit;

pub use auth::AuthUser;
pub use rate_limit::{GlobalRateLimiter, build_limiter, rate_limit};

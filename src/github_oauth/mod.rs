pub mod endpoints;
pub mod service;

pub use endpoints::{GithubOauthEndpoints, GithubUser};
pub use service::GithubOauthService;

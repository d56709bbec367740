//! Minting and verification of the JWTs handed to the frontend after a
//! successful GitHub login. HS256 with a shared secret; the signing
//! internals are jsonwebtoken's concern.

use crate::error::LensError;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// GitHub login name.
    pub sub: String,
    /// GitHub numeric user id; the key into `user_tokens`.
    pub uid: i64,
    pub iat: i64,
    pub exp: i64,
}

pub fn mint(
    username: &str,
    github_id: i64,
    ttl: Duration,
    key: &EncodingKey,
) -> Result<String, LensError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: username.to_string(),
        uid: github_id,
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    Ok(encode(&Header::default(), &claims, key)?)
}

pub fn verify(token: &str, key: &DecodingKey) -> Result<Claims, LensError> {
    let data = decode::<Claims>(token, key, &Validation::default())?;
    Ok(data.claims)
}

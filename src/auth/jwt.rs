use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::model::user::User;
use crate::models::{Claims, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn generate_token(user: &User, token_type: TokenType, secret: &str, ttl: usize) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: user.id,
        sub: user.email.clone(),
        role: user.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(user: &User, secret: &str, ttl: usize) -> Result<String, Error> {
    generate_token(user, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(user: &User, secret: &str, ttl: usize) -> Result<(String, Claims), Error> {
    generate_token(user, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

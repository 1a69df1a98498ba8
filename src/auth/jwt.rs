use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims of the bearer tokens issued by the HRMS identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Username, which is the employee's work email.
    pub sub: String,
    pub role: u8,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("refresh tokens cannot be used for API calls")]
    NotAccessToken,
}

/// Checks signature and expiry, and that the token is an access token.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;

    if claims.token_type != TokenType::Access {
        return Err(TokenError::NotAccessToken);
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub const SECRET: &str = "leave-test-secret";

    pub fn token(
        user_id: u64,
        email: &str,
        role: u8,
        employee_id: Option<u64>,
        token_type: TokenType,
    ) -> String {
        let exp = (chrono::Utc::now() + chrono::Duration::minutes(15)).timestamp() as usize;
        let claims = Claims {
            user_id,
            sub: email.to_string(),
            role,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
            employee_id,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("token encodes")
    }
}

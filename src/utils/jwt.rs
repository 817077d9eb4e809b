use crate::entities::UserRole;
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, Page};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub role: UserRole,
    pub pages: Vec<Page>,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String, // "access" or "refresh"
}

impl Claims {
    pub fn to_auth_user(&self) -> AppResult<AuthUser> {
        let id = self
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;
        Ok(AuthUser {
            id,
            username: self.username.clone(),
            role: self.role,
            pages: self.pages.clone(),
        })
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
    refresh_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64, refresh_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
            refresh_token_expires_in: refresh_expires_in,
        }
    }

    pub fn generate_access_token(&self, user: &AuthUser) -> AppResult<String> {
        self.generate(user, "access", self.access_token_expires_in)
    }

    pub fn generate_refresh_token(&self, user: &AuthUser) -> AppResult<String> {
        self.generate(user, "refresh", self.refresh_token_expires_in)
    }

    fn generate(&self, user: &AuthUser, token_type: &str, expires_in: i64) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(expires_in);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            pages: user.pages.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: token_type.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        Ok(claims)
    }

    pub fn verify_refresh_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "refresh" {
            return Err(AppError::AuthError("Invalid refresh token type".to_string()));
        }

        Ok(claims)
    }

    pub fn get_access_token_expires_in(&self) -> i64 {
        self.access_token_expires_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff() -> AuthUser {
        AuthUser {
            id: 7,
            username: "ravi".to_string(),
            role: UserRole::Staff,
            pages: vec![Page::Orders, Page::Customers],
        }
    }

    #[test]
    fn test_access_token_roundtrip_keeps_permissions() {
        let jwt = JwtService::new("secret", 60, 120);
        let token = jwt.generate_access_token(&staff()).unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();
        let user = claims.to_auth_user().unwrap();
        assert_eq!(user, staff());
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let jwt = JwtService::new("secret", 60, 120);
        let access = jwt.generate_access_token(&staff()).unwrap();
        let refresh = jwt.generate_refresh_token(&staff()).unwrap();
        assert!(jwt.verify_refresh_token(&access).is_err());
        assert!(jwt.verify_access_token(&refresh).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = JwtService::new("secret", 60, 120);
        let other = JwtService::new("other", 60, 120);
        let token = jwt.generate_access_token(&staff()).unwrap();
        assert!(other.verify_access_token(&token).is_err());
    }
}

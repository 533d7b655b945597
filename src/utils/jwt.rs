//! JWT 签发与校验
//!
//! access token 放在 Authorization 头，refresh token 只通过 HttpOnly cookie 下发。
//! 两种 token 用 `token_type` 区分，互相不能替代。

use crate::config::AppConfig;
use crate::errors::{Result, SchoolSystemError};
use crate::models::users::entities::UserRole;
use actix_web::cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const ISSUER: &str = "schoolsys";
const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn lifetime(self, config: &AppConfig) -> chrono::Duration {
        match self {
            TokenKind::Access => chrono::Duration::minutes(config.jwt.access_token_expiry),
            TokenKind::Refresh => chrono::Duration::days(config.jwt.refresh_token_expiry),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户 ID
    pub role: UserRole,
    #[serde(rename = "token_type")]
    pub kind: TokenKind,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok().filter(|id| *id > 0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct JwtUtils;

impl JwtUtils {
    pub fn issue(user_id: i64, role: &UserRole, kind: TokenKind) -> Result<String> {
        let config = AppConfig::get();
        let now = chrono::Utc::now();

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.clone(),
            kind,
            iss: ISSUER.to_string(),
            exp: (now + kind.lifetime(config)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
        )
        .map_err(|e| SchoolSystemError::authentication(format!("签发 token 失败: {e}")))
    }

    pub fn issue_pair(user_id: i64, role: &UserRole) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: Self::issue(user_id, role, TokenKind::Access)?,
            refresh_token: Self::issue(user_id, role, TokenKind::Refresh)?,
        })
    }

    /// 校验签名、过期时间、签发者与 token 类型
    pub fn verify(token: &str, expected: TokenKind) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(AppConfig::get().jwt.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| SchoolSystemError::authentication(format!("token 无效: {e}")))?;

        if claims.kind != expected {
            return Err(SchoolSystemError::authentication("token 类型不匹配"));
        }
        Ok(claims)
    }

    pub fn refresh_cookie(refresh_token: &str) -> Cookie<'static> {
        let config = AppConfig::get();
        Cookie::build(REFRESH_COOKIE, refresh_token.to_string())
            .path("/api/v1/auth")
            .max_age(actix_web::cookie::time::Duration::days(
                config.jwt.refresh_token_expiry,
            ))
            .same_site(SameSite::Strict)
            .http_only(true)
            .secure(config.is_production())
            .finish()
    }

    pub fn refresh_token_from_request(req: &actix_web::HttpRequest) -> Option<String> {
        req.cookie(REFRESH_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let pair = JwtUtils::issue_pair(42, &UserRole::Teacher).expect("sign");

        let claims = JwtUtils::verify(&pair.access_token, TokenKind::Access).expect("access");
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.role, UserRole::Teacher);
        assert!(JwtUtils::verify(&pair.access_token, TokenKind::Refresh).is_err());
        assert!(JwtUtils::verify(&pair.refresh_token, TokenKind::Access).is_err());
        assert!(JwtUtils::verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = JwtUtils::verify("not-a-jwt", TokenKind::Access).expect_err("garbage");
        assert!(matches!(err, SchoolSystemError::Authentication(_)));
    }

    #[test]
    fn test_refresh_cookie_is_http_only() {
        let cookie = JwtUtils::refresh_cookie("abc");
        assert_eq!(cookie.name(), "refresh_token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }
}

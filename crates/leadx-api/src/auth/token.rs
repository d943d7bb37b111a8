//! Access Token 및 Refresh Token 발급/검증.
//!
//! 모든 연산은 (서명 키, 현재 시각, 입력)의 순수 함수입니다. 서명 키는
//! 시작 시 한 번 설정되는 읽기 전용 상태이므로 잠금 없이 동시에 호출할 수 있습니다.

use chrono::{DateTime, Duration, Utc};
use leadx_core::{JwtConfig, Role, MAX_TOKEN_TTL_SECS, MIN_SECRET_LEN};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::claims::{ClaimsCodec, TokenClaims, TokenType};
use crate::metrics::record_token_issued;

/// 토큰 처리 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("잘못된 토큰 형식")]
    Malformed,
    #[error("토큰 서명이 유효하지 않습니다")]
    SignatureInvalid,
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("지원하지 않는 토큰 유형")]
    UnsupportedType,
    #[error("이 요청에 사용할 수 없는 토큰 유형입니다")]
    WrongTokenType,
    #[error("신뢰할 수 없는 토큰 발급자 또는 대상")]
    Untrusted,
    #[error("폐기된 토큰입니다")]
    Revoked,
    #[error("서명 키 설정 오류: {0}")]
    KeyMisconfigured(String),
}

/// 로그인 성공 시 발급되는 토큰 쌍.
///
/// 서버 측에 저장되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access Token
    pub access_token: String,
    /// Refresh Token
    pub refresh_token: String,
    /// Access Token 만료 시간 (초)
    pub expires_in: i64,
}

/// 설정된 수명(초)을 검증된 [`Duration`]으로 변환.
fn ttl(kind: &str, secs: i64) -> Result<Duration, TokenError> {
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        return Err(TokenError::KeyMisconfigured(format!(
            "{} token lifetime out of range: {}",
            kind, secs
        )));
    }
    Duration::try_seconds(secs).ok_or_else(|| {
        TokenError::KeyMisconfigured(format!("{} token lifetime out of range: {}", kind, secs))
    })
}

/// 토큰 서비스.
pub struct TokenService {
    codec: ClaimsCodec,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// 설정에서 토큰 서비스를 생성합니다.
    ///
    /// 서명 키가 너무 짧으면 [`TokenError::KeyMisconfigured`]를 반환합니다.
    pub fn new(config: &JwtConfig) -> Result<Self, TokenError> {
        let secret = config.secret.expose_secret();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::KeyMisconfigured(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            codec: ClaimsCodec::new(secret.as_bytes(), &config.issuer, &config.audience),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: ttl("access", config.access_ttl_secs)?,
            refresh_ttl: ttl("refresh", config.refresh_ttl_secs)?,
        })
    }

    /// Access Token 수명 (초).
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Refresh Token 수명 (초).
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }

    fn claims(
        &self,
        subject: &str,
        roles: &[Role],
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            TokenError::KeyMisconfigured(format!(
                "{} token expiry out of range",
                token_type.as_str()
            ))
        })?;

        Ok(TokenClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            authorities: roles.iter().map(|r| r.as_str().to_string()).collect(),
            token_type,
            jti: Uuid::new_v4().to_string(),
        })
    }

    /// Access Token 발급.
    pub fn issue_access_token(&self, subject: &str, roles: &[Role]) -> Result<String, TokenError> {
        self.issue_access_token_at(subject, roles, Utc::now())
    }

    /// 주어진 시각 기준으로 Access Token 발급.
    pub fn issue_access_token_at(
        &self,
        subject: &str,
        roles: &[Role],
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let token = self
            .codec
            .encode(&self.claims(subject, roles, TokenType::Access, now)?)?;
        record_token_issued(TokenType::Access);
        Ok(token)
    }

    /// Refresh Token 발급.
    ///
    /// 역할은 포함하지 않습니다. 재발급 시 사용자 저장소에서 다시 조회합니다.
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_refresh_token_at(subject, Utc::now())
    }

    /// 주어진 시각 기준으로 Refresh Token 발급.
    pub fn issue_refresh_token_at(
        &self,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let token = self
            .codec
            .encode(&self.claims(subject, &[], TokenType::Refresh, now)?)?;
        record_token_issued(TokenType::Refresh);
        Ok(token)
    }

    /// Access Token + Refresh Token 쌍 발급.
    pub fn issue_token_pair(&self, subject: &str, roles: &[Role]) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.issue_access_token_at(subject, roles, now)?,
            refresh_token: self.issue_refresh_token_at(subject, now)?,
            expires_in: self.access_ttl_secs(),
        })
    }

    /// 토큰 검증.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// 주어진 시각 기준으로 토큰 검증.
    ///
    /// 검사 순서: 서명 → 구조 → 발급자/대상 → 만료 (`now > exp`) → 유형.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let raw = self.codec.decode(token)?;

        if now.timestamp() > raw.exp {
            debug!(exp = raw.exp, "Token expired");
            return Err(TokenError::Expired);
        }

        let token_type = raw
            .token_type
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(TokenType::parse)
            .ok_or(TokenError::UnsupportedType)?;
        let jti = raw.jti.filter(|j| !j.is_empty()).ok_or(TokenError::Malformed)?;

        Ok(TokenClaims {
            sub: raw.sub,
            iat: raw.iat,
            exp: raw.exp,
            iss: raw.iss,
            aud: raw.aud,
            authorities: raw.authorities,
            token_type,
            jti,
        })
    }

    /// Refresh Token 여부.
    pub fn is_refresh_token(claims: &TokenClaims) -> bool {
        claims.is_refresh()
    }
}

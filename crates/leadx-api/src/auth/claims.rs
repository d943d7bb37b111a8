//! 토큰 클레임 인코딩/디코딩.
//!
//! 클레임 집합을 HS512로 서명된 compact 토큰 문자열로 변환하고,
//! 서명과 구조를 검증하여 다시 클레임으로 복원합니다. 만료와 토큰 유형은
//! 호출 측([`TokenService`](super::TokenService))이 현재 시각 기준으로 판단합니다.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use leadx_core::Role;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::token::TokenError;

/// 토큰 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// API 호출용 단기 토큰
    Access,
    /// Access Token 재발급 전용 장기 토큰
    Refresh,
}

impl TokenType {
    /// 클레임에 기록되는 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }

    /// 클레임 문자열에서 유형 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "access" => Some(TokenType::Access),
            "refresh" => Some(TokenType::Refresh),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 토큰 페이로드.
///
/// 발급 후 변경되지 않으며 하나의 토큰과 일대일로 대응합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - 사용자 이름
    pub sub: String,
    /// Issued At (Unix timestamp, 초)
    pub iat: i64,
    /// Expiration (Unix timestamp, 초)
    pub exp: i64,
    /// 발급자
    pub iss: String,
    /// 대상
    pub aud: String,
    /// 역할 이름 목록 (순서 유지, Refresh Token은 비어 있음)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorities: Vec<String>,
    /// 토큰 유형
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// JWT ID - 블랙리스트 키
    pub jti: String,
}

impl TokenClaims {
    /// 알려진 역할만 순서대로 반환합니다.
    ///
    /// 알 수 없는 권한 문자열은 버립니다.
    pub fn roles(&self) -> Vec<Role> {
        self.authorities
            .iter()
            .filter_map(|authority| {
                let role = Role::parse(authority);
                if role.is_none() {
                    debug!(authority = %authority, "Dropping unknown authority from token");
                }
                role
            })
            .collect()
    }

    /// Refresh Token 여부.
    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenType::Refresh
    }
}

/// 서명 검증만 거친 원시 클레임.
///
/// `type`은 문자열이 아닌 값도 구조 오류가 아닌 유형 오류로 보고하기 위해
/// JSON 값 그대로 유지합니다.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub authorities: Vec<String>,
    #[serde(rename = "type", default)]
    pub token_type: Option<serde_json::Value>,
    #[serde(default)]
    pub jti: Option<String>,
}

/// HS512 클레임 코덱.
///
/// 키와 검증 규칙은 생성 시 한 번 만들어지고 이후 읽기 전용입니다.
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ClaimsCodec {
    /// 서명 키와 발급자/대상으로 코덱을 생성합니다.
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        // 만료는 주입된 현재 시각으로 TokenService가 검사
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["sub", "iat", "exp", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// 클레임을 서명된 토큰 문자열로 인코딩합니다.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS512), claims, &self.encoding_key)
            .map_err(|e| TokenError::KeyMisconfigured(e.to_string()))
    }

    /// 서명과 구조를 검증하고 원시 클레임을 반환합니다.
    pub(crate) fn decode(&self, token: &str) -> Result<RawClaims, TokenError> {
        decode::<RawClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = match e.kind() {
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidAlgorithm
                    | ErrorKind::InvalidAlgorithmName => TokenError::SignatureInvalid,
                    ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => TokenError::Untrusted,
                    ErrorKind::InvalidKeyFormat => TokenError::KeyMisconfigured(e.to_string()),
                    _ => TokenError::Malformed,
                };
                debug!(kind = ?e.kind(), "Token decode failed");
                err
            })
    }
}

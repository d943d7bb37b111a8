//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다. 인증/인가 거부는
//! [`AuthRejection`]으로 표현되며, HTTP 상태 코드와 에러 코드로의 매핑은
//! 이 경계에서만 이루어집니다.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::{CredentialError, TokenError};

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "TOKEN_EXPIRED",
///   "message": "토큰이 만료되었습니다",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "TOKEN_EXPIRED", "FORBIDDEN")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    /// 현재 시각의 에러 응답 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// 거부 응답에 첨부되는 에러 코드.
///
/// 응답 extension으로 삽입되어 메트릭 미들웨어가 본문을 파싱하지 않고 거부 사유를 집계합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectionCode(pub &'static str);

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, AuthRejection>;

/// 인증/인가 거부 사유.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
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
    #[error("인증이 필요합니다")]
    Unauthenticated,
    #[error("접근 권한이 없습니다")]
    Forbidden,
    #[error("비활성화된 계정입니다")]
    AccountDisabled,
    #[error("계정이 잠겼습니다. 잠시 후 다시 시도하세요")]
    AccountLocked,
    #[error("만료된 계정 또는 비밀번호입니다")]
    AccountExpired,
    #[error("사용자 이름 또는 비밀번호가 올바르지 않습니다")]
    BadCredentials,
    #[error("인증 서비스를 일시적으로 사용할 수 없습니다")]
    Unavailable,
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String),
    #[error("내부 서버 오류")]
    Internal,
}

impl AuthRejection {
    /// 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::Malformed => "TOKEN_MALFORMED",
            AuthRejection::SignatureInvalid => "TOKEN_SIGNATURE_INVALID",
            AuthRejection::Expired => "TOKEN_EXPIRED",
            AuthRejection::UnsupportedType => "TOKEN_UNSUPPORTED_TYPE",
            AuthRejection::WrongTokenType => "WRONG_TOKEN_TYPE",
            AuthRejection::Untrusted => "TOKEN_UNTRUSTED",
            AuthRejection::Revoked => "TOKEN_REVOKED",
            AuthRejection::Unauthenticated => "UNAUTHENTICATED",
            AuthRejection::Forbidden => "FORBIDDEN",
            AuthRejection::AccountDisabled => "ACCOUNT_DISABLED",
            AuthRejection::AccountLocked => "ACCOUNT_LOCKED",
            AuthRejection::AccountExpired => "ACCOUNT_EXPIRED",
            AuthRejection::BadCredentials => "INVALID_CREDENTIALS",
            AuthRejection::Unavailable => "SERVICE_UNAVAILABLE",
            AuthRejection::InvalidRequest(_) => "VALIDATION_ERROR",
            AuthRejection::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP 상태 코드.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthRejection::Malformed
            | AuthRejection::SignatureInvalid
            | AuthRejection::Expired
            | AuthRejection::UnsupportedType
            | AuthRejection::WrongTokenType
            | AuthRejection::Untrusted
            | AuthRejection::Revoked
            | AuthRejection::Unauthenticated
            | AuthRejection::BadCredentials => StatusCode::UNAUTHORIZED,
            AuthRejection::Forbidden
            | AuthRejection::AccountDisabled
            | AuthRejection::AccountExpired => StatusCode::FORBIDDEN,
            AuthRejection::AccountLocked => StatusCode::LOCKED,
            AuthRejection::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthRejection::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AuthRejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AuthRejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AuthRejection::Malformed,
            TokenError::SignatureInvalid => AuthRejection::SignatureInvalid,
            TokenError::Expired => AuthRejection::Expired,
            TokenError::UnsupportedType => AuthRejection::UnsupportedType,
            TokenError::WrongTokenType => AuthRejection::WrongTokenType,
            TokenError::Untrusted => AuthRejection::Untrusted,
            TokenError::Revoked => AuthRejection::Revoked,
            TokenError::KeyMisconfigured(reason) => {
                error!(reason = %reason, "Signing key misconfigured");
                AuthRejection::Internal
            }
        }
    }
}

impl From<CredentialError> for AuthRejection {
    fn from(err: CredentialError) -> Self {
        match err {
            // 존재하지 않는 계정과 비밀번호 불일치는 구분하지 않음
            CredentialError::NotFound | CredentialError::BadPassword { .. } => {
                AuthRejection::BadCredentials
            }
            CredentialError::Disabled => AuthRejection::AccountDisabled,
            CredentialError::Locked { .. } => AuthRejection::AccountLocked,
            CredentialError::Expired => AuthRejection::AccountExpired,
            CredentialError::Unavailable(e) => {
                error!(error = %e, "Credential store unavailable");
                if e.is_transient() {
                    AuthRejection::Unavailable
                } else {
                    AuthRejection::Internal
                }
            }
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiErrorResponse::new(self.code(), self.to_string());
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(RejectionCode(self.code()));

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

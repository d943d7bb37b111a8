//! 인증 미들웨어.
//!
//! 요청마다 Bearer 토큰을 추출/검증하여 [`AuthOutcome`]을 요청 extensions에
//! 기록합니다. 이 단계는 요청을 직접 거부하지 않으며, 보호 경로에서의 거부는
//! 인가 단계가 담당합니다.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::auth::{
    AuthOutcome, Identity, PublicPaths, TokenBlacklist, TokenError, TokenService,
};
use crate::metrics::record_authentication;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// `Authorization: Bearer <token>` 헤더에서 토큰을 추출합니다.
///
/// 헤더가 없거나 접두사가 다르면 `None`입니다.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// 요청 단위 인증기.
pub struct Authenticator<'a> {
    tokens: &'a TokenService,
    blacklist: Option<&'a TokenBlacklist>,
    public_paths: &'a PublicPaths,
}

impl<'a> Authenticator<'a> {
    /// 새 인증기 생성.
    pub fn new(
        tokens: &'a TokenService,
        blacklist: Option<&'a TokenBlacklist>,
        public_paths: &'a PublicPaths,
    ) -> Self {
        Self {
            tokens,
            blacklist,
            public_paths,
        }
    }

    /// 경로와 헤더로 인증 결과를 결정합니다.
    ///
    /// - 공개 접두사 경로: 검증 생략, `Anonymous`
    /// - 토큰 없음: `Anonymous`
    /// - 유효한 Access Token: `Authenticated`
    /// - 유효한 Refresh Token: `Rejected(WrongTokenType)`
    /// - 검증 실패: `Rejected(사유)`
    /// - 블랙리스트 조회 실패: `Anonymous` (보호 경로에서는 거부됨)
    pub async fn authenticate(
        &self,
        path: &str,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> AuthOutcome {
        if self.public_paths.matches(path) {
            return AuthOutcome::Anonymous;
        }

        let Some(token) = extract_bearer(headers) else {
            return AuthOutcome::Anonymous;
        };

        let claims = match self.tokens.validate_at(token, now) {
            Ok(claims) => claims,
            Err(TokenError::KeyMisconfigured(reason)) => {
                warn!(reason = %reason, "Token validation failed internally");
                return AuthOutcome::Anonymous;
            }
            Err(e) => {
                debug!(error = %e, path = %path, "Token rejected");
                return AuthOutcome::Rejected(e);
            }
        };

        if TokenService::is_refresh_token(&claims) {
            return AuthOutcome::Rejected(TokenError::WrongTokenType);
        }

        if let Some(blacklist) = self.blacklist {
            match blacklist.is_revoked(&claims.jti).await {
                Ok(true) => return AuthOutcome::Rejected(TokenError::Revoked),
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Blacklist lookup failed, treating request as anonymous");
                    return AuthOutcome::Anonymous;
                }
            }
        }

        AuthOutcome::Authenticated(Identity::from_claims(&claims))
    }
}

fn outcome_label(outcome: &AuthOutcome, bypassed: bool) -> String {
    match outcome {
        AuthOutcome::Authenticated(_) => "authenticated".to_string(),
        AuthOutcome::Anonymous if bypassed => "bypass".to_string(),
        AuthOutcome::Anonymous => "anonymous".to_string(),
        AuthOutcome::Rejected(e) => crate::error::AuthRejection::from(e.clone())
            .code()
            .to_lowercase(),
    }
}

/// 인증 미들웨어.
///
/// 결과는 항상 요청 extensions에 기록되며 요청은 다음 단계로 전달됩니다.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let authenticator = Authenticator::new(
        &state.tokens,
        state.blacklist.as_ref(),
        &state.public_paths,
    );

    let outcome = authenticator
        .authenticate(&path, request.headers(), Utc::now())
        .await;

    record_authentication(&outcome_label(&outcome, state.public_paths.matches(&path)));
    if let Some(identity) = outcome.identity() {
        debug!(subject = %identity.subject, path = %path, "Request authenticated");
    }

    request.extensions_mut().insert(outcome);
    next.run(request).await
}

//! 요청 단위 인증 결과.
//!
//! 인증 미들웨어가 요청 extensions에 [`AuthOutcome`]을 기록하고,
//! 인가 미들웨어와 핸들러는 이를 값으로 읽습니다. 전역 보안 컨텍스트는 없습니다.

use std::collections::BTreeSet;

use axum::{extract::FromRequestParts, http::request::Parts};
use leadx_core::Role;

use super::claims::{TokenClaims, TokenType};
use super::token::TokenError;
use crate::error::AuthRejection;

/// 토큰에서 매 요청마다 새로 만들어지는 불변 신원 정보.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// 주체 이름
    pub subject: String,
    /// 역할 집합
    pub roles: BTreeSet<Role>,
    /// 토큰 유형
    pub token_type: TokenType,
}

impl Identity {
    /// 검증된 클레임에서 신원 생성.
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            subject: claims.sub.clone(),
            roles: claims.roles().into_iter().collect(),
            token_type: claims.token_type,
        }
    }

    /// 요구 역할 중 하나라도 가지고 있는지 확인.
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.iter().any(|role| self.roles.contains(role))
    }
}

/// 인증 단계 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// 유효한 Access Token
    Authenticated(Identity),
    /// 토큰 없음, 공개 경로 우회, 또는 내부 오류 (보호 경로에서는 거부됨)
    Anonymous,
    /// 토큰이 제시되었으나 거부됨
    Rejected(TokenError),
}

impl AuthOutcome {
    /// 인증된 신원.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthOutcome::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// 보호 경로에서 신원이 없을 때 돌려줄 거부 사유.
    pub fn rejection(&self) -> AuthRejection {
        match self {
            AuthOutcome::Rejected(err) => AuthRejection::from(err.clone()),
            _ => AuthRejection::Unauthenticated,
        }
    }
}

/// 현재 요청의 인증된 신원 추출기.
///
/// ```rust,ignore
/// async fn handler(CurrentIdentity(identity): CurrentIdentity) -> String {
///     identity.subject
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthOutcome>() {
            Some(AuthOutcome::Authenticated(identity)) => Ok(CurrentIdentity(identity.clone())),
            Some(outcome) => Err(outcome.rejection()),
            None => Err(AuthRejection::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn claims(authorities: &[&str]) -> TokenClaims {
        TokenClaims {
            sub: "alice".to_string(),
            iat: 0,
            exp: 60,
            iss: "lead-exchange".to_string(),
            aud: "lead-exchange-users".to_string(),
            authorities: authorities.iter().map(|a| a.to_string()).collect(),
            token_type: TokenType::Access,
            jti: "id".to_string(),
        }
    }

    #[test]
    fn test_identity_from_claims() {
        let identity = Identity::from_claims(&claims(&["USER", "ROLE_ENTERPRISE", "GHOST"]));
        assert_eq!(identity.subject, "alice");
        assert_eq!(
            identity.roles,
            BTreeSet::from([Role::User, Role::Enterprise])
        );
        assert!(identity.has_any_role(&[Role::Admin, Role::Enterprise]));
        assert!(!identity.has_any_role(&[Role::Admin]));
        assert!(!identity.has_any_role(&[]));
    }

    #[test]
    fn test_outcome_rejection_reason() {
        assert!(matches!(
            AuthOutcome::Anonymous.rejection(),
            AuthRejection::Unauthenticated
        ));
        assert!(matches!(
            AuthOutcome::Rejected(TokenError::Expired).rejection(),
            AuthRejection::Expired
        ));
    }

    #[tokio::test]
    async fn test_extractor_reads_extension() {
        let identity = Identity::from_claims(&claims(&["ADMIN"]));
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(AuthOutcome::Authenticated(identity.clone()));
        let (mut parts, _) = request.into_parts();

        let CurrentIdentity(extracted) = CurrentIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted, identity);
    }

    #[tokio::test]
    async fn test_extractor_without_outcome() {
        let (mut parts, _) = Request::new(()).into_parts();
        let result = CurrentIdentity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }
}

//! 경로 패턴 기반 역할 인가.
//!
//! 라우트 테이블은 시작 시 한 번 구성되며 이후 변경되지 않습니다.
//! 가장 구체적인 패턴부터 평가하여 첫 번째로 일치하는 항목이 필요한 역할을
//! 결정합니다. 일치하는 항목이 없으면 인증만 요구합니다.
//!
//! 패턴 문법: `*`는 한 세그먼트, `**`는 0개 이상의 세그먼트와 일치합니다.

use axum::http::Method;
use leadx_core::{Role, RouteRule};

use super::identity::Identity;

/// 정책 구성 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("잘못된 경로 패턴: {0}")]
    InvalidPattern(String),
    #[error("잘못된 HTTP 메서드: {0}")]
    InvalidMethod(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    Rest,
}

/// 경로 패턴.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// 패턴 파싱.
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        if !pattern.starts_with('/') {
            return Err(PolicyError::InvalidPattern(pattern.to_string()));
        }

        let segments = split_path(pattern)
            .map(|segment| match segment {
                "**" => Ok(Segment::Rest),
                "*" => Ok(Segment::Single),
                s if s.contains('*') => Err(PolicyError::InvalidPattern(pattern.to_string())),
                s => Ok(Segment::Literal(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// 원본 패턴 문자열.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 경로 일치 여부.
    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split_path(path).collect();
        match_segments(&self.segments, &path)
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    fn has_rest(&self) -> bool {
        self.segments.contains(&Segment::Rest)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Rest, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            None => false,
            Some((head, tail)) => {
                let ok = match segment {
                    Segment::Literal(lit) => lit == head,
                    _ => true,
                };
                ok && match_segments(rest, tail)
            }
        },
    }
}

/// 라우트 접근 요구사항.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// 인증 불필요
    Public,
    /// 유효한 신원만 필요
    Authenticated,
    /// 나열된 역할 중 하나 필요
    AnyRole(Vec<Role>),
}

/// 거부 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// 신원 없음
    Unauthenticated,
    /// 신원은 있으나 역할 부족
    Forbidden,
}

/// 인가 결정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    /// 메트릭 라벨.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny(DenyReason::Unauthenticated) => "unauthenticated",
            Decision::Deny(DenyReason::Forbidden) => "forbidden",
        }
    }
}

#[derive(Debug, Clone)]
struct PolicyEntry {
    pattern: RoutePattern,
    methods: Vec<Method>,
    access: Access,
}

impl PolicyEntry {
    fn applies(&self, path: &str, method: &Method) -> bool {
        (self.methods.is_empty() || self.methods.contains(method)) && self.pattern.matches(path)
    }
}

/// 인가 정책.
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    entries: Vec<PolicyEntry>,
}

const AUTHENTICATED_ONLY: Access = Access::Authenticated;

impl AuthorizationPolicy {
    /// 라우트 규칙으로 정책을 구성합니다.
    ///
    /// 규칙은 메서드 제한이 있는 순, 리터럴 세그먼트가 많은 순, `**`가 없는 순으로
    /// 안정 정렬됩니다. 구체성이 같으면 설정 순서를 유지합니다.
    pub fn from_rules(rules: &[RouteRule]) -> Result<Self, PolicyError> {
        let mut entries = rules
            .iter()
            .map(|rule| {
                let methods = rule
                    .methods
                    .iter()
                    .map(|m| {
                        Method::from_bytes(m.trim().to_uppercase().as_bytes())
                            .map_err(|_| PolicyError::InvalidMethod(m.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let access = if rule.public {
                    Access::Public
                } else if rule.roles.is_empty() {
                    Access::Authenticated
                } else {
                    Access::AnyRole(rule.roles.clone())
                };

                Ok(PolicyEntry {
                    pattern: RoutePattern::parse(&rule.pattern)?,
                    methods,
                    access,
                })
            })
            .collect::<Result<Vec<_>, PolicyError>>()?;

        entries.sort_by_key(|entry| {
            (
                entry.methods.is_empty(),
                std::cmp::Reverse(entry.pattern.literal_count()),
                entry.pattern.has_rest(),
            )
        });

        Ok(Self { entries })
    }

    /// 경로와 메서드에 적용되는 접근 요구사항.
    pub fn required_access(&self, path: &str, method: &Method) -> &Access {
        self.entries
            .iter()
            .find(|entry| entry.applies(path, method))
            .map(|entry| &entry.access)
            .unwrap_or(&AUTHENTICATED_ONLY)
    }

    /// 인가 결정.
    pub fn authorize(&self, identity: Option<&Identity>, path: &str, method: &Method) -> Decision {
        match (self.required_access(path, method), identity) {
            (Access::Public, _) => Decision::Allow,
            (_, None) => Decision::Deny(DenyReason::Unauthenticated),
            (Access::Authenticated, Some(_)) => Decision::Allow,
            (Access::AnyRole(roles), Some(identity)) => {
                if identity.has_any_role(roles) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden)
                }
            }
        }
    }

    /// 평가 순서대로 정렬된 패턴 목록.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.pattern.as_str())
    }
}

/// 토큰 검증을 완전히 생략하는 경로 접두사 목록.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    prefixes: Vec<String>,
}

impl PublicPaths {
    /// 접두사 목록으로 생성.
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// 접두사 일치 여부.
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenType;
    use leadx_core::SecurityConfig;
    use std::collections::BTreeSet;

    fn identity(roles: &[Role]) -> Identity {
        Identity {
            subject: "alice".to_string(),
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            token_type: TokenType::Access,
        }
    }

    fn default_policy() -> AuthorizationPolicy {
        AuthorizationPolicy::from_rules(&SecurityConfig::default().routes).unwrap()
    }

    #[test]
    fn test_pattern_matching() {
        let rest = RoutePattern::parse("/api/lead/**").unwrap();
        assert!(rest.matches("/api/lead"));
        assert!(rest.matches("/api/lead/42"));
        assert!(rest.matches("/api/lead/42/notes/"));
        assert!(!rest.matches("/api/leads/42"));

        let single = RoutePattern::parse("/api/*/profile").unwrap();
        assert!(single.matches("/api/user/profile"));
        assert!(!single.matches("/api/profile"));
        assert!(!single.matches("/api/a/b/profile"));

        let middle = RoutePattern::parse("/api/**/export").unwrap();
        assert!(middle.matches("/api/export"));
        assert!(middle.matches("/api/lead/1/export"));
        assert!(!middle.matches("/api/lead/1"));

        assert!(RoutePattern::parse("/**").unwrap().matches("/"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(RoutePattern::parse("api/lead").is_err());
        assert!(RoutePattern::parse("/static/*.js").is_err());

        let rule = RouteRule::public("/x").methods(&["GE T"]);
        assert!(matches!(
            AuthorizationPolicy::from_rules(&[rule]),
            Err(PolicyError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_user_denied_admin_allowed_lead() {
        let policy = default_policy();
        let user = identity(&[Role::User]);

        assert_eq!(
            policy.authorize(Some(&user), "/api/admin/x", &Method::GET),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            policy.authorize(Some(&user), "/api/lead/x", &Method::GET),
            Decision::Allow
        );
    }

    #[test]
    fn test_unauthenticated_distinct_from_forbidden() {
        let policy = default_policy();
        assert_eq!(
            policy.authorize(None, "/api/admin/x", &Method::GET),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            policy.authorize(Some(&identity(&[Role::Agent])), "/api/admin/x", &Method::GET),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_public_and_default_rules() {
        let policy = default_policy();
        assert_eq!(
            policy.authorize(None, "/api/auth/login", &Method::POST),
            Decision::Allow
        );
        assert_eq!(
            policy.authorize(None, "/health", &Method::GET),
            Decision::Allow
        );

        // 테이블에 없는 경로는 인증만 요구
        assert_eq!(
            policy.authorize(None, "/api/unlisted", &Method::GET),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            policy.authorize(Some(&identity(&[Role::Agent])), "/api/unlisted", &Method::GET),
            Decision::Allow
        );
    }

    #[test]
    fn test_me_more_specific_than_auth_wildcard() {
        let policy = default_policy();
        assert_eq!(
            policy.required_access("/api/auth/me", &Method::GET),
            &Access::Authenticated
        );
        assert_eq!(
            policy.required_access("/api/auth/logout", &Method::POST),
            &Access::Public
        );
    }

    #[test]
    fn test_method_restricted_rule() {
        let policy = default_policy();
        let enterprise = identity(&[Role::Enterprise]);

        assert_eq!(
            policy.authorize(Some(&enterprise), "/api/user/profile", &Method::GET),
            Decision::Deny(DenyReason::Forbidden)
        );
        // DELETE는 메서드 제한 규칙에 해당하지 않으므로 기본 규칙 (인증만)
        assert_eq!(
            policy.authorize(Some(&enterprise), "/api/user/profile", &Method::DELETE),
            Decision::Allow
        );
        // OPTIONS /** 공개 규칙
        assert_eq!(
            policy.authorize(None, "/api/unlisted", &Method::OPTIONS),
            Decision::Allow
        );
    }

    #[test]
    fn test_options_allowed_on_role_protected_routes() {
        let policy = default_policy();
        for path in ["/api/lead/1", "/api/admin/users", "/api/user/profile"] {
            assert_eq!(
                policy.authorize(None, path, &Method::OPTIONS),
                Decision::Allow,
                "OPTIONS {}",
                path
            );
        }
        // 다른 메서드는 여전히 역할 규칙 적용
        assert_eq!(
            policy.authorize(None, "/api/admin/users", &Method::GET),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_specificity_order_and_tie_keeps_config_order() {
        let rules = vec![
            RouteRule::with_roles("/api/**", &[Role::Admin]),
            RouteRule::with_roles("/api/lead/*", &[Role::User]),
            RouteRule::with_roles("/api/lead/**", &[Role::Enterprise]),
        ];
        let policy = AuthorizationPolicy::from_rules(&rules).unwrap();
        let patterns: Vec<&str> = policy.patterns().collect();
        assert_eq!(patterns, vec!["/api/lead/*", "/api/lead/**", "/api/**"]);

        let tie = vec![
            RouteRule::with_roles("/api/a/*", &[Role::User]),
            RouteRule::with_roles("/api/*/b", &[Role::Admin]),
        ];
        let policy = AuthorizationPolicy::from_rules(&tie).unwrap();
        assert_eq!(
            policy.required_access("/api/a/b", &Method::GET),
            &Access::AnyRole(vec![Role::User])
        );
    }

    #[test]
    fn test_public_paths_prefix_match() {
        let public = PublicPaths::new(SecurityConfig::default().public_paths);
        assert!(public.matches("/api/auth/login"));
        assert!(public.matches("/api/public/leads"));
        assert!(public.matches("/health/ready"));
        assert!(!public.matches("/api/auth/me"));
        assert!(!public.matches("/api/lead/1"));
    }
}

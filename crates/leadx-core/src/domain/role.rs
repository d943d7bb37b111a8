//! 사용자 역할 정의.

use serde::{Deserialize, Serialize};

/// 레거시 권한 문자열의 역할 접두사.
const AUTHORITY_PREFIX: &str = "ROLE_";

/// 사용자 역할.
///
/// 토큰의 `authorities` 클레임과 라우트 정책 테이블에서 대문자 이름으로 사용됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// 관리자 - 관리 엔드포인트 접근
    Admin,
    /// 개인 사용자
    User,
    /// 기업 사용자
    Enterprise,
    /// 에이전트
    Agent,
}

impl Role {
    /// 모든 역할.
    pub const ALL: [Role; 4] = [Role::Admin, Role::User, Role::Enterprise, Role::Agent];

    /// 역할 이름 반환 (토큰 클레임에 기록되는 형식).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
            Role::Enterprise => "ENTERPRISE",
            Role::Agent => "AGENT",
        }
    }

    /// 문자열에서 역할 파싱.
    ///
    /// 대소문자를 구분하지 않으며 `ROLE_` 접두사가 붙은 권한 문자열도 허용합니다.
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        let name = upper.strip_prefix(AUTHORITY_PREFIX).unwrap_or(&upper);
        match name {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            "ENTERPRISE" => Some(Role::Enterprise),
            "AGENT" => Some(Role::Agent),
            _ => None,
        }
    }

    /// 사용자 유형 코드에서 역할 목록 생성.
    ///
    /// `sys_user.user_type`: 1 개인, 2 기업, 3 관리자.
    pub fn from_user_type(user_type: i32) -> Vec<Role> {
        match user_type {
            2 => vec![Role::Enterprise],
            3 => vec![Role::Admin, Role::User],
            _ => vec![Role::User],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("Unknown role: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("Enterprise"), Some(Role::Enterprise));
        assert_eq!(Role::parse("unknown"), None);
    }

    #[test]
    fn test_role_parse_legacy_prefix() {
        assert_eq!(Role::parse("ROLE_ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("role_agent"), Some(Role::Agent));
        assert_eq!(Role::parse("ROLE_"), None);
    }

    #[test]
    fn test_role_from_user_type() {
        assert_eq!(Role::from_user_type(1), vec![Role::User]);
        assert_eq!(Role::from_user_type(2), vec![Role::Enterprise]);
        assert_eq!(Role::from_user_type(3), vec![Role::Admin, Role::User]);
        // 알 수 없는 코드는 개인 사용자로 취급
        assert_eq!(Role::from_user_type(99), vec![Role::User]);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Enterprise).unwrap();
        assert_eq!(json, "\"ENTERPRISE\"");

        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Role::Enterprise);
    }

    #[test]
    fn test_display_matches_as_str() {
        for role in Role::ALL {
            assert_eq!(role.to_string(), role.as_str());
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }
}

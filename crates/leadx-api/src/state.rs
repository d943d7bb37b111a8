//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 보안 구성요소와 외부 저장소 핸들을 보관합니다.
//! 모든 필드는 시작 시 한 번 구성되는 읽기 전용 값이며 Arc로 공유됩니다.

use std::sync::Arc;

use leadx_core::{AppConfig, CacheStore, Credential, CredentialStore, SeedUser};
use leadx_data::{Database, MemoryCredentialStore};
use tracing::info;

use crate::auth::{
    hash_password, AuthenticationProvider, AuthorizationPolicy, PasswordAuthenticationProvider,
    PasswordError, PolicyError, PublicPaths, TokenBlacklist, TokenError, TokenService,
};

/// 상태 구성 에러.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("토큰 서비스 초기화 실패: {0}")]
    Token(#[from] TokenError),
    #[error("인가 정책 구성 실패: {0}")]
    Policy(#[from] PolicyError),
    #[error("초기 사용자 비밀번호 해싱 실패: {0}")]
    Seed(#[from] PasswordError),
}

/// 애플리케이션 공유 상태.
///
/// Axum의 State extractor를 통해 핸들러와 미들웨어에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 토큰 발급/검증
    pub tokens: Arc<TokenService>,

    /// 자격증명 인증 및 재조회
    pub provider: Arc<dyn AuthenticationProvider>,

    /// 로그아웃 토큰 블랙리스트 (비활성화 시 None)
    pub blacklist: Option<TokenBlacklist>,

    /// 경로별 인가 정책
    pub policy: Arc<AuthorizationPolicy>,

    /// 토큰 검증 생략 경로 접두사
    pub public_paths: Arc<PublicPaths>,

    /// 데이터베이스 (헬스 체크용, 미설정 시 None)
    pub database: Option<Database>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 설정과 저장소로 AppState를 구성합니다.
    ///
    /// `cache`가 `None`이거나 블랙리스트가 비활성화되어 있으면 로그아웃은
    /// 토큰을 폐기하지 않습니다.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn CredentialStore>,
        cache: Option<Arc<dyn CacheStore>>,
        database: Option<Database>,
    ) -> Result<Self, StateError> {
        let timeout = config.store.timeout();

        let tokens = TokenService::new(&config.jwt)?;
        let policy = AuthorizationPolicy::from_rules(&config.security.routes)?;
        let provider = PasswordAuthenticationProvider::new(store, config.lockout, timeout);
        let blacklist = cache
            .filter(|_| config.blacklist.enabled)
            .map(|cache| TokenBlacklist::new(cache, timeout));

        info!(
            routes = config.security.routes.len(),
            public_paths = config.security.public_paths.len(),
            blacklist = blacklist.is_some(),
            "Security state initialized"
        );

        Ok(Self {
            tokens: Arc::new(tokens),
            provider: Arc::new(provider),
            blacklist,
            policy: Arc::new(policy),
            public_paths: Arc::new(PublicPaths::new(config.security.public_paths.clone())),
            database,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        match &self.database {
            Some(db) => db.health_check().await.unwrap_or(false),
            None => false,
        }
    }

    /// 블랙리스트 저장소 상태 확인.
    pub async fn is_blacklist_healthy(&self) -> bool {
        match &self.blacklist {
            Some(blacklist) => blacklist.ping().await.is_ok(),
            None => false,
        }
    }
}

/// 설정의 초기 사용자로 메모리 사용자 저장소를 만듭니다 (개발용).
pub fn memory_store_from_seed(users: &[SeedUser]) -> Result<MemoryCredentialStore, PasswordError> {
    let credentials = users
        .iter()
        .map(|user| {
            Ok(Credential::new(
                user.username.clone(),
                hash_password(&user.password)?,
                user.roles.clone(),
            ))
        })
        .collect::<Result<Vec<_>, PasswordError>>()?;

    Ok(MemoryCredentialStore::with_credentials(credentials))
}

/// 테스트용 서명 키.
#[cfg(test)]
pub const TEST_SECRET: &str = "test-secret-key-that-is-long-enough-for-hs512";

/// 테스트용 기본 설정.
#[cfg(test)]
pub fn test_config() -> AppConfig {
    AppConfig::from_toml_str(&format!("[jwt]\nsecret = \"{}\"\n", TEST_SECRET))
        .expect("test config")
}

/// 테스트용 AppState 생성.
///
/// 메모리 저장소와 초기 사용자 `alice`(USER), `root`(ADMIN), `acme`(ENTERPRISE)를
/// 사용합니다. 비밀번호는 모두 `password123!`입니다.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    use leadx_core::Role;
    use leadx_data::MemoryCache;

    let config = test_config();
    let seed = [
        ("alice", Role::User),
        ("root", Role::Admin),
        ("acme", Role::Enterprise),
    ]
    .map(|(username, role)| SeedUser {
        username: username.to_string(),
        password: "password123!".to_string(),
        roles: vec![role],
    });

    let store = memory_store_from_seed(&seed).expect("seed users");
    AppState::from_config(
        &config,
        Arc::new(store),
        Some(Arc::new(MemoryCache::new())),
        None,
    )
    .expect("test state")
}

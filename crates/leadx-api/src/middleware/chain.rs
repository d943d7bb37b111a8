//! 보안 미들웨어 체인.
//!
//! 단계 순서를 명시적으로 선언하고, 구성 시점에 순서 규칙을 검증합니다.
//!
//! ```rust,ignore
//! let chain = SecurityChain::builder()
//!     .then(Stage::Authenticate)
//!     .then(Stage::Authorize)
//!     .build()?;
//! let app = chain.apply(router, &state);
//! ```

use std::fmt;
use std::sync::Arc;

use axum::{middleware, Router};

use super::authenticate::authenticate;
use super::authorize::authorize;
use crate::state::AppState;

/// 체인 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 토큰 검증 및 신원 기록
    Authenticate,
    /// 경로 정책에 따른 허용/거부
    Authorize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Authenticate => write!(f, "authenticate"),
            Stage::Authorize => write!(f, "authorize"),
        }
    }
}

/// 체인 구성 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("보안 체인이 비어 있습니다")]
    Empty,
    #[error("인가 단계는 인증 단계 뒤에 와야 합니다")]
    AuthorizeBeforeAuthenticate,
    #[error("중복된 단계: {0}")]
    DuplicateStage(Stage),
}

/// 체인 빌더.
#[derive(Debug, Default)]
pub struct SecurityChainBuilder {
    stages: Vec<Stage>,
}

impl SecurityChainBuilder {
    /// 다음 단계 추가.
    pub fn then(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// 순서 규칙을 검증하고 체인을 생성합니다.
    pub fn build(self) -> Result<SecurityChain, ChainError> {
        if self.stages.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut seen: Vec<Stage> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            if seen.contains(stage) {
                return Err(ChainError::DuplicateStage(*stage));
            }
            if *stage == Stage::Authorize && !seen.contains(&Stage::Authenticate) {
                return Err(ChainError::AuthorizeBeforeAuthenticate);
            }
            seen.push(*stage);
        }

        Ok(SecurityChain {
            stages: self.stages,
        })
    }
}

/// 검증된 보안 체인.
#[derive(Debug, Clone)]
pub struct SecurityChain {
    stages: Vec<Stage>,
}

impl SecurityChain {
    /// 빌더 생성.
    pub fn builder() -> SecurityChainBuilder {
        SecurityChainBuilder::default()
    }

    /// 인증 → 인가 표준 체인.
    pub fn standard() -> Self {
        Self {
            stages: vec![Stage::Authenticate, Stage::Authorize],
        }
    }

    /// 선언 순서.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// 라우터에 체인을 적용합니다.
    ///
    /// 나중에 추가된 레이어가 먼저 실행되므로 역순으로 추가하여
    /// 선언 순서대로 실행되게 합니다.
    pub fn apply<S>(&self, router: Router<S>, state: &Arc<AppState>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.stages
            .iter()
            .rev()
            .fold(router, |router, stage| match stage {
                Stage::Authenticate => {
                    router.layer(middleware::from_fn_with_state(state.clone(), authenticate))
                }
                Stage::Authorize => {
                    router.layer(middleware::from_fn_with_state(state.clone(), authorize))
                }
            })
    }
}

//! # Lead Exchange Core
//!
//! 마켓플레이스 인증 서브시스템 전반에서 공유되는 핵심 타입을 제공합니다.
//!
//! - 역할 및 자격증명 도메인 모델
//! - 외부 협력자 계약 (사용자 저장소, 캐시 저장소)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;

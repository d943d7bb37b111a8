//! 인증 도메인 모델.
//!
//! - [`Role`]: 사용자 역할 (ADMIN, USER, ENTERPRISE, AGENT)
//! - [`Credential`]: 외부 사용자 저장소가 소유한 자격증명 레코드
//! - [`CredentialStore`], [`CacheStore`]: 외부 협력자 계약

mod credential;
mod role;
mod store;

pub use credential::{Credential, FailedLogin, LockoutPolicy};
pub use role::Role;
pub use store::{CacheStore, CredentialStore};

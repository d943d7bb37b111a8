//! API 서버용 HTTP middleware.
//!
//! 요청 처리 파이프라인에 적용되는 보안 체인, 보안 응답 헤더, 메트릭 미들웨어.

mod authenticate;
mod authorize;
mod chain;
mod headers;
mod metrics;

pub use authenticate::{authenticate, extract_bearer, Authenticator};
pub use authorize::authorize;
pub use chain::{ChainError, SecurityChain, SecurityChainBuilder, Stage};
pub use headers::{security_headers, HSTS_POLICY, REFERRER_POLICY};
pub use metrics::metrics_layer;

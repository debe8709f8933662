//! 탐지 규칙 -- 알려진 공격 시그니처 매칭
//!
//! 내장 규칙 테이블([`builtin`])과 운영자가 YAML로 추가하는 규칙([`loader`])을
//! 하나의 불변 테이블로 컴파일하여 [`RuleMatcher`]가 보유합니다.
//!
//! # 추가 규칙 형식
//! ```yaml
//! rules:
//!   - id: wp_login_bruteforce
//!     category: failed-login
//!     pattern: 'POST /wp-login\.php'
//!     severity: medium
//! ```
//!
//! # 구성
//! - [`RuleMatcher`]: 메시지 → 위협 카테고리 집합
//! - [`loader`]: YAML 파일 로딩 및 유효성 검증
//! - [`types`]: 규칙 선언과 컴파일된 규칙
//! - [`builtin`]: 내장 패턴과 카테고리 기본 심각도

pub mod builtin;
pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::RuleLoader;
pub use matcher::RuleMatcher;
pub use types::{Rule, RuleDef, RuleStatus};

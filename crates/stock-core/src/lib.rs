//! # Stock Core
//!
//! 시세 데이터 수집기의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 수집 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 수집 작업(FetchTask) 및 상태
//! - 일봉/주봉/월봉 데이터 구조체
//! - 종목 및 거래일 캘린더 정의
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;

//! 수집 시스템 전반에서 사용되는 공통 타입.

mod date;
mod frequency;

pub use date::*;
pub use frequency::*;

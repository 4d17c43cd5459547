//! 수집 도메인 모델.

mod bar;
mod calendar;
mod instrument;
mod task;
mod unit;

pub use bar::*;
pub use calendar::*;
pub use instrument::*;
pub use task::*;
pub use unit::*;

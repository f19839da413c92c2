//! action/mod.rs：
//! - 作為 action 子模組的入口，統一 re-export ability、movement、pending 等子模組。
//! - 不放具體邏輯或資料結構實作。
mod ability;
mod movement;
mod pending;

pub use ability::*;
pub use movement::*;
pub use pending::*;

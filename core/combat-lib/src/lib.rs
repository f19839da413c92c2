use serde::{Deserialize, Serialize};

mod action;
mod ai;
mod battle;
mod board;
mod boss;
mod config;
mod damage;
mod error;
mod game;
mod pool;
mod session;
mod setup;
mod unit;
mod view;

pub use action::*;
pub use ai::*;
pub use battle::*;
pub use board::*;
pub use boss::*;
pub use config::*;
pub use damage::*;
pub use error::*;
pub use game::*;
pub use pool::*;
pub use session::*;
pub use setup::*;
pub use unit::*;
pub use view::*;

pub use abilities_lib::{
    Ability, AbilityEffect, AbilityID, AbilityTable, Cost, FollowUp, Targeting, UnitClass,
};

pub type UnitID = u64;
pub type Hp = u32;
pub type ActionPoints = u32;

/// 棋盤座標：x 為行（column），y 為列（row）
#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Chebyshev 距離：max(|dx|, |dy|)
    pub fn distance(self, other: Pos) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// 以 (dx, dy) 位移，結果為負時回傳 None（不檢查棋盤上界）
    pub fn offset(self, dx: isize, dy: isize) -> Option<Pos> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Pos { x, y })
    }
}

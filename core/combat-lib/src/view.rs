//! view.rs：
//! - 提供畫面呈現用的唯讀快照（Snapshot），不含任何規則邏輯。
//! - 實際繪製由外部的 Renderer 實作負責。
use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitView {
    pub id: UnitID,
    pub side: Side,
    pub class: UnitClass,
    pub hp: Hp,
    pub max_hp: Hp,
    pub pos: Option<Pos>,
    pub selected: bool,
    pub rested: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// grid[y][x]：該格的單位 ID
    pub grid: Vec<Vec<Option<UnitID>>>,
    pub units: Vec<UnitView>,
    pub pools: BTreeMap<Side, TeamPool>,
    pub active_side: Side,
    pub slot_index: usize,
    pub pending: Option<PendingKind>,
    pub status: GameStatus,
}

/// 畫面繪製介面
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot);
}

impl Session {
    pub fn snapshot(&self) -> Snapshot {
        let size = self.board.size;
        let grid = (0..size)
            .map(|y| {
                (0..size)
                    .map(|x| self.board.occupant(Pos::new(x, y)))
                    .collect()
            })
            .collect();
        let units = self
            .board
            .units
            .values()
            .map(|unit| UnitView {
                id: unit.id,
                side: unit.side,
                class: unit.class,
                hp: unit.hp,
                max_hp: unit.max_hp,
                pos: unit.pos,
                selected: self.selected == Some(unit.id),
                rested: unit.rested,
            })
            .collect();
        Snapshot {
            grid,
            units,
            pools: self.pools.clone(),
            active_side: self.current_side(),
            slot_index: self.battle.slot_index,
            pending: self.pending_kind(),
            status: self.status,
        }
    }

    /// 以文字畫出棋盤，供記錄與除錯使用
    pub fn ascii_board(&self) -> String {
        let snapshot = self.snapshot();
        snapshot
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.and_then(|id| self.board.get(id)) {
                        None => ".".to_string(),
                        Some(unit) => match (unit.side, unit.class) {
                            (Side::Boss, _) => "B".to_string(),
                            (Side::TeamA, UnitClass::Ranged) => "r".to_string(),
                            (Side::TeamA, _) => "m".to_string(),
                            (_, UnitClass::Ranged) => "R".to_string(),
                            _ => "M".to_string(),
                        },
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

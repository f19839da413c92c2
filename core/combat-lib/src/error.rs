// 戰鬥規則錯誤型別，攜帶 function name 與 context，支援來源錯誤巢狀
use crate::*;
use thiserror::Error;

pub use abilities_lib::LoadError;

/// 錯誤分類：決定呼叫端如何恢復
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 操作被拒絕，狀態不變，可重試
    Validation,
    /// 引用的單位已不存在，進行中的行動已中止
    Structural,
}

/// 戰鬥核心錯誤型別
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{func}`: 戰鬥已結束")]
    GameOver { func: &'static str },

    #[error("`{func}`: 單位 {unit_id} 不存在")]
    UnitMissing { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: 單位 {unit_id} 不適用行動建議")]
    NotAdvisable { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: 單位 {unit_id} 目前不在棋盤上")]
    UnitNotOnBoard { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: 單位 {unit_id} 不存在或已離場")]
    UnitNotFound { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: 現在是 {slot} 的回合，單位 {unit_id} 不能行動")]
    WrongActor {
        func: &'static str,
        unit_id: UnitID,
        slot: Side,
    },

    #[error("`{func}`: 單位 {unit_id} 本回合已休息")]
    UnitRested { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: 單位 {unit_id} 本回合已行動")]
    UnitActed { func: &'static str, unit_id: UnitID },

    #[error("`{func}`: 行動點數不足（需要 {needed}，剩餘 {available}）")]
    NotEnoughAp {
        func: &'static str,
        needed: ActionPoints,
        available: ActionPoints,
    },

    #[error("`{func}`: 花費 {spend} 不合法（可用 {available}）")]
    InvalidApSpend {
        func: &'static str,
        spend: ActionPoints,
        available: ActionPoints,
    },

    #[error("`{func}`: 技能 {ability} 冷卻中（剩餘 {turns} 回合）")]
    OnCooldown {
        func: &'static str,
        ability: AbilityID,
        turns: u32,
    },

    #[error("`{func}`: {class} 沒有技能 {ability}")]
    AbilityNotFound {
        func: &'static str,
        class: UnitClass,
        ability: AbilityID,
    },

    #[error("`{func}`: 目標 {pos:?} 不合法")]
    InvalidTarget { func: &'static str, pos: Pos },

    #[error("`{func}`: 技能 {ability} 沒有可選的目標")]
    NoValidTarget {
        func: &'static str,
        ability: AbilityID,
    },

    #[error("`{func}`: 尚有未完成的行動 {kind}")]
    PendingActionOpen { func: &'static str, kind: PendingKind },

    #[error("`{func}`: 沒有進行中的行動")]
    NoPendingAction { func: &'static str },

    #[error("`{func}`: 強制行動 {kind} 不可放棄")]
    CannotAbandon { func: &'static str, kind: PendingKind },

    #[error("`{func}`: 位置 {pos:?} 超出棋盤")]
    OutOfBounds { func: &'static str, pos: Pos },

    #[error("`{func}`: 位置 {pos:?} 已被佔用")]
    PosOccupied { func: &'static str, pos: Pos },

    #[error("`{func}`: {side} 只能部署在第 {row} 列，{pos:?} 不合法")]
    WrongRow {
        func: &'static str,
        side: Side,
        row: usize,
        pos: Pos,
    },

    #[error("`{func}`: {side} 已部署 {limit} 個單位")]
    TeamFull {
        func: &'static str,
        side: Side,
        limit: usize,
    },

    #[error("`{func}`: {side} 不能部署 {class}")]
    InvalidPlacement {
        func: &'static str,
        side: Side,
        class: UnitClass,
    },

    #[error("`{func}`: {side} 只部署了 {placed}/{required} 個單位")]
    SetupIncomplete {
        func: &'static str,
        side: Side,
        placed: usize,
        required: usize,
    },

    #[error("`{func}`: 包裝: {source}")]
    Wrap {
        func: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match root_error(self) {
            Error::UnitMissing { .. } => ErrorCategory::Structural,
            _ => ErrorCategory::Validation,
        }
    }

    pub fn wrap(self, func: &'static str) -> Error {
        Error::Wrap {
            func,
            source: Box::new(self),
        }
    }
}

pub fn root_error(err: &Error) -> &Error {
    let mut err = err;
    while let Error::Wrap { source, .. } = err {
        err = source.as_ref();
    }
    err
}

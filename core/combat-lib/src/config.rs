// 可調整的規則數值，可由 TOML 載入，缺少的欄位使用預設值
use crate::*;
use serde::{Deserialize, Serialize};

/// 職業基本屬性
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    pub hp: Hp,
    #[serde(default = "default_movement")]
    pub movement: usize,
}

fn default_movement() -> usize {
    1
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub board_size: usize,
    pub max_ap: ActionPoints,
    pub starting_ap: ActionPoints,
    pub units_per_team: usize,
    pub melee: ClassStats,
    pub ranged: ClassStats,
    pub boss: ClassStats,
    /// 休息：回合結束時給所屬隊伍的 AP / HP
    pub rest_ap: ActionPoints,
    pub rest_hp: Hp,
    /// 擊殺時被擊殺方獲得的 AP
    pub kill_refund_ap: ActionPoints,
    /// 專注時技能射程倍率
    pub focus_range_multiplier: usize,
    /// 可選擊退（Strength）接受時的 AP 消耗
    pub displace_ap_cost: ActionPoints,
    pub boss_slide_steps: usize,
    pub boss_heal: Hp,
    pub boss_breath_damage: Hp,
    pub boss_displace_damage: Hp,
    pub advisor_low_health: Hp,
    pub advisor_medium_range: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            board_size: 7,
            max_ap: 6,
            starting_ap: 3,
            units_per_team: 3,
            melee: ClassStats { hp: 7, movement: 1 },
            ranged: ClassStats { hp: 4, movement: 1 },
            boss: ClassStats {
                hp: 20,
                movement: 0,
            },
            rest_ap: 1,
            rest_hp: 1,
            kill_refund_ap: 1,
            focus_range_multiplier: 2,
            displace_ap_cost: 1,
            boss_slide_steps: 3,
            boss_heal: 3,
            boss_breath_damage: 3,
            boss_displace_damage: 3,
            advisor_low_health: 3,
            advisor_medium_range: 3,
        }
    }
}

impl RulesConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, LoadError> {
        let config: RulesConfig =
            toml::from_str(data).map_err(|e| LoadError::DeserializeError {
                format: "rules.toml".to_string(),
                reason: e.to_string(),
            })?;
        if config.board_size < 3 {
            return Err(LoadError::DeserializeError {
                format: "rules.toml".to_string(),
                reason: format!("board_size 至少為 3，實際為 {}", config.board_size),
            });
        }
        Ok(config)
    }

    pub fn stats(&self, class: UnitClass) -> ClassStats {
        match class {
            UnitClass::Melee => self.melee,
            UnitClass::Ranged => self.ranged,
            UnitClass::Boss => self.boss,
        }
    }

    /// 首領開場位置：棋盤正中央
    pub fn boss_start(&self) -> Pos {
        let center = self.board_size / 2;
        Pos::new(center, center)
    }
}

//! unit.rs：
//! - 定義陣營（Side）、單位（Unit）與 buff 資料結構。
//! - 只處理單位自身的狀態變化（旗標、冷卻、buff），不負責傷害結算與回合流程。
use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Display,
    EnumIter,
    EnumString,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    TeamA,
    TeamB,
    Boss,
}

impl Side {
    pub fn is_team(self) -> bool {
        self != Side::Boss
    }

    /// 對手隊伍；首領沒有對手隊伍
    pub fn opponent(self) -> Option<Side> {
        match self {
            Side::TeamA => Some(Side::TeamB),
            Side::TeamB => Some(Side::TeamA),
            Side::Boss => None,
        }
    }

    /// 該職業是否可屬於此陣營
    pub fn allows(self, class: UnitClass) -> bool {
        match self {
            Side::Boss => class == UnitClass::Boss,
            Side::TeamA | Side::TeamB => class != UnitClass::Boss,
        }
    }
}

/// 下一次造成傷害時的加成
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Buff {
    pub bonus: Hp,
    pub turns: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: UnitID,
    pub side: Side,
    pub class: UnitClass,
    /// None 表示被首領擠出棋盤、尚未重新放置
    pub pos: Option<Pos>,
    pub hp: Hp,
    pub max_hp: Hp,
    pub movement: usize,
    pub cooldowns: BTreeMap<AbilityID, u32>,
    pub buffs: Vec<Buff>,
    pub rested: bool,
    pub acted: bool,
    pub focused: bool,
    /// 專注姿態：下一次輪到所屬隊伍時才生效
    pub focus_queued: bool,
}

impl Unit {
    pub fn new(id: UnitID, side: Side, class: UnitClass, pos: Pos, stats: ClassStats) -> Self {
        Self {
            id,
            side,
            class,
            pos: Some(pos),
            hp: stats.hp,
            max_hp: stats.hp,
            movement: stats.movement,
            cooldowns: BTreeMap::new(),
            buffs: Vec::new(),
            rested: false,
            acted: false,
            focused: false,
            focus_queued: false,
        }
    }

    pub fn is_boss(&self) -> bool {
        self.side == Side::Boss
    }

    pub fn is_hostile_to(&self, other: &Unit) -> bool {
        self.side != other.side
    }

    pub fn cooldown(&self, ability: &str) -> u32 {
        self.cooldowns.get(ability).copied().unwrap_or(0)
    }

    pub fn start_cooldown(&mut self, ability: &str, turns: u32) {
        if turns > 0 {
            self.cooldowns.insert(ability.to_string(), turns);
        }
    }

    pub fn next_hit_bonus(&self) -> Hp {
        self.buffs.iter().map(|b| b.bonus).sum()
    }

    /// 取出並清除下一擊加成
    pub fn take_next_hit_bonus(&mut self) -> Hp {
        let bonus = self.next_hit_bonus();
        self.buffs.clear();
        bonus
    }

    /// 回合開始：清除旗標、套用排定的專注、冷卻與 buff 各減一
    pub fn start_turn(&mut self) {
        self.rested = false;
        self.acted = false;
        self.focused = self.focus_queued;
        self.focus_queued = false;
        for turns in self.cooldowns.values_mut() {
            *turns = turns.saturating_sub(1);
        }
        self.cooldowns.retain(|_, turns| *turns > 0);
        for buff in self.buffs.iter_mut() {
            buff.turns = buff.turns.saturating_sub(1);
        }
        self.buffs.retain(|buff| buff.turns > 0);
    }

    /// 技能射程，專注時加倍
    pub fn effective_range(&self, ability: &Ability, multiplier: usize) -> usize {
        if self.focused {
            ability.range() * multiplier
        } else {
            ability.range()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranger() -> Unit {
        Unit::new(
            1,
            Side::TeamA,
            UnitClass::Ranged,
            Pos::new(0, 0),
            ClassStats { hp: 4, movement: 1 },
        )
    }

    #[test]
    fn test_start_turn_decays_cooldowns_and_buffs() {
        let mut unit = ranger();
        unit.rested = true;
        unit.acted = true;
        unit.start_cooldown("bullseye", 2);
        unit.start_cooldown("quick_shot", 0);
        unit.buffs.push(Buff { bonus: 2, turns: 1 });
        assert_eq!(unit.cooldown("quick_shot"), 0);

        unit.start_turn();
        assert!(!unit.rested);
        assert!(!unit.acted);
        assert_eq!(unit.cooldown("bullseye"), 1);
        assert!(unit.buffs.is_empty());

        unit.start_turn();
        assert_eq!(unit.cooldown("bullseye"), 0);
    }

    #[test]
    fn test_focus_applies_on_next_turn_only() {
        let mut unit = ranger();
        unit.focus_queued = true;
        assert!(!unit.focused);
        unit.start_turn();
        assert!(unit.focused);
        assert!(!unit.focus_queued);
        unit.start_turn();
        assert!(!unit.focused);
    }

    #[test]
    fn test_next_hit_bonus_clears() {
        let mut unit = ranger();
        unit.buffs.push(Buff { bonus: 2, turns: 1 });
        assert_eq!(unit.take_next_hit_bonus(), 2);
        assert_eq!(unit.take_next_hit_bonus(), 0);
    }

    #[test]
    fn test_side_rules() {
        assert!(Side::TeamA.allows(UnitClass::Melee));
        assert!(!Side::TeamB.allows(UnitClass::Boss));
        assert!(Side::Boss.allows(UnitClass::Boss));
        assert_eq!(Side::TeamA.opponent(), Some(Side::TeamB));
        assert_eq!(Side::Boss.opponent(), None);
        assert_eq!(Side::TeamB.to_string(), "team_b");
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

pub type AbilityID = String;

/// 內建技能表（TOML）
pub const BUILTIN_ABILITIES_TOML: &str = include_str!("../data/abilities.toml");

/// 單位職業
#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    EnumString,
    Display,
    EnumIter,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnitClass {
    Melee,
    Ranged,
    Boss,
}

/// 行動點數消耗
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Cost {
    Fixed { value: u32 },
    /// 由操作者決定花費（至少 min，至多可用 AP）
    Variable { min: u32 },
}

/// 選取目標的規則
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Targeting {
    /// 移動力範圍內、同列／同行／同斜線的空格
    Movement,
    /// 周圍八格內的單位
    Adjacent,
    /// 同列／同行／同斜線且距離不超過 range 的單位
    Reachable { range: usize },
    /// 施放者自身，不需選目標
    #[serde(rename = "self")]
    Caster,
    /// 周圍八格內所有單位
    AoeAdjacent,
    /// range 內可到達線上的所有單位
    AoeReachable { range: usize },
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AbilityEffect {
    Move,
    Damage,
    /// 傷害 = per_ap × 花費的 AP
    ScaledDamage { per_ap: u32 },
    /// 下一次行動時技能射程加倍，本回合剩餘時間不可再行動
    Focus,
    /// 下一次造成傷害時 +bonus，之後清除
    NextHitBuff { bonus: u32, turns: u32 },
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FollowUp {
    #[default]
    None,
    /// 強制後續移動（不可放棄）
    ForcedMove,
    /// 可選的擊退（可拒絕）
    OptionalDisplace,
}

/// 技能資料結構
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Ability {
    pub name: AbilityID,
    pub class: UnitClass,
    pub cost: Cost,
    #[serde(default)]
    pub damage: u32,
    pub targeting: Targeting,
    #[serde(default)]
    pub cooldown: u32,
    pub effect: AbilityEffect,
    #[serde(default)]
    pub follow_up: FollowUp,
    #[serde(default)]
    pub exempt_from_acted: bool,
}

impl Ability {
    /// 實際消耗的 AP；可變消耗時使用操作者指定的 spend，未指定則取最低值
    pub fn ap_cost(&self, spend: Option<u32>) -> u32 {
        match self.cost {
            Cost::Fixed { value } => value,
            Cost::Variable { min } => spend.unwrap_or(min).max(min),
        }
    }

    /// 未加上 buff 的基礎傷害
    pub fn base_damage(&self, spend: Option<u32>) -> u32 {
        match self.effect {
            AbilityEffect::ScaledDamage { per_ap } => per_ap * self.ap_cost(spend),
            AbilityEffect::Damage => self.damage,
            _ => 0,
        }
    }

    pub fn is_variable_cost(&self) -> bool {
        matches!(self.cost, Cost::Variable { .. })
    }

    /// 需要玩家點選目標格才能結算
    pub fn needs_target(&self) -> bool {
        matches!(
            self.targeting,
            Targeting::Movement | Targeting::Adjacent | Targeting::Reachable { .. }
        )
    }

    /// 技能的基礎距離（未計算專注加倍）
    pub fn range(&self) -> usize {
        match self.targeting {
            Targeting::Adjacent | Targeting::AoeAdjacent => 1,
            Targeting::Reachable { range } | Targeting::AoeReachable { range } => range,
            Targeting::Movement | Targeting::Caster => 0,
        }
    }
}

/// 技能表載入錯誤
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{format} 反序列化失敗: {reason}")]
    DeserializeError { format: String, reason: String },

    #[error("技能 {class}/{name} 重複定義")]
    DuplicateAbility { class: UnitClass, name: AbilityID },

    #[error("技能 {class}/{name} 設定錯誤: {reason}")]
    InvalidAbility {
        class: UnitClass,
        name: AbilityID,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct AbilitiesToml {
    abilities: Vec<Ability>,
}

/// 以 (職業, 技能名稱) 為鍵的技能表
#[derive(Debug, Clone, Default)]
pub struct AbilityTable {
    abilities: BTreeMap<(UnitClass, AbilityID), Ability>,
}

impl AbilityTable {
    pub fn from_toml_str(data: &str) -> Result<Self, LoadError> {
        let parsed: AbilitiesToml =
            toml::from_str(data).map_err(|e| LoadError::DeserializeError {
                format: "abilities.toml".to_string(),
                reason: e.to_string(),
            })?;
        let mut table = AbilityTable::default();
        for ability in parsed.abilities {
            table.insert(ability)?;
        }
        Ok(table)
    }

    /// 載入內建技能表
    pub fn builtin() -> Result<Self, LoadError> {
        Self::from_toml_str(BUILTIN_ABILITIES_TOML)
    }

    pub fn insert(&mut self, ability: Ability) -> Result<(), LoadError> {
        validate(&ability)?;
        let key = (ability.class, ability.name.clone());
        if self.abilities.contains_key(&key) {
            return Err(LoadError::DuplicateAbility {
                class: ability.class,
                name: ability.name,
            });
        }
        self.abilities.insert(key, ability);
        Ok(())
    }

    pub fn get(&self, class: UnitClass, name: &str) -> Option<&Ability> {
        self.abilities.get(&(class, name.to_string()))
    }

    /// 依名稱排序列出某職業的所有技能
    pub fn for_class(&self, class: UnitClass) -> impl Iterator<Item = &Ability> {
        self.abilities
            .iter()
            .filter(move |((c, _), _)| *c == class)
            .map(|(_, ability)| ability)
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

// 只檢查會讓結算流程無法運作的組合
fn validate(ability: &Ability) -> Result<(), LoadError> {
    let invalid = |reason: &str| LoadError::InvalidAbility {
        class: ability.class,
        name: ability.name.clone(),
        reason: reason.to_string(),
    };
    match (ability.effect, ability.targeting) {
        (AbilityEffect::Move, Targeting::Movement) => {}
        (AbilityEffect::Move, _) | (_, Targeting::Movement) => {
            return Err(invalid("移動效果必須搭配 movement 目標"));
        }
        (AbilityEffect::Focus | AbilityEffect::NextHitBuff { .. }, Targeting::Caster) => {}
        (AbilityEffect::Focus | AbilityEffect::NextHitBuff { .. }, _) => {
            return Err(invalid("自身效果必須搭配 self 目標"));
        }
        (AbilityEffect::Damage | AbilityEffect::ScaledDamage { .. }, Targeting::Caster) => {
            return Err(invalid("傷害技能不可只以自身為目標"));
        }
        _ => {}
    }
    if let Cost::Variable { min } = ability.cost {
        if min == 0 {
            return Err(invalid("可變消耗至少為 1"));
        }
    }
    if ability.follow_up == FollowUp::OptionalDisplace && ability.targeting != Targeting::Adjacent
    {
        return Err(invalid("擊退只能接在單體近戰之後"));
    }
    Ok(())
}

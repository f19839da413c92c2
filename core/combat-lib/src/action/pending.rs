//! pending.rs：
//! - 待決行動（多步驟互動）的狀態機：同一時間最多一個。
//! - 選取目標：不合法的目標直接拒絕且狀態不變；合法則結算並回到無待決狀態，或串接下一個待決行動。
//! - 強制後續（強制移動、首領擠開）不可放棄，且會擋住回合結束；其餘可放棄。
use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingKind {
    AwaitingMoveTarget,
    AwaitingMeleeTarget,
    AwaitingRangedTarget,
    AwaitingForcedFollowMove,
    AwaitingOptionalDisplace,
    AwaitingBossDisplace,
}

impl PendingKind {
    pub fn is_forced(self) -> bool {
        matches!(
            self,
            PendingKind::AwaitingForcedFollowMove | PendingKind::AwaitingBossDisplace
        )
    }
}

/// 進行中的多步驟行動；valid 為開啟時計算的合法目標格
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    AwaitingMoveTarget {
        actor: UnitID,
        ability: AbilityID,
        cost: ActionPoints,
        valid: BTreeSet<Pos>,
    },
    AwaitingMeleeTarget {
        actor: UnitID,
        ability: AbilityID,
        cost: ActionPoints,
        valid: BTreeSet<Pos>,
    },
    AwaitingRangedTarget {
        actor: UnitID,
        ability: AbilityID,
        cost: ActionPoints,
        valid: BTreeSet<Pos>,
    },
    /// 範圍攻擊後必須移動到施放者周圍的空格；struck 為仍存活的受擊者（依受擊順序）
    AwaitingForcedFollowMove {
        actor: UnitID,
        struck: Vec<UnitID>,
        valid: BTreeSet<Pos>,
    },
    AwaitingOptionalDisplace {
        actor: UnitID,
        target: UnitID,
        valid: BTreeSet<Pos>,
    },
    AwaitingBossDisplace {
        actor: UnitID,
        evicted: UnitID,
        valid: BTreeSet<Pos>,
    },
}

impl PendingAction {
    pub fn kind(&self) -> PendingKind {
        match self {
            PendingAction::AwaitingMoveTarget { .. } => PendingKind::AwaitingMoveTarget,
            PendingAction::AwaitingMeleeTarget { .. } => PendingKind::AwaitingMeleeTarget,
            PendingAction::AwaitingRangedTarget { .. } => PendingKind::AwaitingRangedTarget,
            PendingAction::AwaitingForcedFollowMove { .. } => {
                PendingKind::AwaitingForcedFollowMove
            }
            PendingAction::AwaitingOptionalDisplace { .. } => {
                PendingKind::AwaitingOptionalDisplace
            }
            PendingAction::AwaitingBossDisplace { .. } => PendingKind::AwaitingBossDisplace,
        }
    }

    pub fn actor(&self) -> UnitID {
        match self {
            PendingAction::AwaitingMoveTarget { actor, .. }
            | PendingAction::AwaitingMeleeTarget { actor, .. }
            | PendingAction::AwaitingRangedTarget { actor, .. }
            | PendingAction::AwaitingForcedFollowMove { actor, .. }
            | PendingAction::AwaitingOptionalDisplace { actor, .. }
            | PendingAction::AwaitingBossDisplace { actor, .. } => *actor,
        }
    }

    pub fn valid_targets(&self) -> &BTreeSet<Pos> {
        match self {
            PendingAction::AwaitingMoveTarget { valid, .. }
            | PendingAction::AwaitingMeleeTarget { valid, .. }
            | PendingAction::AwaitingRangedTarget { valid, .. }
            | PendingAction::AwaitingForcedFollowMove { valid, .. }
            | PendingAction::AwaitingOptionalDisplace { valid, .. }
            | PendingAction::AwaitingBossDisplace { valid, .. } => valid,
        }
    }

    pub fn is_forced(&self) -> bool {
        self.kind().is_forced()
    }

    /// 結算時必須仍然存在的單位
    fn referenced_units(&self) -> Vec<UnitID> {
        match self {
            PendingAction::AwaitingOptionalDisplace { actor, target, .. } => vec![*actor, *target],
            PendingAction::AwaitingBossDisplace { evicted, .. } => vec![*evicted],
            other => vec![other.actor()],
        }
    }
}

impl Session {
    /// 對目前的待決行動選取目標格
    pub fn select_target(&mut self, pos: Pos) -> Result<Vec<String>, Error> {
        let func = "Session::select_target";

        self.ensure_ongoing(func)?;
        let pending = self
            .pending
            .as_ref()
            .ok_or(Error::NoPendingAction { func })?;
        if let Some(unit_id) = pending
            .referenced_units()
            .into_iter()
            .find(|id| self.board.get(*id).is_none())
        {
            log::warn!("pending {} aborted, unit {unit_id} is gone", pending.kind());
            self.pending = None;
            return Err(Error::UnitMissing { func, unit_id });
        }
        if !pending.valid_targets().contains(&pos) {
            return Err(Error::InvalidTarget { func, pos });
        }
        if let PendingAction::AwaitingOptionalDisplace { actor, .. } = pending {
            self.check_displace_ap(*actor)
                .map_err(|e| e.wrap(func))?;
        }

        let Some(pending) = self.pending.take() else {
            return Err(Error::NoPendingAction { func });
        };
        log::debug!("resolving {} at {pos:?}", pending.kind());
        let result = match pending {
            PendingAction::AwaitingMoveTarget {
                actor,
                ability,
                cost,
                ..
            } => self.resolve_move(actor, &ability, cost, pos),
            PendingAction::AwaitingMeleeTarget {
                actor,
                ability,
                cost,
                ..
            }
            | PendingAction::AwaitingRangedTarget {
                actor,
                ability,
                cost,
                ..
            } => self.resolve_single_attack(actor, &ability, cost, pos),
            PendingAction::AwaitingForcedFollowMove { actor, struck, .. } => {
                self.resolve_follow_move(actor, &struck, pos)
            }
            PendingAction::AwaitingOptionalDisplace { actor, target, .. } => {
                self.resolve_displace(actor, target, pos)
            }
            PendingAction::AwaitingBossDisplace { actor, evicted, .. } => {
                self.resolve_boss_displace(actor, evicted, pos)
            }
        };
        result.map_err(|e| e.wrap(func))
    }

    /// 放棄目前的待決行動；強制後續不可放棄
    pub fn cancel_pending(&mut self) -> Result<Vec<String>, Error> {
        let func = "Session::cancel_pending";

        let pending = self
            .pending
            .as_ref()
            .ok_or(Error::NoPendingAction { func })?;
        let kind = pending.kind();
        if kind.is_forced() {
            return Err(Error::CannotAbandon { func, kind });
        }
        self.pending = None;
        Ok(vec![format!("取消 {}", kind)])
    }

    fn resolve_single_attack(
        &mut self,
        actor: UnitID,
        ability_id: &str,
        cost: ActionPoints,
        pos: Pos,
    ) -> Result<Vec<String>, Error> {
        let func = "Session::resolve_single_attack";

        let ability = self.ability_of(actor, ability_id)?;
        let target = self
            .board
            .occupant(pos)
            .ok_or(Error::InvalidTarget { func, pos })?;
        self.commit_ability(actor, &ability, cost)?;

        let mut msgs = vec![format!("{} 對 ({}, {}) 使用 {}", actor, pos.x, pos.y, ability.name)];
        let damage = ability.base_damage(Some(cost));
        let (hit_msgs, survivors) = self.strike_units(actor, &[target], damage)?;
        msgs.extend(hit_msgs);

        if ability.follow_up == FollowUp::OptionalDisplace {
            if let Some(&target) = survivors.first() {
                msgs.extend(self.offer_displace(actor, target));
            }
        }
        Ok(msgs)
    }

    fn resolve_follow_move(
        &mut self,
        actor: UnitID,
        struck: &[UnitID],
        pos: Pos,
    ) -> Result<Vec<String>, Error> {
        self.board.move_unit(actor, pos)?;
        let mut msgs = vec![format!("{} 突進至 ({}, {})", actor, pos.x, pos.y)];
        let first = struck
            .iter()
            .copied()
            .find(|id| self.board.get(*id).is_some_and(|u| u.pos.is_some()));
        if let Some(target) = first {
            msgs.extend(self.offer_displace(actor, target));
        }
        Ok(msgs)
    }

    fn resolve_displace(
        &mut self,
        actor: UnitID,
        target: UnitID,
        pos: Pos,
    ) -> Result<Vec<String>, Error> {
        let func = "Session::resolve_displace";

        let side = self.unit(actor)?.side;
        let cost = self.config.displace_ap_cost;
        let pool = self
            .pools
            .get_mut(&side)
            .ok_or(Error::UnitMissing { func, unit_id: actor })?;
        pool.spend_ap(cost)?;
        self.board.move_unit(target, pos)?;
        Ok(vec![format!(
            "{} 將 {} 擊退至 ({}, {})（消耗 {} AP）",
            actor, target, pos.x, pos.y, cost
        )])
    }

    fn resolve_boss_displace(
        &mut self,
        boss: UnitID,
        evicted: UnitID,
        pos: Pos,
    ) -> Result<Vec<String>, Error> {
        self.board.move_unit(evicted, pos)?;
        let mut msgs = vec![format!("{} 被放置到 ({}, {})", evicted, pos.x, pos.y)];
        let bonus = self.take_next_hit_bonus(boss);
        let amount = self.config.boss_displace_damage + bonus;
        msgs.extend(self.apply_damage(boss, evicted, amount)?);
        Ok(msgs)
    }

    pub(crate) fn check_displace_ap(&self, actor: UnitID) -> Result<(), Error> {
        let func = "Session::check_displace_ap";

        let side = self.unit(actor)?.side;
        let needed = self.config.displace_ap_cost;
        let available = self.pool(side).map_or(0, |p| p.ap);
        if available < needed {
            return Err(Error::NotEnoughAp {
                func,
                needed,
                available,
            });
        }
        Ok(())
    }

    /// 視情況開啟可選擊退；條件不足時只回傳訊息
    fn offer_displace(&mut self, actor: UnitID, target: UnitID) -> Option<String> {
        if self.status != GameStatus::Ongoing || self.check_displace_ap(actor).is_err() {
            return None;
        }
        let target_pos = self.board.get(target)?.pos?;
        let valid: BTreeSet<Pos> = self.board.empty_adjacent(target_pos).into_iter().collect();
        if valid.is_empty() {
            return Some(format!("{} 周圍沒有空格，無法擊退", target));
        }
        self.pending = Some(PendingAction::AwaitingOptionalDisplace {
            actor,
            target,
            valid,
        });
        Some(format!("可選擇將 {} 擊退（{} AP）", target, self.config.displace_ap_cost))
    }
}

//! battle.rs：
//! - 負責回合流程：固定四格循環 [TeamA, Boss, TeamB, Boss]。
//! - 回合結束時結算休息獎勵、丟棄可放棄的待決行動、推進回合並重置新回合的單位狀態。
//! - 輪到首領時立即執行首領行為；首領行為本身不推進回合。
use crate::*;
use serde::{Deserialize, Serialize};

pub const TURN_CYCLE: [Side; 4] = [Side::TeamA, Side::Boss, Side::TeamB, Side::Boss];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Battle {
    pub slot_index: usize,
    /// 完整循環的次數
    pub round: u32,
}

impl Battle {
    pub fn current_side(&self) -> Side {
        TURN_CYCLE[self.slot_index % TURN_CYCLE.len()]
    }

    pub fn advance(&mut self) -> Side {
        self.slot_index = (self.slot_index + 1) % TURN_CYCLE.len();
        if self.slot_index == 0 {
            self.round += 1;
        }
        self.current_side()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "result")]
pub enum TurnOutcome {
    Advanced {
        slot_index: usize,
        side: Side,
        msgs: Vec<String>,
    },
    Blocked {
        reason: String,
    },
}

impl Session {
    /// 結束目前回合。強制待決行動未完成時回傳 Blocked 且不改變狀態
    pub fn end_turn(&mut self, dice: &mut impl Dice) -> Result<TurnOutcome, Error> {
        let func = "Session::end_turn";

        self.ensure_ongoing(func)?;
        if let Some(pending) = self.pending.as_ref().filter(|p| p.is_forced()) {
            let reason = format!("必須先完成 {}", pending.kind());
            log::debug!("end turn blocked: {reason}");
            return Ok(TurnOutcome::Blocked { reason });
        }

        let mut msgs = Vec::new();
        if self.battle.current_side().is_team() {
            msgs.extend(self.apply_rest_rewards());
        }
        if let Some(pending) = self.pending.take() {
            msgs.push(format!("放棄未完成的 {}", pending.kind()));
        }

        let side = self.battle.advance();
        log::info!(
            "turn advanced to slot {} ({side}), round {}",
            self.battle.slot_index,
            self.battle.round
        );
        msgs.push(format!("輪到 {}", side));

        if side.is_team() {
            self.start_team_turn(side);
        } else if let Some(boss_id) = self.board.boss().map(|b| b.id) {
            if let Some(boss) = self.board.get_mut(boss_id) {
                boss.acted = false;
            }
            msgs.extend(self.run_boss(dice).map_err(|e| e.wrap(func))?);
        } else {
            msgs.push("首領已倒下，跳過首領回合".to_string());
        }

        Ok(TurnOutcome::Advanced {
            slot_index: self.battle.slot_index,
            side,
            msgs,
        })
    }

    /// 每個休息中的單位為所屬隊伍 +AP / +HP（皆有上限），然後清空佇列
    pub fn apply_rest_rewards(&mut self) -> Vec<String> {
        let mut msgs = Vec::new();
        let queue = std::mem::take(&mut self.rest_queue);
        for unit_id in queue {
            let Some(side) = self.board.get(unit_id).map(|u| u.side) else {
                continue;
            };
            let Some(pool) = self.pools.get_mut(&side) else {
                continue;
            };
            pool.gain_ap(self.config.rest_ap, self.config.max_ap);
            pool.heal(self.config.rest_hp);
            msgs.push(format!(
                "{} 休息完成，{} AP {} / HP {}",
                unit_id, side, pool.ap, pool.hp_current
            ));
        }
        msgs
    }

    fn start_team_turn(&mut self, side: Side) {
        for unit in self.board.units.values_mut().filter(|u| u.side == side) {
            unit.start_turn();
            if unit.focused {
                log::debug!("unit {} is focused this turn", unit.id);
            }
        }
    }
}

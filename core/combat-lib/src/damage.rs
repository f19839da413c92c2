//! damage.rs：
//! - 傷害結算、單位移除、擊殺返還 AP 與隊伍血池分段判定。
//! - 首領受傷只扣自身血量；隊伍單位受傷同時扣隊伍血池。
use crate::*;

/// 單位離場原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Killed,
    Segmentation,
}

impl Session {
    /// 對 target 造成 amount 點傷害；source 只用於訊息
    pub fn apply_damage(
        &mut self,
        source: UnitID,
        target: UnitID,
        amount: Hp,
    ) -> Result<Vec<String>, Error> {
        let func = "Session::apply_damage";

        let unit = self
            .board
            .get_mut(target)
            .ok_or(Error::UnitMissing {
                func,
                unit_id: target,
            })?;
        unit.hp = unit.hp.saturating_sub(amount);
        let (side, hp) = (unit.side, unit.hp);
        let mut msgs = vec![format!(
            "{} 對 {} 造成 {} 點傷害（剩餘 HP {}）",
            source, target, amount, hp
        )];
        log::debug!("{source} hit {target} for {amount}, hp now {hp}");

        if side == Side::Boss {
            if hp == 0 {
                self.remove_unit(target, Removal::Killed);
                msgs.push(format!("首領 {} 被擊倒", target));
            }
            return Ok(msgs);
        }

        let max_ap = self.config.max_ap;
        let refund = self.config.kill_refund_ap;
        let pool = self.pools.get_mut(&side).ok_or(Error::UnitMissing {
            func,
            unit_id: target,
        })?;
        pool.lose_hp(amount);
        pool.last_hit = Some(target);
        msgs.push(format!("{} 血池剩餘 {}", side, pool.hp_current));

        if hp == 0 {
            pool.gain_ap(refund, max_ap);
            let ap = pool.ap;
            self.remove_unit(target, Removal::Killed);
            msgs.push(format!("{} 陣亡，{} 獲得 +{} AP（現為 {}）", target, side, refund, ap));
        }
        msgs.extend(self.check_segmentation(side));
        self.refresh_status();
        Ok(msgs)
    }

    /// 血池跌破分段門檻時移除最後受擊單位（不算擊殺，不返還 AP）
    pub fn check_segmentation(&mut self, side: Side) -> Vec<String> {
        let Some(pool) = self.pools.get_mut(&side) else {
            return Vec::new();
        };
        let new_index = pool.current_segment();
        if new_index >= pool.segment_index {
            return Vec::new();
        }
        pool.segment_index = new_index;
        let victim = pool.last_hit;

        let mut msgs = Vec::new();
        match victim.filter(|id| self.board.get(*id).is_some_and(|u| u.side == side)) {
            Some(id) => {
                self.remove_unit(id, Removal::Segmentation);
                msgs.push(format!(
                    "{} 血池跌至第 {} 段，移除最後受擊的 {}",
                    side, new_index, id
                ));
            }
            None => {
                msgs.push(format!(
                    "{} 血池跌至第 {} 段，但沒有可移除的單位",
                    side, new_index
                ));
            }
        }
        msgs
    }

    /// 將單位移出戰場，並清除休息佇列與選取中的參照
    pub fn remove_unit(&mut self, unit_id: UnitID, reason: Removal) -> Option<Unit> {
        let unit = self.board.remove(unit_id)?;
        self.rest_queue.remove(&unit_id);
        if self.selected == Some(unit_id) {
            self.selected = None;
        }
        log::info!("unit {unit_id} ({}) removed: {reason:?}", unit.side);
        Some(unit)
    }
}

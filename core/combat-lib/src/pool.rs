use crate::*;
use serde::{Deserialize, Serialize};

pub const TOP_SEGMENT: u8 = 3;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamPool {
    pub hp_total: Hp,
    pub hp_current: Hp,
    pub ap: ActionPoints,
    pub segment_index: u8,
    pub last_hit: Option<UnitID>,
}

impl TeamPool {
    pub fn new(hp_total: Hp, ap: ActionPoints) -> Self {
        Self {
            hp_total,
            hp_current: hp_total,
            ap,
            segment_index: TOP_SEGMENT,
            last_hit: None,
        }
    }

    pub fn spend_ap(&mut self, cost: ActionPoints) -> Result<(), Error> {
        let func = "TeamPool::spend_ap";

        if self.ap < cost {
            return Err(Error::NotEnoughAp {
                func,
                needed: cost,
                available: self.ap,
            });
        }
        self.ap -= cost;
        Ok(())
    }

    pub fn gain_ap(&mut self, amount: ActionPoints, cap: ActionPoints) {
        self.ap = (self.ap + amount).min(cap);
    }

    pub fn heal(&mut self, amount: Hp) {
        self.hp_current = (self.hp_current + amount).min(self.hp_total);
    }

    pub fn lose_hp(&mut self, amount: Hp) {
        self.hp_current = self.hp_current.saturating_sub(amount);
    }

    /// 依目前血量應處的分段
    pub fn current_segment(&self) -> u8 {
        segment_for(self.hp_total, self.hp_current)
    }
}

/// seg = ⌊total/3⌋；cur ≤ seg 為 1，cur ≤ 2·seg 為 2，其餘為 3
pub fn segment_for(hp_total: Hp, hp_current: Hp) -> u8 {
    let seg = hp_total / 3;
    if hp_current <= seg {
        1
    } else if hp_current <= seg * 2 {
        2
    } else {
        TOP_SEGMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_thresholds() {
        // total 15 → seg 5
        assert_eq!(segment_for(15, 15), 3);
        assert_eq!(segment_for(15, 11), 3);
        assert_eq!(segment_for(15, 10), 2);
        assert_eq!(segment_for(15, 9), 2);
        assert_eq!(segment_for(15, 5), 1);
        assert_eq!(segment_for(15, 0), 1);
        // total 18 (melee x2 + ranged) → seg 6
        assert_eq!(segment_for(18, 13), 3);
        assert_eq!(segment_for(18, 12), 2);
    }

    #[test]
    fn test_ap_bounds() {
        let mut pool = TeamPool::new(15, 3);
        pool.gain_ap(10, 6);
        assert_eq!(pool.ap, 6);
        pool.spend_ap(6).unwrap();
        assert_eq!(pool.ap, 0);
        assert!(matches!(
            pool.spend_ap(1),
            Err(Error::NotEnoughAp {
                needed: 1,
                available: 0,
                ..
            })
        ));
        assert_eq!(pool.ap, 0);
    }

    #[test]
    fn test_hp_bounds() {
        let mut pool = TeamPool::new(15, 3);
        pool.lose_hp(20);
        assert_eq!(pool.hp_current, 0);
        pool.heal(100);
        assert_eq!(pool.hp_current, 15);
    }
}

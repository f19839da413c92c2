//! setup.rs：
//! - 開局部署：兩隊只能部署在各自的底線（TeamA 第 0 列，TeamB 最後一列），每隊固定數量。
//! - 兩隊部署完成後 finalize：以部署單位的血量建立血池、放置首領於中央，產生 Session。
use crate::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Setup {
    config: RulesConfig,
    abilities: AbilityTable,
    board: Board,
    next_id: UnitID,
}

impl Setup {
    pub fn new(config: RulesConfig, abilities: AbilityTable) -> Self {
        let board = Board::new(config.board_size);
        Self {
            config,
            abilities,
            board,
            next_id: 1,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn home_row(&self, side: Side) -> Option<usize> {
        match side {
            Side::TeamA => Some(0),
            Side::TeamB => Some(self.config.board_size - 1),
            Side::Boss => None,
        }
    }

    pub fn placed(&self, side: Side) -> usize {
        self.board.units_of(side).count()
    }

    pub fn is_ready(&self) -> bool {
        [Side::TeamA, Side::TeamB]
            .iter()
            .all(|&side| self.placed(side) == self.config.units_per_team)
    }

    /// 部署一個單位，回傳其 ID（依部署順序遞增）
    pub fn place(&mut self, side: Side, class: UnitClass, pos: Pos) -> Result<UnitID, Error> {
        let func = "Setup::place";

        let Some(row) = self.home_row(side).filter(|_| side.allows(class)) else {
            return Err(Error::InvalidPlacement { func, side, class });
        };
        if !self.board.in_bounds(pos) {
            return Err(Error::OutOfBounds { func, pos });
        }
        if pos.y != row {
            return Err(Error::WrongRow {
                func,
                side,
                row,
                pos,
            });
        }
        if self.board.occupant(pos).is_some() {
            return Err(Error::PosOccupied { func, pos });
        }
        let limit = self.config.units_per_team;
        if self.placed(side) >= limit {
            return Err(Error::TeamFull { func, side, limit });
        }

        let unit_id = self.next_id;
        let unit = Unit::new(unit_id, side, class, pos, self.config.stats(class));
        self.board.place(unit, pos)?;
        self.next_id += 1;
        log::debug!("placed {class} {unit_id} for {side} at {pos:?}");
        Ok(unit_id)
    }

    pub fn finalize(mut self) -> Result<Session, Error> {
        let func = "Setup::finalize";

        let required = self.config.units_per_team;
        let mut pools = BTreeMap::new();
        for side in [Side::TeamA, Side::TeamB] {
            let placed = self.placed(side);
            if placed != required {
                return Err(Error::SetupIncomplete {
                    func,
                    side,
                    placed,
                    required,
                });
            }
            let hp_total: Hp = self.board.units_of(side).map(|u| u.max_hp).sum();
            pools.insert(side, TeamPool::new(hp_total, self.config.starting_ap));
        }

        let boss_pos = self.config.boss_start();
        let boss = Unit::new(
            self.next_id,
            Side::Boss,
            UnitClass::Boss,
            boss_pos,
            self.config.stats(UnitClass::Boss),
        );
        self.board.place(boss, boss_pos).map_err(|e| e.wrap(func))?;
        log::info!("setup finalized, boss {} at {boss_pos:?}", self.next_id);

        Ok(Session::new(self.config, self.abilities, self.board, pools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Setup {
        Setup::new(RulesConfig::default(), AbilityTable::builtin().unwrap())
    }

    #[test]
    fn test_placement_rules() {
        let mut setup = setup();
        assert_eq!(
            setup.place(Side::TeamA, UnitClass::Melee, Pos::new(0, 0)).unwrap(),
            1
        );
        assert!(matches!(
            setup.place(Side::TeamB, UnitClass::Melee, Pos::new(0, 0)),
            Err(Error::WrongRow { row: 6, .. })
        ));
        assert!(matches!(
            setup.place(Side::TeamA, UnitClass::Ranged, Pos::new(0, 0)),
            Err(Error::PosOccupied { .. })
        ));
        assert!(matches!(
            setup.place(Side::TeamA, UnitClass::Boss, Pos::new(1, 0)),
            Err(Error::InvalidPlacement { .. })
        ));
        assert!(matches!(
            setup.place(Side::Boss, UnitClass::Boss, Pos::new(3, 3)),
            Err(Error::InvalidPlacement { .. })
        ));
        assert!(matches!(
            setup.place(Side::TeamA, UnitClass::Melee, Pos::new(9, 0)),
            Err(Error::OutOfBounds { .. })
        ));
        setup.place(Side::TeamA, UnitClass::Melee, Pos::new(1, 0)).unwrap();
        setup.place(Side::TeamA, UnitClass::Ranged, Pos::new(2, 0)).unwrap();
        assert!(matches!(
            setup.place(Side::TeamA, UnitClass::Ranged, Pos::new(3, 0)),
            Err(Error::TeamFull { limit: 3, .. })
        ));
        assert_eq!(setup.placed(Side::TeamA), 3);
        assert_eq!(setup.board().occupant(Pos::new(2, 0)), Some(3));
        assert!(setup.board().boss().is_none(), "首領在 finalize 時才放置");
        assert!(!setup.is_ready());
    }

    #[test]
    fn test_finalize_requires_full_teams() {
        let mut setup = setup();
        setup.place(Side::TeamA, UnitClass::Melee, Pos::new(0, 0)).unwrap();
        match setup.finalize() {
            Err(Error::SetupIncomplete {
                side,
                placed,
                required,
                ..
            }) => {
                assert_eq!(side, Side::TeamA);
                assert_eq!(placed, 1);
                assert_eq!(required, 3);
            }
            other => panic!("應回傳 SetupIncomplete，實際為 {other:?}"),
        }
    }

    #[test]
    fn test_finalize_builds_pools_and_boss() {
        let mut setup = setup();
        for x in 0..3 {
            setup.place(Side::TeamA, UnitClass::Ranged, Pos::new(x, 0)).unwrap();
            setup.place(Side::TeamB, UnitClass::Melee, Pos::new(x, 6)).unwrap();
        }
        assert!(setup.is_ready());
        let session = setup.finalize().unwrap();

        let a = session.pool(Side::TeamA).unwrap();
        assert_eq!((a.hp_total, a.hp_current, a.ap, a.segment_index), (12, 12, 3, 3));
        let b = session.pool(Side::TeamB).unwrap();
        assert_eq!(b.hp_total, 21);

        let boss = session.board.boss().unwrap();
        assert_eq!(boss.id, 7);
        assert_eq!(boss.pos, Some(Pos::new(3, 3)));
        assert_eq!((boss.hp, boss.max_hp), (20, 20));
        assert!(session.pool(Side::Boss).is_none());
    }
}

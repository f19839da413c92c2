//! session.rs：
//! - 一場戰鬥的完整狀態：棋盤與單位、隊伍資源池、回合、待決行動、休息佇列、選取中的單位。
//! - 所有規則操作都作用在 Session 上；由 Setup::finalize 建立。
use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "side")]
pub enum GameStatus {
    Ongoing,
    Won(Side),
    Draw,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub config: RulesConfig,
    pub abilities: AbilityTable,
    pub board: Board,
    pub pools: BTreeMap<Side, TeamPool>,
    pub battle: Battle,
    pub pending: Option<PendingAction>,
    pub rest_queue: BTreeSet<UnitID>,
    pub selected: Option<UnitID>,
    pub status: GameStatus,
}

impl Session {
    pub fn new(
        config: RulesConfig,
        abilities: AbilityTable,
        board: Board,
        pools: BTreeMap<Side, TeamPool>,
    ) -> Self {
        let mut session = Self {
            config,
            abilities,
            board,
            pools,
            battle: Battle::default(),
            pending: None,
            rest_queue: BTreeSet::new(),
            selected: None,
            status: GameStatus::Ongoing,
        };
        session.refresh_status();
        session
    }

    pub fn current_side(&self) -> Side {
        self.battle.current_side()
    }

    pub fn pool(&self, side: Side) -> Option<&TeamPool> {
        self.pools.get(&side)
    }

    pub fn unit(&self, unit_id: UnitID) -> Result<&Unit, Error> {
        let func = "Session::unit";

        self.board
            .get(unit_id)
            .ok_or(Error::UnitNotFound { func, unit_id })
    }

    pub fn pending_kind(&self) -> Option<PendingKind> {
        self.pending.as_ref().map(|p| p.kind())
    }

    pub fn ensure_ongoing(&self, func: &'static str) -> Result<(), Error> {
        match self.status {
            GameStatus::Ongoing => Ok(()),
            _ => Err(Error::GameOver { func }),
        }
    }

    /// 依兩隊剩餘單位重新判定勝負
    pub fn refresh_status(&mut self) -> GameStatus {
        if self.status != GameStatus::Ongoing {
            return self.status;
        }
        let alive = |side| self.board.units_of(side).next().is_some();
        let status = match (alive(Side::TeamA), alive(Side::TeamB)) {
            (true, true) => GameStatus::Ongoing,
            (true, false) => GameStatus::Won(Side::TeamA),
            (false, true) => GameStatus::Won(Side::TeamB),
            (false, false) => GameStatus::Draw,
        };
        if status != GameStatus::Ongoing {
            log::info!("game over: {status:?}");
            self.pending = None;
        }
        self.status = status;
        status
    }

    /// 設定選取中的單位（僅影響畫面呈現）
    pub fn select_unit(&mut self, unit_id: Option<UnitID>) -> Result<(), Error> {
        let func = "Session::select_unit";

        if let Some(unit_id) = unit_id {
            if self.board.get(unit_id).is_none() {
                return Err(Error::UnitNotFound { func, unit_id });
            }
        }
        self.selected = unit_id;
        Ok(())
    }
}

#[cfg(test)]
impl Session {
    /// TeamA：1 (0,0) 近戰、2 (1,0) 近戰、3 (2,0) 遠程
    /// TeamB：4 (0,6) 近戰、5 (1,6) 近戰、6 (2,6) 遠程
    /// 首領：7 (3,3)
    pub(crate) fn for_tests() -> Self {
        let abilities = AbilityTable::builtin().unwrap();
        let mut setup = Setup::new(RulesConfig::default(), abilities);
        for (side, y) in [(Side::TeamA, 0), (Side::TeamB, 6)] {
            setup.place(side, UnitClass::Melee, Pos::new(0, y)).unwrap();
            setup.place(side, UnitClass::Melee, Pos::new(1, y)).unwrap();
            setup.place(side, UnitClass::Ranged, Pos::new(2, y)).unwrap();
        }
        setup.finalize().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_tests_layout() {
        let session = Session::for_tests();
        assert_eq!(session.board.units.len(), 7);
        assert_eq!(session.board.boss().unwrap().id, 7);
        assert_eq!(session.board.unit_to_pos(7), Some(Pos::new(3, 3)));
        assert_eq!(session.current_side(), Side::TeamA);
        assert_eq!(session.status, GameStatus::Ongoing);
        assert_eq!(session.pool(Side::TeamA).unwrap().hp_total, 18);
    }

    #[test]
    fn test_status_after_team_wiped() {
        let mut session = Session::for_tests();
        for id in [4, 5, 6] {
            session.remove_unit(id, Removal::Killed);
        }
        assert_eq!(session.refresh_status(), GameStatus::Won(Side::TeamA));
        assert!(matches!(
            session.ensure_ongoing("test"),
            Err(Error::GameOver { .. })
        ));
    }

    #[test]
    fn test_select_unit() {
        let mut session = Session::for_tests();
        session.select_unit(Some(3)).unwrap();
        assert_eq!(session.selected, Some(3));
        assert!(session.select_unit(Some(99)).is_err());
        assert_eq!(session.selected, Some(3));
        session.select_unit(None).unwrap();
        assert_eq!(session.selected, None);
    }
}

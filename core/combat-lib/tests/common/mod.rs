//! 整合測試共用的開局工具
#![allow(dead_code)]

use combat_lib::*;

/// 標準開局：
/// TeamA：1 (0,0) 近戰、2 (1,0) 近戰、3 (2,0) 遠程
/// TeamB：4 (0,6) 近戰、5 (1,6) 近戰、6 (2,6) 遠程
/// 首領：7 (3,3)
pub fn standard_session() -> Session {
    let abilities = AbilityTable::builtin().unwrap();
    let mut setup = Setup::new(RulesConfig::default(), abilities);
    for (side, y) in [(Side::TeamA, 0), (Side::TeamB, 6)] {
        setup.place(side, UnitClass::Melee, Pos::new(0, y)).unwrap();
        setup.place(side, UnitClass::Melee, Pos::new(1, y)).unwrap();
        setup.place(side, UnitClass::Ranged, Pos::new(2, y)).unwrap();
    }
    assert!(setup.is_ready());
    setup.finalize().unwrap()
}

pub const BOSS: UnitID = 7;

/// 直接把單位搬到指定格，用來擺出測試局面
pub fn relocate(session: &mut Session, unit_id: UnitID, pos: Pos) {
    session.board.move_unit(unit_id, pos).unwrap();
}

pub fn set_hp(session: &mut Session, unit_id: UnitID, hp: Hp) {
    session.board.get_mut(unit_id).unwrap().hp = hp;
}

pub fn pool(session: &Session, side: Side) -> &TeamPool {
    session.pool(side).unwrap()
}

/// 連續結束回合，直到輪到 side
pub fn end_turns_until(session: &mut Session, dice: &mut ScriptedDice, side: Side) {
    for _ in 0..TURN_CYCLE.len() {
        if session.current_side() == side {
            return;
        }
        match session.end_turn(dice).unwrap() {
            TurnOutcome::Advanced { .. } => {}
            TurnOutcome::Blocked { reason } => panic!("回合被阻擋: {reason}"),
        }
    }
    assert_eq!(session.current_side(), side);
}

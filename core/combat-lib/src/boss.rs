//! boss.rs：
//! - 首領行為：每次啟動擲一顆 d6。
//!   - 1~4：朝該方向滑行最多 N 格，出界時反向一次；落點有單位時將其擠出，等待玩家放置。
//!   - 5：回血。
//!   - 6：對周圍八格的所有非首領單位造成傷害。
//! - 骰子來源可注入（Dice），測試時使用固定序列。
use crate::*;
use std::collections::{BTreeSet, VecDeque};
use strum_macros::Display;

/// d6 骰子來源
pub trait Dice {
    /// 回傳 1..=6
    fn roll_d6(&mut self) -> u8;
}

/// 以 rand::Rng 實作的骰子
#[derive(Debug, Clone)]
pub struct RngDice<R: rand::Rng>(pub R);

impl<R: rand::Rng> Dice for RngDice<R> {
    fn roll_d6(&mut self) -> u8 {
        self.0.random_range(1..=6)
    }
}

impl RngDice<rand::rngs::ThreadRng> {
    pub fn thread() -> Self {
        Self(rand::rng())
    }
}

/// 依序回傳預先指定的點數；用盡後重複最後一個值（沒有則為 1）
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<u8>,
    last: Option<u8>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self {
            rolls: rolls.into_iter().map(|r| r.clamp(1, 6)).collect(),
            last: None,
        }
    }

    pub fn push(&mut self, roll: u8) {
        self.rolls.push_back(roll.clamp(1, 6));
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl Dice for ScriptedDice {
    fn roll_d6(&mut self) -> u8 {
        if let Some(roll) = self.rolls.pop_front() {
            self.last = Some(roll);
        }
        self.last.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Up,
    Right,
    Left,
    Down,
}

impl Direction {
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Down => (0, 1),
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossRoll {
    Slide(Direction),
    Heal,
    Breath,
}

impl BossRoll {
    pub fn from_d6(roll: u8) -> Self {
        match roll {
            1 => BossRoll::Slide(Direction::Up),
            2 => BossRoll::Slide(Direction::Right),
            3 => BossRoll::Slide(Direction::Left),
            4 => BossRoll::Slide(Direction::Down),
            5 => BossRoll::Heal,
            _ => BossRoll::Breath,
        }
    }
}

/// 計算滑行終點與實際移動格數。途中的單位不阻擋；出界時反向一次，反向後再出界即停止
pub fn slide_destination(
    board_size: usize,
    from: Pos,
    direction: Direction,
    steps: usize,
) -> (Pos, usize) {
    let step = |pos: Pos, dir: Direction| {
        let (dx, dy) = dir.delta();
        pos.offset(dx, dy)
            .filter(|p| p.x < board_size && p.y < board_size)
    };

    let mut pos = from;
    let mut dir = direction;
    let mut reversed = false;
    let mut moved = 0;
    for _ in 0..steps {
        let next = match step(pos, dir) {
            Some(next) => next,
            None if !reversed => {
                reversed = true;
                dir = dir.reverse();
                match step(pos, dir) {
                    Some(next) => next,
                    None => break,
                }
            }
            None => break,
        };
        pos = next;
        moved += 1;
    }
    (pos, moved)
}

impl Session {
    /// 執行一次首領行為，不推進回合
    pub fn run_boss(&mut self, dice: &mut impl Dice) -> Result<Vec<String>, Error> {
        let func = "Session::run_boss";

        let Some((boss_id, from)) = self.board.boss().and_then(|b| b.pos.map(|p| (b.id, p)))
        else {
            return Ok(vec!["首領不在場上".to_string()]);
        };
        let roll = dice.roll_d6();
        log::info!("boss rolled {roll}");
        let mut msgs = vec![format!("首領擲出 {}", roll)];

        match BossRoll::from_d6(roll) {
            BossRoll::Slide(direction) => {
                msgs.extend(
                    self.boss_slide(boss_id, from, direction)
                        .map_err(|e| e.wrap(func))?,
                );
            }
            BossRoll::Heal => {
                let heal = self.config.boss_heal;
                if let Some(boss) = self.board.get_mut(boss_id) {
                    boss.hp = (boss.hp + heal).min(boss.max_hp);
                    msgs.push(format!("首領休息，回復至 {} HP", boss.hp));
                }
            }
            BossRoll::Breath => {
                let targets: Vec<UnitID> = self
                    .board
                    .adjacent(from)
                    .into_iter()
                    .filter_map(|p| self.board.occupant(p))
                    .filter(|&id| id != boss_id)
                    .collect();
                if targets.is_empty() {
                    msgs.push("首領噴火，但周圍沒有目標".to_string());
                } else {
                    let bonus = self.take_next_hit_bonus(boss_id);
                    let amount = self.config.boss_breath_damage + bonus;
                    msgs.push("首領噴火".to_string());
                    for target in targets {
                        if self.board.get(target).is_some() {
                            msgs.extend(self.apply_damage(boss_id, target, amount)?);
                        }
                    }
                }
            }
        }
        Ok(msgs)
    }

    fn boss_slide(
        &mut self,
        boss_id: UnitID,
        from: Pos,
        direction: Direction,
    ) -> Result<Vec<String>, Error> {
        let (to, moved) = slide_destination(
            self.board.size,
            from,
            direction,
            self.config.boss_slide_steps,
        );
        if moved == 0 || to == from {
            return Ok(vec![format!("首領朝 {} 滑行但停在原地", direction)]);
        }

        let evicted = self.board.occupant(to).filter(|&id| id != boss_id);
        if let Some(id) = evicted {
            self.board.evict(id);
        }
        self.board.move_unit(boss_id, to)?;
        let mut msgs = vec![format!(
            "首領朝 {} 滑行 {} 格至 ({}, {})",
            direction, moved, to.x, to.y
        )];

        if let Some(evicted) = evicted {
            // 首領原位已空出，因此一定找得到空格
            let mut valid: BTreeSet<Pos> = self.board.empty_adjacent(to).into_iter().collect();
            if valid.is_empty() {
                valid = self.board.nearest_empty(to).into_iter().collect();
            }
            log::info!("boss displaced unit {evicted}");
            msgs.push(format!("首領擠開了 {}，請選擇放置位置", evicted));
            self.pending = Some(PendingAction::AwaitingBossDisplace {
                actor: boss_id,
                evicted,
                valid,
            });
        }
        Ok(msgs)
    }

    /// 取出 source 的下一擊加成（沒有 buff 時為 0）
    pub fn take_next_hit_bonus(&mut self, source: UnitID) -> Hp {
        self.board
            .get_mut(source)
            .map_or(0, |unit| unit.take_next_hit_bonus())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_rng_dice_in_range() {
        let mut dice = RngDice(StdRng::seed_from_u64(42));
        for _ in 0..200 {
            let roll = dice.roll_d6();
            assert!((1..=6).contains(&roll));
        }
        let mut dice = RngDice::thread();
        assert!((1..=6).contains(&dice.roll_d6()));
    }

    #[test]
    fn test_scripted_dice_repeats_last() {
        let mut dice = ScriptedDice::new([2, 9]);
        assert_eq!(dice.roll_d6(), 2);
        assert_eq!(dice.roll_d6(), 6);
        assert_eq!(dice.roll_d6(), 6);
        assert_eq!(ScriptedDice::default().roll_d6(), 1);

        dice.push(0);
        assert_eq!(dice.remaining(), 1);
        assert_eq!(dice.roll_d6(), 1, "超出範圍的點數會被夾到 1..=6");
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    fn test_slide_straight() {
        let (to, moved) = slide_destination(7, Pos::new(3, 3), Direction::Up, 3);
        assert_eq!((to, moved), (Pos::new(3, 0), 3));
        let (to, moved) = slide_destination(7, Pos::new(3, 3), Direction::Right, 3);
        assert_eq!((to, moved), (Pos::new(6, 3), 3));
    }

    #[test]
    fn test_slide_reverses_at_edge() {
        // (5,3) 往右：6 → 出界反向 → 5 → 4
        let (to, moved) = slide_destination(7, Pos::new(5, 3), Direction::Right, 3);
        assert_eq!((to, moved), (Pos::new(4, 3), 3));
        let (to, _) = slide_destination(7, Pos::new(0, 0), Direction::Left, 3);
        assert_eq!(to, Pos::new(3, 0));
    }

    #[test]
    fn test_slide_stops_after_second_edge() {
        // 1 格寬的棋盤：反向後仍出界
        let (to, moved) = slide_destination(1, Pos::new(0, 0), Direction::Down, 3);
        assert_eq!((to, moved), (Pos::new(0, 0), 0));
        // 2 格寬：往下 1 格、反向 1 格、再出界就停止
        let (to, moved) = slide_destination(2, Pos::new(0, 0), Direction::Down, 3);
        assert_eq!((to, moved), (Pos::new(0, 0), 2));
    }

    #[test]
    fn test_roll_mapping() {
        assert_eq!(BossRoll::from_d6(1), BossRoll::Slide(Direction::Up));
        assert_eq!(BossRoll::from_d6(4), BossRoll::Slide(Direction::Down));
        assert_eq!(BossRoll::from_d6(5), BossRoll::Heal);
        assert_eq!(BossRoll::from_d6(6), BossRoll::Breath);
    }

    #[test]
    fn test_heal_clamped() {
        let mut session = Session::for_tests();
        let boss = session.board.boss().unwrap().id;
        session.board.get_mut(boss).unwrap().hp = 19;
        session.run_boss(&mut ScriptedDice::new([5])).unwrap();
        assert_eq!(session.board.get(boss).unwrap().hp, 20);
    }

    #[test]
    fn test_breath_uses_strengthen_bonus() {
        let mut session = Session::for_tests();
        let boss = session.board.boss().unwrap().id;
        // 近戰 1 移到首領旁 (3,3) → (2,2)
        session.board.move_unit(1, Pos::new(2, 2)).unwrap();
        session
            .board
            .get_mut(boss)
            .unwrap()
            .buffs
            .push(Buff { bonus: 2, turns: 1 });
        session.run_boss(&mut ScriptedDice::new([6])).unwrap();
        assert_eq!(session.board.get(1).unwrap().hp, 2);
        assert!(session.board.get(boss).unwrap().buffs.is_empty());
    }

    #[test]
    fn test_slide_without_collision_moves_boss() {
        let mut session = Session::for_tests();
        let boss = session.board.boss().unwrap().id;
        // 往上 3 格到 (3,0)，該格為空
        session.run_boss(&mut ScriptedDice::new([1])).unwrap();
        assert_eq!(session.board.unit_to_pos(boss), Some(Pos::new(3, 0)));
        assert!(session.pending.is_none());
    }
}

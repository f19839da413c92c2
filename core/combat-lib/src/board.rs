use crate::*;
use std::collections::{BTreeMap, HashMap};

/// 八方向位移
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (0, -1),
    (1, 0),
    (-1, 0),
    (0, 1),
    (1, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
];

#[derive(Debug, Default, Clone)]
pub struct Board {
    pub size: usize,
    pub units: BTreeMap<UnitID, Unit>,
    pub unit_map: UnitMap,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    pub fn occupant(&self, pos: Pos) -> Option<UnitID> {
        self.unit_map.get_unit(pos)
    }

    pub fn unit_to_pos(&self, unit_id: UnitID) -> Option<Pos> {
        self.unit_map.get_pos(unit_id)
    }

    pub fn is_empty(&self, pos: Pos) -> bool {
        self.in_bounds(pos) && self.occupant(pos).is_none()
    }

    pub fn get(&self, unit_id: UnitID) -> Option<&Unit> {
        self.units.get(&unit_id)
    }

    pub fn get_mut(&mut self, unit_id: UnitID) -> Option<&mut Unit> {
        self.units.get_mut(&unit_id)
    }

    pub fn units_of(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |unit| unit.side == side)
    }

    pub fn boss(&self) -> Option<&Unit> {
        self.units.values().find(|unit| unit.is_boss())
    }

    /// 周圍八格中位於棋盤內的格子
    pub fn adjacent(&self, pos: Pos) -> Vec<Pos> {
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| pos.offset(dx, dy))
            .filter(|&p| self.in_bounds(p))
            .collect()
    }

    pub fn empty_adjacent(&self, pos: Pos) -> Vec<Pos> {
        self.adjacent(pos)
            .into_iter()
            .filter(|&p| self.is_empty(p))
            .collect()
    }

    /// 最靠近 pos 的一圈空格（Chebyshev 距離相同者），找不到時回傳空集合
    pub fn nearest_empty(&self, pos: Pos) -> Vec<Pos> {
        for ring in 1..self.size {
            let cells: Vec<Pos> = self
                .cells()
                .filter(|&p| p.distance(pos) == ring && self.is_empty(p))
                .collect();
            if !cells.is_empty() {
                return cells;
            }
        }
        Vec::new()
    }

    /// 由 from 出發、同列／同行／同斜線且距離不超過 max_dist 的棋盤內格子
    pub fn reachable_cells(&self, from: Pos, max_dist: usize) -> Vec<Pos> {
        self.cells()
            .filter(|&to| is_reachable(from, to, max_dist))
            .collect()
    }

    /// 依 (y, x) 順序列出所有格子
    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.size).flat_map(move |y| (0..self.size).map(move |x| Pos::new(x, y)))
    }

    pub fn place(&mut self, mut unit: Unit, pos: Pos) -> Result<(), Error> {
        let func = "Board::place";

        if !self.in_bounds(pos) {
            return Err(Error::OutOfBounds { func, pos });
        }
        if self.occupant(pos).is_some() {
            return Err(Error::PosOccupied { func, pos });
        }
        unit.pos = Some(pos);
        self.unit_map.insert(unit.id, pos);
        self.units.insert(unit.id, unit);
        Ok(())
    }

    pub fn move_unit(&mut self, unit_id: UnitID, to: Pos) -> Result<(), Error> {
        let func = "Board::move_unit";

        if !self.in_bounds(to) {
            return Err(Error::OutOfBounds { func, pos: to });
        }
        let unit = self
            .units
            .get_mut(&unit_id)
            .ok_or(Error::UnitNotFound { func, unit_id })?;
        match unit.pos {
            Some(from) => self.unit_map.move_unit(unit_id, from, to)?,
            None => {
                if self.unit_map.get_unit(to).is_some() {
                    return Err(Error::PosOccupied { func, pos: to });
                }
                self.unit_map.insert(unit_id, to);
            }
        }
        unit.pos = Some(to);
        Ok(())
    }

    /// 將單位移出棋盤但保留資料，等待重新放置
    pub fn evict(&mut self, unit_id: UnitID) -> Option<Pos> {
        let unit = self.units.get_mut(&unit_id)?;
        let pos = unit.pos.take()?;
        self.unit_map.remove(unit_id);
        Some(pos)
    }

    pub fn remove(&mut self, unit_id: UnitID) -> Option<Unit> {
        self.unit_map.remove(unit_id);
        self.units.remove(&unit_id)
    }
}

/// to ≠ from，位於同列／同行／同斜線，且 Chebyshev 距離不超過 max_dist
pub fn is_reachable(from: Pos, to: Pos, max_dist: usize) -> bool {
    if from == to {
        return false;
    }
    let dx = from.x.abs_diff(to.x);
    let dy = from.y.abs_diff(to.y);
    let on_line = dx == 0 || dy == 0 || dx == dy;
    on_line && from.distance(to) <= max_dist
}

#[derive(Debug, Default, Clone)]
pub struct UnitMap {
    pos_to_unit: HashMap<Pos, UnitID>,
    unit_to_pos: HashMap<UnitID, Pos>,
}

impl UnitMap {
    pub fn insert(&mut self, unit_id: UnitID, pos: Pos) {
        self.pos_to_unit.insert(pos, unit_id);
        self.unit_to_pos.insert(unit_id, pos);
    }

    pub fn move_unit(&mut self, unit_id: UnitID, from: Pos, to: Pos) -> Result<(), Error> {
        let func = "UnitMap::move_unit";

        if self.unit_to_pos.get(&unit_id) != Some(&from) {
            return Err(Error::UnitNotOnBoard { func, unit_id });
        }
        if from == to {
            return Ok(());
        }
        if self.pos_to_unit.contains_key(&to) {
            return Err(Error::PosOccupied { func, pos: to });
        }
        self.pos_to_unit.remove(&from);
        self.pos_to_unit.insert(to, unit_id);
        self.unit_to_pos.insert(unit_id, to);
        Ok(())
    }

    pub fn remove(&mut self, unit_id: UnitID) -> Option<Pos> {
        let pos = self.unit_to_pos.remove(&unit_id)?;
        self.pos_to_unit.remove(&pos);
        Some(pos)
    }

    pub fn get_unit(&self, pos: Pos) -> Option<UnitID> {
        self.pos_to_unit.get(&pos).copied()
    }

    pub fn get_pos(&self, unit_id: UnitID) -> Option<Pos> {
        self.unit_to_pos.get(&unit_id).copied()
    }

    pub fn len(&self) -> usize {
        self.unit_to_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_to_pos.is_empty()
    }
}

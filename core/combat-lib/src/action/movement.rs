//! movement.rs：
//! - 負責單位移動：可移動格的計算與移動結算。
//! - 移動只能到移動力範圍內、同列／同行／同斜線上的空格，途中單位不阻擋。
use crate::*;
use std::collections::BTreeSet;

/// 單位可移動到的空格
pub fn movement_cells(board: &Board, unit: &Unit) -> BTreeSet<Pos> {
    let Some(from) = unit.pos else {
        return BTreeSet::new();
    };
    board
        .reachable_cells(from, unit.movement)
        .into_iter()
        .filter(|&p| board.is_empty(p))
        .collect()
}

impl Session {
    pub(crate) fn resolve_move(
        &mut self,
        actor: UnitID,
        ability_id: &str,
        cost: ActionPoints,
        to: Pos,
    ) -> Result<Vec<String>, Error> {
        let ability = self.ability_of(actor, ability_id)?;
        self.commit_ability(actor, &ability, cost)?;
        self.board.move_unit(actor, to)?;
        let ap = self
            .unit(actor)
            .ok()
            .and_then(|u| self.pool(u.side))
            .map_or(0, |p| p.ap);
        Ok(vec![format!(
            "{} 移動到 ({}, {})，剩餘 AP {}",
            actor, to.x, to.y, ap
        )])
    }
}

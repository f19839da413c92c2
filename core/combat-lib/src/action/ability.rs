//! ability.rs：
//! - 技能選取與結算：依序檢查 陣營 → 休息 → 已行動 → AP → 冷卻 → 目標。
//! - 需要點選目標的技能開啟對應的待決行動；自身與範圍技能立即結算。
//! - 休息（rest）也在此處理。
use crate::*;
use std::collections::BTreeSet;

impl Session {
    /// 選取並使用技能。spend 只用於可變消耗的技能
    pub fn select_ability(
        &mut self,
        unit_id: UnitID,
        ability_id: &str,
        spend: Option<ActionPoints>,
    ) -> Result<Vec<String>, Error> {
        let func = "Session::select_ability";

        self.ensure_ongoing(func)?;
        if let Some(kind) = self.pending_kind() {
            return Err(Error::PendingActionOpen { func, kind });
        }
        let ability = self.ability_of(unit_id, ability_id)?;
        let cost = self
            .check_usable(unit_id, &ability, spend)
            .map_err(|e| e.wrap(func))?;

        match ability.targeting {
            Targeting::Movement | Targeting::Adjacent | Targeting::Reachable { .. } => {
                let valid = self.ability_targets(unit_id, &ability)?;
                if valid.is_empty() {
                    return Err(Error::NoValidTarget {
                        func,
                        ability: ability.name.clone(),
                    });
                }
                let actor = unit_id;
                let name = ability.name.clone();
                let pending = match ability.targeting {
                    Targeting::Movement => PendingAction::AwaitingMoveTarget {
                        actor,
                        ability: name,
                        cost,
                        valid,
                    },
                    Targeting::Adjacent => PendingAction::AwaitingMeleeTarget {
                        actor,
                        ability: name,
                        cost,
                        valid,
                    },
                    _ => PendingAction::AwaitingRangedTarget {
                        actor,
                        ability: name,
                        cost,
                        valid,
                    },
                };
                let msg = format!("{} 選擇 {}，請選擇目標", unit_id, ability.name);
                log::debug!("unit {unit_id} opened {}", pending.kind());
                self.pending = Some(pending);
                self.selected = Some(unit_id);
                Ok(vec![msg])
            }
            Targeting::Caster => {
                let msgs = self.resolve_self_ability(unit_id, &ability, cost)?;
                self.selected = Some(unit_id);
                Ok(msgs)
            }
            Targeting::AoeAdjacent | Targeting::AoeReachable { .. } => {
                let targets = self.ability_area(unit_id, &ability)?;
                if targets.is_empty() {
                    return Err(Error::NoValidTarget {
                        func,
                        ability: ability.name.clone(),
                    });
                }
                let msgs = self.resolve_area_ability(unit_id, &ability, cost, &targets)?;
                self.selected = Some(unit_id);
                Ok(msgs)
            }
        }
    }

    /// 休息：本回合不再行動，回合結束時所屬隊伍 +AP / +HP
    pub fn rest(&mut self, unit_id: UnitID) -> Result<Vec<String>, Error> {
        let func = "Session::rest";

        self.ensure_ongoing(func)?;
        if let Some(kind) = self.pending_kind() {
            return Err(Error::PendingActionOpen { func, kind });
        }
        let slot = self.current_side();
        let unit = self
            .board
            .get_mut(unit_id)
            .ok_or(Error::UnitNotFound { func, unit_id })?;
        if unit.is_boss() {
            return Err(Error::AbilityNotFound {
                func,
                class: unit.class,
                ability: "rest".to_string(),
            });
        }
        if unit.side != slot {
            return Err(Error::WrongActor {
                func,
                unit_id,
                slot,
            });
        }
        if unit.rested {
            return Err(Error::UnitRested { func, unit_id });
        }
        if unit.acted {
            return Err(Error::UnitActed { func, unit_id });
        }
        unit.rested = true;
        self.rest_queue.insert(unit_id);
        self.selected = Some(unit_id);
        log::debug!("unit {unit_id} rests");
        Ok(vec![format!("{} 休息，回合結束時 +AP / +HP", unit_id)])
    }

    /// 依職業查技能
    pub fn ability_of(&self, unit_id: UnitID, ability_id: &str) -> Result<Ability, Error> {
        let func = "Session::ability_of";

        let unit = self.unit(unit_id)?;
        self.abilities
            .get(unit.class, ability_id)
            .cloned()
            .ok_or_else(|| Error::AbilityNotFound {
                func,
                class: unit.class,
                ability: ability_id.to_string(),
            })
    }

    /// 檢查單位現在能否使用技能（不含目標），回傳實際 AP 消耗
    pub fn check_usable(
        &self,
        unit_id: UnitID,
        ability: &Ability,
        spend: Option<ActionPoints>,
    ) -> Result<ActionPoints, Error> {
        let func = "Session::check_usable";

        let unit = self.unit(unit_id)?;
        if unit.pos.is_none() {
            return Err(Error::UnitNotOnBoard { func, unit_id });
        }
        let slot = self.current_side();
        if unit.side != slot {
            return Err(Error::WrongActor {
                func,
                unit_id,
                slot,
            });
        }
        if unit.rested {
            return Err(Error::UnitRested { func, unit_id });
        }
        if unit.acted && !ability.exempt_from_acted {
            return Err(Error::UnitActed { func, unit_id });
        }

        // 首領沒有 AP 池，技能免費
        let cost = match self.pool(unit.side) {
            None => 0,
            Some(pool) => {
                let cost = ability.ap_cost(spend);
                if let (Cost::Variable { min }, Some(spend)) = (ability.cost, spend) {
                    if spend < min || spend > pool.ap.max(min) {
                        return Err(Error::InvalidApSpend {
                            func,
                            spend,
                            available: pool.ap,
                        });
                    }
                }
                if pool.ap < cost {
                    return Err(Error::NotEnoughAp {
                        func,
                        needed: cost,
                        available: pool.ap,
                    });
                }
                cost
            }
        };

        let turns = unit.cooldown(&ability.name);
        if turns > 0 {
            return Err(Error::OnCooldown {
                func,
                ability: ability.name.clone(),
                turns,
            });
        }
        Ok(cost)
    }

    /// 需要點選目標的技能：回傳合法目標格
    pub fn ability_targets(
        &self,
        unit_id: UnitID,
        ability: &Ability,
    ) -> Result<BTreeSet<Pos>, Error> {
        let func = "Session::ability_targets";

        let unit = self.unit(unit_id)?;
        let from = unit
            .pos
            .ok_or(Error::UnitNotOnBoard { func, unit_id })?;
        let hostile_at = |pos: Pos| {
            self.board
                .occupant(pos)
                .and_then(|id| self.board.get(id))
                .is_some_and(|other| unit.is_hostile_to(other))
        };
        let targets = match ability.targeting {
            Targeting::Movement => movement_cells(&self.board, unit),
            Targeting::Adjacent => self
                .board
                .adjacent(from)
                .into_iter()
                .filter(|&p| hostile_at(p))
                .collect(),
            Targeting::Reachable { .. } => {
                let range = unit.effective_range(ability, self.config.focus_range_multiplier);
                self.board
                    .reachable_cells(from, range)
                    .into_iter()
                    .filter(|&p| hostile_at(p))
                    .collect()
            }
            Targeting::Caster | Targeting::AoeAdjacent | Targeting::AoeReachable { .. } => {
                BTreeSet::new()
            }
        };
        Ok(targets)
    }

    /// 範圍技能會命中的單位：範圍內除施放者外的所有單位，首領技能另排除首領
    pub fn ability_area(&self, unit_id: UnitID, ability: &Ability) -> Result<Vec<UnitID>, Error> {
        let func = "Session::ability_area";

        let unit = self.unit(unit_id)?;
        let from = unit
            .pos
            .ok_or(Error::UnitNotOnBoard { func, unit_id })?;
        let cells = match ability.targeting {
            Targeting::AoeAdjacent => self.board.adjacent(from),
            Targeting::AoeReachable { .. } => {
                let range = unit.effective_range(ability, self.config.focus_range_multiplier);
                self.board.reachable_cells(from, range)
            }
            _ => Vec::new(),
        };
        let targets = cells
            .into_iter()
            .filter_map(|p| self.board.occupant(p))
            .filter(|&id| id != unit_id)
            .filter(|&id| {
                ability.class != UnitClass::Boss
                    || self.board.get(id).is_some_and(|u| !u.is_boss())
            })
            .collect();
        Ok(targets)
    }

    /// 扣 AP、設定已行動、開始冷卻
    pub(crate) fn commit_ability(
        &mut self,
        unit_id: UnitID,
        ability: &Ability,
        cost: ActionPoints,
    ) -> Result<(), Error> {
        let func = "Session::commit_ability";

        let side = self.unit(unit_id)?.side;
        if let Some(pool) = self.pools.get_mut(&side) {
            pool.spend_ap(cost)?;
        }
        let unit = self
            .board
            .get_mut(unit_id)
            .ok_or(Error::UnitMissing { func, unit_id })?;
        if !ability.exempt_from_acted {
            unit.acted = true;
        }
        unit.start_cooldown(&ability.name, ability.cooldown);
        log::debug!("unit {unit_id} used {} for {cost} AP", ability.name);
        Ok(())
    }

    /// 以同一次加成對多個目標造成傷害，回傳訊息與仍在場上的目標
    pub(crate) fn strike_units(
        &mut self,
        source: UnitID,
        targets: &[UnitID],
        damage: Hp,
    ) -> Result<(Vec<String>, Vec<UnitID>), Error> {
        let bonus = self.take_next_hit_bonus(source);
        let amount = damage + bonus;
        let mut msgs = Vec::new();
        for &target in targets {
            if self.board.get(target).is_some() {
                msgs.extend(self.apply_damage(source, target, amount)?);
            }
        }
        let survivors = targets
            .iter()
            .copied()
            .filter(|id| self.board.get(*id).is_some())
            .collect();
        Ok((msgs, survivors))
    }

    fn resolve_self_ability(
        &mut self,
        unit_id: UnitID,
        ability: &Ability,
        cost: ActionPoints,
    ) -> Result<Vec<String>, Error> {
        let func = "Session::resolve_self_ability";

        self.commit_ability(unit_id, ability, cost)?;
        let unit = self
            .board
            .get_mut(unit_id)
            .ok_or(Error::UnitMissing { func, unit_id })?;
        let msg = match ability.effect {
            AbilityEffect::Focus => {
                unit.acted = true;
                unit.focus_queued = true;
                format!("{} 進入專注姿態，下回合射程加倍", unit_id)
            }
            AbilityEffect::NextHitBuff { bonus, turns } => {
                unit.buffs.push(Buff { bonus, turns });
                format!("{} 強化，下一擊 +{}", unit_id, bonus)
            }
            _ => format!("{} 使用 {}", unit_id, ability.name),
        };
        Ok(vec![msg])
    }

    fn resolve_area_ability(
        &mut self,
        unit_id: UnitID,
        ability: &Ability,
        cost: ActionPoints,
        targets: &[UnitID],
    ) -> Result<Vec<String>, Error> {
        self.commit_ability(unit_id, ability, cost)?;
        let mut msgs = vec![format!("{} 使用 {}", unit_id, ability.name)];
        let (hit_msgs, survivors) =
            self.strike_units(unit_id, targets, ability.base_damage(Some(cost)))?;
        msgs.extend(hit_msgs);

        if ability.follow_up == FollowUp::ForcedMove && self.status == GameStatus::Ongoing {
            let Some(from) = self.board.get(unit_id).and_then(|u| u.pos) else {
                return Ok(msgs);
            };
            let valid: BTreeSet<Pos> = self.board.empty_adjacent(from).into_iter().collect();
            if valid.is_empty() {
                msgs.push(format!("{} 周圍沒有空格，略過突進", unit_id));
            } else {
                msgs.push(format!("{} 必須突進到相鄰空格", unit_id));
                self.pending = Some(PendingAction::AwaitingForcedFollowMove {
                    actor: unit_id,
                    struck: survivors,
                    valid,
                });
            }
        }
        Ok(msgs)
    }
}

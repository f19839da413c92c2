use crate::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type WirePos = [usize; 2];

fn to_wire(pos: Pos) -> WirePos {
    [pos.x, pos.y]
}

fn from_wire(pos: WirePos) -> Pos {
    Pos::new(pos[0], pos[1])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityOffer {
    pub name: AbilityID,
    pub cost: ActionPoints,
    pub damage: Hp,
    pub range: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyInfo {
    #[serde(rename = "type")]
    pub class: UnitClass,
    pub hp: Hp,
    pub position: WirePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    /// 每列一個字串，見 Session::ascii_board
    pub grid: Vec<String>,
    pub acting_team: Side,
    pub unit_class: UnitClass,
    pub position: WirePos,
    #[serde(rename = "availableAP")]
    pub available_ap: ActionPoints,
    pub abilities: Vec<AbilityOffer>,
    pub enemies: Vec<EnemyInfo>,
    /// 先列出可移動格，再列出可攻擊的敵方位置
    pub valid_targets: Vec<WirePos>,
    pub current_hp: Hp,
    pub max_hp: Hp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceAction {
    Attack,
    Move,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryResponse {
    pub action: AdviceAction,
    #[serde(default)]
    pub target: Option<WirePos>,
    #[serde(default)]
    pub ability: Option<AbilityID>,
    #[serde(default)]
    pub reasoning: String,
}

impl AdvisoryResponse {
    pub fn from_json(body: &str) -> Result<Self, TransportError> {
        serde_json::from_str(body).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

/// 建議服務的傳輸錯誤，一律由本地規則接手，不會往外拋
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("建議服務無法連線: {0}")]
    Unreachable(String),
    #[error("建議服務逾時")]
    Timeout,
    #[error("建議服務回應格式錯誤: {0}")]
    Malformed(String),
}

/// 外部建議服務（同步呼叫）
pub trait Advisor {
    fn advise(&mut self, request: &AdvisoryRequest) -> Result<AdvisoryResponse, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    Attack {
        ability: AbilityID,
        target: Pos,
        spend: ActionPoints,
    },
    Move {
        target: Pos,
    },
    /// 沒有可做的事
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceSource {
    Advisor,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advice {
    pub recommendation: Recommendation,
    pub reasoning: String,
    pub source: AdviceSource,
}

impl AdvisoryRequest {
    fn enemy_positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.enemies.iter().map(|e| from_wire(e.position))
    }

    /// valid_targets 中不是敵方位置的格子
    pub fn move_cells(&self) -> Vec<Pos> {
        let enemies: Vec<Pos> = self.enemy_positions().collect();
        self.valid_targets
            .iter()
            .map(|&p| from_wire(p))
            .filter(|p| !enemies.contains(p))
            .collect()
    }

    fn in_range(&self, offer: &AbilityOffer, target: Pos) -> bool {
        is_reachable(from_wire(self.position), target, offer.range)
    }

    fn nearest_enemy_distance(&self, from: Pos) -> Option<usize> {
        self.enemy_positions().map(|p| p.distance(from)).min()
    }
}

/// 驗證外部回應；回傳 None 代表需要改用本地規則
pub fn validate_response(
    request: &AdvisoryRequest,
    response: &AdvisoryResponse,
) -> Option<Recommendation> {
    let first = *request.valid_targets.first()?;
    let target = match response.target {
        Some(t) if request.valid_targets.contains(&t) => t,
        _ => first,
    };
    let target = from_wire(target);
    match response.action {
        AdviceAction::Attack => {
            let name = response.ability.as_ref()?;
            let offer = request.abilities.iter().find(|o| &o.name == name)?;
            let hits_enemy = request.enemy_positions().any(|p| p == target);
            if !hits_enemy || !request.in_range(offer, target) {
                return None;
            }
            Some(Recommendation::Attack {
                ability: offer.name.clone(),
                target,
                spend: offer.cost,
            })
        }
        AdviceAction::Move => request
            .move_cells()
            .contains(&target)
            .then_some(Recommendation::Move { target }),
    }
}

/// 本地規則決策，依優先序：
/// 1. 可擊殺範圍內的敵人 → 攻擊
/// 2. 低血量且有敵人相鄰 → 移動到離最近敵人最遠的格子
/// 3. 最近的敵人在中距離之外 → 靠近
/// 4. 非低血量且有 ≥2 傷害的技能可打到敵人 → 攻擊
/// 5. 靠近最近的敵人
/// 6. 第一個可移動格
pub fn fallback_decision(request: &AdvisoryRequest, config: &RulesConfig) -> (Recommendation, String) {
    let here = from_wire(request.position);
    let low_health = request.current_hp < config.advisor_low_health;
    let moves = request.move_cells();

    let mut enemies: Vec<&EnemyInfo> = request.enemies.iter().collect();
    enemies.sort_by_key(|e| e.hp);
    let mut offers: Vec<&AbilityOffer> = request.abilities.iter().collect();
    offers.sort_by_key(|o| o.cost);

    let attack = |offer: &AbilityOffer, enemy: &EnemyInfo| Recommendation::Attack {
        ability: offer.name.clone(),
        target: from_wire(enemy.position),
        spend: offer.cost,
    };

    // 1
    for enemy in &enemies {
        let target = from_wire(enemy.position);
        if let Some(offer) = offers
            .iter()
            .find(|o| o.damage >= enemy.hp && request.in_range(o, target))
        {
            return (attack(*offer, *enemy), "可擊殺範圍內的敵人".to_string());
        }
    }

    let nearest_after = |pos: Pos| request.nearest_enemy_distance(pos).unwrap_or(usize::MAX);
    let toward = moves.iter().copied().min_by_key(|&p| nearest_after(p));

    // 2
    let enemy_adjacent = request.nearest_enemy_distance(here) == Some(1);
    if low_health && enemy_adjacent {
        if let Some(target) = moves.iter().copied().max_by_key(|&p| {
            // 同分時取第一個
            (nearest_after(p), std::cmp::Reverse(moves.iter().position(|m| *m == p)))
        }) {
            return (Recommendation::Move { target }, "低血量，撤離".to_string());
        }
    }

    // 3
    let far = request
        .nearest_enemy_distance(here)
        .is_some_and(|d| d > config.advisor_medium_range);
    if far {
        if let Some(target) = toward {
            return (Recommendation::Move { target }, "敵人太遠，靠近".to_string());
        }
    }

    // 4
    if !low_health {
        let mut strong: Vec<&&AbilityOffer> = offers.iter().filter(|o| o.damage >= 2).collect();
        strong.sort_by_key(|o| std::cmp::Reverse(o.damage));
        for offer in strong {
            if let Some(enemy) = enemies
                .iter()
                .find(|e| request.in_range(offer, from_wire(e.position)))
            {
                return (attack(*offer, *enemy), "使用高傷害技能".to_string());
            }
        }
    }

    // 5
    if request.enemies.is_empty() {
        if let Some(&target) = moves.first() {
            return (Recommendation::Move { target }, "沒有敵人，任意移動".to_string());
        }
    } else if let Some(target) = toward {
        return (Recommendation::Move { target }, "靠近最近的敵人".to_string());
    }

    // 6
    match moves.first() {
        Some(&target) => (Recommendation::Move { target }, "第一個可移動格".to_string()),
        None => (Recommendation::Rest, "沒有可執行的行動".to_string()),
    }
}

impl Session {
    /// 依目前狀態組出指定單位的建議請求
    pub fn advisory_request(&self, unit_id: UnitID) -> Result<AdvisoryRequest, Error> {
        let func = "Session::advisory_request";

        let unit = self.unit(unit_id)?;
        let Some(opponent) = unit.side.opponent() else {
            return Err(Error::NotAdvisable { func, unit_id });
        };
        let position = unit
            .pos
            .ok_or(Error::UnitNotOnBoard { func, unit_id })?;
        let available_ap = self.pool(unit.side).map_or(0, |p| p.ap);

        let enemies: Vec<EnemyInfo> = self
            .board
            .units_of(opponent)
            .filter_map(|e| {
                e.pos.map(|p| EnemyInfo {
                    class: e.class,
                    hp: e.hp,
                    position: to_wire(p),
                })
            })
            .collect();

        let mut abilities = Vec::new();
        let mut move_cells = Vec::new();
        let mut attack_cells = Vec::new();
        for ability in self.abilities.for_class(unit.class) {
            match ability.targeting {
                Targeting::Movement => {
                    if self.check_usable(unit_id, ability, None).is_ok() {
                        move_cells.extend(movement_cells(&self.board, unit));
                    }
                }
                Targeting::Adjacent | Targeting::Reachable { .. } => {
                    let spend = if ability.is_variable_cost() {
                        Some(available_ap.min(2).max(ability.ap_cost(None)))
                    } else {
                        None
                    };
                    let Ok(cost) = self.check_usable(unit_id, ability, spend) else {
                        continue;
                    };
                    let targets = self.ability_targets(unit_id, ability)?;
                    let enemy_targets: Vec<WirePos> = targets
                        .into_iter()
                        .map(to_wire)
                        .filter(|p| enemies.iter().any(|e| e.position == *p))
                        .collect();
                    attack_cells.extend(enemy_targets);
                    abilities.push(AbilityOffer {
                        name: ability.name.clone(),
                        cost,
                        damage: ability.base_damage(Some(cost)),
                        range: unit.effective_range(ability, self.config.focus_range_multiplier),
                    });
                }
                _ => {}
            }
        }

        let mut valid_targets: Vec<WirePos> = move_cells.into_iter().map(to_wire).collect();
        for cell in attack_cells {
            if !valid_targets.contains(&cell) {
                valid_targets.push(cell);
            }
        }

        Ok(AdvisoryRequest {
            grid: self.ascii_board().lines().map(String::from).collect(),
            acting_team: unit.side,
            unit_class: unit.class,
            position: to_wire(position),
            available_ap,
            abilities,
            enemies,
            valid_targets,
            current_hp: unit.hp,
            max_hp: unit.max_hp,
        })
    }

    /// 取得建議；advisor 為 None 或失敗時使用本地規則
    pub fn recommend(
        &self,
        unit_id: UnitID,
        advisor: Option<&mut dyn Advisor>,
    ) -> Result<Advice, Error> {
        let request = self.advisory_request(unit_id)?;
        if let Some(advisor) = advisor {
            match advisor.advise(&request) {
                Ok(response) => match validate_response(&request, &response) {
                    Some(recommendation) => {
                        return Ok(Advice {
                            recommendation,
                            reasoning: response.reasoning,
                            source: AdviceSource::Advisor,
                        });
                    }
                    None => log::warn!("advisor response rejected for unit {unit_id}: {response:?}"),
                },
                Err(err) => log::warn!("advisor failed for unit {unit_id}: {err}"),
            }
        }
        let (recommendation, reasoning) = fallback_decision(&request, &self.config);
        Ok(Advice {
            recommendation,
            reasoning,
            source: AdviceSource::Fallback,
        })
    }

    /// 透過一般的技能流程執行建議
    pub fn execute_recommendation(
        &mut self,
        unit_id: UnitID,
        recommendation: &Recommendation,
    ) -> Result<Vec<String>, Error> {
        let func = "Session::execute_recommendation";

        let (ability, target, spend) = match recommendation {
            Recommendation::Rest => return self.rest(unit_id),
            Recommendation::Attack {
                ability,
                target,
                spend,
            } => (ability.clone(), *target, Some(*spend)),
            Recommendation::Move { target } => {
                let class = self.unit(unit_id)?.class;
                let ability = self
                    .abilities
                    .for_class(class)
                    .find(|a| a.targeting == Targeting::Movement)
                    .map(|a| a.name.clone())
                    .ok_or_else(|| Error::AbilityNotFound {
                        func,
                        class,
                        ability: "move".to_string(),
                    })?;
                (ability, *target, None)
            }
        };

        let mut msgs = self
            .select_ability(unit_id, &ability, spend)
            .map_err(|e| e.wrap(func))?;
        match self.select_target(target) {
            Ok(more) => {
                msgs.extend(more);
                Ok(msgs)
            }
            Err(err) => {
                // 建議無效時不留下懸空的提示
                if self.pending.as_ref().is_some_and(|p| !p.is_forced()) {
                    self.pending = None;
                }
                Err(err.wrap(func))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAdvisor(Result<&'static str, ()>);

    impl Advisor for FixedAdvisor {
        fn advise(&mut self, _: &AdvisoryRequest) -> Result<AdvisoryResponse, TransportError> {
            match self.0 {
                Ok(body) => AdvisoryResponse::from_json(body),
                Err(()) => Err(TransportError::Timeout),
            }
        }
    }

    fn request() -> AdvisoryRequest {
        AdvisoryRequest {
            grid: Vec::new(),
            acting_team: Side::TeamA,
            unit_class: UnitClass::Ranged,
            position: [2, 2],
            available_ap: 3,
            abilities: vec![
                AbilityOffer {
                    name: "quick_shot".to_string(),
                    cost: 1,
                    damage: 1,
                    range: 3,
                },
                AbilityOffer {
                    name: "bullseye".to_string(),
                    cost: 2,
                    damage: 4,
                    range: 3,
                },
            ],
            enemies: vec![EnemyInfo {
                class: UnitClass::Melee,
                hp: 7,
                position: [2, 5],
            }],
            valid_targets: vec![[2, 1], [2, 3], [2, 5]],
            current_hp: 4,
            max_hp: 4,
        }
    }

    #[test]
    fn test_request_json_shape() {
        let value = serde_json::to_value(request()).unwrap();
        assert_eq!(value["availableAP"], 3);
        assert_eq!(value["actingTeam"], "team_a");
        assert_eq!(value["enemies"][0]["type"], "melee");
        assert_eq!(value["validTargets"][0], serde_json::json!([2, 1]));
    }

    #[test]
    fn test_validate_replaces_unknown_target() {
        let req = request();
        let resp = AdvisoryResponse::from_json(
            r#"{"action":"move","target":[6,6],"reasoning":"go"}"#,
        )
        .unwrap();
        assert_eq!(
            validate_response(&req, &resp),
            Some(Recommendation::Move {
                target: Pos::new(2, 1)
            })
        );
    }

    #[test]
    fn test_validate_rejects_unoffered_ability() {
        let req = request();
        let resp = AdvisoryResponse::from_json(
            r#"{"action":"attack","target":[2,5],"ability":"firebreath"}"#,
        )
        .unwrap();
        assert_eq!(validate_response(&req, &resp), None);

        let resp = AdvisoryResponse::from_json(
            r#"{"action":"attack","target":[2,5],"ability":"bullseye"}"#,
        )
        .unwrap();
        assert_eq!(
            validate_response(&req, &resp),
            Some(Recommendation::Attack {
                ability: "bullseye".to_string(),
                target: Pos::new(2, 5),
                spend: 2
            })
        );
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            AdvisoryResponse::from_json("not json"),
            Err(TransportError::Malformed(_))
        ));
    }

    #[test]
    fn test_fallback_priorities() {
        let config = RulesConfig::default();

        // 4：不是低血量，bullseye 傷害 4 可打到
        let (rec, _) = fallback_decision(&request(), &config);
        assert!(matches!(rec, Recommendation::Attack { ref ability, .. } if ability == "bullseye"));

        // 1：可擊殺
        let mut req = request();
        req.enemies[0].hp = 1;
        let (rec, _) = fallback_decision(&req, &config);
        assert!(matches!(rec, Recommendation::Attack { ref ability, .. } if ability == "quick_shot"));

        // 2：低血量且敵人相鄰 → 遠離
        let mut req = request();
        req.current_hp = 2;
        req.enemies[0].position = [2, 3];
        req.valid_targets = vec![[2, 1], [1, 3], [2, 3]];
        let (rec, _) = fallback_decision(&req, &config);
        assert_eq!(rec, Recommendation::Move { target: Pos::new(2, 1) });

        // 3：敵人太遠 → 靠近
        let mut req = request();
        req.enemies[0].position = [2, 6];
        req.valid_targets = vec![[2, 1], [2, 3]];
        let (rec, _) = fallback_decision(&req, &config);
        assert_eq!(rec, Recommendation::Move { target: Pos::new(2, 3) });

        // 6 / Rest
        let mut req = request();
        req.abilities.clear();
        req.enemies.clear();
        req.valid_targets.clear();
        let (rec, _) = fallback_decision(&req, &config);
        assert_eq!(rec, Recommendation::Rest);
    }

    #[test]
    fn test_recommend_from_session() {
        let mut session = Session::for_tests();
        // 敵方近戰 4 移到遠程 3 (2,0) 的射程內
        session.board.move_unit(4, Pos::new(2, 3)).unwrap();
        let req = session.advisory_request(3).unwrap();
        assert_eq!(req.position, [2, 0]);
        assert_eq!(req.enemies.len(), 3);
        assert!(req.valid_targets.contains(&[2, 3]));
        assert!(req.abilities.iter().any(|o| o.name == "bullseye" && o.cost == 2 && o.damage == 4));
        assert!(req.abilities.iter().all(|o| o.name != "focused_stance"));

        // advisor 逾時 → 本地規則，bullseye 打 (2,3)
        let mut advisor = FixedAdvisor(Err(()));
        let advice = session.recommend(3, Some(&mut advisor)).unwrap();
        assert_eq!(advice.source, AdviceSource::Fallback);
        assert_eq!(
            advice.recommendation,
            Recommendation::Attack {
                ability: "bullseye".to_string(),
                target: Pos::new(2, 3),
                spend: 2
            }
        );

        session
            .execute_recommendation(3, &advice.recommendation)
            .unwrap();
        assert_eq!(session.board.get(4).unwrap().hp, 3);
        assert_eq!(session.pools[&Side::TeamA].ap, 1);
    }

    #[test]
    fn test_recommend_uses_valid_advisor_response() {
        let session = Session::for_tests();
        let mut advisor =
            FixedAdvisor(Ok(r#"{"action":"move","target":[0,1],"reasoning":"forward"}"#));
        let advice = session.recommend(1, Some(&mut advisor)).unwrap();
        assert_eq!(advice.source, AdviceSource::Advisor);
        assert_eq!(advice.recommendation, Recommendation::Move { target: Pos::new(0, 1) });
        assert_eq!(advice.reasoning, "forward");

        assert!(matches!(
            session.advisory_request(7),
            Err(Error::NotAdvisable { .. })
        ));
    }
}

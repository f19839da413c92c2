use crate::*;

/// 組合 Session、骰子、Renderer 與 Advisor；狀態改變後重繪
pub struct Game<D: Dice> {
    session: Session,
    dice: D,
    renderer: Option<Box<dyn Renderer>>,
    advisor: Option<Box<dyn Advisor>>,
}

impl<D: Dice> Game<D> {
    pub fn new(session: Session, dice: D) -> Self {
        Self {
            session,
            dice,
            renderer: None,
            advisor: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self.render();
        self
    }

    pub fn with_advisor(mut self, advisor: Box<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn render(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&self.session.snapshot());
        }
    }

    // 成功或結構性錯誤（待決行動被中止）都代表狀態已變
    fn commit<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.render(),
            Err(err) if err.category() == ErrorCategory::Structural => self.render(),
            Err(err) => log::debug!("rejected: {err}"),
        }
        result
    }

    pub fn select_unit(&mut self, unit_id: Option<UnitID>) -> Result<(), Error> {
        let result = self.session.select_unit(unit_id);
        self.commit(result)
    }

    pub fn select_ability(
        &mut self,
        unit_id: UnitID,
        ability: &str,
        spend: Option<ActionPoints>,
    ) -> Result<Vec<String>, Error> {
        let result = self.session.select_ability(unit_id, ability, spend);
        self.commit(result)
    }

    pub fn select_target(&mut self, pos: Pos) -> Result<Vec<String>, Error> {
        let result = self.session.select_target(pos);
        self.commit(result)
    }

    pub fn cancel_pending(&mut self) -> Result<Vec<String>, Error> {
        let result = self.session.cancel_pending();
        self.commit(result)
    }

    pub fn rest(&mut self, unit_id: UnitID) -> Result<Vec<String>, Error> {
        let result = self.session.rest(unit_id);
        self.commit(result)
    }

    pub fn end_turn(&mut self) -> Result<TurnOutcome, Error> {
        let result = self.session.end_turn(&mut self.dice);
        if matches!(result, Ok(TurnOutcome::Blocked { .. })) {
            return result;
        }
        self.commit(result)
    }

    pub fn recommend(&mut self, unit_id: UnitID) -> Result<Advice, Error> {
        match self.advisor.as_mut() {
            Some(advisor) => self.session.recommend(unit_id, Some(advisor.as_mut())),
            None => self.session.recommend(unit_id, None),
        }
    }

    /// 取得建議並立即執行
    pub fn play_recommended(&mut self, unit_id: UnitID) -> Result<Vec<String>, Error> {
        let advice = self.recommend(unit_id)?;
        log::debug!(
            "unit {unit_id} follows {:?} advice: {}",
            advice.source,
            advice.reasoning
        );
        let result = self
            .session
            .execute_recommendation(unit_id, &advice.recommendation);
        self.commit(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Snapshot>>>);

    impl Renderer for Recorder {
        fn render(&mut self, snapshot: &Snapshot) {
            self.0.borrow_mut().push(snapshot.clone());
        }
    }

    #[test]
    fn test_renders_after_each_mutation() {
        let recorder = Recorder::default();
        let mut game = Game::new(Session::for_tests(), ScriptedDice::new([5]))
            .with_renderer(Box::new(recorder.clone()));
        assert_eq!(recorder.0.borrow().len(), 1);

        game.select_ability(1, "move", None).unwrap();
        assert_eq!(recorder.0.borrow().len(), 2);
        assert_eq!(
            recorder.0.borrow()[1].pending,
            Some(PendingKind::AwaitingMoveTarget)
        );

        // 被拒絕的操作不重繪
        assert!(game.select_target(Pos::new(5, 5)).is_err());
        assert_eq!(recorder.0.borrow().len(), 2);

        game.select_target(Pos::new(0, 1)).unwrap();
        game.end_turn().unwrap();
        let frames = recorder.0.borrow();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3].active_side, Side::Boss);
    }

    #[test]
    fn test_play_recommended_without_advisor() {
        let mut game = Game::new(Session::for_tests(), ScriptedDice::default());
        game.play_recommended(1).unwrap();
        let unit = game.session().board.get(1).unwrap();
        assert!(unit.acted);
        assert_ne!(unit.pos, Some(Pos::new(0, 0)));

        let session = game.into_session();
        assert_eq!(session.pools[&Side::TeamA].ap, 2);
    }
}

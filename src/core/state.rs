//! 单轮状态机：RECEIVED → THINKING → (ACTING → OBSERVING)* → {NEGOTIATING | COMPLETE | ERROR}

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Received,
    Thinking,
    Acting,
    Observing,
    Negotiating,
    Complete,
    Error,
}

impl TurnPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnPhase::Complete | TurnPhase::Error)
    }

    pub fn can_transition(self, next: TurnPhase) -> bool {
        use TurnPhase::*;
        if next == Error {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Received, Thinking)
                | (Thinking, Thinking)
                | (Thinking, Acting)
                | (Thinking, Negotiating)
                | (Thinking, Complete)
                | (Acting, Observing)
                | (Acting, Negotiating)
                | (Observing, Thinking)
                | (Observing, Complete)
                | (Negotiating, Complete)
        )
    }
}

/// 当前轮的阶段与迭代计数
#[derive(Clone, Debug)]
pub struct TurnState {
    phase: TurnPhase,
    iteration: usize,
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnState {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::Received,
            iteration: 0,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// 进入 THINKING 时迭代计数加一
    pub fn transition(&mut self, next: TurnPhase) -> bool {
        if !self.phase.can_transition(next) {
            tracing::warn!(from = ?self.phase, to = ?next, "illegal turn phase transition ignored");
            return false;
        }
        if next == TurnPhase::Thinking {
            self.iteration += 1;
        }
        tracing::debug!(from = ?self.phase, to = ?next, iteration = self.iteration, "turn phase");
        self.phase = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut s = TurnState::new();
        assert!(s.transition(TurnPhase::Thinking));
        assert!(s.transition(TurnPhase::Acting));
        assert!(s.transition(TurnPhase::Observing));
        assert!(s.transition(TurnPhase::Thinking));
        assert_eq!(s.iteration(), 2);
        assert!(s.transition(TurnPhase::Complete));
        assert!(s.phase().is_terminal());
    }

    #[test]
    fn test_terminal_is_final() {
        let mut s = TurnState::new();
        assert!(s.transition(TurnPhase::Error));
        assert!(!s.transition(TurnPhase::Thinking));
        assert_eq!(s.phase(), TurnPhase::Error);
    }

    #[test]
    fn test_cannot_skip_thinking() {
        let mut s = TurnState::new();
        assert!(!s.transition(TurnPhase::Acting));
        assert_eq!(s.phase(), TurnPhase::Received);
    }
}

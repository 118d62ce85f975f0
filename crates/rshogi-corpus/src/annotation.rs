//! 指し手と評価値コメントの対応付け
//!
//! 評価値コメントは指し手の後、次の指し手の前に現れる。1手につき最初の1つだけを採用し、
//! 後から現れたものや最初の指し手より前のものは捨てる。先読みや遡っての付け替えはしない。

use rshogi_csa::{CsaEvent, Move};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingScore,
    ScoreCaptured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotatedMove {
    pub mv: Move,
    /// 棋譜に記録されたままの評価値（符号の正規化前）
    pub eval: Option<i32>,
}

pub fn associate(events: &[CsaEvent]) -> Vec<AnnotatedMove> {
    let mut out: Vec<AnnotatedMove> = Vec::new();
    // 最初の指し手までは受け付けない
    let mut state = State::ScoreCaptured;
    for event in events {
        match event {
            CsaEvent::Move(mv) => {
                out.push(AnnotatedMove { mv: *mv, eval: None });
                state = State::AwaitingScore;
            }
            CsaEvent::Score(v) if state == State::AwaitingScore => {
                if let Some(last) = out.last_mut() {
                    last.eval = Some(*v);
                }
                state = State::ScoreCaptured;
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> CsaEvent {
        CsaEvent::Move(Move::from_csa(s).unwrap())
    }

    #[test]
    fn test_score_follows_its_move() {
        let events = vec![
            CsaEvent::Score(999),
            mv("+7776FU"),
            CsaEvent::Time(3),
            CsaEvent::Score(40),
            CsaEvent::Score(70),
            mv("-3334FU"),
            mv("+2726FU"),
            CsaEvent::Comment("x".into()),
            CsaEvent::Score(-15),
            CsaEvent::End("%TORYO".into()),
        ];
        let evals: Vec<_> = associate(&events).iter().map(|a| a.eval).collect();
        assert_eq!(evals, [Some(40), None, Some(-15)]);
    }

    #[test]
    fn test_no_moves() {
        assert!(associate(&[CsaEvent::Score(1)]).is_empty());
    }
}

//! 棋譜の再生
//!
//! 初期局面から指し手を順に検査・適用し、各手について指す前の局面・指し手・正規化済み評価値を
//! 呼び出し側へ渡す。手数上限・評価値による打ち切り・非合法手で途中終了する。

use clap::ValueEnum;
use rshogi_csa::{Color, IllegalMove, Move, Position};
use serde::{Deserialize, Serialize};

use crate::game::ParsedGame;

/// 評価値が記録されている視点
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Perspective {
    #[default]
    Black,
    White,
}

impl Perspective {
    pub fn color(self) -> Color {
        match self {
            Perspective::Black => Color::Black,
            Perspective::White => Color::White,
        }
    }
}

/// 符号の基準にする手番。指す前の局面か、指した後の局面か。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvalTurn {
    #[default]
    Before,
    After,
}

/// 非合法手を含む棋譜の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IllegalPolicy {
    /// 非合法手より前の手は採用する
    #[default]
    Truncate,
    /// その棋譜から得たものを全て捨てる
    Discard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkConfig {
    /// 再生する最大手数。0 で無制限。
    pub max_moves: usize,
    /// |評価値| がこれを超えたら打ち切る。0 で無効。
    pub eval_cutoff: i32,
    /// 打ち切りの原因になった手自体を渡すか
    pub emit_decisive: bool,
    pub score_perspective: Perspective,
    pub eval_turn: EvalTurn,
    pub illegal_policy: IllegalPolicy,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_moves: 0,
            eval_cutoff: 0,
            emit_decisive: true,
            score_perspective: Perspective::Black,
            eval_turn: EvalTurn::Before,
            illegal_policy: IllegalPolicy::Truncate,
        }
    }
}

/// 1手分の再生結果。`position` は `mv` を指す前の局面。
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub index: usize,
    pub position: &'a Position,
    pub mv: &'a Move,
    /// 基準手番から見た評価値（正なら基準手番が有利）
    pub eval: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    MaxMoves,
    EvalCutoff { index: usize },
    Illegal { index: usize, mv: Move, reason: IllegalMove },
}

/// `perspective` 視点の評価値を `reference` 視点に直す
#[inline]
pub fn normalize_eval(raw: i32, perspective: Color, reference: Color) -> i32 {
    if perspective == reference {
        raw
    } else {
        raw.saturating_neg()
    }
}

pub fn walk<F>(game: &ParsedGame, cfg: &WalkConfig, mut visit: F) -> WalkOutcome
where
    F: FnMut(Step<'_>),
{
    let mut pos = game.initial.clone();
    for (index, (mv, raw)) in game.moves.iter().zip(&game.evals).enumerate() {
        if cfg.max_moves > 0 && index >= cfg.max_moves {
            return WalkOutcome::MaxMoves;
        }
        if let Err(reason) = pos.check_move(mv) {
            return WalkOutcome::Illegal {
                index,
                mv: *mv,
                reason,
            };
        }
        let reference = match cfg.eval_turn {
            EvalTurn::Before => pos.side_to_move,
            EvalTurn::After => pos.side_to_move.opponent(),
        };
        let eval = raw.map(|v| normalize_eval(v, cfg.score_perspective.color(), reference));
        let decisive = cfg.eval_cutoff > 0
            && eval.is_some_and(|e| e.unsigned_abs() > cfg.eval_cutoff.unsigned_abs());
        if !decisive || cfg.emit_decisive {
            visit(Step {
                index,
                position: &pos,
                mv,
                eval,
            });
        }
        if decisive {
            return WalkOutcome::EvalCutoff { index };
        }
        pos.do_move(mv);
    }
    WalkOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = "\
+7776FU
'** 20
-3334FU
'** 35
+8822UM
'** 1500
-3122GI
'** 1600
+0055KA
%TORYO
";

    type Seen = Vec<(usize, Option<i32>)>;

    fn collect(game: &ParsedGame, cfg: &WalkConfig) -> (Seen, WalkOutcome) {
        let mut seen = Vec::new();
        let outcome = walk(game, cfg, |s| seen.push((s.index, s.eval)));
        (seen, outcome)
    }

    #[test]
    fn test_full_walk_normalizes_sign() {
        let game = ParsedGame::parse(GAME).unwrap();
        let (seen, outcome) = collect(&game, &WalkConfig::default());
        assert_eq!(outcome, WalkOutcome::Completed);
        // 先手視点の値を指す側の視点へ
        assert_eq!(
            seen,
            [
                (0, Some(20)),
                (1, Some(-35)),
                (2, Some(1500)),
                (3, Some(-1600)),
                (4, None)
            ]
        );

        let cfg = WalkConfig {
            eval_turn: EvalTurn::After,
            ..Default::default()
        };
        let (seen, _) = collect(&game, &cfg);
        assert_eq!(seen[0], (0, Some(-20)));
        assert_eq!(seen[1], (1, Some(35)));
    }

    #[test]
    fn test_max_moves_boundary() {
        let game = ParsedGame::parse(GAME).unwrap();
        let cfg = WalkConfig {
            max_moves: 2,
            ..Default::default()
        };
        let (seen, outcome) = collect(&game, &cfg);
        assert_eq!(seen.len(), 2);
        assert_eq!(outcome, WalkOutcome::MaxMoves);
    }

    #[test]
    fn test_eval_cutoff_is_strict() {
        let game = ParsedGame::parse(GAME).unwrap();
        let cfg = WalkConfig {
            eval_cutoff: 1500,
            ..Default::default()
        };
        let (seen, outcome) = collect(&game, &cfg);
        assert_eq!(seen.len(), 4);
        assert_eq!(outcome, WalkOutcome::EvalCutoff { index: 3 });

        let cfg = WalkConfig {
            eval_cutoff: 1000,
            emit_decisive: false,
            ..Default::default()
        };
        let (seen, outcome) = collect(&game, &cfg);
        assert_eq!(seen.len(), 2);
        assert_eq!(outcome, WalkOutcome::EvalCutoff { index: 2 });
    }

    #[test]
    fn test_illegal_move_stops_walk() {
        let game = ParsedGame::parse("+7776FU\n-3334FU\n+7776FU\n-2233KA\n").unwrap();
        let (seen, outcome) = collect(&game, &WalkConfig::default());
        assert_eq!(seen.len(), 2);
        match outcome {
            WalkOutcome::Illegal { index, mv, reason } => {
                assert_eq!(index, 2);
                assert_eq!(mv.to_string(), "+7776FU");
                assert_eq!(reason, IllegalMove::NoPiece);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_normalize_saturates() {
        assert_eq!(normalize_eval(i32::MIN, Color::Black, Color::White), i32::MAX);
        assert_eq!(normalize_eval(-7, Color::White, Color::White), -7);
    }
}

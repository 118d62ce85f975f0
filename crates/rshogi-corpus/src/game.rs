//! 解析済みの1局

use clap::ValueEnum;
use rshogi_csa::{Color, CsaError, CsaRecord, Move, Position, parse_csa};
use serde::{Deserialize, Serialize};

use crate::annotation::associate;

/// 終局理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalResult {
    /// `%TORYO`
    Resignation,
    /// `%SENNICHITE`
    Repetition,
    /// `%KACHI`
    DeclaredWin,
    /// `%HIKIWAKE` / `%JISHOGI`
    ImpasseDraw,
    /// `%TSUMI`
    Checkmate,
    /// `%TIME_UP`
    TimeUp,
    /// `%ILLEGAL_MOVE` / `%+ILLEGAL_ACTION` / `%-ILLEGAL_ACTION`
    IllegalMove,
    /// `%MAX_MOVES`
    MaxMoves,
    /// `%CHUDAN`
    Interrupted,
    Other,
}

impl TerminalResult {
    pub fn from_token(token: Option<&str>) -> Self {
        match token.unwrap_or_default() {
            "%TORYO" => Self::Resignation,
            "%SENNICHITE" => Self::Repetition,
            "%KACHI" => Self::DeclaredWin,
            "%HIKIWAKE" | "%JISHOGI" => Self::ImpasseDraw,
            "%TSUMI" => Self::Checkmate,
            "%TIME_UP" => Self::TimeUp,
            "%ILLEGAL_MOVE" | "%+ILLEGAL_ACTION" | "%-ILLEGAL_ACTION" => Self::IllegalMove,
            "%MAX_MOVES" => Self::MaxMoves,
            "%CHUDAN" => Self::Interrupted,
            _ => Self::Other,
        }
    }

    /// 教師データ生成で採用する既定の終局理由
    pub const DEFAULT_ALLOWED: [TerminalResult; 4] = [
        Self::Resignation,
        Self::Repetition,
        Self::DeclaredWin,
        Self::ImpasseDraw,
    ];
}

/// 終局表記と終局時の手番から勝者を決める。引き分け・不明は None。
fn winner(token: Option<&str>, result: TerminalResult, to_move: Color) -> Option<Color> {
    match token {
        Some("%+ILLEGAL_ACTION") => return Some(Color::White),
        Some("%-ILLEGAL_ACTION") => return Some(Color::Black),
        _ => {}
    }
    match result {
        TerminalResult::Resignation
        | TerminalResult::Checkmate
        | TerminalResult::TimeUp
        | TerminalResult::IllegalMove => Some(to_move.opponent()),
        TerminalResult::DeclaredWin => Some(to_move),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ParsedGame {
    pub initial: Position,
    pub moves: Vec<Move>,
    /// `moves` と同じ長さ
    pub evals: Vec<Option<i32>>,
    /// [先手, 後手]
    pub ratings: [Option<f64>; 2],
    pub result: TerminalResult,
    pub winner: Option<Color>,
}

impl ParsedGame {
    pub fn parse(text: &str) -> Result<Self, CsaError> {
        parse_csa(text).map(Self::from_record)
    }

    pub fn from_record(record: CsaRecord) -> Self {
        let annotated = associate(&record.events);
        let token = record.end();
        let result = TerminalResult::from_token(token);
        let to_move = if annotated.len() % 2 == 0 {
            record.initial.side_to_move
        } else {
            record.initial.side_to_move.opponent()
        };
        let winner = winner(token, result, to_move);
        let (moves, evals): (Vec<Move>, Vec<Option<i32>>) =
            annotated.into_iter().map(|a| (a.mv, a.eval)).unzip();
        Self {
            initial: record.initial,
            moves,
            evals,
            ratings: record.ratings,
            result,
            winner,
        }
    }

    #[inline]
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resignation_winner() {
        // 後手番で投了 → 先手勝ち
        let g = ParsedGame::parse("+7776FU\n'** 30\n-3334FU\n+8822UM\n%TORYO\n").unwrap();
        assert_eq!(g.result, TerminalResult::Resignation);
        assert_eq!(g.winner, Some(Color::Black));
        assert_eq!(g.move_count(), 3);
        assert_eq!(g.evals, [Some(30), None, None]);
    }

    #[test]
    fn test_declared_win_and_draws() {
        let g = ParsedGame::parse("+7776FU\n-3334FU\n%KACHI\n").unwrap();
        assert_eq!(g.winner, Some(Color::Black));
        let g = ParsedGame::parse("+7776FU\n%SENNICHITE\n").unwrap();
        assert_eq!(g.result, TerminalResult::Repetition);
        assert_eq!(g.winner, None);
        let g = ParsedGame::parse("+7776FU\n%JISHOGI\n").unwrap();
        assert_eq!(g.result, TerminalResult::ImpasseDraw);
    }

    #[test]
    fn test_illegal_action_and_unknown() {
        let g = ParsedGame::parse("+7776FU\n%+ILLEGAL_ACTION\n").unwrap();
        assert_eq!(g.result, TerminalResult::IllegalMove);
        assert_eq!(g.winner, Some(Color::White));
        let g = ParsedGame::parse("+7776FU\n").unwrap();
        assert_eq!(g.result, TerminalResult::Other);
        assert_eq!(g.winner, None);
    }
}

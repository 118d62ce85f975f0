//! HCPE 教師データ（38バイト）
//!
//! | オフセット | 型      | 内容                 |
//! |------------|---------|----------------------|
//! | 0          | [u8;32] | HCP                  |
//! | 32         | i16 LE  | 評価値               |
//! | 34         | u16 LE  | 指し手 (move16)      |
//! | 36         | u8      | 勝敗                 |
//! | 37         | u8      | パディング (0)       |

use byteorder::{ByteOrder, LittleEndian};
use clap::ValueEnum;
use rshogi_csa::Color;
use rshogi_csa::hcp::{self, HCP_SIZE, HcpError};
use serde::{Deserialize, Serialize};

use crate::game::ParsedGame;
use crate::walker::Step;

pub const HCPE_SIZE: usize = 38;

const EVAL_OFFSET: usize = HCP_SIZE;
const MOVE_OFFSET: usize = HCP_SIZE + 2;
const RESULT_OFFSET: usize = HCP_SIZE + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub hcp: [u8; HCP_SIZE],
    pub eval: i16,
    pub best_move16: u16,
    pub game_result: u8,
}

impl Sample {
    pub fn to_bytes(&self) -> [u8; HCPE_SIZE] {
        let mut out = [0u8; HCPE_SIZE];
        out[..HCP_SIZE].copy_from_slice(&self.hcp);
        LittleEndian::write_i16(&mut out[EVAL_OFFSET..MOVE_OFFSET], self.eval);
        LittleEndian::write_u16(&mut out[MOVE_OFFSET..RESULT_OFFSET], self.best_move16);
        out[RESULT_OFFSET] = self.game_result;
        out
    }

    pub fn from_bytes(data: &[u8; HCPE_SIZE]) -> Self {
        let mut hcp = [0u8; HCP_SIZE];
        hcp.copy_from_slice(&data[..HCP_SIZE]);
        Self {
            hcp,
            eval: LittleEndian::read_i16(&data[EVAL_OFFSET..MOVE_OFFSET]),
            best_move16: LittleEndian::read_u16(&data[MOVE_OFFSET..RESULT_OFFSET]),
            game_result: data[RESULT_OFFSET],
        }
    }
}

/// 勝敗の符号化
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultPerspective {
    /// 0=引き分け/不明, 1=手番側の勝ち, 2=手番側の負け
    #[default]
    SideToMove,
    /// 0=引き分け/不明, 1=先手勝ち, 2=後手勝ち
    Absolute,
}

pub fn encode_result(
    winner: Option<Color>,
    side_to_move: Color,
    perspective: ResultPerspective,
) -> u8 {
    match (winner, perspective) {
        (None, _) => 0,
        (Some(Color::Black), ResultPerspective::Absolute) => 1,
        (Some(Color::White), ResultPerspective::Absolute) => 2,
        (Some(w), ResultPerspective::SideToMove) if w == side_to_move => 1,
        (Some(_), ResultPerspective::SideToMove) => 2,
    }
}

#[inline]
pub fn clamp_eval(eval: i32) -> i16 {
    eval.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// 評価値のない手からは何も作らない
pub fn extract(
    step: &Step<'_>,
    game: &ParsedGame,
    perspective: ResultPerspective,
) -> Result<Option<Sample>, HcpError> {
    let Some(eval) = step.eval else {
        return Ok(None);
    };
    let pos = step.position;
    Ok(Some(Sample {
        hcp: hcp::encode(pos)?,
        eval: clamp_eval(eval),
        best_move16: pos.move16(step.mv),
        game_result: encode_result(game.winner, pos.side_to_move, perspective),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::{WalkConfig, walk};

    #[test]
    fn test_layout() {
        let s = Sample {
            hcp: [0xAB; HCP_SIZE],
            eval: -2,
            best_move16: 0x1234,
            game_result: 2,
        };
        let b = s.to_bytes();
        assert_eq!(&b[32..], &[0xFE, 0xFF, 0x34, 0x12, 2, 0]);
        assert_eq!(Sample::from_bytes(&b), s);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_eval(100_000), i16::MAX);
        assert_eq!(clamp_eval(-100_000), i16::MIN);
        assert_eq!(clamp_eval(-123), -123);
    }

    #[test]
    fn test_result_encoding() {
        use ResultPerspective::*;
        assert_eq!(encode_result(None, Color::Black, SideToMove), 0);
        assert_eq!(encode_result(Some(Color::Black), Color::Black, SideToMove), 1);
        assert_eq!(encode_result(Some(Color::Black), Color::White, SideToMove), 2);
        assert_eq!(encode_result(Some(Color::White), Color::Black, Absolute), 2);
        assert_eq!(encode_result(Some(Color::Black), Color::White, Absolute), 1);
    }

    #[test]
    fn test_extract_skips_unannotated() {
        let game = ParsedGame::parse("+7776FU\n'** 50\n-3334FU\n+2726FU\n'** 99999\n%TORYO\n")
            .unwrap();
        let mut samples = Vec::new();
        walk(&game, &WalkConfig::default(), |step| {
            if let Some(s) = extract(&step, &game, ResultPerspective::SideToMove).unwrap() {
                samples.push(s);
            }
        });
        assert_eq!(samples.len(), 2);
        // 後手番で投了 → 先手勝ち。どちらも先手番の局面。
        assert!(samples.iter().all(|s| s.game_result == 1));
        assert_eq!(samples[0].eval, 50);
        assert_eq!(samples[1].eval, i16::MAX);
        // 7七(60) -> 7六(59)
        assert_eq!(samples[0].best_move16, 59 | (60 << 7));
    }
}

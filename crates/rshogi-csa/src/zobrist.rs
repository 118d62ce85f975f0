//! 定跡キー（Zobrist ハッシュ）
//!
//! 盤上の駒・持ち駒・手番から 64bit のキーを作る。手数や手順には依存しない。
//! 乱数表は固定シードの xoshiro256++ から生成するので、実行ごと・環境ごとに同じ値になる。

use std::sync::OnceLock;

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::position::Position;
use crate::types::{Color, Piece, PieceType, Square};

const SEED: u64 = 0x5348_4f47_495f_424b; // "SHOGI_BK"

/// 持ち駒の最大枚数（歩18枚）+ 1
const MAX_HAND: usize = 19;

struct ZobristTable {
    /// [駒の種類(32)][マス(81)]
    board: [[u64; 81]; 32],
    /// [手番][駒種(7)][枚数]
    hand: [[[u64; MAX_HAND]; 7]; 2],
    side: u64,
}

fn table() -> &'static ZobristTable {
    static TABLE: OnceLock<Box<ZobristTable>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(SEED);
        let mut t = Box::new(ZobristTable {
            board: [[0; 81]; 32],
            hand: [[[0; MAX_HAND]; 7]; 2],
            side: 0,
        });
        for row in t.board.iter_mut() {
            for v in row.iter_mut() {
                *v = rng.next_u64();
            }
        }
        for color in t.hand.iter_mut() {
            for pt in color.iter_mut() {
                // 0枚のときはキーに寄与しない
                for v in pt.iter_mut().skip(1) {
                    *v = rng.next_u64();
                }
            }
        }
        t.side = rng.next_u64();
        t
    })
}

/// 駒の種類を 0..32 に詰める: 手番(2) x 成り(2) x 駒種(8)
fn piece_slot(pc: Piece) -> usize {
    pc.color.index() * 16 + usize::from(pc.promoted) * 8 + (pc.ty.index() - 1)
}

impl Position {
    /// 定跡用の局面キー
    pub fn book_key(&self) -> u64 {
        let t = table();
        let mut key = 0u64;
        for sq in Square::iter() {
            if let Some(pc) = self.piece_at(sq) {
                key ^= t.board[piece_slot(pc)][sq.index() as usize];
            }
        }
        for color in Color::ALL {
            let hand = self.hand(color);
            for (i, pt) in PieceType::HAND.iter().enumerate() {
                let n = (hand.count(*pt) as usize).min(MAX_HAND - 1);
                key ^= t.hand[color.index()][i][n];
            }
        }
        if self.side_to_move == Color::White {
            key ^= t.side;
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::initial_position;
    use crate::types::Move;

    fn play(pos: &mut Position, moves: &[&str]) {
        for m in moves {
            let m = Move::from_csa(m).unwrap();
            pos.do_move(&m);
        }
    }

    #[test]
    fn test_transposition_has_same_key() {
        let mut a = initial_position();
        play(&mut a, &["+7776FU", "-3334FU", "+2726FU"]);
        let mut b = initial_position();
        play(&mut b, &["+2726FU", "-3334FU", "+7776FU"]);
        assert_eq!(a.book_key(), b.book_key());
        assert_ne!(a.book_key(), initial_position().book_key());
    }

    #[test]
    fn test_side_to_move_changes_key() {
        let a = initial_position();
        let mut b = initial_position();
        b.side_to_move = Color::White;
        assert_ne!(a.book_key(), b.book_key());
        // 手数は無関係
        let mut c = initial_position();
        c.ply = 99;
        assert_eq!(a.book_key(), c.book_key());
    }

    #[test]
    fn test_key_is_stable() {
        // 乱数表が固定シードから生成されていること
        assert_eq!(initial_position().book_key(), initial_position().book_key());
        let mut h = initial_position();
        h.hand_mut(Color::Black).add(PieceType::Pawn);
        assert_ne!(h.book_key(), initial_position().book_key());
    }
}

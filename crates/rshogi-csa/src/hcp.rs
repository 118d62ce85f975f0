//! HuffmanCodedPos (HCP) 符号化
//!
//! 局面を 256bit（32バイト）に符号化する。HCPE 教師データの局面部分に使う。
//!
//! # データ形式
//!
//! ビットストリームに下位ビットから順に以下を格納する:
//! 1. 手番 (1bit): 0=先手, 1=後手
//! 2. 先手玉位置 (7bit): 0-80のマス番号（筋優先）
//! 3. 後手玉位置 (7bit)
//! 4. 盤上の駒 (ハフマン符号化): マス番号順に81マス分（玉のマスはスキップ）
//! 5. 手駒 (ハフマン符号化): 先手・後手の順、歩香桂銀金角飛の順
//! 6. 駒箱パディング: 40枚に満たない局面は、駒箱フラグ付きの歩で埋める。
//!    実際に欠けている駒種ではなく 3bit 単位で埋めるので、末尾に 0 が最大 2bit 残る。
//!
//! ## 盤上の駒
//!
//! | 駒種 | 符号     | ビット数 | 付加ビット        |
//! |------|----------|----------|-------------------|
//! | 空   | 0        | 1        | なし              |
//! | 歩   | 01       | 2        | 先後, 成り        |
//! | 香   | 0011     | 4        | 先後, 成り        |
//! | 桂   | 0111     | 4        | 先後, 成り        |
//! | 銀   | 1011     | 4        | 先後, 成り        |
//! | 金   | 01111    | 5        | 先後              |
//! | 角   | 011111   | 6        | 先後, 成り        |
//! | 飛   | 111111   | 6        | 先後, 成り        |
//!
//! （符号は下位ビットから書き込む値で表記）
//!
//! ## 手駒
//!
//! 盤上の符号を1bit右シフトしたものに、成りフラグ（金以外、常に0）と先後フラグを続ける。
//! 成りフラグが1の駒は駒箱の駒として復号時に無視される。

use thiserror::Error;

use crate::position::Position;
use crate::types::{Color, Piece, PieceType, Square};

pub const HCP_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HcpError {
    #[error("king missing for {0:?}")]
    MissingKing(Color),
    #[error("invalid king square: {0}")]
    BadKingSquare(u32),
    #[error("invalid huffman code at bit {0}")]
    BadCode(usize),
    #[error("position needs {0} bits (more than 40 pieces)")]
    TooManyPieces(usize),
}

#[derive(Debug, Clone, Copy)]
struct HuffmanCode {
    code: u8,
    bits: u8,
}

/// 盤上の駒種の基本符号（先後・成りフラグを含まない）
fn board_code(pt: PieceType) -> HuffmanCode {
    let (code, bits) = match pt {
        PieceType::Pawn => (0x01, 2),
        PieceType::Lance => (0x03, 4),
        PieceType::Knight => (0x07, 4),
        PieceType::Silver => (0x0b, 4),
        PieceType::Gold => (0x0f, 5),
        PieceType::Bishop => (0x1f, 6),
        PieceType::Rook => (0x3f, 6),
        PieceType::King => (0x00, 0),
    };
    HuffmanCode { code, bits }
}

/// 手駒の列挙順
const HAND_ORDER: [PieceType; 7] = [
    PieceType::Pawn,
    PieceType::Lance,
    PieceType::Knight,
    PieceType::Silver,
    PieceType::Gold,
    PieceType::Bishop,
    PieceType::Rook,
];

struct BitStreamWriter {
    data: [u8; HCP_SIZE],
    bit_cursor: usize,
}

impl BitStreamWriter {
    fn new() -> Self {
        Self {
            data: [0u8; HCP_SIZE],
            bit_cursor: 0,
        }
    }

    /// 256bit を超えた分は書き込まず、カーソルだけ進める
    fn write_one_bit(&mut self, b: bool) {
        if b && self.bit_cursor < HCP_SIZE * 8 {
            self.data[self.bit_cursor / 8] |= 1 << (self.bit_cursor & 7);
        }
        self.bit_cursor += 1;
    }

    fn write_n_bit(&mut self, d: u32, n: usize) {
        for i in 0..n {
            self.write_one_bit((d >> i) & 1 != 0);
        }
    }
}

struct BitStream<'a> {
    data: &'a [u8],
    bit_cursor: usize,
}

impl<'a> BitStream<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_cursor: 0,
        }
    }

    /// 終端を超えた読み込みは 0 を返す
    fn read_one_bit(&mut self) -> u8 {
        let byte_idx = self.bit_cursor / 8;
        if byte_idx >= self.data.len() {
            return 0;
        }
        let bit = (self.data[byte_idx] >> (self.bit_cursor & 7)) & 1;
        self.bit_cursor += 1;
        bit
    }

    fn read_n_bit(&mut self, n: usize) -> u32 {
        (0..n).fold(0u32, |acc, i| acc | (self.read_one_bit() as u32) << i)
    }

    fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_cursor)
    }
}

fn write_board_piece(stream: &mut BitStreamWriter, piece: Option<Piece>) {
    let Some(piece) = piece else {
        stream.write_one_bit(false);
        return;
    };
    let huff = board_code(piece.ty);
    stream.write_n_bit(huff.code as u32, huff.bits as usize);
    stream.write_one_bit(piece.color == Color::White);
    if piece.ty != PieceType::Gold {
        stream.write_one_bit(piece.promoted);
    }
}

fn write_hand_piece(stream: &mut BitStreamWriter, pt: PieceType, color: Color) {
    let huff = board_code(pt);
    stream.write_n_bit((huff.code >> 1) as u32, (huff.bits - 1) as usize);
    if pt != PieceType::Gold {
        stream.write_one_bit(false);
    }
    stream.write_one_bit(color == Color::White);
}

/// 局面を HCP に符号化する。玉が盤上にない局面と、256bit に収まらない局面はエラー。
pub fn encode(pos: &Position) -> Result<[u8; HCP_SIZE], HcpError> {
    let black_king = pos
        .king_square(Color::Black)
        .ok_or(HcpError::MissingKing(Color::Black))?;
    let white_king = pos
        .king_square(Color::White)
        .ok_or(HcpError::MissingKing(Color::White))?;

    let mut stream = BitStreamWriter::new();
    stream.write_one_bit(pos.side_to_move == Color::White);
    stream.write_n_bit(black_king.index() as u32, 7);
    stream.write_n_bit(white_king.index() as u32, 7);

    for sq in Square::iter() {
        let piece = pos.piece_at(sq);
        if piece.is_some_and(|p| p.ty == PieceType::King) {
            continue;
        }
        write_board_piece(&mut stream, piece);
    }

    for color in Color::ALL {
        let hand = pos.hand(color);
        for pt in HAND_ORDER {
            for _ in 0..hand.count(pt) {
                write_hand_piece(&mut stream, pt, color);
            }
        }
    }

    if stream.bit_cursor > HCP_SIZE * 8 {
        return Err(HcpError::TooManyPieces(stream.bit_cursor));
    }

    // 駒箱の歩: 符号(1bit=0) + 成りフラグ(1) + 先後フラグ(0)
    // 余りが 3bit 未満なら 0 のまま残る
    while stream.bit_cursor + 3 <= HCP_SIZE * 8 {
        stream.write_n_bit(0b010, 3);
    }

    Ok(stream.data)
}

/// `shift` = 0 は盤上の符号（先頭 0 は空きマス）、1 は手駒の符号
fn decode_code(
    stream: &mut BitStream,
    max_bits: u8,
    shift: u8,
) -> Result<Option<PieceType>, HcpError> {
    let start = stream.bit_cursor;
    let mut code = 0u8;
    let mut bits = 0u8;
    loop {
        code |= stream.read_one_bit() << bits;
        bits += 1;
        if shift == 0 && bits == 1 && code == 0 {
            return Ok(None);
        }
        for pt in HAND_ORDER {
            let h = board_code(pt);
            if h.code >> shift == code && h.bits - shift == bits {
                return Ok(Some(pt));
            }
        }
        if bits >= max_bits {
            return Err(HcpError::BadCode(start));
        }
    }
}

/// HCP を局面に復号する。手数は 1 になる。
pub fn decode(data: &[u8; HCP_SIZE]) -> Result<Position, HcpError> {
    let mut stream = BitStream::new(data);
    let mut pos = Position::default();
    pos.side_to_move = if stream.read_one_bit() == 0 {
        Color::Black
    } else {
        Color::White
    };
    let mut king_squares = [None; 2];
    for color in Color::ALL {
        let idx = stream.read_n_bit(7);
        let sq = Square::from_index(idx as u8).ok_or(HcpError::BadKingSquare(idx))?;
        pos.set_piece(sq, Some(Piece::new(PieceType::King, color, false)));
        king_squares[color.index()] = Some(sq);
    }

    for sq in Square::iter() {
        if king_squares.contains(&Some(sq)) {
            continue;
        }
        if let Some(pt) = decode_code(&mut stream, 6, 0)? {
            let color = if stream.read_one_bit() == 0 {
                Color::Black
            } else {
                Color::White
            };
            let promoted = pt != PieceType::Gold && stream.read_one_bit() != 0;
            pos.set_piece(sq, Some(Piece::new(pt, color, promoted)));
        }
    }

    while stream.remaining() >= 3 {
        let Some(pt) = decode_code(&mut stream, 5, 1)? else {
            continue;
        };
        let piecebox = pt != PieceType::Gold && stream.read_one_bit() != 0;
        let color = if stream.read_one_bit() == 0 {
            Color::Black
        } else {
            Color::White
        };
        if !piecebox {
            pos.hand_mut(color).add(pt);
        }
    }

    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::initial_position;
    use crate::types::Move;

    #[test]
    fn test_bitstream_writer() {
        let mut w = BitStreamWriter::new();
        w.write_n_bit(0b1011, 4);
        w.write_one_bit(true);
        assert_eq!(w.data[0], 0b1_1011);
        assert_eq!(w.bit_cursor, 5);
    }

    #[test]
    fn test_hirate_uses_all_bits() {
        let pos = initial_position();
        let hcp = encode(&pos).unwrap();
        // 手番=先手(0)、先手玉=5九(index 44)
        assert_eq!(hcp[0] & 1, 0);
        assert_eq!((hcp[0] >> 1) & 0x7f, 44);
        let back = decode(&hcp).unwrap();
        assert_eq!(back.to_sfen(), pos.to_sfen());
    }

    #[test]
    fn test_roundtrip_with_hands_and_promotions() {
        let mut pos = initial_position();
        for m in ["+7776FU", "-3334FU", "+8822UM", "-3122GI", "+0045KA"] {
            let m = Move::from_csa(m).unwrap();
            pos.check_move(&m).unwrap();
            pos.do_move(&m);
        }
        let hcp = encode(&pos).unwrap();
        let mut back = decode(&hcp).unwrap();
        back.ply = pos.ply;
        assert_eq!(back.to_sfen(), pos.to_sfen());
        assert_eq!(back.hand(Color::White).b, 1);
    }

    #[test]
    fn test_handicap_position_is_padded() {
        let mut pos = initial_position();
        // 後手の飛車・角を除いた二枚落ち
        pos.set_piece(Square::new(8, 2).unwrap(), None);
        pos.set_piece(Square::new(2, 2).unwrap(), None);
        let hcp = encode(&pos).unwrap();
        let back = decode(&hcp).unwrap();
        assert!(back.hand(Color::Black).is_empty());
        assert!(back.hand(Color::White).is_empty());
        assert_eq!(back.to_sfen(), pos.to_sfen());
    }

    #[test]
    fn test_excess_pieces_are_rejected() {
        let mut three = initial_position();
        let mut five = initial_position();
        for _ in 0..3 {
            three.hand_mut(Color::Black).add(PieceType::Pawn);
        }
        for _ in 0..5 {
            five.hand_mut(Color::Black).add(PieceType::Pawn);
        }
        // 平手は 256bit ちょうど、持ち駒の歩は1枚 3bit
        assert_eq!(encode(&three), Err(HcpError::TooManyPieces(265)));
        assert_eq!(encode(&five), Err(HcpError::TooManyPieces(271)));
    }

    #[test]
    fn test_fewer_pieces_leave_unpadded_tail() {
        let mut pos = initial_position();
        // 香を1枚除くと 5bit 空き、駒箱の歩1枚 (3bit) と 0 が 2bit 残る
        pos.set_piece(Square::new(1, 1).unwrap(), None);
        let hcp = encode(&pos).unwrap();
        assert_eq!((hcp[31] >> 3) & 0b111, 0b010);
        assert_eq!(hcp[31] >> 6, 0);
        let back = decode(&hcp).unwrap();
        assert_eq!(back.to_sfen(), pos.to_sfen());
    }

    #[test]
    fn test_missing_king_is_error() {
        let pos = Position::default();
        assert_eq!(encode(&pos), Err(HcpError::MissingKing(Color::Black)));
    }
}

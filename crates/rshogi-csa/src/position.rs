//! 盤面・合法手判定・着手

use std::fmt::Write as _;

use thiserror::Error;

use crate::types::{Color, Hand, Move, Piece, PieceType, Square};

/// 非合法手の理由
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("not the side to move")]
    WrongTurn,
    #[error("no own piece on the source square")]
    NoPiece,
    #[error("piece on the source square does not match the move")]
    PieceMismatch,
    #[error("destination occupied by an own piece")]
    OwnPieceOnTarget,
    #[error("piece cannot reach the destination")]
    Unreachable,
    #[error("promotion not allowed")]
    BadPromotion,
    #[error("piece would have no further move")]
    DeadPiece,
    #[error("piece not in hand")]
    NotInHand,
    #[error("drop on an occupied square")]
    DropOnOccupied,
    #[error("second unpromoted pawn on the same file")]
    DoublePawn,
    #[error("king left in check")]
    LeavesKingInCheck,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// board[rank][file]、どちらも 1..=9（0 は未使用）
    board: [[Option<Piece>; 10]; 10],
    hands: [Hand; 2],
    pub side_to_move: Color,
    pub ply: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            board: [[None; 10]; 10],
            hands: [Hand::default(); 2],
            side_to_move: Color::Black,
            ply: 1,
        }
    }
}

const BACK_RANK: [PieceType; 9] = [
    PieceType::Lance,
    PieceType::Knight,
    PieceType::Silver,
    PieceType::Gold,
    PieceType::King,
    PieceType::Gold,
    PieceType::Silver,
    PieceType::Knight,
    PieceType::Lance,
];

/// 平手初期局面
pub fn initial_position() -> Position {
    let mut pos = Position::default();
    for (file, ty) in (1..=9).zip(BACK_RANK) {
        pos.board[1][file] = Some(Piece::new(ty, Color::White, false));
        pos.board[9][file] = Some(Piece::new(ty, Color::Black, false));
    }
    // 後手: 8二飛・2二角、先手: 8八角・2八飛
    pos.board[2][8] = Some(Piece::new(PieceType::Rook, Color::White, false));
    pos.board[2][2] = Some(Piece::new(PieceType::Bishop, Color::White, false));
    pos.board[8][8] = Some(Piece::new(PieceType::Bishop, Color::Black, false));
    pos.board[8][2] = Some(Piece::new(PieceType::Rook, Color::Black, false));
    for file in 1..=9 {
        pos.board[3][file] = Some(Piece::new(PieceType::Pawn, Color::White, false));
        pos.board[7][file] = Some(Piece::new(PieceType::Pawn, Color::Black, false));
    }
    pos
}

fn sfen_piece_char(p: Piece) -> char {
    use PieceType::*;
    let base = match p.ty {
        Pawn => 'p',
        Lance => 'l',
        Knight => 'n',
        Silver => 's',
        Gold => 'g',
        Bishop => 'b',
        Rook => 'r',
        King => 'k',
    };

    match p.color {
        Color::Black => base.to_ascii_uppercase(),
        Color::White => base,
    }
}

fn append_hand(out: &mut String, h: &Hand, color: Color) {
    const ORDER: [(PieceType, char); 7] = [
        (PieceType::Rook, 'R'),
        (PieceType::Bishop, 'B'),
        (PieceType::Gold, 'G'),
        (PieceType::Silver, 'S'),
        (PieceType::Knight, 'N'),
        (PieceType::Lance, 'L'),
        (PieceType::Pawn, 'P'),
    ];
    for (pt, c) in ORDER {
        let n = h.count(pt);
        if n == 0 {
            continue;
        }
        if n > 1 {
            let _ = write!(out, "{n}");
        }
        out.push(match color {
            Color::Black => c,
            Color::White => c.to_ascii_lowercase(),
        });
    }
}

/// 生駒が `sq` に置かれたとき、以後動けなくなるか
fn is_dead_square(ty: PieceType, sq: Square, color: Color) -> bool {
    match ty {
        PieceType::Pawn | PieceType::Lance => sq.relative_rank(color) == 1,
        PieceType::Knight => sq.relative_rank(color) <= 2,
        _ => false,
    }
}

impl Position {
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.rank() as usize][sq.file() as usize]
    }

    #[inline]
    pub fn set_piece(&mut self, sq: Square, piece: Option<Piece>) {
        self.board[sq.rank() as usize][sq.file() as usize] = piece;
    }

    #[inline]
    pub fn hand(&self, color: Color) -> &Hand {
        &self.hands[color.index()]
    }

    #[inline]
    pub fn hand_mut(&mut self, color: Color) -> &mut Hand {
        &mut self.hands[color.index()]
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        Square::iter().find(|&sq| {
            self.piece_at(sq)
                .is_some_and(|p| p.ty == PieceType::King && p.color == color)
        })
    }

    pub fn to_sfen(&self) -> String {
        let mut out = String::new();
        for rank in 1..=9 {
            let mut empty = 0u8;
            for file in (1..=9).rev() {
                if let Some(pc) = self.board[rank][file] {
                    if empty > 0 {
                        let _ = write!(out, "{empty}");
                        empty = 0;
                    }
                    if pc.promoted {
                        out.push('+');
                    }
                    out.push(sfen_piece_char(pc));
                } else {
                    empty += 1;
                }
            }
            if empty > 0 {
                let _ = write!(out, "{empty}");
            }
            if rank != 9 {
                out.push('/');
            }
        }
        out.push(' ');
        out.push(match self.side_to_move {
            Color::Black => 'b',
            Color::White => 'w',
        });
        out.push(' ');
        let mut hands = String::new();
        append_hand(&mut hands, self.hand(Color::Black), Color::Black);
        append_hand(&mut hands, self.hand(Color::White), Color::White);
        if hands.is_empty() {
            out.push('-');
        } else {
            out.push_str(&hands);
        }
        let _ = write!(out, " {}", self.ply);
        out
    }

    /// `pc` が `from` から `to` に（利きとして）届くか。飛び駒は途中のマスが空いている必要がある。
    fn reaches(&self, from: Square, to: Square, pc: Piece) -> bool {
        let df = to.file() as i8 - from.file() as i8;
        let dr = to.rank() as i8 - from.rank() as i8;
        if df == 0 && dr == 0 {
            return false;
        }
        let f = pc.color.forward();
        let king_step = df.abs() <= 1 && dr.abs() <= 1;
        let gold_step = king_step && !(dr == -f && df != 0);
        match (pc.ty, pc.promoted) {
            (PieceType::Gold, _)
            | (PieceType::Pawn | PieceType::Lance | PieceType::Knight | PieceType::Silver, true) => {
                gold_step
            }
            (PieceType::King, _) => king_step,
            (PieceType::Pawn, false) => df == 0 && dr == f,
            (PieceType::Lance, false) => df == 0 && dr * f > 0 && self.path_clear(from, to),
            (PieceType::Knight, false) => df.abs() == 1 && dr == 2 * f,
            (PieceType::Silver, false) => {
                dr.abs() == 1 && df.abs() <= 1 && (dr == f || df != 0)
            }
            (PieceType::Bishop, promoted) => {
                (df.abs() == dr.abs() && self.path_clear(from, to)) || (promoted && king_step)
            }
            (PieceType::Rook, promoted) => {
                ((df == 0) != (dr == 0) && self.path_clear(from, to)) || (promoted && king_step)
            }
        }
    }

    /// 直線上の `from` と `to` の間（両端を含まない）が空いているか
    fn path_clear(&self, from: Square, to: Square) -> bool {
        let step_f = (to.file() as i8 - from.file() as i8).signum();
        let step_r = (to.rank() as i8 - from.rank() as i8).signum();
        let mut cur = from;
        loop {
            cur = match cur.offset(step_f, step_r) {
                Some(sq) => sq,
                None => return false,
            };
            if cur == to {
                return true;
            }
            if self.piece_at(cur).is_some() {
                return false;
            }
        }
    }

    /// `by` の駒が `sq` に利いているか
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        Square::iter().any(|from| {
            self.piece_at(from)
                .is_some_and(|pc| pc.color == by && self.reaches(from, sq, pc))
        })
    }

    /// 玉のいない局面（詰将棋の攻め方など）では常に false
    pub fn in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .is_some_and(|ksq| self.is_attacked(ksq, color.opponent()))
    }

    /// 指し手の合法性を検査する。打ち歩詰めは判定しない。
    pub fn check_move(&self, mv: &Move) -> Result<(), IllegalMove> {
        if mv.color != self.side_to_move {
            return Err(IllegalMove::WrongTurn);
        }
        match mv.from {
            None => self.check_drop(mv)?,
            Some(from) => self.check_board_move(from, mv)?,
        }
        let mut next = self.clone();
        next.do_move(mv);
        if next.in_check(mv.color) {
            return Err(IllegalMove::LeavesKingInCheck);
        }
        Ok(())
    }

    #[inline]
    pub fn is_legal(&self, mv: &Move) -> bool {
        self.check_move(mv).is_ok()
    }

    fn check_drop(&self, mv: &Move) -> Result<(), IllegalMove> {
        if mv.promoted {
            return Err(IllegalMove::BadPromotion);
        }
        if self.piece_at(mv.to).is_some() {
            return Err(IllegalMove::DropOnOccupied);
        }
        if mv.piece == PieceType::King || self.hand(mv.color).count(mv.piece) == 0 {
            return Err(IllegalMove::NotInHand);
        }
        if is_dead_square(mv.piece, mv.to, mv.color) {
            return Err(IllegalMove::DeadPiece);
        }
        if mv.piece == PieceType::Pawn {
            let file = mv.to.file();
            let doubled = (1..=9).filter_map(|rank| Square::new(file, rank)).any(|sq| {
                self.piece_at(sq).is_some_and(|p| {
                    p.ty == PieceType::Pawn && p.color == mv.color && !p.promoted
                })
            });
            if doubled {
                return Err(IllegalMove::DoublePawn);
            }
        }
        Ok(())
    }

    fn check_board_move(&self, from: Square, mv: &Move) -> Result<(), IllegalMove> {
        let pc = match self.piece_at(from) {
            Some(pc) if pc.color == mv.color => pc,
            _ => return Err(IllegalMove::NoPiece),
        };
        if pc.ty != mv.piece || (pc.promoted && !mv.promoted) {
            return Err(IllegalMove::PieceMismatch);
        }
        if self.piece_at(mv.to).is_some_and(|dst| dst.color == mv.color) {
            return Err(IllegalMove::OwnPieceOnTarget);
        }
        if !self.reaches(from, mv.to, pc) {
            return Err(IllegalMove::Unreachable);
        }
        let promoting = mv.promoted && !pc.promoted;
        if promoting
            && (!pc.ty.can_promote()
                || !(from.in_promotion_zone(mv.color) || mv.to.in_promotion_zone(mv.color)))
        {
            return Err(IllegalMove::BadPromotion);
        }
        if !mv.promoted && is_dead_square(pc.ty, mv.to, mv.color) {
            return Err(IllegalMove::DeadPiece);
        }
        Ok(())
    }

    /// 指し手を適用する。合法性は [`Position::check_move`] で確認済みであること。
    pub fn do_move(&mut self, mv: &Move) {
        if let Some(captured) = self.piece_at(mv.to) {
            self.hands[mv.color.index()].add(captured.ty);
        }
        match mv.from {
            None => {
                self.hands[mv.color.index()].take(mv.piece);
            }
            Some(from) => self.set_piece(from, None),
        }
        self.set_piece(mv.to, Some(Piece::new(mv.piece, mv.color, mv.promoted)));
        self.side_to_move = self.side_to_move.opponent();
        self.ply += 1;
    }

    /// move16 形式に変換する（この局面で指す前提）
    ///
    /// - bits 0-6:  移動先マス
    /// - bits 7-13: 移動元マス、駒打ちは 80 + 駒種インデックス（歩=81 … 金=87）
    /// - bit 14:    成りフラグ
    pub fn move16(&self, mv: &Move) -> u16 {
        let to = mv.to.index() as u16;
        match mv.from {
            None => to | ((80 + mv.piece.index() as u16) << 7),
            Some(from) => {
                let was_promoted = self.piece_at(from).is_some_and(|p| p.promoted);
                let promote = if mv.promoted && !was_promoted {
                    0x4000
                } else {
                    0
                };
                to | ((from.index() as u16) << 7) | promote
            }
        }
    }
}

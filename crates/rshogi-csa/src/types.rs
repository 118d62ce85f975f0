//! 盤面を構成する基本型（手番・駒・マス・持ち駒・指し手）

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::Black, Color::White];

    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// 前進方向の段の増分（先手は1段目に向かって進む）
    #[inline]
    pub fn forward(self) -> i8 {
        match self {
            Color::Black => -1,
            Color::White => 1,
        }
    }

    /// CSA の手番記号
    pub fn csa_sign(self) -> char {
        match self {
            Color::Black => '+',
            Color::White => '-',
        }
    }
}

/// 成りを含まない駒種。並びは HCP / move16 の駒種インデックス順（歩=1 … 金=7, 玉）。
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceType {
    Pawn,
    Lance,
    Knight,
    Silver,
    Bishop,
    Rook,
    Gold,
    King,
}

impl PieceType {
    /// 持ち駒になり得る駒種
    pub const HAND: [PieceType; 7] = [
        PieceType::Pawn,
        PieceType::Lance,
        PieceType::Knight,
        PieceType::Silver,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Gold,
    ];

    /// 1=歩, 2=香, 3=桂, 4=銀, 5=角, 6=飛, 7=金, 8=玉
    #[inline]
    pub fn index(self) -> usize {
        self as usize + 1
    }

    #[inline]
    pub fn can_promote(self) -> bool {
        !matches!(self, PieceType::Gold | PieceType::King)
    }

    /// 盤上の駒の CSA コード
    pub fn csa_code(self, promoted: bool) -> &'static str {
        use PieceType::*;
        match (self, promoted) {
            (Pawn, false) => "FU",
            (Lance, false) => "KY",
            (Knight, false) => "KE",
            (Silver, false) => "GI",
            (Gold, _) => "KI",
            (Bishop, false) => "KA",
            (Rook, false) => "HI",
            (King, _) => "OU",
            (Pawn, true) => "TO",
            (Lance, true) => "NY",
            (Knight, true) => "NK",
            (Silver, true) => "NG",
            (Bishop, true) => "UM",
            (Rook, true) => "RY",
        }
    }

    /// CSA コード -> (駒種, 成りフラグ)
    pub fn from_csa_code(code: &str) -> Option<(PieceType, bool)> {
        use PieceType::*;
        let parsed = match code {
            "FU" => (Pawn, false),
            "KY" => (Lance, false),
            "KE" => (Knight, false),
            "GI" => (Silver, false),
            "KI" => (Gold, false),
            "KA" => (Bishop, false),
            "HI" => (Rook, false),
            "OU" => (King, false),
            "TO" => (Pawn, true),
            "NY" => (Lance, true),
            "NK" => (Knight, true),
            "NG" => (Silver, true),
            "UM" => (Bishop, true),
            "RY" => (Rook, true),
            _ => return None,
        };
        Some(parsed)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub ty: PieceType,
    pub color: Color,
    pub promoted: bool,
}

impl Piece {
    pub fn new(ty: PieceType, color: Color, promoted: bool) -> Self {
        Self {
            ty,
            color,
            promoted,
        }
    }
}

/// 盤上のマス。筋・段とも 1..=9。
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if (1..=9).contains(&file) && (1..=9).contains(&rank) {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    /// 筋優先のマス番号: (筋-1)*9 + (段-1)。11 が 0、99 が 80。
    pub fn from_index(index: u8) -> Option<Self> {
        if index < 81 {
            Some(Self {
                file: index / 9 + 1,
                rank: index % 9 + 1,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn file(self) -> u8 {
        self.file
    }

    #[inline]
    pub fn rank(self) -> u8 {
        self.rank
    }

    #[inline]
    pub fn index(self) -> u8 {
        (self.file - 1) * 9 + (self.rank - 1)
    }

    /// 相対位置のマス（盤外なら None）
    pub fn offset(self, df: i8, dr: i8) -> Option<Self> {
        let file = self.file as i8 + df;
        let rank = self.rank as i8 + dr;
        if (1..=9).contains(&file) && (1..=9).contains(&rank) {
            Some(Self {
                file: file as u8,
                rank: rank as u8,
            })
        } else {
            None
        }
    }

    /// `color` から見た敵陣（成れる段）か
    pub fn in_promotion_zone(self, color: Color) -> bool {
        match color {
            Color::Black => self.rank <= 3,
            Color::White => self.rank >= 7,
        }
    }

    /// `color` から見て奥から数えた段（1 = 最奥）
    pub fn relative_rank(self, color: Color) -> u8 {
        match color {
            Color::Black => self.rank,
            Color::White => 10 - self.rank,
        }
    }

    pub fn iter() -> impl Iterator<Item = Square> {
        (0..81u8).filter_map(Square::from_index)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file, self.rank)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Hand {
    pub p: u8,
    pub l: u8,
    pub n: u8,
    pub s: u8,
    pub g: u8,
    pub b: u8,
    pub r: u8,
}

impl Hand {
    fn slot(&mut self, pt: PieceType) -> Option<&mut u8> {
        match pt {
            PieceType::Pawn => Some(&mut self.p),
            PieceType::Lance => Some(&mut self.l),
            PieceType::Knight => Some(&mut self.n),
            PieceType::Silver => Some(&mut self.s),
            PieceType::Gold => Some(&mut self.g),
            PieceType::Bishop => Some(&mut self.b),
            PieceType::Rook => Some(&mut self.r),
            PieceType::King => None,
        }
    }

    pub fn count(&self, pt: PieceType) -> u8 {
        match pt {
            PieceType::Pawn => self.p,
            PieceType::Lance => self.l,
            PieceType::Knight => self.n,
            PieceType::Silver => self.s,
            PieceType::Gold => self.g,
            PieceType::Bishop => self.b,
            PieceType::Rook => self.r,
            PieceType::King => 0,
        }
    }

    /// 成駒は生駒として加える。玉は無視。上限で飽和する。
    pub fn add(&mut self, pt: PieceType) {
        if let Some(slot) = self.slot(pt) {
            *slot = slot.saturating_add(1);
        }
    }

    /// 1枚取り出す。持っていなければ false。
    pub fn take(&mut self, pt: PieceType) -> bool {
        match self.slot(pt) {
            Some(slot) if *slot > 0 => {
                *slot -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Hand::default()
    }
}

/// CSA 形式の指し手 ("+7776FU", "-0055KA")。
///
/// `promoted` は移動後の駒が成駒かどうかで、成る手かどうかは移動元の駒による。
/// そのため move16 への変換は指す前の局面を必要とする（[`crate::Position::move16`]）。
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub color: Color,
    /// None は駒打ち
    pub from: Option<Square>,
    pub to: Square,
    pub piece: PieceType,
    pub promoted: bool,
}

impl Move {
    #[inline]
    pub fn is_drop(&self) -> bool {
        self.from.is_none()
    }

    /// "+7776FU" 形式の文字列から生成
    pub fn from_csa(token: &str) -> Option<Self> {
        let bytes = token.as_bytes();
        if bytes.len() < 7 || !token.is_ascii() {
            return None;
        }
        let color = match bytes[0] {
            b'+' => Color::Black,
            b'-' => Color::White,
            _ => return None,
        };
        let digit = |b: u8| b.is_ascii_digit().then(|| b - b'0');
        let (fx, fy) = (digit(bytes[1])?, digit(bytes[2])?);
        let (tx, ty) = (digit(bytes[3])?, digit(bytes[4])?);
        let (piece, promoted) = PieceType::from_csa_code(&token[5..7])?;
        let from = if fx == 0 && fy == 0 {
            None
        } else {
            Some(Square::new(fx, fy)?)
        };
        let to = Square::new(tx, ty)?;
        Some(Self {
            color,
            from,
            to,
            piece,
            promoted,
        })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from.map_or_else(|| "00".to_string(), |sq| sq.to_string());
        write!(
            f,
            "{}{}{}{}",
            self.color.csa_sign(),
            from,
            self.to,
            self.piece.csa_code(self.promoted)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_index_roundtrip() {
        for i in 0..81u8 {
            let sq = Square::from_index(i).unwrap();
            assert_eq!(sq.index(), i);
        }
        assert_eq!(Square::new(1, 1).unwrap().index(), 0);
        assert_eq!(Square::new(9, 9).unwrap().index(), 80);
        assert_eq!(Square::new(7, 7).unwrap().index(), 60);
        assert!(Square::new(0, 5).is_none());
    }

    #[test]
    fn test_move_from_csa() {
        let mv = Move::from_csa("+7776FU").unwrap();
        assert_eq!(mv.color, Color::Black);
        assert_eq!(mv.from, Square::new(7, 7));
        assert_eq!(mv.to, Square::new(7, 6).unwrap());
        assert_eq!(mv.piece, PieceType::Pawn);
        assert!(!mv.promoted);
        assert_eq!(mv.to_string(), "+7776FU");

        let drop = Move::from_csa("-0055KA").unwrap();
        assert!(drop.is_drop());
        assert_eq!(drop.to_string(), "-0055KA");

        let promo = Move::from_csa("+2233UM").unwrap();
        assert_eq!(promo.piece, PieceType::Bishop);
        assert!(promo.promoted);

        assert!(Move::from_csa("+7776XX").is_none());
        assert!(Move::from_csa("*7776FU").is_none());
        assert!(Move::from_csa("+70").is_none());
    }

    #[test]
    fn test_hand_take_and_add() {
        let mut h = Hand::default();
        assert!(!h.take(PieceType::Pawn));
        h.add(PieceType::Pawn);
        h.add(PieceType::King);
        assert_eq!(h.count(PieceType::Pawn), 1);
        assert!(h.take(PieceType::Pawn));
        assert!(h.is_empty());
    }

    #[test]
    fn test_hand_add_saturates() {
        let mut h = Hand::default();
        for _ in 0..300 {
            h.add(PieceType::Pawn);
        }
        assert_eq!(h.count(PieceType::Pawn), u8::MAX);
    }
}

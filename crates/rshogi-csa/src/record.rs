//! CSA 棋譜ファイルのパーサ
//!
//! 開始局面・対局者情報を読み取り、指し手やコメントは出現順のイベント列として返す。
//! 指し手と評価値コメントの対応付けは呼び出し側が行う。

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::position::{Position, initial_position};
use crate::types::{Color, Move, Piece, PieceType, Square};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsaError {
    #[error("line {line}: invalid move token {token:?}")]
    BadMove { line: usize, token: String },
    #[error("line {line}: invalid position statement {text:?}")]
    BadPosition { line: usize, text: String },
}

/// 棋譜本体のイベント
#[derive(Debug, Clone, PartialEq)]
pub enum CsaEvent {
    Move(Move),
    /// floodgate 形式の評価値コメント `'** <score> ...`
    Score(i32),
    Comment(String),
    /// 消費時間（秒）
    Time(u32),
    /// `%TORYO` などの終局表記
    End(String),
}

#[derive(Debug, Clone)]
pub struct CsaRecord {
    pub initial: Position,
    pub names: [Option<String>; 2],
    /// `'black_rate:...` / `'white_rate:...` コメントのレーティング
    pub ratings: [Option<f64>; 2],
    /// `$KEY:VALUE` 形式の棋譜情報
    pub info: Vec<(String, String)>,
    pub events: Vec<CsaEvent>,
}

impl CsaRecord {
    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.events.iter().filter_map(|e| match e {
            CsaEvent::Move(m) => Some(m),
            _ => None,
        })
    }

    /// 最初に現れた終局表記
    pub fn end(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match e {
            CsaEvent::End(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

fn score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^'\*\*\s*(-?\d+)").expect("valid regex"))
}

fn rating_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^'(black|white)_rate:.*:(-?\d+(?:\.\d+)?)\s*$").expect("valid regex")
    })
}

/// 平手の駒数（玉を除く）
fn full_set(pt: PieceType) -> u8 {
    match pt {
        PieceType::Pawn => 18,
        PieceType::Lance | PieceType::Knight | PieceType::Silver | PieceType::Gold => 4,
        PieceType::Bishop | PieceType::Rook => 2,
        PieceType::King => 0,
    }
}

struct PositionBuilder {
    pos: Option<Position>,
}

impl PositionBuilder {
    fn get(&mut self) -> &mut Position {
        self.pos.get_or_insert_with(Position::default)
    }

    /// "PI82HI22KA" 形式: 平手から指定マスの駒を取り除く
    fn handicap(&mut self, rest: &str) -> Option<()> {
        let mut pos = initial_position();
        for chunk in rest.as_bytes().chunks(4) {
            let text = std::str::from_utf8(chunk).ok()?;
            let sq = parse_square(text.get(..2)?)??;
            pos.set_piece(sq, None);
        }
        self.pos = Some(pos);
        Some(())
    }

    /// "P1-KY-KE-GI-KI-OU-KI-GI-KE-KY" 形式: 9筋から1筋の順
    fn row(&mut self, rank: u8, cells: &str) -> Option<()> {
        if !cells.is_ascii() {
            return None;
        }
        let pos = self.get();
        for (i, chunk) in cells.as_bytes().chunks(3).take(9).enumerate() {
            let file = 9 - i as u8;
            let sq = Square::new(file, rank)?;
            let cell = std::str::from_utf8(chunk).ok()?;
            let piece = match cell.as_bytes()[0] {
                b'+' | b'-' => {
                    let color = if cell.starts_with('+') {
                        Color::Black
                    } else {
                        Color::White
                    };
                    let (ty, promoted) = PieceType::from_csa_code(cell.get(1..3)?)?;
                    Some(Piece::new(ty, color, promoted))
                }
                _ => None,
            };
            pos.set_piece(sq, piece);
        }
        Some(())
    }

    /// "P+00HI55KA" / "P-00AL" 形式の駒配置
    fn place(&mut self, color: Color, rest: &str) -> Option<()> {
        for chunk in rest.as_bytes().chunks(4) {
            let text = std::str::from_utf8(chunk).ok()?;
            let code = text.get(2..4)?;
            let target = parse_square(text.get(..2)?)?;
            if code == "AL" {
                self.fill_hand(color);
                continue;
            }
            let (ty, promoted) = PieceType::from_csa_code(code)?;
            let pos = self.get();
            match target {
                None => pos.hand_mut(color).add(ty),
                Some(sq) => pos.set_piece(sq, Some(Piece::new(ty, color, promoted))),
            }
            // 駒数が平手一式を超える配置は受け付けない
            if ty != PieceType::King && piece_count(pos, ty) > full_set(ty) as usize {
                return None;
            }
        }
        Some(())
    }

    /// 盤上・持ち駒に現れていない残り駒をすべて `color` の持ち駒にする
    fn fill_hand(&mut self, color: Color) {
        let pos = self.get();
        for pt in PieceType::HAND {
            let rest = (full_set(pt) as usize).saturating_sub(piece_count(pos, pt));
            for _ in 0..rest {
                pos.hand_mut(color).add(pt);
            }
        }
    }
}

/// 盤上（成駒を含む）と両者の持ち駒にある `pt` の枚数
fn piece_count(pos: &Position, pt: PieceType) -> usize {
    let on_board = Square::iter()
        .filter(|&sq| pos.piece_at(sq).is_some_and(|p| p.ty == pt))
        .count();
    on_board + Color::ALL.iter().map(|&c| pos.hand(c).count(pt) as usize).sum::<usize>()
}

/// "00" は None（駒台）、"11".."99" は Some(マス)。それ以外は解釈失敗。
fn parse_square(text: &str) -> Option<Option<Square>> {
    let b = text.as_bytes();
    if b.len() != 2 || !b[0].is_ascii_digit() || !b[1].is_ascii_digit() {
        return None;
    }
    let (file, rank) = (b[0] - b'0', b[1] - b'0');
    if file == 0 && rank == 0 {
        return Some(None);
    }
    Square::new(file, rank).map(Some)
}

fn parse_comment(line: &str) -> CsaEvent {
    let score = score_re()
        .captures(line)
        .and_then(|caps| caps[1].parse::<i32>().ok());
    if let Some(v) = score {
        return CsaEvent::Score(v);
    }
    CsaEvent::Comment(line.trim_start_matches('\'').to_string())
}

/// CSA 形式の文字列を解析する。
///
/// `PI`/`P1`..`P9`/`P+`/`P-` のいずれもなければ平手から始まるものとする。
/// 複数棋譜（`/` 区切り）は先頭の1局だけを読む。
pub fn parse_csa(text: &str) -> Result<CsaRecord, CsaError> {
    let mut builder = PositionBuilder { pos: None };
    let mut side_to_move = Color::Black;
    let mut names: [Option<String>; 2] = [None, None];
    let mut ratings = [None, None];
    let mut info = Vec::new();
    let mut events = Vec::new();
    let mut in_moves = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line == "/" {
            break;
        }
        if line.starts_with('\'') {
            let rating = rating_re().captures(line).and_then(|caps| {
                let color = if &caps[1] == "black" {
                    Color::Black
                } else {
                    Color::White
                };
                caps[2].parse::<f64>().ok().map(|r| (color, r))
            });
            if let Some((color, r)) = rating {
                ratings[color.index()] = Some(r);
                continue;
            }
            if in_moves {
                events.push(parse_comment(line));
            }
            continue;
        }

        for stmt in line.split(',') {
            let s = stmt.trim();
            if s.is_empty() || s.starts_with('V') {
                continue;
            }
            let bad_position = || CsaError::BadPosition {
                line: line_no,
                text: s.to_string(),
            };
            if let Some(name) = s.strip_prefix("N+") {
                names[0] = Some(name.to_string());
            } else if let Some(name) = s.strip_prefix("N-") {
                names[1] = Some(name.to_string());
            } else if let Some(kv) = s.strip_prefix('$') {
                let (k, v) = kv.split_once(':').unwrap_or((kv, ""));
                info.push((k.to_string(), v.to_string()));
            } else if let Some(rest) = s.strip_prefix("PI") {
                builder.handicap(rest).ok_or_else(bad_position)?;
            } else if let Some(rest) = s.strip_prefix("P+") {
                builder.place(Color::Black, rest).ok_or_else(bad_position)?;
            } else if let Some(rest) = s.strip_prefix("P-") {
                builder.place(Color::White, rest).ok_or_else(bad_position)?;
            } else if s.len() >= 2 && s.starts_with('P') && s.as_bytes()[1].is_ascii_digit() {
                let rank = s.as_bytes()[1] - b'0';
                builder.row(rank, &s[2..]).ok_or_else(bad_position)?;
            } else if s == "+" || s == "-" {
                if !in_moves {
                    side_to_move = if s == "+" { Color::Black } else { Color::White };
                }
            } else if s.starts_with('+') || s.starts_with('-') {
                let mv = s
                    .get(..7)
                    .and_then(Move::from_csa)
                    .ok_or_else(|| CsaError::BadMove {
                        line: line_no,
                        token: s.to_string(),
                    })?;
                in_moves = true;
                events.push(CsaEvent::Move(mv));
            } else if let Some(t) = s.strip_prefix('T') {
                if let Ok(sec) = t.parse::<u32>() {
                    events.push(CsaEvent::Time(sec));
                }
            } else if s.starts_with('%') {
                in_moves = true;
                events.push(CsaEvent::End(s.to_string()));
            }
        }
    }

    let mut initial = builder.pos.unwrap_or_else(initial_position);
    initial.side_to_move = side_to_move;
    Ok(CsaRecord {
        initial,
        names,
        ratings,
        info,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOODGATE: &str = "\
V2
N+Apery
N-Gikou
'black_rate:Apery+0123:3450.5
'white_rate:Gikou+4567:3301
$EVENT:wdoor+floodgate-300-10F
P1-KY-KE-GI-KI-OU-KI-GI-KE-KY
P2 * -HI *  *  *  *  * -KA *
P3-FU-FU-FU-FU-FU-FU-FU-FU-FU
P4 *  *  *  *  *  *  *  *  *
P5 *  *  *  *  *  *  *  *  *
P6 *  *  *  *  *  *  *  *  *
P7+FU+FU+FU+FU+FU+FU+FU+FU+FU
P8 * +KA *  *  *  *  * +HI *
P9+KY+KE+GI+KI+OU+KI+GI+KE+KY
+
+2726FU,T3
'** 50 -8384FU +2625FU
-8384FU
T5
'** 38
%TORYO
'summary:toryo:Apery win:Gikou lose
";

    #[test]
    fn test_parse_floodgate_record() {
        let rec = parse_csa(FLOODGATE).unwrap();
        assert_eq!(rec.names[0].as_deref(), Some("Apery"));
        assert_eq!(rec.ratings, [Some(3450.5), Some(3301.0)]);
        assert_eq!(rec.info[0], ("EVENT".to_string(), "wdoor+floodgate-300-10F".to_string()));
        assert_eq!(rec.initial.to_sfen(), initial_position().to_sfen());
        assert_eq!(rec.moves().count(), 2);
        assert_eq!(rec.end(), Some("%TORYO"));
        let kinds: Vec<_> = rec
            .events
            .iter()
            .map(|e| match e {
                CsaEvent::Move(_) => "M",
                CsaEvent::Score(_) => "S",
                CsaEvent::Comment(_) => "C",
                CsaEvent::Time(_) => "T",
                CsaEvent::End(_) => "E",
            })
            .collect();
        assert_eq!(kinds, ["M", "T", "S", "M", "T", "S", "E", "C"]);
    }

    #[test]
    fn test_handicap_and_side_to_move() {
        let rec = parse_csa("PI82HI22KA\n-\n-3334FU\n%TORYO\n").unwrap();
        assert_eq!(rec.initial.side_to_move, Color::White);
        assert!(rec.initial.piece_at(Square::new(8, 2).unwrap()).is_none());
        assert!(rec.initial.piece_at(Square::new(2, 2).unwrap()).is_none());
        assert_eq!(rec.moves().count(), 1);
    }

    #[test]
    fn test_piece_placement_with_al() {
        let text = "P-51OU\nP+59OU\nP+00HI\nP-00AL\n+\n";
        let rec = parse_csa(text).unwrap();
        assert_eq!(rec.initial.hand(Color::Black).r, 1);
        assert_eq!(rec.initial.hand(Color::White).r, 1);
        assert_eq!(rec.initial.hand(Color::White).p, 18);
        assert_eq!(rec.moves().count(), 0);
    }

    #[test]
    fn test_excess_pieces_are_bad_position() {
        let text = format!("PI\nP+{}\n+\n", "00FU".repeat(300));
        let err = parse_csa(&text).unwrap_err();
        assert!(matches!(err, CsaError::BadPosition { line: 2, .. }));

        // 平手に歩を1枚足すだけでも19枚目になる
        assert!(parse_csa("PI\nP+00FU\n+\n").is_err());
        assert!(parse_csa("PI\nP-55TO\n+\n").is_err());
    }

    #[test]
    fn test_al_after_full_hand_adds_nothing() {
        let rec = parse_csa("P-51OU\nP+59OU\nP+00AL\nP-00AL\n+\n").unwrap();
        assert_eq!(rec.initial.hand(Color::Black).p, 18);
        assert!(rec.initial.hand(Color::White).is_empty());
    }

    #[test]
    fn test_bad_move_is_error() {
        let err = parse_csa("PI\n+\n+7776ZZ\n").unwrap_err();
        assert!(matches!(err, CsaError::BadMove { line: 3, .. }));
    }

    #[test]
    fn test_defaults_without_header() {
        let rec = parse_csa("+7776FU\n-3334FU\n").unwrap();
        assert_eq!(rec.ratings, [None, None]);
        assert_eq!(rec.end(), None);
        assert_eq!(rec.initial.side_to_move, Color::Black);
    }
}

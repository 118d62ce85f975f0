//! CSA 棋譜の読み込みと、学習データ生成に使う局面符号化
//!
//! - [`record`]: CSA 形式のパーサ
//! - [`position`]: 盤面と合法手判定
//! - [`hcp`]: HuffmanCodedPos (32バイト) 符号化
//! - [`zobrist`]: 定跡キー

pub mod hcp;
pub mod position;
pub mod record;
pub mod types;
pub mod zobrist;

pub use position::{IllegalMove, Position, initial_position};
pub use record::{CsaError, CsaEvent, CsaRecord, parse_csa};
pub use types::{Color, Hand, Move, Piece, PieceType, Square};

//! 1局単位で回復可能なエラー

use rshogi_csa::CsaError;
use rshogi_csa::hcp::HcpError;
use thiserror::Error;

use crate::filter::FilterReject;

/// 棋譜ファイルを読み飛ばす理由。コーパス全体の処理は止めない。
#[derive(Debug, Error)]
pub enum GameSkip {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("parse failed: {0}")]
    Parse(#[from] CsaError),
    #[error("no moves")]
    NoMoves,
    #[error("position encoding failed: {0}")]
    Encode(#[from] HcpError),
    #[error("filtered: {0}")]
    Filtered(#[from] FilterReject),
}

impl GameSkip {
    /// 集計用の理由名
    pub fn reason(&self) -> &'static str {
        match self {
            GameSkip::Read(_) => "read",
            GameSkip::Parse(_) => "parse",
            GameSkip::NoMoves => "no_moves",
            GameSkip::Encode(_) => "encode",
            GameSkip::Filtered(r) => r.reason(),
        }
    }
}

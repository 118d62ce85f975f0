//! CSA 棋譜コーパスから定跡・教師データ（HCPE / HCP）を作る
//!
//! 棋譜の列挙 → 解析 → 評価値の対応付け → 選別 → 再生 → 集計 → 重複除去 → 書き出し

pub mod annotation;
pub mod book;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod game;
pub mod io;
pub mod pipeline;
pub mod sample;
pub mod source;
pub mod walker;

pub use book::{Accumulator, BookEntry, BookFormat};
pub use config::CorpusConfig;
pub use error::GameSkip;
pub use filter::{FilterReject, GameFilter};
pub use game::{ParsedGame, TerminalResult};
pub use pipeline::RunSummary;
pub use sample::Sample;
pub use walker::{WalkConfig, WalkOutcome};

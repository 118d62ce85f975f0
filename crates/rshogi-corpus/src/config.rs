//! 変換ツールの設定
//!
//! ツールごとの既定値に TOML ファイルの値を重ね、さらにコマンドライン引数で上書きする。
//!
//! ```toml
//! [filter]
//! min_rating = 3500
//! allowed_results = ["resignation", "declared-win"]
//!
//! [walk]
//! max_moves = 60
//!
//! [run]
//! threads = 8
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::book::BookFormat;
use crate::filter::GameFilter;
use crate::game::TerminalResult;
use crate::sample::ResultPerspective;
use crate::walker::{IllegalPolicy, WalkConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookConfig {
    /// 合計回数がこれ未満の局面は出力しない
    pub min_count: u64,
    pub format: BookFormat,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            min_count: 50,
            format: BookFormat::Wide,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    pub result_perspective: ResultPerspective,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub recursive: bool,
    /// 0 で rayon の既定値
    pub threads: usize,
    /// 並列に処理するファイル数の単位
    pub chunk_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            threads: 0,
            chunk_size: 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusConfig {
    pub filter: GameFilter,
    pub walk: WalkConfig,
    pub book: BookConfig,
    pub sample: SampleConfig,
    pub run: RunConfig,
}

impl CorpusConfig {
    /// 定跡作成: 80手まで、レーティング 3000 以上
    pub fn book() -> Self {
        let mut cfg = Self::default();
        cfg.filter.min_rating = 3000;
        cfg.walk.max_moves = 80;
        cfg
    }

    /// HCPE 作成: 50手以上、レーティング 3000 以上、投了・千日手・宣言勝ち・引き分けのみ
    pub fn hcpe() -> Self {
        let mut cfg = Self::default();
        cfg.filter.min_moves = 50;
        cfg.filter.min_rating = 3000;
        cfg.filter.allowed_results = TerminalResult::DEFAULT_ALLOWED.to_vec();
        cfg.walk.illegal_policy = IllegalPolicy::Discard;
        cfg
    }

    /// HCP 作成: 150手まで、|評価値| > 1000 で打ち切り
    pub fn hcp() -> Self {
        let mut cfg = Self::default();
        cfg.walk.max_moves = 150;
        cfg.walk.eval_cutoff = 1000;
        cfg
    }

    /// `self` を既定値として TOML ファイルの値を重ねる
    pub fn overlay_file(self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        self.overlay_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn overlay_str(self, text: &str) -> Result<Self> {
        let overlay: toml::Table = text.parse()?;
        let mut base = toml::Value::try_from(&self)?;
        merge(&mut base, toml::Value::Table(overlay));
        Ok(base.try_into()?)
    }
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (k, v) in overlay {
                match base.get_mut(&k) {
                    Some(slot) => merge(slot, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::EvalTurn;

    #[test]
    fn test_presets() {
        assert_eq!(CorpusConfig::book().walk.max_moves, 80);
        assert_eq!(CorpusConfig::book().book.min_count, 50);
        assert_eq!(CorpusConfig::hcpe().filter.allowed_results.len(), 4);
        assert_eq!(CorpusConfig::hcp().walk.eval_cutoff, 1000);
    }

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let text = r#"
[filter]
min_rating = 3500
allowed_results = ["resignation"]

[walk]
eval_turn = "after"

[book]
format = "apery"
"#;
        let cfg = CorpusConfig::book().overlay_str(text).unwrap();
        assert_eq!(cfg.filter.min_rating, 3500);
        assert_eq!(cfg.filter.allowed_results, [TerminalResult::Resignation]);
        assert_eq!(cfg.walk.eval_turn, EvalTurn::After);
        assert_eq!(cfg.walk.max_moves, 80);
        assert_eq!(cfg.book.format, BookFormat::Apery);
        assert_eq!(cfg.book.min_count, 50);
    }

    #[test]
    fn test_unknown_key_is_error() {
        assert!(CorpusConfig::default().overlay_str("[walk]\nmax_move = 3\n").is_err());
        assert!(CorpusConfig::default().overlay_str("[walk]\nmax_moves = \"x\"\n").is_err());
    }
}

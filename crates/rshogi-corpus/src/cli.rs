//! 変換ツール共通のコマンドライン引数とログ設定

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::CorpusConfig;
use crate::pipeline::RunSummary;
use crate::walker::IllegalPolicy;

/// ログは標準エラーへ。`RUST_LOG` 未設定なら info。
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}

#[derive(Args, Debug)]
pub struct CorpusArgs {
    /// CSA 棋譜のディレクトリ
    pub input_dir: PathBuf,

    /// 出力ファイル（`-` で標準出力、拡張子 .gz で gzip 圧縮）
    pub output_file: PathBuf,

    /// 設定ファイル (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 最小手数
    #[arg(long, aliases = ["minMoves", "filter_moves"])]
    pub min_moves: Option<usize>,

    /// 両対局者の最低レーティング（0 で無効）
    #[arg(long, aliases = ["minRating", "filter_rating"])]
    pub min_rating: Option<u32>,

    /// |評価値| がこれを超えたら以降の手を使わない（0 で無効）
    #[arg(long, aliases = ["evalCutoff", "eval"])]
    pub eval_cutoff: Option<i32>,

    /// 1局あたり再生する最大手数（0 で無制限）
    #[arg(long, aliases = ["maxMoves", "limit_moves", "turn"])]
    pub max_moves: Option<usize>,

    /// サブディレクトリも探索する
    #[arg(short, long)]
    pub recursive: bool,

    /// ワーカースレッド数（0 で自動）
    #[arg(long)]
    pub threads: Option<usize>,

    /// 並列処理の単位とするファイル数
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// 非合法手を含む棋譜の扱い
    #[arg(long, value_enum)]
    pub illegal_policy: Option<IllegalPolicy>,

    /// 集計結果を JSON で書き出す
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// 進捗バーを表示する
    #[arg(long)]
    pub progress: bool,
}

impl CorpusArgs {
    /// 既定値 → 設定ファイル → コマンドライン引数の順に重ねる
    pub fn resolve(&self, preset: CorpusConfig) -> Result<CorpusConfig> {
        let mut cfg = match &self.config {
            Some(path) => preset.overlay_file(path)?,
            None => preset,
        };
        if let Some(v) = self.min_moves {
            cfg.filter.min_moves = v;
        }
        if let Some(v) = self.min_rating {
            cfg.filter.min_rating = v;
        }
        if let Some(v) = self.eval_cutoff {
            cfg.walk.eval_cutoff = v;
        }
        if let Some(v) = self.max_moves {
            cfg.walk.max_moves = v;
        }
        if self.recursive {
            cfg.run.recursive = true;
        }
        if let Some(v) = self.threads {
            cfg.run.threads = v;
        }
        if let Some(v) = self.chunk_size {
            cfg.run.chunk_size = v;
        }
        if let Some(v) = self.illegal_policy {
            cfg.walk.illegal_policy = v;
        }
        log::debug!("config: {cfg:?}");
        Ok(cfg)
    }

    /// 集計を表示し、指定があれば JSON に書き出す。
    /// 出力先が標準出力のときは表示を標準エラーに回す。
    pub fn report(&self, summary: &RunSummary, lines: &[(&str, u64)]) -> Result<()> {
        summary.log();
        let to_stdout = self.output_file.as_os_str() != "-";
        for (label, value) in lines {
            if to_stdout {
                println!("{label} : {value}");
            } else {
                eprintln!("{label} : {value}");
            }
        }
        if let Some(path) = &self.summary_json {
            summary.write_json(path)?;
        }
        Ok(())
    }
}

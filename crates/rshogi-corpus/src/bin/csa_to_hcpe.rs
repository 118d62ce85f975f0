//! CSA 棋譜から HCPE 教師データを作る
//!
//! 評価値コメントのある手の局面だけを出力する。出力はバイト列の昇順で重複を含まない。

use anyhow::{Context, Result};
use clap::Parser;

use rshogi_corpus::cli::{CorpusArgs, init_logging};
use rshogi_corpus::config::CorpusConfig;
use rshogi_corpus::dedup::write_records;
use rshogi_corpus::game::TerminalResult;
use rshogi_corpus::io::open_writer;
use rshogi_corpus::pipeline::build_samples;
use rshogi_corpus::sample::ResultPerspective;
use rshogi_corpus::source::enumerate_records;
use rshogi_corpus::walker::{EvalTurn, Perspective};

#[derive(Parser, Debug)]
#[command(name = "csa_to_hcpe")]
#[command(about = "CSA 棋譜から HCPE 教師データを作る")]
struct Cli {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// 採用する終局理由（カンマ区切り）
    #[arg(long, value_enum, value_delimiter = ',')]
    results: Option<Vec<TerminalResult>>,

    /// 勝敗の符号化
    #[arg(long, value_enum)]
    result_perspective: Option<ResultPerspective>,

    /// 評価値コメントの視点
    #[arg(long, value_enum)]
    score_perspective: Option<Perspective>,

    /// 評価値の符号の基準にする手番
    #[arg(long, value_enum)]
    eval_turn: Option<EvalTurn>,

    /// 打ち切りの原因になった局面を出力しない
    #[arg(long)]
    drop_decisive: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut cfg = cli.corpus.resolve(CorpusConfig::hcpe())?;
    if let Some(results) = &cli.results {
        cfg.filter.allowed_results = results.clone();
    }
    if let Some(p) = cli.result_perspective {
        cfg.sample.result_perspective = p;
    }
    if let Some(p) = cli.score_perspective {
        cfg.walk.score_perspective = p;
    }
    if let Some(t) = cli.eval_turn {
        cfg.walk.eval_turn = t;
    }
    if cli.drop_decisive {
        cfg.walk.emit_decisive = false;
    }

    let files = enumerate_records(&cli.corpus.input_dir, cfg.run.recursive)?;
    log::info!("{} record files in {}", files.len(), cli.corpus.input_dir.display());
    let output = &cli.corpus.output_file;
    let mut out =
        open_writer(output).with_context(|| format!("failed to create {}", output.display()))?;

    let (records, summary) = build_samples(&files, &cfg, cli.corpus.progress)?;
    write_records(&mut out, &records)?;
    out.close()
        .with_context(|| format!("failed to write {}", output.display()))?;

    cli.corpus.report(
        &summary,
        &[
            ("games", summary.games_accepted),
            ("positions", summary.records_emitted),
            ("unique positions", summary.records_retained),
        ],
    )
}

//! CSA 棋譜から定跡ファイルを作る
//!
//! 局面キーの昇順、同一局面内は指された回数の多い順に並ぶ。

use anyhow::{Context, Result};
use clap::Parser;

use rshogi_corpus::book::BookFormat;
use rshogi_corpus::cli::{CorpusArgs, init_logging};
use rshogi_corpus::config::CorpusConfig;
use rshogi_corpus::io::open_writer;
use rshogi_corpus::pipeline::build_book;
use rshogi_corpus::source::enumerate_records;

#[derive(Parser, Debug)]
#[command(name = "csa_to_book")]
#[command(about = "CSA 棋譜から定跡ファイルを作る")]
struct Cli {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// 合計回数がこれ未満の局面を除く
    #[arg(long, aliases = ["minCount", "min_counts"])]
    min_count: Option<u64>,

    /// レコード形式
    #[arg(long, value_enum)]
    book_format: Option<BookFormat>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut cfg = cli.corpus.resolve(CorpusConfig::book())?;
    if let Some(n) = cli.min_count {
        cfg.book.min_count = n;
    }
    if let Some(f) = cli.book_format {
        cfg.book.format = f;
    }

    let files = enumerate_records(&cli.corpus.input_dir, cfg.run.recursive)?;
    log::info!("{} record files in {}", files.len(), cli.corpus.input_dir.display());
    let output = &cli.corpus.output_file;
    let mut out =
        open_writer(output).with_context(|| format!("failed to create {}", output.display()))?;

    let (drain, summary) = build_book(&files, &cfg, cli.corpus.progress)?;
    for entry in &drain.entries {
        cfg.book.format.write_entry(&mut out, entry)?;
    }
    out.close()
        .with_context(|| format!("failed to write {}", output.display()))?;

    cli.corpus.report(
        &summary,
        &[
            ("games", summary.games_accepted),
            ("positions", summary.positions_retained),
            ("entries", summary.records_retained),
        ],
    )
}

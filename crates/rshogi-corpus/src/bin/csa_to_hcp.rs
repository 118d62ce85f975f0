//! CSA 棋譜から局面だけの HCP データを作る

use anyhow::{Context, Result};
use clap::Parser;

use rshogi_corpus::cli::{CorpusArgs, init_logging};
use rshogi_corpus::config::CorpusConfig;
use rshogi_corpus::dedup::write_records;
use rshogi_corpus::io::open_writer;
use rshogi_corpus::pipeline::build_positions;
use rshogi_corpus::source::enumerate_records;

#[derive(Parser, Debug)]
#[command(name = "csa_to_hcp")]
#[command(about = "CSA 棋譜から再生した局面を HCP で書き出す")]
struct Cli {
    #[command(flatten)]
    corpus: CorpusArgs,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cfg = cli.corpus.resolve(CorpusConfig::hcp())?;

    let files = enumerate_records(&cli.corpus.input_dir, cfg.run.recursive)?;
    log::info!("{} record files in {}", files.len(), cli.corpus.input_dir.display());
    let output = &cli.corpus.output_file;
    let mut out =
        open_writer(output).with_context(|| format!("failed to create {}", output.display()))?;

    let (records, summary) = build_positions(&files, &cfg, cli.corpus.progress)?;
    write_records(&mut out, &records)?;
    out.close()
        .with_context(|| format!("failed to write {}", output.display()))?;

    cli.corpus.report(
        &summary,
        &[
            ("file num", summary.games_accepted),
            ("position num", summary.records_emitted),
            ("uniq position num", summary.records_retained),
        ],
    )
}

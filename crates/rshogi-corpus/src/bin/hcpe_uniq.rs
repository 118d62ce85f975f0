//! HCPE / HCP ファイルの重複除去
//!
//! レコード全体が一致するものを1つにまとめ、バイト列の昇順で書き出す。

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use rshogi_corpus::cli::init_logging;
use rshogi_corpus::dedup::uniq_file;
use rshogi_corpus::sample::HCPE_SIZE;
use rshogi_csa::hcp::HCP_SIZE;

#[derive(Parser, Debug)]
#[command(name = "hcpe_uniq")]
#[command(about = "HCPE / HCP ファイルの重複レコードを除いて並べ替える")]
struct Cli {
    /// 入力ファイル
    input: PathBuf,

    /// 出力ファイル
    output: PathBuf,

    /// レコードサイズ（38 = HCPE, 32 = HCP）
    #[arg(long, default_value_t = HCPE_SIZE)]
    record_size: usize,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let (total, unique) = match cli.record_size {
        HCPE_SIZE => uniq_file::<HCPE_SIZE>(&cli.input, &cli.output)?,
        HCP_SIZE => uniq_file::<HCP_SIZE>(&cli.input, &cli.output)?,
        n => bail!("unsupported record size {n} (expected {HCPE_SIZE} or {HCP_SIZE})"),
    };
    log::info!("{} -> {}", cli.input.display(), cli.output.display());
    println!("positions : {total}");
    println!("unique positions : {unique}");
    Ok(())
}

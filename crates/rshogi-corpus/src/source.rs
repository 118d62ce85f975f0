//! 棋譜ファイルの列挙
//!
//! `.csa` と `.csa.gz` を対象にする。結果はパス順に並べるので、
//! 同じディレクトリからは常に同じ順序で棋譜が供給される。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

fn is_record_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    name.ends_with(".csa") || name.ends_with(".csa.gz")
}

/// `dir` 以下の棋譜ファイルを列挙する。`recursive` が false なら直下のみ。
///
/// ディレクトリ自体を開けない場合はエラー。配下の個別エントリの読み取り失敗は警告して飛ばす。
pub fn enumerate_records(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    std::fs::read_dir(dir)
        .with_context(|| format!("cannot enumerate input directory {}", dir.display()))?;

    let mut walker = WalkDir::new(dir).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }
    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(e) if e.file_type().is_file() && is_record_file(e.path()) => {
                files.push(e.into_path());
            }
            Ok(_) => {}
            Err(e) => log::warn!("skip directory entry: {e}"),
        }
    }
    files.sort();
    Ok(files)
}

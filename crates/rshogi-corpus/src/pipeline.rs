//! コーパス変換の実行部
//!
//! ファイルをパス順にチャンクへ分け、チャンク内は rayon で並列に
//! 読み込み・解析・選別・再生する。結果はファイル順に集め直してから
//! 単一の集計段に渡すので、スレッド数によらず出力は同じになる。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rshogi_csa::hcp::{self, HCP_SIZE};
use serde::Serialize;

use crate::book::{Accumulator, BookDrain};
use crate::config::CorpusConfig;
use crate::dedup::sort_dedup;
use crate::error::GameSkip;
use crate::game::ParsedGame;
use crate::io::read_text;
use crate::sample::{self, HCPE_SIZE, ResultPerspective};
use crate::walker::{IllegalPolicy, Step, WalkOutcome, walk};

/// 再生中の各手から出力を作る。ワーカースレッドから呼ばれる。
pub trait StepSink: Sync {
    type Item: Send;

    fn on_step(
        &self,
        game: &ParsedGame,
        step: &Step<'_>,
        out: &mut Vec<Self::Item>,
    ) -> Result<(), GameSkip>;
}

/// 定跡用: (局面キー, move16)
pub struct BookSink;

impl StepSink for BookSink {
    type Item = (u64, u16);

    fn on_step(
        &self,
        _game: &ParsedGame,
        step: &Step<'_>,
        out: &mut Vec<Self::Item>,
    ) -> Result<(), GameSkip> {
        out.push((step.position.book_key(), step.position.move16(step.mv)));
        Ok(())
    }
}

/// HCPE 用
pub struct SampleSink {
    pub perspective: ResultPerspective,
}

impl StepSink for SampleSink {
    type Item = [u8; HCPE_SIZE];

    fn on_step(
        &self,
        game: &ParsedGame,
        step: &Step<'_>,
        out: &mut Vec<Self::Item>,
    ) -> Result<(), GameSkip> {
        if let Some(s) = sample::extract(step, game, self.perspective)? {
            out.push(s.to_bytes());
        }
        Ok(())
    }
}

/// HCP 用: 再生した全局面
pub struct PositionSink;

impl StepSink for PositionSink {
    type Item = [u8; HCP_SIZE];

    fn on_step(
        &self,
        _game: &ParsedGame,
        step: &Step<'_>,
        out: &mut Vec<Self::Item>,
    ) -> Result<(), GameSkip> {
        out.push(hcp::encode(step.position)?);
        Ok(())
    }
}

/// 1ファイル分の処理結果
enum FileResult<T> {
    Skipped(GameSkip),
    Walked {
        items: Vec<T>,
        steps: usize,
        outcome: WalkOutcome,
    },
}

fn process_file<S: StepSink>(
    path: &Path,
    cfg: &CorpusConfig,
    sink: &S,
) -> FileResult<S::Item> {
    match walk_file(path, cfg, sink) {
        Ok((items, steps, outcome)) => FileResult::Walked {
            items,
            steps,
            outcome,
        },
        Err(skip) => FileResult::Skipped(skip),
    }
}

fn walk_file<S: StepSink>(
    path: &Path,
    cfg: &CorpusConfig,
    sink: &S,
) -> Result<(Vec<S::Item>, usize, WalkOutcome), GameSkip> {
    let text = read_text(path)?;
    let game = ParsedGame::parse(&text)?;
    if game.moves.is_empty() {
        return Err(GameSkip::NoMoves);
    }
    cfg.filter.check(&game)?;

    let mut items = Vec::new();
    let mut steps = 0usize;
    let mut failure = None;
    let outcome = walk(&game, &cfg.walk, |step| {
        steps += 1;
        if failure.is_none() {
            failure = sink.on_step(&game, &step, &mut items).err();
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok((items, steps, outcome)),
    }
}

/// 実行結果の集計
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub files: u64,
    pub games_accepted: u64,
    /// 理由ごとの読み飛ばし数
    pub skipped: BTreeMap<String, u64>,
    pub illegal_truncated: u64,
    pub illegal_discarded: u64,
    pub eval_cutoff: u64,
    pub max_moves_reached: u64,
    pub positions_walked: u64,
    pub records_emitted: u64,
    /// 重複除去・足切り後のレコード数
    pub records_retained: u64,
    /// 定跡に残った局面数
    pub positions_retained: u64,
}

impl RunSummary {
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub fn log(&self) {
        log::info!(
            "files: {}, accepted: {}, skipped: {} {:?}",
            self.files,
            self.games_accepted,
            self.skipped_total(),
            self.skipped
        );
        log::info!(
            "illegal: {} truncated / {} discarded, eval cutoff: {}, max moves: {}",
            self.illegal_truncated,
            self.illegal_discarded,
            self.eval_cutoff,
            self.max_moves_reached
        );
        log::info!(
            "positions walked: {}, records emitted: {}, retained: {}",
            self.positions_walked,
            self.records_emitted,
            self.records_retained
        );
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary {}", path.display()))
    }
}

/// 全ファイルを処理し、採用した棋譜の出力をファイル順に `absorb` へ渡す
pub fn run<S, F>(
    files: &[PathBuf],
    cfg: &CorpusConfig,
    sink: &S,
    progress: bool,
    mut absorb: F,
) -> Result<RunSummary>
where
    S: StepSink,
    F: FnMut(Vec<S::Item>),
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.run.threads)
        .build()
        .context("failed to build thread pool")?;

    let bar = if progress {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({per_sec}) {msg}")
                .context("invalid progress template")?,
        );
        Some(bar)
    } else {
        None
    };

    let mut summary = RunSummary::default();
    for chunk in files.chunks(cfg.run.chunk_size.max(1)) {
        let results: Vec<FileResult<S::Item>> = pool.install(|| {
            chunk
                .par_iter()
                .map(|path| process_file(path, cfg, sink))
                .collect()
        });

        for (path, result) in chunk.iter().zip(results) {
            summary.files += 1;
            match result {
                FileResult::Skipped(skip) => {
                    match &skip {
                        GameSkip::Filtered(_) | GameSkip::NoMoves => {
                            log::debug!("skip {}: {skip}", path.display())
                        }
                        _ => log::warn!("skip {}: {skip}", path.display()),
                    }
                    *summary.skipped.entry(skip.reason().to_string()).or_default() += 1;
                }
                FileResult::Walked {
                    items,
                    steps,
                    outcome,
                } => {
                    match outcome {
                        WalkOutcome::Completed => {}
                        WalkOutcome::MaxMoves => summary.max_moves_reached += 1,
                        WalkOutcome::EvalCutoff { .. } => summary.eval_cutoff += 1,
                        WalkOutcome::Illegal { index, mv, reason } => {
                            log::warn!(
                                "illegal move in {} at index {index} ({mv}): {reason}",
                                path.display()
                            );
                            if cfg.walk.illegal_policy == IllegalPolicy::Discard {
                                summary.illegal_discarded += 1;
                                *summary.skipped.entry("illegal".to_string()).or_default() += 1;
                                continue;
                            }
                            summary.illegal_truncated += 1;
                        }
                    }
                    summary.games_accepted += 1;
                    summary.positions_walked += steps as u64;
                    summary.records_emitted += items.len() as u64;
                    absorb(items);
                }
            }
        }
        if let Some(bar) = &bar {
            bar.inc(chunk.len() as u64);
        }
    }
    if let Some(bar) = bar {
        bar.finish_with_message("done");
    }
    Ok(summary)
}

/// 定跡を作る。`positions_retained` と `records_retained` は足切り後の値。
pub fn build_book(
    files: &[PathBuf],
    cfg: &CorpusConfig,
    progress: bool,
) -> Result<(BookDrain, RunSummary)> {
    let mut acc = Accumulator::new();
    let mut summary = run(files, cfg, &BookSink, progress, |pairs| {
        for (key, mv) in pairs {
            acc.add(key, mv);
        }
    })?;
    log::debug!(
        "accumulated {} positions from {} moves",
        acc.len(),
        acc.occurrences()
    );
    let drain = acc.drain(cfg.book.min_count);
    summary.positions_retained = drain.positions as u64;
    summary.records_retained = drain.entries.len() as u64;
    Ok((drain, summary))
}

/// HCPE を作る。バイト列の昇順・重複なし。
pub fn build_samples(
    files: &[PathBuf],
    cfg: &CorpusConfig,
    progress: bool,
) -> Result<(Vec<[u8; HCPE_SIZE]>, RunSummary)> {
    let sink = SampleSink {
        perspective: cfg.sample.result_perspective,
    };
    let mut records = Vec::new();
    let mut summary = run(files, cfg, &sink, progress, |mut items| records.append(&mut items))?;
    sort_dedup(&mut records);
    summary.records_retained = records.len() as u64;
    Ok((records, summary))
}

/// HCP を作る。バイト列の昇順・重複なし。
pub fn build_positions(
    files: &[PathBuf],
    cfg: &CorpusConfig,
    progress: bool,
) -> Result<(Vec<[u8; HCP_SIZE]>, RunSummary)> {
    let mut records = Vec::new();
    let mut summary = run(files, cfg, &PositionSink, progress, |mut items| {
        records.append(&mut items)
    })?;
    sort_dedup(&mut records);
    summary.records_retained = records.len() as u64;
    Ok((records, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, text).unwrap();
        p
    }

    #[test]
    fn test_skips_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "a.csa", "+7776FU\n-3334FU\n%TORYO\n"),
            write(dir.path(), "b.csa", "+7776ZZ\n"),
            write(dir.path(), "c.csa", "N+x\nN-y\n"),
            dir.path().join("missing.csa"),
        ];
        let mut cfg = CorpusConfig::default();
        cfg.book.min_count = 1;
        let (drain, summary) = build_book(&files, &cfg, false).unwrap();
        assert_eq!(summary.files, 4);
        assert_eq!(summary.games_accepted, 1);
        assert_eq!(summary.skipped.get("parse"), Some(&1));
        assert_eq!(summary.skipped.get("no_moves"), Some(&1));
        assert_eq!(summary.skipped.get("read"), Some(&1));
        assert_eq!(drain.entries.len(), 2);
    }

    #[test]
    fn test_discard_policy_drops_game() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![write(
            dir.path(),
            "a.csa",
            "+7776FU\n'** 10\n-3334FU\n'** 20\n+7776FU\n'** 30\n",
        )];
        let mut cfg = CorpusConfig::default();
        cfg.walk.illegal_policy = IllegalPolicy::Discard;
        let (records, summary) = build_samples(&files, &cfg, false).unwrap();
        assert!(records.is_empty());
        assert_eq!(summary.illegal_discarded, 1);
        assert_eq!(summary.games_accepted, 0);

        cfg.walk.illegal_policy = IllegalPolicy::Truncate;
        let (records, summary) = build_samples(&files, &cfg, false).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(summary.illegal_truncated, 1);
    }
}

//! 定跡の集計と書き出し
//!
//! 局面キーごとに指された手の回数を数え、全棋譜を読み終えてから一度だけ取り出す。
//! 同数の手は集計中に先に現れた方を優先する。

use std::cmp::Reverse;
use std::collections::HashMap;
use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::dedup::RecordError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookEntry {
    pub key: u64,
    pub mv: u16,
    pub count: u32,
    pub reserved: u32,
}

/// 定跡ファイルのレコード形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookFormat {
    /// key u64, move u16, count u32, reserved u32 (18 bytes)
    #[default]
    Wide,
    /// Apery 形式のレコード配置: key u64, move u16, count u16, score i32 (16 bytes)
    ///
    /// キーはこのクレートの Zobrist 表によるもので、Apery の局面キーとは一致しない。
    Apery,
}

impl BookFormat {
    pub fn record_size(self) -> usize {
        match self {
            BookFormat::Wide => 18,
            BookFormat::Apery => 16,
        }
    }

    pub fn write_entry<W: Write>(self, w: &mut W, e: &BookEntry) -> io::Result<()> {
        w.write_u64::<LittleEndian>(e.key)?;
        w.write_u16::<LittleEndian>(e.mv)?;
        match self {
            BookFormat::Wide => {
                w.write_u32::<LittleEndian>(e.count)?;
                w.write_u32::<LittleEndian>(e.reserved)?;
            }
            BookFormat::Apery => {
                w.write_u16::<LittleEndian>(u16::try_from(e.count).unwrap_or(u16::MAX))?;
                w.write_i32::<LittleEndian>(0)?;
            }
        }
        Ok(())
    }

    /// 書き出したファイルを読み戻す
    pub fn read_entries(self, data: &[u8]) -> Result<Vec<BookEntry>, RecordError> {
        let size = self.record_size();
        if data.len() % size != 0 {
            return Err(RecordError::BadLength {
                len: data.len() as u64,
                record_size: size,
            });
        }
        let mut out = Vec::with_capacity(data.len() / size);
        for mut rec in data.chunks_exact(size) {
            let key = rec.read_u64::<LittleEndian>()?;
            let mv = rec.read_u16::<LittleEndian>()?;
            let (count, reserved) = match self {
                BookFormat::Wide => (
                    rec.read_u32::<LittleEndian>()?,
                    rec.read_u32::<LittleEndian>()?,
                ),
                BookFormat::Apery => (u32::from(rec.read_u16::<LittleEndian>()?), 0),
            };
            out.push(BookEntry {
                key,
                mv,
                count,
                reserved,
            });
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy)]
struct MoveStat {
    mv: u16,
    count: u32,
    first_seen: u64,
}

/// 取り出し結果
#[derive(Debug, Default)]
pub struct BookDrain {
    pub entries: Vec<BookEntry>,
    /// 残った局面数
    pub positions: usize,
    /// `min_count` 未満で捨てた局面数
    pub pruned: usize,
}

/// 局面キー -> 手ごとの回数
///
/// 書き込みは1つの集計段からのみ行う。
#[derive(Debug, Default)]
pub struct Accumulator {
    map: HashMap<u64, Vec<MoveStat>>,
    seq: u64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: u64, mv: u16) {
        let seq = self.seq;
        self.seq += 1;
        let stats = self.map.entry(key).or_default();
        match stats.iter_mut().find(|s| s.mv == mv) {
            Some(s) => s.count = s.count.saturating_add(1),
            None => stats.push(MoveStat {
                mv,
                count: 1,
                first_seen: seq,
            }),
        }
    }

    /// 集計した局面数
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 追加された (局面, 手) の総数
    pub fn occurrences(&self) -> u64 {
        self.seq
    }

    /// キー昇順に取り出す。合計回数が `min_count` 未満の局面は捨てる。
    pub fn drain(self, min_count: u64) -> BookDrain {
        let mut keys: Vec<(u64, Vec<MoveStat>)> = self.map.into_iter().collect();
        keys.sort_unstable_by_key(|(key, _)| *key);

        let mut out = BookDrain::default();
        for (key, mut stats) in keys {
            let total: u64 = stats.iter().map(|s| u64::from(s.count)).sum();
            if total < min_count {
                out.pruned += 1;
                continue;
            }
            stats.sort_by_key(|s| (Reverse(s.count), s.first_seen));
            out.entries.extend(stats.iter().map(|s| BookEntry {
                key,
                mv: s.mv,
                count: s.count,
                reserved: 0,
            }));
            out.positions += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_orders_keys_and_ties() {
        let mut acc = Accumulator::new();
        acc.add(30, 7);
        acc.add(10, 2);
        acc.add(10, 1);
        acc.add(10, 3);
        acc.add(10, 3);
        acc.add(20, 5);
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.occurrences(), 6);

        let drained = acc.drain(1);
        let got: Vec<_> = drained.entries.iter().map(|e| (e.key, e.mv, e.count)).collect();
        // 同数の 2 と 1 は先に現れた 2 が先
        assert_eq!(got, [(10, 3, 2), (10, 2, 1), (10, 1, 1), (20, 5, 1), (30, 7, 1)]);
        assert_eq!(drained.positions, 3);
        assert!(drained.entries.iter().all(|e| e.reserved == 0));
    }

    #[test]
    fn test_prune_below_min_count() {
        let mut acc = Accumulator::new();
        for _ in 0..3 {
            acc.add(1, 100);
        }
        acc.add(2, 100);
        acc.add(2, 101);
        acc.add(3, 9);
        let drained = acc.drain(2);
        let keys: Vec<_> = drained.entries.iter().map(|e| e.key).collect();
        assert_eq!(keys, [1, 2, 2]);
        assert_eq!(drained.positions, 2);
        assert_eq!(drained.pruned, 1);
    }

    #[test]
    fn test_formats() {
        let e = BookEntry {
            key: 0x0102_0304_0506_0708,
            mv: 0x1234,
            count: 70_000,
            reserved: 0,
        };
        let mut wide = Vec::new();
        BookFormat::Wide.write_entry(&mut wide, &e).unwrap();
        assert_eq!(wide.len(), 18);
        assert_eq!(&wide[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(BookFormat::Wide.read_entries(&wide).unwrap(), vec![e]);

        let mut apery = Vec::new();
        BookFormat::Apery.write_entry(&mut apery, &e).unwrap();
        assert_eq!(apery.len(), 16);
        let back = BookFormat::Apery.read_entries(&apery).unwrap();
        assert_eq!(back[0].count, u32::from(u16::MAX));

        assert!(BookFormat::Wide.read_entries(&apery).is_err());
    }
}

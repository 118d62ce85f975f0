//! 固定長レコードの重複除去
//!
//! レコード全体のバイト列が等しいものを1つにまとめ、バイト列の辞書順に並べる。
//! 並べ替え済み・重複除去済みの列に再度かけても結果は変わらない。

use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use thiserror::Error;

use crate::io::{open_reader, open_writer};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("data length {len} is not a multiple of record size {record_size}")]
    BadLength { len: u64, record_size: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn sort_dedup<const N: usize>(records: &mut Vec<[u8; N]>) {
    records.sort_unstable();
    records.dedup();
}

/// 末尾まで読み込んで N バイトずつに区切る。端数があればエラー。
pub fn read_records<const N: usize, R: Read>(mut reader: R) -> Result<Vec<[u8; N]>, RecordError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    if buf.len() % N != 0 {
        return Err(RecordError::BadLength {
            len: buf.len() as u64,
            record_size: N,
        });
    }
    Ok(buf
        .chunks_exact(N)
        .map(|c| {
            let mut rec = [0u8; N];
            rec.copy_from_slice(c);
            rec
        })
        .collect())
}

pub fn write_records<const N: usize, W: Write>(w: &mut W, records: &[[u8; N]]) -> io::Result<()> {
    for rec in records {
        w.write_all(rec)?;
    }
    Ok(())
}

/// ファイル単位の重複除去。(入力件数, 出力件数) を返す。
pub fn uniq_file<const N: usize>(input: &Path, output: &Path) -> anyhow::Result<(usize, usize)> {
    let reader =
        open_reader(input).with_context(|| format!("failed to open {}", input.display()))?;
    let mut records = read_records::<N, _>(reader)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let total = records.len();
    sort_dedup(&mut records);

    let mut w =
        open_writer(output).with_context(|| format!("failed to create {}", output.display()))?;
    write_records(&mut w, &records)?;
    w.close()
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok((total, records.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_dedup_is_idempotent() {
        let mut recs = vec![[3u8, 0], [1, 9], [3, 0], [1, 2], [1, 9]];
        sort_dedup(&mut recs);
        assert_eq!(recs, vec![[1, 2], [1, 9], [3, 0]]);
        let once = recs.clone();
        sort_dedup(&mut recs);
        assert_eq!(recs, once);
    }

    #[test]
    fn test_read_rejects_partial_record() {
        let data = [0u8; 7];
        let err = read_records::<4, _>(&data[..]).unwrap_err();
        assert!(matches!(err, RecordError::BadLength { len: 7, record_size: 4 }));

        let recs = read_records::<4, _>(&data[..4]).unwrap();
        let mut out = Vec::new();
        write_records(&mut out, &recs).unwrap();
        assert_eq!(out, vec![0u8; 4]);
    }

    #[test]
    fn test_uniq_file_twice_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let once = dir.path().join("once.bin");
        let twice = dir.path().join("twice.bin");
        std::fs::write(&input, [5u8, 5, 1, 1, 5, 5, 3, 3]).unwrap();

        assert_eq!(uniq_file::<2>(&input, &once).unwrap(), (4, 3));
        assert_eq!(std::fs::read(&once).unwrap(), [1, 1, 3, 3, 5, 5]);
        assert_eq!(uniq_file::<2>(&once, &twice).unwrap(), (3, 3));
        assert_eq!(std::fs::read(&once).unwrap(), std::fs::read(&twice).unwrap());
    }
}

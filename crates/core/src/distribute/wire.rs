// Pipe encoding between coordinator and process workers, all little-endian.
//
//   coordinator -> worker: u32 pair count, then (i32 i, i32 j) per pair, once.
//   worker -> coordinator: one 16-byte record {i32 i, i32 j, f64 result} per
//   finished pair. A NaN result marks a pair the worker could not score.

use std::io::{self, Read, Write};

use crate::error::{R2ksError, Result};
use crate::partition::ListPair;

use super::WorkerReport;

pub const RECORD_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRecord {
    pub i: i32,
    pub j: i32,
    pub result: f64,
}

impl ResultRecord {
    pub fn new(pair: ListPair, outcome: &Result<f64>) -> Result<Self> {
        Ok(Self {
            i: to_wire_index(pair.i)?,
            j: to_wire_index(pair.j)?,
            result: match outcome {
                Ok(score) => *score,
                Err(_) => f64::NAN,
            },
        })
    }

    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[0..4].copy_from_slice(&self.i.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.j.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.result.to_le_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8; RECORD_LEN]) -> Self {
        let mut i = [0u8; 4];
        let mut j = [0u8; 4];
        let mut result = [0u8; 8];
        i.copy_from_slice(&bytes[0..4]);
        j.copy_from_slice(&bytes[4..8]);
        result.copy_from_slice(&bytes[8..16]);
        Self {
            i: i32::from_le_bytes(i),
            j: i32::from_le_bytes(j),
            result: f64::from_le_bytes(result),
        }
    }

    pub fn into_report(self, worker: usize) -> Result<WorkerReport> {
        let pair = ListPair {
            i: from_wire_index(self.i)?,
            j: from_wire_index(self.j)?,
        };
        let outcome = if self.result.is_nan() {
            Err(R2ksError::RemoteFailure {
                worker,
                i: pair.i,
                j: pair.j,
            })
        } else {
            Ok(self.result)
        };
        Ok(WorkerReport {
            worker,
            pair,
            outcome,
        })
    }
}

fn to_wire_index(index: usize) -> Result<i32> {
    i32::try_from(index)
        .map_err(|_| R2ksError::Protocol(format!("list index {index} does not fit in 32 bits")))
}

fn from_wire_index(index: i32) -> Result<usize> {
    if index < 1 {
        return Err(R2ksError::Protocol(format!("invalid list index {index}")));
    }
    Ok(index as usize)
}

pub fn write_record<W: Write>(out: &mut W, record: &ResultRecord) -> io::Result<()> {
    out.write_all(&record.encode())
}

/// `Ok(None)` on a clean end of stream; a record cut short is an error.
pub fn read_record<R: Read>(input: &mut R) -> Result<Option<ResultRecord>> {
    let mut bytes = [0u8; RECORD_LEN];
    match fill(input, &mut bytes)? {
        0 => Ok(None),
        RECORD_LEN => Ok(Some(ResultRecord::decode(&bytes))),
        n => Err(R2ksError::Protocol(format!(
            "result record truncated after {n} of {RECORD_LEN} bytes"
        ))),
    }
}

pub fn write_chunk<W: Write>(out: &mut W, pairs: &[ListPair]) -> Result<()> {
    let count = u32::try_from(pairs.len())
        .map_err(|_| R2ksError::Protocol(format!("chunk of {} pairs is too large", pairs.len())))?;
    let mut bytes = Vec::with_capacity(4 + pairs.len() * 8);
    bytes.extend_from_slice(&count.to_le_bytes());
    for pair in pairs {
        bytes.extend_from_slice(&to_wire_index(pair.i)?.to_le_bytes());
        bytes.extend_from_slice(&to_wire_index(pair.j)?.to_le_bytes());
    }
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}

pub fn read_chunk<R: Read>(input: &mut R) -> Result<Vec<ListPair>> {
    let mut word = [0u8; 4];
    read_word(input, &mut word, "pair count")?;
    let count = u32::from_le_bytes(word) as usize;

    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        read_word(input, &mut word, "pair index")?;
        let i = from_wire_index(i32::from_le_bytes(word))?;
        read_word(input, &mut word, "pair index")?;
        let j = from_wire_index(i32::from_le_bytes(word))?;
        pairs.push(ListPair { i, j });
    }
    Ok(pairs)
}

fn read_word<R: Read>(input: &mut R, word: &mut [u8; 4], what: &str) -> Result<()> {
    if fill(input, word)? != word.len() {
        return Err(R2ksError::Protocol(format!("chunk ended before {what}")));
    }
    Ok(())
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
fn fill<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

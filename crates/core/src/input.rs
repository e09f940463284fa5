// Rank-file access. The first line holds `num_genes num_lists`; line k (1-based)
// lists the genes of list k in rank order. Lists are read on demand, one file
// open per read, so concurrent readers never share a cursor.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::{R2ksError, Result};
use crate::ranked::RankedList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub num_genes: usize,
    pub num_lists: usize,
}

impl Header {
    pub fn parse(line: &str) -> Result<Self> {
        let mut fields = line.split_ascii_whitespace();
        let mut next = |name: &str| -> Result<usize> {
            let token = fields
                .next()
                .ok_or_else(|| R2ksError::MalformedHeader(format!("missing {name}")))?;
            token.parse().map_err(|_| {
                R2ksError::MalformedHeader(format!("{name} '{token}' is not a count"))
            })
        };
        let num_genes = next("num_genes")?;
        let num_lists = next("num_lists")?;

        if num_genes == 0 {
            return Err(R2ksError::EmptyUniverse);
        }
        if num_genes > u32::MAX as usize {
            return Err(R2ksError::MalformedHeader(format!(
                "num_genes {num_genes} exceeds the supported universe size"
            )));
        }
        Ok(Self {
            num_genes,
            num_lists,
        })
    }
}

/// Where ranked lists come from. Indices are 1-based.
pub trait ListSource: Sync {
    fn header(&self) -> Header;

    fn load(&self, index: usize) -> Result<RankedList>;
}

/// Line-oriented rank file, plain or gzip-compressed (`.gz`).
#[derive(Debug, Clone)]
pub struct RankFile {
    path: PathBuf,
    header: Header,
}

impl RankFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut reader = open_reader(&path)?;
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(R2ksError::MalformedHeader("file is empty".into()));
        }
        let header = Header::parse(&line)?;
        log::debug!(
            "{}: {} genes x {} lists",
            path.display(),
            header.num_genes,
            header.num_lists
        );
        Ok(Self { path, header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ListSource for RankFile {
    fn header(&self) -> Header {
        self.header
    }

    /// Skips `index` lines, then reads exactly `num_genes` tokens from the next
    /// one. The result maps each gene to its rank position in that list.
    fn load(&self, index: usize) -> Result<RankedList> {
        let missing = |available| R2ksError::MissingList {
            list: index,
            available,
        };
        if index == 0 {
            return Err(missing(self.header.num_lists));
        }

        // the header may promise more lists than the file holds, so report
        // what was actually found
        let mut reader = open_reader(&self.path)?;
        let mut skipped = Vec::new();
        for lines in 0..index {
            skipped.clear();
            if reader.read_until(b'\n', &mut skipped)? == 0 {
                return Err(missing(lines.saturating_sub(1)));
            }
        }

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(missing(index - 1));
        }

        let num_genes = self.header.num_genes;
        let mut genes = Vec::with_capacity(num_genes);
        for token in line.split_ascii_whitespace().take(num_genes) {
            let gene = token.parse::<u64>().map_err(|_| R2ksError::InvalidToken {
                list: index,
                token: token.to_string(),
            })?;
            genes.push(gene);
        }
        if genes.len() < num_genes {
            return Err(R2ksError::Truncated {
                list: index,
                expected: num_genes,
                found: genes.len(),
            });
        }

        RankedList::from_rank_order(index, &genes)
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|source| R2ksError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(raw)))
}

/// Lists already in memory, in the form a loader hands to the scorer.
#[derive(Debug, Clone)]
pub struct InMemoryLists {
    num_genes: usize,
    lists: Vec<RankedList>,
}

impl InMemoryLists {
    pub fn new(lists: Vec<RankedList>) -> Result<Self> {
        let num_genes = lists.first().map(RankedList::len).unwrap_or(0);
        if num_genes == 0 {
            return Err(R2ksError::EmptyUniverse);
        }
        if let Some(odd) = lists.iter().find(|list| list.len() != num_genes) {
            return Err(R2ksError::LengthMismatch {
                left: num_genes,
                right: odd.len(),
            });
        }
        Ok(Self { num_genes, lists })
    }

    pub fn lists(&self) -> &[RankedList] {
        &self.lists
    }
}

impl ListSource for InMemoryLists {
    fn header(&self) -> Header {
        Header {
            num_genes: self.num_genes,
            num_lists: self.lists.len(),
        }
    }

    fn load(&self, index: usize) -> Result<RankedList> {
        index
            .checked_sub(1)
            .and_then(|at| self.lists.get(at))
            .cloned()
            .ok_or(R2ksError::MissingList {
                list: index,
                available: self.lists.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn rank_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            Header::parse("4 3\n").unwrap(),
            Header {
                num_genes: 4,
                num_lists: 3
            }
        );
        assert!(matches!(
            Header::parse("4"),
            Err(R2ksError::MalformedHeader(_))
        ));
        assert!(matches!(
            Header::parse("four 3"),
            Err(R2ksError::MalformedHeader(_))
        ));
        assert!(matches!(
            Header::parse("-1 3"),
            Err(R2ksError::MalformedHeader(_))
        ));
        assert!(matches!(Header::parse("0 3"), Err(R2ksError::EmptyUniverse)));
    }

    #[test]
    fn loads_lists_by_line() {
        let file = rank_file("3 2\n0 1 2\n2 0 1\n");
        let source = RankFile::open(file.path()).expect("header");
        assert_eq!(source.header().num_lists, 2);
        assert_eq!(source.load(1).unwrap().as_slice(), &[0, 1, 2]);
        // gene 2 first, then 0, then 1
        assert_eq!(source.load(2).unwrap().as_slice(), &[1, 2, 0]);
        assert!(matches!(
            source.load(3),
            Err(R2ksError::MissingList { list: 3, available: 2 })
        ));
        assert!(matches!(source.load(0), Err(R2ksError::MissingList { .. })));
    }

    #[test]
    fn missing_lists_report_what_the_file_holds() {
        let file = rank_file("3 4\n0 1 2\n2 0 1\n");
        let source = RankFile::open(file.path()).expect("header");
        assert_eq!(source.header().num_lists, 4);
        assert!(matches!(
            source.load(3),
            Err(R2ksError::MissingList { list: 3, available: 2 })
        ));
        assert!(matches!(
            source.load(4),
            Err(R2ksError::MissingList { list: 4, available: 2 })
        ));
        let err = source.load(3).unwrap_err().to_string();
        assert!(err.contains("holds 2 lists"), "{err}");
    }

    #[test]
    fn extra_tokens_are_not_read() {
        let file = rank_file("2 1\n1 0 9 9\n");
        let source = RankFile::open(file.path()).expect("header");
        assert_eq!(source.load(1).unwrap().as_slice(), &[1, 0]);
    }

    #[test]
    fn bad_lines_fail_their_list_only() {
        let file = rank_file("3 4\n0 1\n0 7 1\n0 x 1\n2 1 0\n");
        let source = RankFile::open(file.path()).expect("header");
        assert!(matches!(
            source.load(1),
            Err(R2ksError::Truncated { list: 1, expected: 3, found: 2 })
        ));
        assert!(matches!(
            source.load(2),
            Err(R2ksError::GeneOutOfRange { list: 2, gene: 7, .. })
        ));
        assert!(matches!(
            source.load(3),
            Err(R2ksError::InvalidToken { list: 3, .. })
        ));
        assert_eq!(source.load(4).unwrap().as_slice(), &[2, 1, 0]);
    }

    #[test]
    fn reads_gzip_input() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("lists.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"2 2\n0 1\n1 0\n").unwrap();
        encoder.finish().unwrap();

        let source = RankFile::open(&path).expect("header");
        assert_eq!(source.header().num_genes, 2);
        assert_eq!(source.load(2).unwrap().as_slice(), &[1, 0]);
    }

    #[test]
    fn empty_or_missing_files_are_fatal() {
        let file = rank_file("");
        assert!(matches!(
            RankFile::open(file.path()),
            Err(R2ksError::MalformedHeader(_))
        ));
        assert!(matches!(
            RankFile::open("/nonexistent/r2ks/lists.txt"),
            Err(R2ksError::Open { .. })
        ));
    }

    #[test]
    fn in_memory_lists_are_one_based() {
        let lists = InMemoryLists::new(vec![
            RankedList::new(vec![0, 1]).unwrap(),
            RankedList::new(vec![1, 0]).unwrap(),
        ])
        .unwrap();
        assert_eq!(lists.load(2).unwrap().as_slice(), &[1, 0]);
        assert!(lists.load(0).is_err());
        assert!(lists.load(3).is_err());
        assert!(matches!(
            InMemoryLists::new(Vec::new()),
            Err(R2ksError::EmptyUniverse)
        ));
    }
}

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use csv::{Writer, WriterBuilder};
use flate2::{write::GzEncoder, Compression};
use tar::{Builder, Header};

use crate::error::{R2ksError, Result};
use crate::score::PairResult;

/// Accepts scored pairs as they are produced.
pub trait ResultSink {
    fn emit(&mut self, result: &PairResult) -> Result<()>;
}

impl ResultSink for Vec<PairResult> {
    fn emit(&mut self, result: &PairResult) -> Result<()> {
        self.push(*result);
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn emit(&mut self, result: &PairResult) -> Result<()> {
        (**self).emit(result)
    }
}

/// Writes `<i>_<j> <score>` lines.
pub struct TextEmitter<W: Write> {
    writer: Writer<W>,
    flush_each: bool,
}

impl<W: Write> TextEmitter<W> {
    pub fn new(inner: W) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_writer(inner);
        Self {
            writer,
            flush_each: false,
        }
    }

    /// Flush after every line so a reader sees each result as it arrives.
    pub fn line_buffered(mut self) -> Self {
        self.flush_each = true;
        self
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Appends the wall-clock line and returns the underlying writer.
    pub fn finish(self, elapsed: Duration) -> Result<W> {
        let mut inner = self
            .writer
            .into_inner()
            .map_err(|err| R2ksError::Io(err.into_error()))?;
        writeln!(inner, "Wall clock time: {}", elapsed.as_secs_f64())?;
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> ResultSink for TextEmitter<W> {
    fn emit(&mut self, result: &PairResult) -> Result<()> {
        let pair = format!("{}_{}", result.i, result.j);
        let score = result.score.to_string();
        self.writer.write_record([pair.as_str(), score.as_str()])?;
        if self.flush_each {
            self.writer.flush()?;
        }
        Ok(())
    }
}

/// Destination for the result stream, chosen from the output path's suffix.
pub enum Output {
    Stdout(io::Stdout),
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    /// Buffered, then packed as the single entry of a gzip tar archive.
    Archive {
        path: PathBuf,
        entry: String,
        buffer: Vec<u8>,
    },
}

impl Output {
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout()));
        };
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("r2ks");

        if let Some(stem) = name.strip_suffix(".tar.gz") {
            // fail now rather than after scoring
            File::create(path).map_err(|source| R2ksError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            return Ok(Output::Archive {
                path: path.to_path_buf(),
                entry: format!("{stem}.txt"),
                buffer: Vec::new(),
            });
        }

        let file = File::create(path).map_err(|source| R2ksError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if name.ends_with(".gz") {
            Ok(Output::Gzip(GzEncoder::new(
                BufWriter::new(file),
                Compression::default(),
            )))
        } else {
            Ok(Output::Plain(BufWriter::new(file)))
        }
    }

    pub fn finish(self) -> Result<()> {
        match self {
            Output::Stdout(mut out) => out.flush()?,
            Output::Plain(mut out) => out.flush()?,
            Output::Gzip(enc) => {
                enc.finish()?.flush()?;
            }
            Output::Archive {
                path,
                entry,
                buffer,
            } => {
                let enc = GzEncoder::new(File::create(&path)?, Compression::default());
                let mut tar_builder = Builder::new(enc);

                let mut header = Header::new_gnu();
                header.set_size(buffer.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();

                tar_builder.append_data(&mut header, entry, &mut Cursor::new(buffer))?;
                tar_builder.into_inner()?.finish()?;
            }
        }
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(out) => out.write(buf),
            Output::Plain(out) => out.write(buf),
            Output::Gzip(out) => out.write(buf),
            Output::Archive { buffer, .. } => buffer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(out) => out.flush(),
            Output::Plain(out) => out.flush(),
            Output::Gzip(out) => out.flush(),
            Output::Archive { .. } => Ok(()),
        }
    }
}

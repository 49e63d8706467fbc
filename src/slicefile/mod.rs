//! Slice files and grouping of variants into genomic windows.
//!
//! A slice file is a, optionally gzip compressed, stream of length-delimited protocol buffer
//! messages.  The first message is a [`SliceFileHeader`], all following messages are
//! [`VcfSlice`]s.

use std::io::{BufRead, Read, Write};

use prost::Message;

use crate::{
    common::io::{open_read_maybe_gz, open_write_maybe_gz},
    model::Variant,
    pbs::{SliceFileHeader, VcfSlice},
};

/// Start of the window of `chunk_size` containing `start`.
///
/// A `chunk_size` of zero is treated as one.
pub fn window_start(start: u32, chunk_size: u32) -> u32 {
    let chunk_size = chunk_size.max(1);
    (start / chunk_size) * chunk_size
}

/// A batch of variants of one chromosome and window.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Start of the window.
    pub position: u32,
    pub variants: Vec<Variant>,
}

/// Groups a position sorted stream of variants into chunks.
#[derive(Debug)]
pub struct Chunker {
    chunk_size: u32,
    chromosome: String,
    current: Option<Chunk>,
}

impl Chunker {
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chromosome: String::new(),
            current: None,
        }
    }

    /// Add `variant`, returning the previous chunk if `variant` starts a new one.
    pub fn push(&mut self, variant: Variant) -> Option<Chunk> {
        let position = window_start(variant.start, self.chunk_size);
        let same_chunk = self.current.as_ref().map_or(false, |chunk| {
            chunk.position == position && self.chromosome == variant.chromosome
        });

        if same_chunk {
            if let Some(chunk) = self.current.as_mut() {
                chunk.variants.push(variant);
            }
            None
        } else {
            self.chromosome = variant.chromosome.clone();
            self.current.replace(Chunk {
                position,
                variants: vec![variant],
            })
        }
    }

    /// Return the last chunk, if any.
    pub fn finish(&mut self) -> Option<Chunk> {
        self.current.take()
    }
}

/// Writes a slice file.
pub struct Writer {
    inner: Box<dyn Write>,
    buf: Vec<u8>,
}

impl Writer {
    /// Create a writer on the file at `path`, gzip compressed if it ends in `.gz`, and write
    /// the `header`.
    pub fn from_path<P>(path: P, header: &SliceFileHeader) -> Result<Self, anyhow::Error>
    where
        P: AsRef<std::path::Path>,
    {
        let inner = open_write_maybe_gz(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("could not open {:?} for writing: {}", path.as_ref(), e)
        })?;
        Self::new(inner, header)
    }

    pub fn new(inner: Box<dyn Write>, header: &SliceFileHeader) -> Result<Self, anyhow::Error> {
        let mut result = Self {
            inner,
            buf: Vec::new(),
        };
        result.write_message(header)?;
        Ok(result)
    }

    /// Append one slice.
    pub fn write_slice(&mut self, slice: &VcfSlice) -> Result<(), anyhow::Error> {
        self.write_message(slice)
    }

    fn write_message<M: Message>(&mut self, message: &M) -> Result<(), anyhow::Error> {
        self.buf.clear();
        message.encode_length_delimited(&mut self.buf)?;
        self.inner.write_all(&self.buf)?;
        Ok(())
    }

    /// Flush the underlying writer; gzip streams are finished when the writer is dropped.
    pub fn flush(&mut self) -> Result<(), anyhow::Error> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Maximal length of a varint length delimiter.
const MAX_DELIMITER_LEN: usize = 10;

/// Read the next length-delimited message from `inner`, `None` at the end of input.
fn read_message<M: Message + Default>(
    inner: &mut dyn BufRead,
    buf: &mut Vec<u8>,
) -> Result<Option<M>, anyhow::Error> {
    if inner.fill_buf()?.is_empty() {
        return Ok(None);
    }

    let mut delimiter = [0u8; MAX_DELIMITER_LEN];
    let mut len = 0;
    loop {
        if len == MAX_DELIMITER_LEN {
            anyhow::bail!("invalid length delimiter");
        }
        inner.read_exact(&mut delimiter[len..=len])?;
        len += 1;
        if delimiter[len - 1] & 0x80 == 0 {
            break;
        }
    }
    let size = prost::decode_length_delimiter(&delimiter[..len])?;

    buf.clear();
    buf.resize(size, 0);
    inner.read_exact(buf)?;
    Ok(Some(M::decode(buf.as_slice())?))
}

/// Reads a slice file.
///
/// Slices are read and decoded one at a time on iteration.
pub struct Reader {
    inner: Box<dyn BufRead>,
    header: SliceFileHeader,
    buf: Vec<u8>,
    done: bool,
}

impl Reader {
    /// Open the slice file at `path`, gzip compressed if it ends in `.gz`.
    pub fn from_path<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<std::path::Path>,
    {
        let inner = open_read_maybe_gz(path.as_ref())
            .map_err(|e| anyhow::anyhow!("could not open {:?}: {}", path.as_ref(), e))?;
        Self::new(inner)
    }

    /// Create a reader on `inner` and read the header.
    pub fn new(mut inner: Box<dyn BufRead>) -> Result<Self, anyhow::Error> {
        let mut buf = Vec::new();
        let header = read_message::<SliceFileHeader>(inner.as_mut(), &mut buf)
            .map_err(|e| anyhow::anyhow!("problem decoding slice file header: {}", e))?
            .ok_or_else(|| anyhow::anyhow!("slice file header is missing"))?;
        Ok(Self {
            inner,
            header,
            buf,
            done: false,
        })
    }

    pub fn header(&self) -> &SliceFileHeader {
        &self.header
    }
}

impl Iterator for Reader {
    type Item = Result<VcfSlice, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match read_message::<VcfSlice>(self.inner.as_mut(), &mut self.buf) {
            Ok(Some(slice)) => Some(Ok(slice)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                // Stop after the first broken message.
                self.done = true;
                Some(Err(anyhow::anyhow!("problem decoding slice: {}", e)))
            }
        }
    }
}

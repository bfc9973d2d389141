use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stat {path:?}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lock {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid magic at start of file {path:?} (offset {offset})")]
    InvalidFormat { path: PathBuf, offset: u64 },

    #[error("read at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("corrupt key at offset {offset}: {source}")]
    Codec {
        offset: u64,
        #[source]
        source: CodecError,
    },

    #[error("{kind} length {len} at offset {offset} exceeds max {max}")]
    RecordTooLarge {
        offset: u64,
        kind: &'static str,
        len: u64,
        max: usize,
    },

    #[error("empty value payload at offset {offset}")]
    EmptyValue { offset: u64 },

    #[error("key at offset {offset} sorts before the previous record")]
    OutOfOrder { offset: u64 },

    #[error("not found")]
    NotFound,
}

impl Error {
    /// `true` when the key is provably absent from the segment.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub(crate) fn io(offset: u64, source: io::Error) -> Self {
        Error::Io { offset, source }
    }

    pub(crate) fn eof(offset: u64) -> Self {
        Error::Io {
            offset,
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of segment"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use std::cmp::Ordering;
use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::codec::{KeyCodec, OrderedCode};
use crate::conf::{Conf, Config};
use crate::error::{Error, Result};
use crate::io_ext::{ReadAt, read_exact_at, read_uvarint_at};

use super::{Entry, HEADER_SIZE, MAGIC, TYPE_NIL, Value};

/// Point lookups over one immutable segment.
///
/// The segment has no index, so every [`find`](SegmentReader::find) scans
/// forward from the header until it meets the key or a larger one. All reads
/// are positioned and nothing on the reader changes after
/// [`open`](SegmentReader::open), so a single reader can be shared across
/// threads and queried concurrently.
pub struct SegmentReader<F = File, C = OrderedCode>
where
    F: ReadAt,
    C: KeyCodec,
{
    source: F,
    len: u64,
    path: PathBuf,
    codec: C,
    config: Config,
}

/// Position of one record, known once its length prefixes are decoded.
#[derive(Debug, Clone, Copy)]
struct Record {
    key_offset: u64,
    key_len: u64,
    value_len: u64,
}

impl Record {
    fn value_offset(&self) -> u64 {
        self.key_offset + self.key_len
    }

    fn next_offset(&self) -> u64 {
        self.value_offset() + self.value_len
    }
}

impl SegmentReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        SegmentReader::open_with(path, &[])
    }

    pub fn open_with<P: AsRef<Path>>(path: P, conf: &[Conf]) -> Result<Self> {
        SegmentReader::open_with_codec(path, OrderedCode, conf)
    }
}

impl<C: KeyCodec> SegmentReader<File, C> {
    /// Opens the segment at `path` and checks its magic.
    ///
    /// # Errors
    ///
    /// [`Error::Open`], [`Error::Lock`] or [`Error::Stat`] when the file can't
    /// be opened, locked or sized; [`Error::InvalidFormat`] when the first
    /// eight bytes are missing or are not [`MAGIC`].
    pub fn open_with_codec<P: AsRef<Path>>(path: P, codec: C, conf: &[Conf]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = Config::from(conf);

        let file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;

        if config.lock_shared {
            // Released when the file is closed.
            FileExt::try_lock_shared(&file).map_err(|source| Error::Lock {
                path: path.clone(),
                source,
            })?;
        }

        let len = file
            .metadata()
            .map_err(|source| Error::Stat {
                path: path.clone(),
                source,
            })?
            .len();

        SegmentReader::with_config(file, len, path, codec, config)
    }
}

impl<F: ReadAt, C: KeyCodec> SegmentReader<F, C> {
    /// Wraps an already opened source of `len` bytes. `path` only labels
    /// diagnostics. [`Conf::LockShared`] has no effect here.
    pub fn from_source(
        source: F,
        len: u64,
        path: impl Into<PathBuf>,
        codec: C,
        conf: &[Conf],
    ) -> Result<Self> {
        SegmentReader::with_config(source, len, path.into(), codec, Config::from(conf))
    }

    fn with_config(source: F, len: u64, path: PathBuf, codec: C, config: Config) -> Result<Self> {
        let reader = SegmentReader {
            source,
            len,
            path,
            codec,
            config,
        };

        reader.verify_magic(0)?;
        log::debug!("opened segment {:?} ({} bytes)", reader.path, reader.len);

        Ok(reader)
    }

    /// Returns the newest record stored for `key`.
    ///
    /// A deleted key comes back as [`Value::Tombstone`] with the timestamp of
    /// the deletion.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the segment provably holds no record for
    /// `key`. Read failures, malformed keys and oversized records abort the
    /// lookup with the matching error.
    pub fn find(&self, key: &str) -> Result<Entry> {
        let mut key_buf = Vec::new();
        let mut prev_key: Option<Vec<u8>> = None;
        let mut offset = HEADER_SIZE;

        while offset < self.len {
            let record = self.record_at(offset)?;

            key_buf.resize(record.key_len as usize, 0);
            read_exact_at(&self.source, &mut key_buf, record.key_offset, self.len)?;

            if self.config.verify_order {
                check_order(&mut prev_key, &key_buf, offset)?;
            }

            let (read_key, ts) = self
                .codec
                .decode(&key_buf)
                .map_err(|source| Error::Codec {
                    offset: record.key_offset,
                    source,
                })?;

            match read_key.as_slice().cmp(key.as_bytes()) {
                Ordering::Equal => {
                    let value = self.read_value(&record)?;
                    return Ok(Entry { value, ts });
                }
                Ordering::Greater => {
                    log::trace!(
                        "{key:?} not in {:?}: passed by {:?} at {offset}",
                        self.path,
                        String::from_utf8_lossy(&read_key)
                    );
                    return Err(Error::NotFound);
                }
                Ordering::Less => {
                    offset = record.next_offset();
                    if offset > self.len {
                        return Err(Error::eof(record.value_offset()));
                    }
                }
            }
        }

        Err(Error::NotFound)
    }

    /// Like [`find`](SegmentReader::find), with an absent key as `None`.
    pub fn get(&self, key: &str) -> Result<Option<Entry>> {
        match self.find(key) {
            Ok(entry) => Ok(Some(entry)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length of the segment as seen at open time.
    pub fn file_len(&self) -> u64 {
        self.len
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn verify_magic(&self, offset: u64) -> Result<()> {
        let mut b = [0u8; 8];

        if let Err(e) = read_exact_at(&self.source, &mut b, offset, self.len) {
            log::debug!(
                "file error while verifying magic for {:?}:{offset}: {e}",
                self.path
            );
            return Err(self.invalid_format(offset));
        }

        let magic = u64::from_le_bytes(b);
        if magic != MAGIC {
            log::debug!("bad magic {magic:#018x} in {:?}:{offset}", self.path);
            return Err(self.invalid_format(offset));
        }

        Ok(())
    }

    fn invalid_format(&self, offset: u64) -> Error {
        Error::InvalidFormat {
            path: self.path.clone(),
            offset,
        }
    }

    /// Decodes the length prefixes of the record starting at `offset`.
    fn record_at(&self, offset: u64) -> Result<Record> {
        let (key_len, n) = read_uvarint_at(&self.source, offset, self.len)?;
        let (value_len, m) = read_uvarint_at(&self.source, offset + n, self.len)?;

        if key_len > self.config.max_key_size as u64 {
            return Err(Error::RecordTooLarge {
                offset,
                kind: "key",
                len: key_len,
                max: self.config.max_key_size,
            });
        }
        if value_len > self.config.max_value_size as u64 {
            return Err(Error::RecordTooLarge {
                offset,
                kind: "value",
                len: value_len,
                max: self.config.max_value_size,
            });
        }

        Ok(Record {
            key_offset: offset + n + m,
            key_len,
            value_len,
        })
    }

    fn read_value(&self, record: &Record) -> Result<Value> {
        let offset = record.value_offset();
        if record.value_len == 0 {
            return Err(Error::EmptyValue { offset });
        }

        let mut payload = vec![0u8; record.value_len as usize];
        read_exact_at(&self.source, &mut payload, offset, self.len)?;

        if payload[0] == TYPE_NIL {
            return Ok(Value::Tombstone);
        }
        payload.drain(..1);
        Ok(Value::Present(payload))
    }
}

fn check_order(prev: &mut Option<Vec<u8>>, key: &[u8], offset: u64) -> Result<()> {
    if prev.as_deref().is_some_and(|p| key < p) {
        return Err(Error::OutOfOrder { offset });
    }

    let prev = prev.get_or_insert_with(Vec::new);
    prev.clear();
    prev.extend_from_slice(key);
    Ok(())
}

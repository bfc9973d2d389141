use std::io;
use std::path::Path;

use crate::codec::{KeyCodec, OrderedCode};
use crate::io_ext::put_uvarint;

use super::{MAGIC, TYPE_BYTES, TYPE_NIL};

/// Builds segment images for tests. Records are appended as given; keeping
/// them sorted is the caller's job.
pub(crate) struct SegmentWriter<C: KeyCodec = OrderedCode> {
    buf: Vec<u8>,
    codec: C,
}

impl SegmentWriter {
    pub fn new() -> Self {
        SegmentWriter::with_codec(OrderedCode)
    }
}

impl<C: KeyCodec> SegmentWriter<C> {
    pub fn with_codec(codec: C) -> Self {
        SegmentWriter {
            buf: MAGIC.to_le_bytes().to_vec(),
            codec,
        }
    }

    pub fn put(&mut self, key: &str, ts: i64, value: &[u8]) -> &mut Self {
        let mut payload = Vec::with_capacity(value.len() + 1);
        payload.push(TYPE_BYTES);
        payload.extend_from_slice(value);

        let encoded = self.codec.encode(key, ts);
        self.record(&encoded, &payload)
    }

    pub fn delete(&mut self, key: &str, ts: i64) -> &mut Self {
        let encoded = self.codec.encode(key, ts);
        self.record(&encoded, &[TYPE_NIL])
    }

    /// Appends a record with arbitrary key bytes and payload.
    pub fn record(&mut self, encoded_key: &[u8], payload: &[u8]) -> &mut Self {
        put_uvarint(&mut self.buf, encoded_key.len() as u64);
        put_uvarint(&mut self.buf, payload.len() as u64);
        self.buf.extend_from_slice(encoded_key);
        self.buf.extend_from_slice(payload);
        self
    }

    /// Appends bytes verbatim.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, &self.buf)
    }
}

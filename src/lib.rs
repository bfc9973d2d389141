mod codec;
pub mod conf;
mod error;
mod io_ext;
mod sstable;

pub use codec::{CodecError, KeyCodec, OrderedCode};
pub use conf::{Conf, Config};
pub use error::{Error, Result};
pub use io_ext::ReadAt;
pub use sstable::reader::SegmentReader;
pub use sstable::{Entry, HEADER_SIZE, MAGIC, TYPE_BYTES, TYPE_NIL, Value};

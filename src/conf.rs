//! Reader configuration.

/// Reader configuration options
#[derive(Debug, Clone, Copy)]
pub enum Conf {
    /// Upper bound for a record's encoded key length
    MaxKeySize(usize),

    /// Upper bound for a record's value payload length (type tag included)
    MaxValueSize(usize),

    /// Fail a lookup when a record sorts before its predecessor
    VerifyOrder(bool),

    /// Hold a shared advisory lock on the segment while the reader is alive
    LockShared(bool),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub max_key_size: usize,
    pub max_value_size: usize,
    pub verify_order: bool,
    pub lock_shared: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_key_size: default::MAX_KEY_SIZE,
            max_value_size: default::MAX_VALUE_SIZE,
            verify_order: default::VERIFY_ORDER,
            lock_shared: default::LOCK_SHARED,
        }
    }
}

impl From<&[Conf]> for Config {
    fn from(conf_li: &[Conf]) -> Self {
        let mut config = Self::default();
        for &conf in conf_li {
            match conf {
                Conf::MaxKeySize(0) => log::warn!("MaxKeySize(0) ignored"),
                Conf::MaxKeySize(v) => config.max_key_size = v,
                Conf::MaxValueSize(0) => log::warn!("MaxValueSize(0) ignored"),
                Conf::MaxValueSize(v) => config.max_value_size = v,
                Conf::VerifyOrder(v) => config.verify_order = v,
                Conf::LockShared(v) => config.lock_shared = v,
            }
        }
        config
    }
}

pub mod default {
    pub const KB: usize = 1024;
    pub const MB: usize = 1024 * KB;

    pub const MAX_KEY_SIZE: usize = 64 * KB;
    pub const MAX_VALUE_SIZE: usize = 16 * MB;

    // Trust the writer's ordering unless asked otherwise.
    pub const VERIFY_ORDER: bool = false;
    pub const LOCK_SHARED: bool = false;
}

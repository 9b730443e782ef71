//! Server configuration.

use crate::fcall::{DEFAULT_MSIZE, MAX_MSIZE, MIN_MSIZE};

/// Limits applied to every connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Largest frame size a client may negotiate. Clamped to
    /// [`MIN_MSIZE`]..=[`MAX_MSIZE`].
    pub max_msize: u32,
    /// Frame ceiling before the first version exchange.
    pub initial_msize: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_msize: MAX_MSIZE,
            initial_msize: DEFAULT_MSIZE,
        }
    }
}

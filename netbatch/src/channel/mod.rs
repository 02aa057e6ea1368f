//! Channel layer: reading output off an open shell.
//!
//! Output for one exchange is whatever the channel has buffered at the
//! moment it is drained. There is no prompt detection, so a device that
//! answers slower than the settle delay has the tail of its reply picked up
//! by the next exchange instead.

mod drain;

pub use drain::{Drained, drain_available};

//! Drain-what-is-buffered output policy.

use bytes::BytesMut;

use crate::transport::{ReadState, ShellChannel};

/// Output collected by one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drained {
    /// Decoded output; invalid UTF-8 is replaced.
    pub text: String,

    /// Raw bytes read before decoding.
    pub byte_len: usize,

    /// Number of chunks the channel handed over.
    pub chunks: usize,

    /// Whether the remote end closed the channel during the drain.
    pub closed: bool,
}

/// Read chunks while the channel has data ready, then stop.
///
/// Never waits. Bytes are accumulated before decoding so multi-byte
/// characters split across chunks survive.
pub fn drain_available<S: ShellChannel + ?Sized>(shell: &mut S) -> Drained {
    let mut buffer = BytesMut::with_capacity(4096);
    let mut chunks = 0;
    let mut closed = false;

    loop {
        match shell.try_read() {
            ReadState::Data(data) => {
                buffer.extend_from_slice(&data);
                chunks += 1;
            }
            ReadState::Empty => break,
            ReadState::Closed => {
                closed = true;
                break;
            }
        }
    }

    Drained {
        text: String::from_utf8_lossy(&buffer).into_owned(),
        byte_len: buffer.len(),
        chunks,
        closed,
    }
}

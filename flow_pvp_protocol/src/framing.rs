// Length-delimited message framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by that many bytes
// of JSON. `write_message` / `read_message` move raw frames; `send_json` /
// `recv_json` add the serde step on top so callers deal in message enums.
//
// `MAX_MESSAGE_SIZE` (1 MiB) bounds the allocation a length prefix can ask
// for. The largest real message is `game_started`, whose board list is a
// few tens of kilobytes even for long rounds on 8x8 boards.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Maximum frame payload size (1 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Failure to move a typed message across a stream.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

impl FramingError {
    /// Whether the peer went away, as opposed to sending garbage.
    pub fn is_disconnect(&self) -> bool {
        match self {
            FramingError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            FramingError::Json(_) => false,
        }
    }
}

/// Write one frame: 4-byte big-endian length, then payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = u32::try_from(msg.len())
        .ok()
        .filter(|&len| len <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "message too large: {} bytes (max {MAX_MESSAGE_SIZE})",
                    msg.len()
                ),
            )
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame.
///
/// Returns `UnexpectedEof` if the stream closes before or during a frame and
/// `InvalidData` if the length prefix exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to JSON and write it as one frame.
pub fn send_json<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), FramingError> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)?;
    Ok(())
}

/// Read one frame and deserialize it.
pub fn recv_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, FramingError> {
    let bytes = read_message(reader)?;
    Ok(serde_json::from_slice(&bytes)?)
}

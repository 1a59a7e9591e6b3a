//! Length-delimited framing over a byte stream.
//!
//! Each frame is a 4-byte big-endian length prefix followed by that many
//! payload bytes. The payload is an encoded [`Envelope`](crate::Envelope),
//! but this module is format-agnostic: it moves `&[u8]` / `Vec<u8>` and
//! leaves encoding to the codec.
//!
//! Framing is what lets several messages arrive back to back on one TCP
//! stream and still decode independently — a plain `read()` may return
//! half a message or three of them, and without a prefix the receiver
//! can't tell where one JSON document ends and the next begins.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum allowed frame payload (1 MiB). Protects against unbounded
/// allocation from a malformed or hostile length prefix. A full game
/// snapshot is the largest expected payload and stays well under this.
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Writes one frame: 4-byte big-endian length, then the payload.
///
/// # Errors
/// `InvalidInput` if the payload exceeds [`MAX_FRAME_SIZE`]; otherwise
/// any I/O error from the underlying writer.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len();
    if len > MAX_FRAME_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. Returns `Ok(None)` on a clean end of stream (the
/// peer closed between frames).
///
/// # Errors
/// `UnexpectedEof` if the stream ends inside a frame, `InvalidData` if
/// the declared length exceeds [`MAX_FRAME_SIZE`], otherwise any I/O
/// error from the underlying reader.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    // Read the length prefix byte by byte so a close BEFORE a frame
    // (filled == 0) can be told apart from a close inside one.
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed inside a frame header",
            ));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

// =========================================================================
// Tests
// =========================================================================

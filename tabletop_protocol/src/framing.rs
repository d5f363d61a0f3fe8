// Length-delimited message framing over TCP.
//
// Every message on the wire is a 4-byte big-endian length prefix followed by
// a JSON payload. `write_message` / `read_message` move raw bytes;
// `write_json` / `read_json` add the serde step on top for the message enums
// in `message.rs`.
//
// `MAX_MESSAGE_SIZE` (16 MB) bounds the allocation a length prefix can
// trigger. The campaign snapshot sent on join is the largest expected
// message; asset bytes travel separately in chunks.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProtocolError;

/// Maximum allowed message size (16 MB).
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

fn too_large(kind: io::ErrorKind, len: usize) -> io::Error {
    io::Error::new(
        kind,
        format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
    )
}

/// Write a length-delimited message: 4-byte big-endian length, then payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = u32::try_from(msg.len())
        .ok()
        .filter(|&len| len <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| too_large(io::ErrorKind::InvalidInput, msg.len()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited message: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes before or during a message,
/// and `InvalidData` if the length exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE as usize {
        return Err(too_large(io::ErrorKind::InvalidData, len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to JSON and write it as one frame.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)?;
    Ok(())
}

/// Read one frame and deserialize it from JSON.
pub fn read_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let bytes = read_message(reader)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_simple_message() {
        let original = b"hello, table!";
        let mut buf = Vec::new();
        write_message(&mut buf, original).unwrap();

        let mut cursor = Cursor::new(&buf);
        let recovered = read_message(&mut cursor).unwrap();
        assert_eq!(recovered, original);
    }

    #[test]
    fn empty_message_has_zero_prefix() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"").unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; MAX_MESSAGE_SIZE as usize + 1];
        let mut buf = Vec::new();
        let err = write_message(&mut buf, &big).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_oversized_read() {
        let fake_len = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(fake_len.to_vec());
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_prefix_is_eof() {
        let mut cursor = Cursor::new(vec![0u8, 1]);
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn truncated_payload_is_eof() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"abcdef").unwrap();
        buf.truncate(7);
        let err = read_message(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn json_frames_in_sequence() {
        let mut buf = Vec::new();
        write_json(&mut buf, &vec![1, 2]).unwrap();
        write_json(&mut buf, &"two").unwrap();

        let mut cursor = Cursor::new(&buf);
        let first: Vec<i32> = read_json(&mut cursor).unwrap();
        let second: String = read_json(&mut cursor).unwrap();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, "two");
    }

    #[test]
    fn bad_json_is_reported() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"{not json").unwrap();
        let err = read_json::<_, Vec<i32>>(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
    }
}

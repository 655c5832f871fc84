//! multipart/x-mixed-replace framing for MJPEG streaming
//!
//! Every broadcast part has the exact layout:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <N>\r\n
//! \r\n
//! <N raw bytes>\r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Multipart boundary token
pub const BOUNDARY: &str = "frame";

/// Response content type for streaming clients
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Content type of each part
pub const PART_CONTENT_TYPE: &str = "image/jpeg";

/// Encode one frame as a multipart part
pub fn encode_part(payload: &[u8]) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        PART_CONTENT_TYPE,
        payload.len()
    );

    let mut buf = BytesMut::with_capacity(header.len() + payload.len() + 2);
    buf.put_slice(header.as_bytes());
    buf.put_slice(payload);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_layout() {
        let part = encode_part(b"JPEGDATA");
        assert_eq!(
            &part[..],
            &b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 8\r\n\r\nJPEGDATA\r\n"[..]
        );
    }

    #[test]
    fn test_empty_payload() {
        let part = encode_part(&[]);
        assert!(part.ends_with(b"Content-Length: 0\r\n\r\n\r\n"));
    }

    #[test]
    fn test_content_type_names_boundary() {
        assert!(STREAM_CONTENT_TYPE.ends_with(&format!("boundary={}", BOUNDARY)));
    }
}

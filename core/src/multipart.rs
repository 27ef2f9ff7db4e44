//! Minimal `multipart/form-data` writer for the media upload endpoint.
//!
//! # Design
//! The writer appends straight into a caller-owned `Vec<u8>` (the bot's
//! request buffer) and generates one boundary per body. The same boundary
//! string feeds both the body delimiters and `content_type()`, so the header
//! and the terminator can never drift apart. Part content is copied byte for
//! byte with no transfer encoding.
//!
//! Framing follows RFC 7578: `--boundary CRLF headers CRLF CRLF content`,
//! parts separated by `CRLF --boundary CRLF`, closed by
//! `CRLF --boundary-- CRLF`.

use std::io::{self, Read};

use uuid::Uuid;

pub(crate) struct MultipartWriter<'a> {
    out: &'a mut Vec<u8>,
    boundary: String,
    parts: usize,
}

impl<'a> MultipartWriter<'a> {
    pub(crate) fn new(out: &'a mut Vec<u8>) -> Self {
        Self::with_boundary(out, format!("wecombot{}", Uuid::new_v4().simple()))
    }

    pub(crate) fn with_boundary(out: &'a mut Vec<u8>, boundary: String) -> Self {
        Self {
            out,
            boundary,
            parts: 0,
        }
    }

    pub(crate) fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Append a file part and copy `content` into it. Returns the number of
    /// content bytes written.
    ///
    /// `length` is written into the `filelength` parameter as declared by the
    /// caller and is not checked against the bytes actually copied.
    pub(crate) fn write_file_part(
        &mut self,
        name: &str,
        filename: &str,
        length: u64,
        content_type: &str,
        mut content: impl Read,
    ) -> io::Result<u64> {
        self.open_part();
        self.out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"; filelength={}\r\n",
                escape_quotes(name),
                escape_quotes(filename),
                length
            )
            .as_bytes(),
        );
        self.out
            .extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        io::copy(&mut content, &mut *self.out)
    }

    /// Write the closing delimiter and return the matching `Content-Type`.
    pub(crate) fn finish(self) -> String {
        if self.parts > 0 {
            self.out.extend_from_slice(b"\r\n");
        }
        self.out.extend_from_slice(b"--");
        self.out.extend_from_slice(self.boundary.as_bytes());
        self.out.extend_from_slice(b"--\r\n");
        self.content_type()
    }

    fn open_part(&mut self) {
        if self.parts > 0 {
            self.out.extend_from_slice(b"\r\n");
        }
        self.out.extend_from_slice(b"--");
        self.out.extend_from_slice(self.boundary.as_bytes());
        self.out.extend_from_slice(b"\r\n");
        self.parts += 1;
    }
}

/// Quote-escape a header parameter value. Everything else, backslashes
/// included, is written as given. CR and LF would end the header early, so
/// they become spaces.
fn escape_quotes(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\r' | '\n' => escaped.push(' '),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary_from_header(content_type: &str) -> &str {
        content_type
            .strip_prefix("multipart/form-data; boundary=")
            .expect("multipart content type")
    }

    #[test]
    fn writes_single_part_body() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::with_boundary(&mut out, "XYZ".to_string());
        let written = writer
            .write_file_part("media", "a.txt", 5, "application/octet-stream", &b"hello"[..])
            .unwrap();
        let content_type = writer.finish();

        assert_eq!(written, 5);
        assert_eq!(content_type, "multipart/form-data; boundary=XYZ");
        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"media\"; filename=\"a.txt\"; filelength=5\r\n\
            Content-Type: application/octet-stream\r\n\
            \r\n\
            hello\r\n\
            --XYZ--\r\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn header_boundary_matches_body_terminator() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::new(&mut out);
        writer
            .write_file_part("media", "f.bin", 3, "application/octet-stream", &[1u8, 2, 3][..])
            .unwrap();
        let content_type = writer.finish();

        let boundary = boundary_from_header(&content_type);
        assert!(!boundary.is_empty());
        assert!(out.starts_with(format!("--{boundary}\r\n").as_bytes()));
        assert!(out.ends_with(format!("\r\n--{boundary}--\r\n").as_bytes()));
    }

    #[test]
    fn boundaries_are_unique_per_body() {
        let (mut a, mut b) = (Vec::new(), Vec::new());
        let first = MultipartWriter::new(&mut a).boundary().to_string();
        let second = MultipartWriter::new(&mut b).boundary().to_string();
        assert_ne!(first, second);
    }

    #[test]
    fn binary_content_is_copied_verbatim() {
        let payload: Vec<u8> = (0..=255u8).chain([b'\r', b'\n', b'-', b'-']).collect();
        let mut out = Vec::new();
        let mut writer = MultipartWriter::with_boundary(&mut out, "B".to_string());
        writer
            .write_file_part("media", "raw", payload.len() as u64, "application/octet-stream", payload.as_slice())
            .unwrap();
        writer.finish();

        let header_end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let trailer = b"\r\n--B--\r\n";
        assert_eq!(&out[header_end..out.len() - trailer.len()], payload.as_slice());
    }

    #[test]
    fn declared_length_is_not_verified() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::with_boundary(&mut out, "B".to_string());
        let written = writer
            .write_file_part("media", "x", 999, "application/octet-stream", &b"abc"[..])
            .unwrap();
        writer.finish();
        assert_eq!(written, 3);
        assert!(String::from_utf8_lossy(&out).contains("filelength=999"));
    }

    #[test]
    fn filename_quotes_are_escaped() {
        assert_eq!(escape_quotes(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_quotes("evil\r\nX-Header: 1"), "evil  X-Header: 1");
    }

    #[test]
    fn filename_backslashes_are_written_verbatim() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::with_boundary(&mut out, "B".to_string());
        writer
            .write_file_part("media", r"C:\tmp\a.txt", 1, "application/octet-stream", &b"x"[..])
            .unwrap();
        writer.finish();

        let body = String::from_utf8(out).unwrap();
        assert!(body.contains(r#"filename="C:\tmp\a.txt"; filelength=1"#), "{body}");
    }

    #[test]
    fn empty_body_still_closes() {
        let mut out = Vec::new();
        let writer = MultipartWriter::with_boundary(&mut out, "B".to_string());
        writer.finish();
        assert_eq!(out, b"--B--\r\n");
    }
}

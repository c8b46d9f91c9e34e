//! Minimal `multipart/form-data` body encoder.
//!
//! Only what the validation upload contract needs: text fields and file parts,
//! written in insertion order with a random boundary that does not occur in
//! any part.

use crate::constants::multipart::FILE_PART_CONTENT_TYPE;
use crate::errors::MillError;

enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        filename: &'a str,
        content: &'a [u8],
    },
}

/// A form under construction; parts borrow their content.
#[derive(Default)]
pub struct MultipartForm<'a> {
    parts: Vec<Part<'a>>,
}

/// An encoded form ready to send.
#[derive(Debug)]
pub struct EncodedForm {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl<'a> MultipartForm<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'a str, value: &'a str) -> Self {
        self.parts.push(Part::Text { name, value });
        self
    }

    pub fn file(mut self, name: &'a str, filename: &'a str, content: &'a [u8]) -> Self {
        self.parts.push(Part::File {
            name,
            filename,
            content,
        });
        self
    }

    /// Encode with a freshly generated boundary.
    pub fn encode(&self) -> Result<EncodedForm, MillError> {
        let boundary = loop {
            let candidate = format!("shacl-mill-{:032x}", rand::random::<u128>());
            if !self.collides(&candidate) {
                break candidate;
            }
        };
        self.encode_with_boundary(&boundary)
    }

    /// Encode with a caller-chosen boundary.
    pub fn encode_with_boundary(&self, boundary: &str) -> Result<EncodedForm, MillError> {
        if boundary.is_empty() || boundary.len() > 70 {
            return Err(MillError::RequestBuild(format!(
                "multipart boundary must be 1..=70 bytes, got {}",
                boundary.len()
            )));
        }
        if self.collides(boundary) {
            return Err(MillError::RequestBuild(
                "multipart boundary occurs inside a part".into(),
            ));
        }
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(b"--");
            body.extend_from_slice(boundary.as_bytes());
            body.extend_from_slice(b"\r\n");
            match part {
                Part::Text { name, value } => {
                    check_header_value(name)?;
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content,
                } => {
                    check_header_value(name)?;
                    check_header_value(filename)?;
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {FILE_PART_CONTENT_TYPE}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(content);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--");
        body.extend_from_slice(boundary.as_bytes());
        body.extend_from_slice(b"--\r\n");
        Ok(EncodedForm {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            body,
        })
    }

    fn collides(&self, boundary: &str) -> bool {
        let needle = boundary.as_bytes();
        self.parts.iter().any(|part| {
            let bytes = match part {
                Part::Text { value, .. } => value.as_bytes(),
                Part::File { content, .. } => *content,
            };
            bytes.windows(needle.len()).any(|window| window == needle)
        })
    }
}

fn check_header_value(value: &str) -> Result<(), MillError> {
    if value.contains(['"', '\r', '\n']) {
        return Err(MillError::RequestBuild(format!(
            "part name {value:?} contains a quote or line break"
        )));
    }
    Ok(())
}

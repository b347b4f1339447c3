//! Container layout: header lines, boundary scan and chunk sizes
//!
//! ```text
//! report.pdf                       <- file name
//! ReadOnly, Archive                <- attributes
//! 2024-02-29T23:59:58.123456789Z   <- creation time (UTC)
//! 2024-03-01T08:00:00Z             <- write time (UTC)
//! 2024-03-02T08:00:00Z             <- access time (UTC)
//!                                  <- blank line
//! 255044462D312E340A...            <- uppercase hex payload, no newline
//! ```
//!
//! The format has no length prefix. The payload starts right after the first
//! empty line (`\n\n`) found in the first [`SCAN_WINDOW`] bytes of the file.
//! A header value holding an empty line would misplace that boundary, so the
//! serializer refuses values with embedded newlines.

use std::io::{BufRead, Read, Write};
use std::path::{Component, Path};

use crate::error::{Error, Result};
use crate::metadata::{read_metadata, FileRecord};

// Container format constants
pub const NEWLINE: u8 = b'\n';
pub const HEADER_LINES: usize = 5;
pub const SCAN_WINDOW: usize = 1024;
pub const CHUNK_SIZE: usize = 2 * 1024;

const FIELD_NAMES: [&str; HEADER_LINES] =
    ["file name", "attributes", "creation time", "write time", "access time"];

/// Chunk and scan sizes used by the encoder and decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Binary bytes per chunk; the decoder reads twice as many hex bytes
    pub chunk_size: usize,
    /// How far into the container to look for the header/payload boundary
    pub scan_window: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            scan_window: SCAN_WINDOW,
        }
    }
}

impl ContainerConfig {
    /// Size of one hex chunk on the text side
    pub fn hex_chunk_size(&self) -> usize {
        self.chunk_size * 2
    }

    /// Reject sizes the chunk loops cannot make progress with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::format("chunk size must be at least 1 byte"));
        }
        Ok(())
    }
}

/// The five header fields of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Base name of the original file
    pub name: String,
    pub record: FileRecord,
}

impl Header {
    pub fn new(name: impl Into<String>, record: FileRecord) -> Self {
        Self { name: name.into(), record }
    }

    /// Build the header for `path` from its base name and filesystem metadata
    pub fn for_file(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .ok_or_else(|| Error::format(format!("'{}' has no file name", path.display())))?
            .to_str()
            .ok_or_else(|| Error::format(format!("file name of '{}' is not valid UTF-8", path.display())))?;
        Ok(Self::new(name, read_metadata(path)?))
    }

    /// Render the header: five lines plus the blank terminator, `\n` endings
    pub fn serialize(&self) -> Result<String> {
        validate_name(&self.name)?;

        let [attributes, creation, write, access] = self.record.to_fields();
        let fields: [&str; HEADER_LINES] = [&self.name, &attributes, &creation, &write, &access];

        let mut output = String::new();
        for (value, field) in fields.iter().zip(FIELD_NAMES) {
            if value.contains(['\n', '\r']) {
                return Err(Error::format(format!("{field} contains a line break")));
            }
            output.push_str(value);
            output.push(NEWLINE as char);
        }
        output.push(NEWLINE as char);

        Ok(output)
    }

    /// Serialize the header into `writer`
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.serialize()?.as_bytes())?;
        Ok(())
    }

    /// Parse the five header lines from the start of a container.
    ///
    /// Only the header lines are consumed; the payload position is found
    /// separately with [`find_payload_start`]. A trailing `\r` is dropped so
    /// CRLF headers can be inspected, but such containers have no `\n\n`
    /// boundary and do not decode.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut lines = Vec::with_capacity(HEADER_LINES);
        let mut buf = Vec::new();

        for field in FIELD_NAMES {
            buf.clear();
            if reader.read_until(NEWLINE, &mut buf)? == 0 {
                return Err(Error::format(format!(
                    "expected {HEADER_LINES} header lines, found {} (missing {field})",
                    lines.len()
                )));
            }
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            let line = String::from_utf8(buf.clone())
                .map_err(|_| Error::format(format!("{field} is not valid UTF-8")))?;
            lines.push(line);
        }

        let name = lines[0].clone();
        validate_name(&name)?;
        let record = FileRecord::from_fields(&lines[1], &lines[2], &lines[3], &lines[4])?;

        Ok(Self { name, record })
    }
}

/// Reject names that are not a single plain path component
fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain || name.contains(['/', '\\']) {
        return Err(Error::format(format!("invalid file name '{name}'")));
    }
    Ok(())
}

/// Locate the first byte of the payload.
///
/// Scans the first `window` bytes for two consecutive `\n` and returns the
/// offset just past the second one.
pub fn find_payload_start<R: Read>(reader: R, window: usize) -> Result<u64> {
    let mut head = Vec::with_capacity(window);
    reader.take(window as u64).read_to_end(&mut head)?;

    head.windows(2)
        .position(|pair| pair == [NEWLINE, NEWLINE])
        .map(|i| (i + 2) as u64)
        .ok_or_else(|| {
            Error::format(format!("no blank line ending the header within the first {window} bytes"))
        })
}

/// Fill `buf` from `reader`, stopping early only at end of input.
///
/// Returns the number of bytes read; anything shorter than `buf.len()` means
/// the input is exhausted.
pub(crate) fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

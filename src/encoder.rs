//! Binary file to hex text container

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info, trace};

use crate::container::{read_chunk, ContainerConfig, Header};
use crate::error::Result;
use crate::hex::encode_chunk_into;

/// Outcome of encoding one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Name recorded in the container header
    pub name: String,
    /// Binary bytes read from the source
    pub payload_bytes: u64,
    /// Hex characters appended after the header
    pub hex_bytes: u64,
    /// Chunks written, including the final short (possibly empty) one
    pub chunks: u64,
}

/// Encodes binary files into hex text containers
pub struct Encoder {
    config: ContainerConfig,
}

impl Encoder {
    /// Create a new encoder with the default chunk size
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Create an encoder with custom chunk sizes
    pub fn with_config(config: ContainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Encode `source` into a new container at `dest`.
    ///
    /// The header is written first (truncating `dest`), then the payload is
    /// appended chunk by chunk. On failure `dest` is left partially written.
    pub fn encode_file(&self, source: &Path, dest: &Path) -> Result<EncodeSummary> {
        self.config.validate()?;
        let header = Header::for_file(source)?;
        debug!("writing header for {} to {}", header.name, dest.display());
        header.write_to(File::create(dest)?)?;

        let input = File::open(source)?;
        let output = OpenOptions::new().append(true).open(dest)?;
        let mut writer = BufWriter::new(output);
        let (payload_bytes, chunks) = self.encode_payload(input, &mut writer)?;
        writer.flush()?;

        let summary = EncodeSummary {
            name: header.name,
            payload_bytes,
            hex_bytes: payload_bytes * 2,
            chunks,
        };
        info!(
            "encoded {} ({} bytes) into {} ({} chunks)",
            source.display(),
            summary.payload_bytes,
            dest.display(),
            summary.chunks
        );
        Ok(summary)
    }

    /// Hex-encode everything `reader` yields into `writer`.
    ///
    /// Returns the number of bytes read and the number of chunks written. The
    /// loop ends after the first chunk shorter than the chunk size, which is
    /// an empty chunk when the input is an exact multiple of it.
    pub fn encode_payload<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<(u64, u64)> {
        self.config.validate()?;
        let chunk_size = self.config.chunk_size;
        let mut data = vec![0u8; chunk_size];
        let mut hex = Vec::with_capacity(self.config.hex_chunk_size());
        let mut total = 0u64;
        let mut chunks = 0u64;

        loop {
            let n = read_chunk(&mut reader, &mut data)?;
            hex.clear();
            encode_chunk_into(&data[..n], &mut hex);
            writer.write_all(&hex)?;

            total += n as u64;
            chunks += 1;
            trace!("chunk {chunks}: {n} bytes");

            if n < chunk_size {
                break;
            }
        }

        Ok((total, chunks))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode `source` into a hex text container at `dest` with default settings
pub fn encode_to_text(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<EncodeSummary> {
    Encoder::new().encode_file(source.as_ref(), dest.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::find_payload_start;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_encode_payload_example() {
        let mut out = Vec::new();
        let (bytes, chunks) = Encoder::new().encode_payload(&[0x00u8, 0xFF, 0x1A][..], &mut out).unwrap();

        assert_eq!(out, b"00FF1A");
        assert_eq!(bytes, 3);
        assert_eq!(chunks, 1);
    }

    #[test]
    fn test_encode_payload_exact_multiple() {
        let data = vec![0xA5u8; 2 * 2048];
        let mut out = Vec::new();
        let (bytes, chunks) = Encoder::new().encode_payload(&data[..], &mut out).unwrap();

        assert_eq!(bytes, 4096);
        // Two full chunks plus the empty terminal one
        assert_eq!(chunks, 3);
        assert_eq!(out.len(), 8192);
        assert!(out.chunks(2).all(|pair| pair == b"A5"));
    }

    #[test]
    fn test_encode_payload_empty() {
        let mut out = Vec::new();
        let (bytes, chunks) = Encoder::new().encode_payload(&b""[..], &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!((bytes, chunks), (0, 1));
    }

    #[test]
    fn test_encode_payload_small_chunks() {
        let encoder = Encoder::with_config(ContainerConfig { chunk_size: 3, ..Default::default() });
        let mut out = Vec::new();
        let (_, chunks) = encoder.encode_payload(&[1u8, 2, 3, 4, 5, 6, 7][..], &mut out).unwrap();
        assert_eq!(out, b"01020304050607");
        assert_eq!(chunks, 3);
    }

    #[test]
    fn test_encode_payload_zero_chunk_size() {
        let encoder = Encoder::with_config(ContainerConfig { chunk_size: 0, ..Default::default() });
        let mut out = Vec::new();
        let err = encoder.encode_payload(&[1u8, 2, 3][..], &mut out).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_encode_file_layout() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("sample.bin");
        let dest = dir.path().join("sample.txt");
        fs::write(&source, [0x00, 0xFF, 0x1A]).unwrap();

        let summary = encode_to_text(&source, &dest).unwrap();
        assert_eq!(summary.name, "sample.bin");
        assert_eq!(summary.payload_bytes, 3);
        assert_eq!(summary.hex_bytes, 6);

        let text = fs::read(&dest).unwrap();
        let start = find_payload_start(&text[..], 1024).unwrap() as usize;
        assert_eq!(&text[start..], b"00FF1A");
        assert!(text.starts_with(b"sample.bin\n"));
        assert_eq!(text.iter().filter(|&&b| b == b'\n').count(), 6);
    }

    #[test]
    fn test_encode_file_truncates_dest() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.bin");
        let dest = dir.path().join("a.txt");
        fs::write(&source, [0x10]).unwrap();
        fs::write(&dest, vec![b'Z'; 10_000]).unwrap();

        encode_to_text(&source, &dest).unwrap();
        let text = fs::read_to_string(&dest).unwrap();
        assert!(text.ends_with("\n\n10"));
        assert!(!text.contains("ZZ"));
        assert!(text.len() < 200);
    }

    #[test]
    fn test_encode_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = encode_to_text(dir.path().join("nope"), dir.path().join("out.txt")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

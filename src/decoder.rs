//! Hex text container back to binary file

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::container::{find_payload_start, read_chunk, ContainerConfig, Header};
use crate::error::Result;
use crate::hex::decode_chunk_into;
use crate::metadata::write_metadata;

/// Outcome of decoding one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Path of the restored file
    pub path: PathBuf,
    /// Binary bytes written
    pub bytes: u64,
    /// Whether attributes and timestamps were applied
    pub metadata_restored: bool,
}

/// Decodes hex text containers back into binary files
pub struct Decoder {
    config: ContainerConfig,
    output_dir: PathBuf,
    restore_metadata: bool,
}

impl Decoder {
    /// Create a new decoder writing into the current directory
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
            output_dir: PathBuf::from("."),
            restore_metadata: true,
        }
    }

    /// Use custom chunk and scan sizes
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Directory the restored file is written to
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Whether to apply the recorded attributes and timestamps (default: true)
    pub fn with_restore_metadata(mut self, restore: bool) -> Self {
        self.restore_metadata = restore;
        self
    }

    /// Parse only the header of a container
    pub fn read_header(&self, source: &Path) -> Result<Header> {
        Header::parse(BufReader::new(File::open(source)?))
    }

    /// Restore the file stored in the container at `source`.
    ///
    /// The output name comes from the header and is resolved against the
    /// output directory. Metadata is applied only after the whole payload has
    /// been written and the output closed; a failure before that point leaves
    /// a partial file without restored metadata.
    pub fn decode_file(&self, source: &Path) -> Result<DecodeSummary> {
        self.config.validate()?;
        let header = self.read_header(source)?;
        let start = find_payload_start(File::open(source)?, self.config.scan_window)?;
        let target = self.output_dir.join(&header.name);
        debug!("payload of {} starts at byte {start}, writing {}", source.display(), target.display());

        let bytes = {
            let mut input = File::open(source)?;
            input.seek(SeekFrom::Start(start))?;
            let mut writer = BufWriter::new(File::create(&target)?);
            let bytes = self.decode_payload(input, &mut writer)?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            bytes
        };

        if self.restore_metadata {
            write_metadata(&target, &header.record)?;
            debug!("restored attributes [{}] on {}", header.record.attributes, target.display());
        }

        info!("decoded {} into {} ({bytes} bytes)", source.display(), target.display());
        Ok(DecodeSummary {
            path: target,
            bytes,
            metadata_restored: self.restore_metadata,
        })
    }

    /// Hex-decode everything `reader` yields into `writer`.
    ///
    /// Reads hex chunks twice the binary chunk size and stops after the first
    /// short one. Error offsets are relative to the start of the payload.
    pub fn decode_payload<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<u64> {
        self.config.validate()?;
        let hex_chunk_size = self.config.hex_chunk_size();
        let mut hex = vec![0u8; hex_chunk_size];
        let mut data = Vec::with_capacity(self.config.chunk_size);
        let mut offset = 0u64;
        let mut total = 0u64;

        loop {
            let n = read_chunk(&mut reader, &mut hex)?;
            data.clear();
            decode_chunk_into(&hex[..n], &mut data).map_err(|e| e.rebase(offset))?;
            writer.write_all(&data)?;

            offset += n as u64;
            total += data.len() as u64;
            trace!("chunk at {}: {n} hex bytes", offset - n as u64);

            if n < hex_chunk_size {
                break;
            }
        }

        Ok(total)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Restore the file stored in the container at `source` into the current
/// directory, with default settings
pub fn decode_to_binary(source: impl AsRef<Path>) -> Result<DecodeSummary> {
    Decoder::new().decode_file(source.as_ref())
}

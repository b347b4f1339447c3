//! # filetext
//!
//! Store a binary file as plain hex text, together with its name, attributes
//! and timestamps, and turn that text back into the original file.
//!
//! ## Container Format
//!
//! A container holds exactly one file:
//!
//! ```text
//! logo.png
//! Archive
//! 2024-02-29T23:59:58.123456789Z
//! 2024-03-01T08:00:00Z
//! 2024-03-02T08:00:00Z
//!
//! 89504E470D0A1A0A0000000D49484452...
//! ```
//!
//! Five header lines (file name, attributes, creation, write and access time
//! in UTC), one blank line, then the payload as uppercase hex with two
//! characters per byte and no separators. Lines always end in `\n`.
//!
//! ## Header Boundary
//!
//! There is no length field. The decoder finds the payload by scanning the
//! first 1024 bytes for the first empty line; a container whose header does
//! not end inside that window is rejected.
//!
//! ## Usage
//!
//! ```no_run
//! use filetext::{decode_to_binary, encode_to_text};
//!
//! encode_to_text("logo.png", "logo.txt")?;
//! // Recreates ./logo.png with its recorded timestamps
//! decode_to_binary("logo.txt")?;
//! # Ok::<(), filetext::Error>(())
//! ```
//!
//! Both operations work on whole files in fixed-size chunks and are not
//! atomic: a failure leaves the partially written output behind.

pub mod container;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod hex;
pub mod metadata;

pub use container::{find_payload_start, ContainerConfig, Header};
pub use decoder::{decode_to_binary, DecodeSummary, Decoder};
pub use encoder::{encode_to_text, EncodeSummary, Encoder};
pub use error::{Error, Result};
pub use metadata::{read_metadata, write_metadata, Attribute, Attributes, FileRecord};

//! File metadata captured in a container header
//!
//! A [`FileRecord`] holds the attribute flags and the three UTC timestamps of
//! a file. It is read from the source file by the encoder, rendered into the
//! header as text, parsed back by the decoder and applied to the restored file.
//!
//! ## Attribute mapping
//!
//! | Flag       | Read (Windows)          | Read (Unix)          | Write           |
//! |------------|-------------------------|----------------------|-----------------|
//! | `ReadOnly` | FILE_ATTRIBUTE_READONLY | permissions readonly | permissions     |
//! | `Hidden`   | FILE_ATTRIBUTE_HIDDEN   | leading `.` in name  | ignored         |
//! | `System`   | FILE_ATTRIBUTE_SYSTEM   | never set            | ignored         |
//! | `Archive`  | FILE_ATTRIBUTE_ARCHIVE  | never set            | ignored         |
//!
//! An empty set is rendered as `Normal`. Flags that cannot be applied are
//! logged at debug level and skipped.
//!
//! The remaining Windows attribute names (`Directory`, `Device`, `Temporary`,
//! `SparseFile`, `ReparsePoint`, `Compressed`, `Offline`, `NotContentIndexed`,
//! `Encrypted`, `IntegrityStream`, `NoScrubData`) show up in containers made
//! on Windows. They are accepted when parsing and dropped with a debug
//! record. Any other name is an error.

use std::fmt;
use std::fs::{self, FileTimes, OpenOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::error::{Error, Result};

/// Rendering of an empty attribute set
pub const NORMAL: &str = "Normal";

// Formats written by the Windows tool (invariant culture), read as UTC
const LEGACY_TIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %I:%M:%S %p"];

// Windows attribute names that are recognized but never carried or applied
const IGNORED_ATTRIBUTES: &[&str] = &[
    "Directory",
    "Device",
    "Temporary",
    "SparseFile",
    "ReparsePoint",
    "Compressed",
    "Offline",
    "NotContentIndexed",
    "Encrypted",
    "IntegrityStream",
    "NoScrubData",
];

/// A single file attribute flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    ReadOnly,
    Hidden,
    System,
    Archive,
}

impl Attribute {
    /// All flags, in rendering order
    pub const ALL: [Attribute; 4] = [
        Attribute::ReadOnly,
        Attribute::Hidden,
        Attribute::System,
        Attribute::Archive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::ReadOnly => "ReadOnly",
            Attribute::Hidden => "Hidden",
            Attribute::System => "System",
            Attribute::Archive => "Archive",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Attribute::ReadOnly => 0x01,
            Attribute::Hidden => 0x02,
            Attribute::System => 0x04,
            Attribute::Archive => 0x08,
        }
    }

    /// Whether this flag can be applied to a file on the current platform
    pub fn is_writable(self) -> bool {
        matches!(self, Attribute::ReadOnly)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Attribute::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::metadata(format!("unknown file attribute '{s}'")))
    }
}

/// Set of [`Attribute`] flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Attributes {
    bits: u8,
}

impl Attributes {
    /// The empty set (`Normal`)
    pub fn normal() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: Attribute) -> Self {
        self.bits |= attr.bit();
        self
    }

    pub fn contains(&self, attr: Attribute) -> bool {
        self.bits & attr.bit() != 0
    }

    pub fn is_normal(&self) -> bool {
        self.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::ALL.into_iter().filter(|a| self.contains(*a))
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        iter.into_iter().fold(Attributes::normal(), Attributes::with)
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_normal() {
            return f.write_str(NORMAL);
        }
        for (i, attr) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(attr.name())?;
        }
        Ok(())
    }
}

impl FromStr for Attributes {
    type Err = Error;

    /// Parse comma separated flag names, e.g. `ReadOnly, Archive` or `Normal`
    fn from_str(s: &str) -> Result<Self> {
        let mut attrs = Attributes::normal();
        for token in s.split(',').map(str::trim) {
            if token.is_empty() {
                return Err(Error::metadata(format!("empty attribute in '{s}'")));
            }
            if token.eq_ignore_ascii_case(NORMAL) {
                continue;
            }
            if IGNORED_ATTRIBUTES.iter().any(|name| name.eq_ignore_ascii_case(token)) {
                debug!("attribute {token} is not carried, ignored");
                continue;
            }
            attrs = attrs.with(token.parse()?);
        }
        Ok(attrs)
    }
}

/// Attribute flags and UTC timestamps of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub attributes: Attributes,
    pub creation_time: DateTime<Utc>,
    pub write_time: DateTime<Utc>,
    pub access_time: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record from its four header lines
    pub fn from_fields(attributes: &str, creation: &str, write: &str, access: &str) -> Result<Self> {
        Ok(Self {
            attributes: attributes.parse()?,
            creation_time: parse_timestamp(creation)?,
            write_time: parse_timestamp(write)?,
            access_time: parse_timestamp(access)?,
        })
    }

    /// Render the record as its four header lines, in header order
    pub fn to_fields(&self) -> [String; 4] {
        [
            self.attributes.to_string(),
            format_timestamp(&self.creation_time),
            format_timestamp(&self.write_time),
            format_timestamp(&self.access_time),
        ]
    }
}

/// Render a timestamp as RFC 3339 UTC, keeping sub-second precision
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a header timestamp.
///
/// Accepts RFC 3339 as well as the `MM/dd/yyyy HH:mm:ss` and
/// `M/d/yyyy h:mm:ss AM` forms found in older containers.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time.with_timezone(&Utc));
    }
    LEGACY_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::metadata(format!("unrecognized timestamp '{text}'")))
}

/// Read the attributes and timestamps of `path`
pub fn read_metadata(path: &Path) -> Result<FileRecord> {
    let meta = fs::metadata(path)?;
    let write_time = meta.modified()?;
    let access_time = meta.accessed()?;
    let creation_time = match meta.created() {
        Ok(time) => time,
        Err(e) => {
            debug!("creation time of {} unavailable ({e}), using write time", path.display());
            write_time
        }
    };

    Ok(FileRecord {
        attributes: read_attributes(path, &meta),
        creation_time: creation_time.into(),
        write_time: write_time.into(),
        access_time: access_time.into(),
    })
}

#[cfg(windows)]
fn read_attributes(_path: &Path, meta: &fs::Metadata) -> Attributes {
    use std::os::windows::fs::MetadataExt;

    const FLAGS: [(u32, Attribute); 4] = [
        (0x01, Attribute::ReadOnly),
        (0x02, Attribute::Hidden),
        (0x04, Attribute::System),
        (0x20, Attribute::Archive),
    ];

    let raw = meta.file_attributes();
    FLAGS
        .into_iter()
        .filter(|(bit, _)| raw & bit != 0)
        .map(|(_, attr)| attr)
        .collect()
}

#[cfg(not(windows))]
fn read_attributes(path: &Path, meta: &fs::Metadata) -> Attributes {
    let mut attrs = Attributes::normal();
    if meta.permissions().readonly() {
        attrs = attrs.with(Attribute::ReadOnly);
    }
    let dotfile = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false);
    if dotfile {
        attrs = attrs.with(Attribute::Hidden);
    }
    attrs
}

/// Apply `record` to `path`.
///
/// Must only be called once the file content is complete and its writer is
/// closed, otherwise the write and access times get overwritten. Timestamps
/// are applied first, attributes last.
pub fn write_metadata(path: &Path, record: &FileRecord) -> Result<()> {
    let times = FileTimes::new()
        .set_modified(SystemTime::from(record.write_time))
        .set_accessed(SystemTime::from(record.access_time));
    let times = with_creation_time(times, record);

    {
        let file = open_for_times(path)?;
        file.set_times(times).map_err(|e| {
            Error::metadata(format!("cannot set timestamps of {}: {e}", path.display()))
        })?;
    }

    for attr in record.attributes.iter().filter(|a| !a.is_writable()) {
        debug!("attribute {attr} cannot be applied to {}, ignored", path.display());
    }

    apply_readonly(path, record.attributes.contains(Attribute::ReadOnly))
}

// Opened without write access so files that are already read-only work too
#[cfg(unix)]
fn open_for_times(path: &Path) -> std::io::Result<fs::File> {
    OpenOptions::new().read(true).open(path)
}

#[cfg(windows)]
fn open_for_times(path: &Path) -> std::io::Result<fs::File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    OpenOptions::new().access_mode(FILE_WRITE_ATTRIBUTES).open(path)
}

#[cfg(not(any(unix, windows)))]
fn open_for_times(path: &Path) -> std::io::Result<fs::File> {
    OpenOptions::new().write(true).open(path)
}

#[cfg(windows)]
fn with_creation_time(times: FileTimes, record: &FileRecord) -> FileTimes {
    use std::os::windows::fs::FileTimesExt;

    times.set_created(SystemTime::from(record.creation_time))
}

#[cfg(not(windows))]
fn with_creation_time(times: FileTimes, record: &FileRecord) -> FileTimes {
    debug!("creation time {} not applied on this platform", format_timestamp(&record.creation_time));
    times
}

fn apply_readonly(path: &Path, readonly: bool) -> Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    if perms.readonly() == readonly {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        // Only the owner write bit is restored; group/other stay as created.
        let mode = perms.mode();
        perms.set_mode(if readonly { mode & !0o222 } else { mode | 0o200 });
    }
    #[cfg(not(unix))]
    perms.set_readonly(readonly);

    fs::set_permissions(path, perms).map_err(|e| {
        Error::metadata(format!("cannot set attributes of {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_record() -> FileRecord {
        FileRecord {
            attributes: Attributes::normal(),
            creation_time: Utc.with_ymd_and_hms(2019, 3, 14, 8, 0, 0).unwrap(),
            write_time: Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap(),
            access_time: Utc.with_ymd_and_hms(2021, 6, 7, 8, 9, 10).unwrap(),
        }
    }

    #[test]
    fn test_attributes_display() {
        assert_eq!(Attributes::normal().to_string(), "Normal");
        let attrs = Attributes::normal().with(Attribute::Archive).with(Attribute::ReadOnly);
        assert_eq!(attrs.to_string(), "ReadOnly, Archive");
    }

    #[test]
    fn test_attributes_parse() {
        assert_eq!("Normal".parse::<Attributes>().unwrap(), Attributes::normal());

        let attrs: Attributes = "archive,  READONLY".parse().unwrap();
        assert!(attrs.contains(Attribute::ReadOnly));
        assert!(attrs.contains(Attribute::Archive));
        assert!(!attrs.contains(Attribute::Hidden));
    }

    #[test]
    fn test_attributes_parse_skips_windows_only_flags() {
        let attrs: Attributes = "Archive, NotContentIndexed".parse().unwrap();
        assert_eq!(attrs, Attributes::normal().with(Attribute::Archive));

        let attrs: Attributes = "ReadOnly, Compressed, Temporary, Offline".parse().unwrap();
        assert_eq!(attrs, Attributes::normal().with(Attribute::ReadOnly));

        assert!("Encrypted".parse::<Attributes>().unwrap().is_normal());
    }

    #[test]
    fn test_attributes_parse_rejects_unknown() {
        assert!(matches!("Sticky".parse::<Attributes>(), Err(Error::Metadata(_))));
        assert!(matches!("Archive, Bogus".parse::<Attributes>(), Err(Error::Metadata(_))));
        assert!(matches!("ReadOnly,".parse::<Attributes>(), Err(Error::Metadata(_))));
        assert!(matches!("".parse::<Attributes>(), Err(Error::Metadata(_))));
    }

    #[test]
    fn test_attributes_text_roundtrip() {
        for bits in 0u8..16 {
            let attrs: Attributes = Attribute::ALL
                .into_iter()
                .enumerate()
                .filter(|(i, _)| bits & (1 << i) != 0)
                .map(|(_, a)| a)
                .collect();
            assert_eq!(attrs.to_string().parse::<Attributes>().unwrap(), attrs);
        }
    }

    #[test]
    fn test_timestamp_rfc3339_roundtrip() {
        let time = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 58).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let text = format_timestamp(&time);
        assert_eq!(text, "2024-02-29T23:59:58.123456789Z");
        assert_eq!(parse_timestamp(&text).unwrap(), time);
    }

    #[test]
    fn test_timestamp_whole_seconds() {
        let time = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(&time), "2020-01-02T03:04:05Z");
    }

    #[test]
    fn test_timestamp_offset_normalized() {
        let parsed = parse_timestamp("2020-01-02T05:04:05+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn test_timestamp_legacy_forms() {
        let expected = Utc.with_ymd_and_hms(2017, 5, 9, 14, 30, 0).unwrap();
        assert_eq!(parse_timestamp("05/09/2017 14:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("5/9/2017 2:30:00 PM").unwrap(), expected);
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(matches!(parse_timestamp("yesterday"), Err(Error::Metadata(_))));
        assert!(matches!(parse_timestamp(""), Err(Error::Metadata(_))));
    }

    #[test]
    fn test_record_fields_roundtrip() {
        let record = sample_record();
        let [a, c, w, t] = record.to_fields();
        assert_eq!(FileRecord::from_fields(&a, &c, &w, &t).unwrap(), record);
    }

    #[test]
    fn test_write_then_read_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"payload").unwrap();

        let record = sample_record();
        write_metadata(&path, &record).unwrap();

        let read = read_metadata(&path).unwrap();
        assert_eq!(read.write_time, record.write_time);
        assert_eq!(read.access_time, record.access_time);
        assert!(!read.attributes.contains(Attribute::ReadOnly));
    }

    #[test]
    fn test_readonly_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.bin");
        fs::write(&path, b"x").unwrap();

        let record = FileRecord {
            attributes: Attributes::normal().with(Attribute::ReadOnly).with(Attribute::Archive),
            ..sample_record()
        };
        write_metadata(&path, &record).unwrap();

        let read = read_metadata(&path).unwrap();
        assert!(read.attributes.contains(Attribute::ReadOnly));
        assert_eq!(read.write_time, record.write_time);

        // Clear the flag again so the temp dir can be removed everywhere
        let cleared = FileRecord { attributes: Attributes::normal(), ..record };
        apply_readonly(&path, cleared.attributes.contains(Attribute::ReadOnly)).unwrap();
        assert!(!fs::metadata(&path).unwrap().permissions().readonly());
    }

    #[cfg(unix)]
    #[test]
    fn test_dotfile_reads_as_hidden() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".profile");
        fs::write(&path, b"").unwrap();
        assert!(read_metadata(&path).unwrap().attributes.contains(Attribute::Hidden));
    }

    #[test]
    fn test_read_metadata_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_metadata(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

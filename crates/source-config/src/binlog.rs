//! Binlog file naming as used by MySQL/MariaDB (`mysql-bin.000001`).

const FILENAME_SEPARATOR: char = '.';

/// A binlog file name split into base name and sequence suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinlogFilename {
    pub base_name: String,
    pub seq: String,
}

impl BinlogFilename {
    /// Parse a binlog file name. Returns `None` unless the name is a non-empty
    /// base name, a single `.` and an all-digit suffix.
    pub fn parse(filename: &str) -> Option<Self> {
        let mut parts = filename.split(FILENAME_SEPARATOR);
        let base_name = parts.next()?;
        let seq = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if base_name.is_empty() || seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            base_name: base_name.to_string(),
            seq: seq.to_string(),
        })
    }

    /// Numeric value of the suffix.
    pub fn seq_number(&self) -> Option<u64> {
        self.seq.parse().ok()
    }
}

/// Whether `filename` follows the positional binlog naming convention.
pub fn verify_filename(filename: &str) -> bool {
    BinlogFilename::parse(filename).is_some()
}

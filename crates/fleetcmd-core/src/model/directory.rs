// ── Device directory ──
//
// Operator-maintained list of target devices and their optional payloads,
// read from `address;payload` records. Payloads are kept as raw bytes
// here; the work-item builder decides whether they are usable text.

use std::path::Path;

use bytes::Bytes;
use indexmap::IndexMap;

use crate::error::CoreError;

/// Separator between the device address and its payload in a record.
pub const FIELD_SEPARATOR: u8 = b';';

/// Ordered mapping of device address to zero or more raw payload entries.
///
/// Iteration order is first-appearance order of each address; payloads keep
/// the order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDirectory {
    devices: IndexMap<String, Vec<Bytes>>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. An empty payload registers the device without
    /// contributing a payload entry; repeated addresses accumulate.
    pub fn push_record(&mut self, address: impl Into<String>, payload: impl Into<Bytes>) {
        let payload = payload.into();
        let entries = self.devices.entry(address.into()).or_default();
        if !payload.is_empty() {
            entries.push(payload);
        }
    }

    /// Parse delimited directory text.
    ///
    /// One record per line, `address[;payload]`. Blank lines and `#` comment
    /// lines are skipped; fields are trimmed.
    pub fn parse(input: &[u8]) -> Result<Self, CoreError> {
        let mut directory = Self::new();

        for (idx, raw_line) in input.split(|b| *b == b'\n').enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim_ascii();
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }

            let (address, payload) = match line.iter().position(|b| *b == FIELD_SEPARATOR) {
                Some(pos) => (&line[..pos], &line[pos + 1..]),
                None => (line, &[][..]),
            };

            let address = std::str::from_utf8(address.trim_ascii()).map_err(|_| {
                CoreError::invalid_directory(format!("line {line_no}: address is not valid UTF-8"))
            })?;
            if address.is_empty() {
                return Err(CoreError::invalid_directory(format!(
                    "line {line_no}: empty device address"
                )));
            }

            directory.push_record(address, Bytes::copy_from_slice(payload.trim_ascii()));
        }

        Ok(directory)
    }

    /// Read and parse a directory file.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read(path).map_err(|source| CoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Devices in directory order, each with its raw payload entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bytes])> {
        self.devices
            .iter()
            .map(|(address, payloads)| (address.as_str(), payloads.as_slice()))
    }

    /// Number of distinct devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl<A, P> FromIterator<(A, P)> for DeviceDirectory
where
    A: Into<String>,
    P: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (A, P)>>(iter: I) -> Self {
        let mut directory = Self::new();
        for (address, payload) in iter {
            directory.push_record(address, payload);
        }
        directory
    }
}

/// Read a shared configuration snippet: trailing whitespace removed, blank
/// lines and `!` comment lines dropped.
pub fn parse_snippet(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim_end)
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('!')
        })
        .map(str::to_owned)
        .collect()
}

/// Read a snippet file in full.
pub fn read_snippet(path: &Path) -> Result<Vec<String>, CoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_snippet(&text))
}

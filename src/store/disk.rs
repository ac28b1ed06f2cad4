//! Disk-backed grouping store
//!
//! Releases are appended as JSON lines to an anonymous temporary file, one
//! row per release in arrival order. Only the row index (`ocid` to row
//! offsets) stays in memory; release bodies are read back one group at a time
//! when the store is drained. The operating system removes the file when the
//! store is dropped.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use super::{GroupingStore, Groups, ReleaseGroup, StoredRelease};
use crate::error::{Error, Result};

/// Location of one release row in the spill file
#[derive(Debug, Clone, Copy)]
struct Row {
    offset: u64,
    len: usize,
}

/// Grouping store that spills release bodies to a temporary file.
#[derive(Debug)]
pub struct DiskStore {
    file: BufWriter<File>,
    /// Bytes written so far; the offset of the next row
    end: u64,
    /// Set once reads have moved the file cursor away from the end
    rewind: bool,
    order: Vec<String>,
    index: HashMap<String, Vec<Row>>,
}

fn storage_error(context: &str, err: impl Display) -> Error {
    Error::Storage {
        message: format!("{}: {}", context, err),
    }
}

impl DiskStore {
    /// Create a store whose spill file lives in `dir`, or in the system
    /// temporary directory if `dir` is `None`.
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        let file = match dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
        .map_err(|err| storage_error("cannot create spill file", err))?;

        debug!(
            "created disk grouping store in {}",
            dir.map(|d| d.display().to_string())
                .unwrap_or_else(|| std::env::temp_dir().display().to_string())
        );

        Ok(Self {
            file: BufWriter::new(file),
            end: 0,
            rewind: false,
            order: Vec::new(),
            index: HashMap::new(),
        })
    }

    fn read_row(file: &mut File, row: Row) -> Result<StoredRelease> {
        let mut buf = vec![0u8; row.len];
        file.seek(SeekFrom::Start(row.offset))
            .map_err(|err| storage_error("cannot seek spill file", err))?;
        file.read_exact(&mut buf)
            .map_err(|err| storage_error("cannot read spill file", err))?;
        serde_json::from_slice(&buf).map_err(|err| storage_error("corrupt spill file row", err))
    }
}

impl GroupingStore for DiskStore {
    fn put(&mut self, ocid: &str, release: StoredRelease) -> Result<()> {
        if self.rewind {
            self.file
                .seek(SeekFrom::Start(self.end))
                .map_err(|err| storage_error("cannot seek spill file", err))?;
            self.rewind = false;
        }

        let bytes = serde_json::to_vec(&release)
            .map_err(|err| storage_error("cannot serialize release", err))?;
        self.file
            .write_all(&bytes)
            .and_then(|_| self.file.write_all(b"\n"))
            .map_err(|err| storage_error("cannot write spill file", err))?;

        let row = Row {
            offset: self.end,
            len: bytes.len(),
        };
        self.end += bytes.len() as u64 + 1;

        match self.index.get_mut(ocid) {
            Some(rows) => rows.push(row),
            None => {
                self.order.push(ocid.to_string());
                self.index.insert(ocid.to_string(), vec![row]);
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn groups(&mut self) -> Result<Groups<'_>> {
        self.file
            .flush()
            .map_err(|err| storage_error("cannot flush spill file", err))?;
        self.rewind = true;

        let order = std::mem::take(&mut self.order);
        let mut index = std::mem::take(&mut self.index);
        let file = self.file.get_mut();

        debug!("draining {} groups from spill file", order.len());

        Ok(Box::new(order.into_iter().map(move |ocid| {
            let rows = index.remove(&ocid).unwrap_or_default();
            let releases = rows
                .into_iter()
                .map(|row| Self::read_row(file, row))
                .collect::<Result<Vec<_>>>()?;
            Ok(ReleaseGroup { ocid, releases })
        })))
    }
}

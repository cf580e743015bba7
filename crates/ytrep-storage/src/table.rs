//! Incremental, slice-structured CSV tables.
//!
//! Layout under the output root:
//!
//! ```text
//! files/<key>.csv/<slice>.csv        raw download, header included (staging)
//! tables/<key>.csv/<slice>.csv       data rows only
//! tables/<key>.csv.manifest          primary key, columns, slice checksums
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};
use ytrep_core::SubscriptionKey;

use crate::{temp_path_for, write_atomic};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRecord {
    pub name: String,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    pub incremental: bool,
    pub primary_key: Vec<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub slices: Vec<SliceRecord>,
}

#[derive(Debug, Clone)]
pub struct TableStore {
    tables_dir: PathBuf,
    files_dir: PathBuf,
}

impl TableStore {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        let out_dir = out_dir.as_ref();
        Self {
            tables_dir: out_dir.join("tables"),
            files_dir: out_dir.join("files"),
        }
    }

    pub fn tables_dir(&self) -> &Path {
        &self.tables_dir
    }

    pub fn table_name(key: &SubscriptionKey) -> String {
        format!("{key}.csv")
    }

    pub fn manifest_path(&self, key: &SubscriptionKey) -> PathBuf {
        self.tables_dir
            .join(format!("{}.manifest", Self::table_name(key)))
    }

    /// Open (or create) the incremental table for `key`.
    ///
    /// Slice records from an earlier manifest are carried over; the column
    /// list is left unset until the first slice of this session is written.
    pub async fn open_table(
        &self,
        key: &SubscriptionKey,
        primary_key: Vec<String>,
    ) -> anyhow::Result<IncrementalTable> {
        let name = Self::table_name(key);
        let dir = self.tables_dir.join(&name);
        let staging_dir = self.files_dir.join(&name);
        for path in [&dir, &staging_dir] {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("creating {}", path.display()))?;
        }

        let manifest_path = self.manifest_path(key);
        let slices = match fs::read_to_string(&manifest_path).await {
            Ok(text) => match serde_json::from_str::<TableManifest>(&text) {
                Ok(manifest) => manifest.slices,
                Err(err) => {
                    warn!(path = %manifest_path.display(), error = %err, "ignoring unreadable table manifest");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Ok(IncrementalTable {
            name,
            dir,
            staging_dir,
            manifest_path,
            primary_key,
            columns: None,
            slices,
        })
    }
}

#[derive(Debug)]
pub struct IncrementalTable {
    name: String,
    dir: PathBuf,
    staging_dir: PathBuf,
    manifest_path: PathBuf,
    primary_key: Vec<String>,
    columns: Option<Vec<String>>,
    slices: Vec<SliceRecord>,
}

impl IncrementalTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn slices(&self) -> &[SliceRecord] {
        &self.slices
    }

    /// Where the raw download for `slice_name` should be placed.
    pub fn staging_path(&self, slice_name: &str) -> PathBuf {
        self.staging_dir.join(format!("{slice_name}.csv"))
    }

    pub fn slice_path(&self, slice_name: &str) -> PathBuf {
        self.dir.join(format!("{slice_name}.csv"))
    }

    /// Materialize a staged raw report as the slice `slice_name`.
    ///
    /// The header row fixes the table's columns if they are not fixed yet;
    /// later slices only have their header stripped.
    pub async fn write_slice(
        &mut self,
        slice_name: &str,
        staged: &Path,
    ) -> anyhow::Result<SliceRecord> {
        let staged = staged.to_path_buf();
        let target = self.slice_path(slice_name);
        let name = slice_name.to_string();

        let (header, record) = tokio::task::spawn_blocking(move || {
            strip_header(&staged, &target).map(|(header, sha256, bytes)| {
                (
                    header,
                    SliceRecord {
                        name,
                        sha256,
                        bytes,
                    },
                )
            })
        })
        .await
        .context("joining slice writer")??;

        if self.columns.is_none() {
            debug!(table = %self.name, columns = header.len(), "fixed table columns from first report");
            self.columns = Some(header);
        }

        self.slices.retain(|s| s.name != record.name);
        self.slices.push(record.clone());
        Ok(record)
    }

    /// Write the manifest; call once after every slice of the session is in place.
    pub async fn finalize(self) -> anyhow::Result<TableManifest> {
        let Some(columns) = self.columns else {
            bail!("table {} has no slices written in this session", self.name);
        };
        let mut slices = self.slices;
        slices.sort_by(|a, b| a.name.cmp(&b.name));
        let manifest = TableManifest {
            incremental: true,
            primary_key: self.primary_key,
            columns,
            slices,
        };
        let bytes = serde_json::to_vec_pretty(&manifest).context("serializing table manifest")?;
        write_atomic(&self.manifest_path, &bytes)
            .await
            .with_context(|| format!("writing {}", self.manifest_path.display()))?;
        Ok(manifest)
    }
}

/// Copy `raw` to `target` without its header row; returns the header, the
/// sha256 of the written body and its size.
fn strip_header(raw: &Path, target: &Path) -> anyhow::Result<(Vec<String>, String, u64)> {
    let file = File::open(raw).with_context(|| format!("opening {}", raw.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));
    let header: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading header row of {}", raw.display()))?
        .iter()
        .map(ToString::to_string)
        .collect();
    if header.is_empty() || header.iter().all(|c| c.is_empty()) {
        bail!("report {} has no header row", raw.display());
    }
    drop(reader);

    let mut source = File::open(raw).with_context(|| format!("reopening {}", raw.display()))?;
    let body_offset = header_end_offset(BufReader::new(&mut source))
        .with_context(|| format!("locating end of header in {}", raw.display()))?;
    source
        .seek(SeekFrom::Start(body_offset))
        .with_context(|| format!("seeking past header of {}", raw.display()))?;

    let temp_path = temp_path_for(target)?;
    let copy_result = (|| -> anyhow::Result<(String, u64)> {
        let mut out = File::create(&temp_path)
            .with_context(|| format!("creating {}", temp_path.display()))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        let mut written = 0u64;
        loop {
            let n = source
                .read(&mut buf)
                .with_context(|| format!("reading {}", raw.display()))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            out.write_all(&buf[..n])
                .with_context(|| format!("writing {}", temp_path.display()))?;
            written += n as u64;
        }
        out.sync_all()
            .with_context(|| format!("syncing {}", temp_path.display()))?;
        Ok((hex::encode(hasher.finalize()), written))
    })();

    let (sha256, written) = match copy_result {
        Ok(done) => done,
        Err(err) => {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }
    };
    std::fs::rename(&temp_path, target).with_context(|| {
        format!("renaming {} -> {}", temp_path.display(), target.display())
    })?;
    Ok((header, sha256, written))
}

/// Byte offset just past the header line's `\n`, ignoring newlines inside quoted names.
fn header_end_offset(reader: impl Read) -> std::io::Result<u64> {
    let mut in_quotes = false;
    let mut offset = 0u64;
    for byte in reader.bytes() {
        let byte = byte?;
        offset += 1;
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' if !in_quotes => return Ok(offset),
            _ => {}
        }
    }
    Ok(offset)
}

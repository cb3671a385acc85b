//! Rotating log file
//!
//! A file writer that rolls over once it reaches a size limit, keeping a bounded
//! set of timestamped backups next to it. Backups can be gzip-compressed and are
//! pruned by count and by age after every rotation.
//!
//! Pruning and compression run on a background thread, one per file, so writers
//! only pay for the rename.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing_subscriber::fmt::MakeWriter;

use super::config::RotationConfig;

/// Timestamp layout embedded in backup file names
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";

#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("write length {len} exceeds maximum file size {max}")]
    WriteTooLarge { len: u64, max: u64 },
    #[error("log retention worker stopped")]
    RetentionStopped,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<RotationError> for io::Error {
    fn from(e: RotationError) -> Self {
        match e {
            RotationError::Io(e) => e,
            other @ RotationError::RetentionStopped => io::Error::new(io::ErrorKind::Other, other),
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}

/// A rotated-out copy of the log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub compressed: bool,
}

enum RetentionRequest {
    /// Apply retention; failures are logged
    Run,
    /// Apply retention and send back the outcome
    Report(mpsc::Sender<Result<(), RotationError>>),
}

/// Handle to the thread that prunes and compresses backups of one file.
/// Requests are handled in order; the thread exits once every handle is gone.
#[derive(Debug, Clone)]
struct Retention {
    tx: mpsc::Sender<RetentionRequest>,
}

impl Retention {
    fn spawn(config: RotationConfig) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<RetentionRequest>();
        thread::Builder::new()
            .name("log-retention".to_string())
            .spawn(move || {
                for request in rx {
                    let result = mill(&config);
                    match request {
                        RetentionRequest::Run => {
                            if let Err(e) = result {
                                tracing::warn!(
                                    error = %e,
                                    file = %config.filename.display(),
                                    "failed to apply log retention after rotation"
                                );
                            }
                        }
                        RetentionRequest::Report(reply) => {
                            let _ = reply.send(result);
                        }
                    }
                }
            })?;
        Ok(Self { tx })
    }

    fn schedule(&self) -> bool {
        self.tx.send(RetentionRequest::Run).is_ok()
    }

    /// Queue a pass and block until it, and everything queued before it, is done
    fn run_and_wait(&self) -> Result<(), RotationError> {
        let (reply, outcome) = mpsc::channel();
        self.tx
            .send(RetentionRequest::Report(reply))
            .map_err(|_| RotationError::RetentionStopped)?;
        outcome.recv().map_err(|_| RotationError::RetentionStopped)?
    }
}

/// Size-bounded log file with timestamped backups
#[derive(Debug)]
pub struct RotatingFile {
    config: RotationConfig,
    file: Option<File>,
    size: u64,
    retention: Option<Retention>,
}

impl RotatingFile {
    /// Create a rotating file. Nothing touches the disk until the first write.
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config,
            file: None,
            size: 0,
            retention: None,
        }
    }

    /// Path of the active log file
    pub fn path(&self) -> &Path {
        &self.config.filename
    }

    /// Bytes written to the active file
    pub fn size(&self) -> u64 {
        self.size
    }

    fn max_size(&self) -> u64 {
        self.config.max_size_bytes()
    }

    /// Close the active file and start a new one, moving the old file to a backup.
    /// Returns once the retention rules have been applied.
    pub fn rotate(&mut self) -> Result<(), RotationError> {
        self.roll()?;
        self.retention()?.run_and_wait()
    }

    /// Block until retention work queued by earlier rotations has finished
    pub fn wait_for_retention(&self) -> Result<(), RotationError> {
        match &self.retention {
            Some(retention) => retention.run_and_wait(),
            None => Ok(()),
        }
    }

    /// Close the active file. The next write reopens it.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }

    fn roll(&mut self) -> Result<(), RotationError> {
        self.close()?;
        self.open_new()
    }

    /// Rotation on the write path: retention is queued, not awaited
    fn roll_over(&mut self) -> Result<(), RotationError> {
        self.roll()?;
        if !self.retention()?.schedule() {
            // Worker is gone; the next rotation starts a fresh one
            self.retention = None;
        }
        Ok(())
    }

    fn retention(&mut self) -> io::Result<Retention> {
        match &self.retention {
            Some(retention) => Ok(retention.clone()),
            None => {
                let retention = Retention::spawn(self.config.clone())?;
                self.retention = Some(retention.clone());
                Ok(retention)
            }
        }
    }

    /// Open the existing file for appending if it has room, otherwise rotate
    fn open_existing_or_new(&mut self, write_len: u64) -> Result<(), RotationError> {
        let path = self.config.filename.clone();
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.open_new(),
            Err(e) => return Err(e.into()),
        };

        if metadata.len() + write_len >= self.max_size() {
            return self.roll_over();
        }

        match OpenOptions::new().append(true).open(&path) {
            Ok(file) => {
                self.file = Some(file);
                self.size = metadata.len();
                Ok(())
            }
            // An unusable existing file is moved aside rather than failing every write
            Err(_) => self.open_new(),
        }
    }

    /// Move any existing file to a backup name and create a fresh one
    fn open_new(&mut self) -> Result<(), RotationError> {
        let path = self.config.filename.clone();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        if path.exists() {
            // Backup names must sort after every existing backup
            let mut at = Utc::now();
            if let Some(newest) = list_backups(&self.config)?.first() {
                if newest.timestamp >= at {
                    at = newest.timestamp + Duration::milliseconds(1);
                }
            }
            fs::rename(&path, unused_backup_path(&self.config, at))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        self.file = Some(file);
        self.size = 0;
        Ok(())
    }

    /// Backup path for a rotation at `at`: `<stem>-<timestamp><ext>`
    pub fn backup_path(&self, at: DateTime<Utc>) -> PathBuf {
        backup_path(&self.config, at)
    }

    /// Backups of this file, newest first
    pub fn backups(&self) -> io::Result<Vec<Backup>> {
        list_backups(&self.config)
    }
}

/// File name stem and extension (with leading dot) of the active file
fn name_parts(config: &RotationConfig) -> (String, String) {
    let path = &config.filename;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

fn log_dir(config: &RotationConfig) -> PathBuf {
    match config.filename.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn backup_path(config: &RotationConfig, at: DateTime<Utc>) -> PathBuf {
    let (stem, ext) = name_parts(config);
    let timestamp = if config.local_time {
        at.with_timezone(&Local).format(BACKUP_TIME_FORMAT).to_string()
    } else {
        at.format(BACKUP_TIME_FORMAT).to_string()
    };
    log_dir(config).join(format!("{}-{}{}", stem, timestamp, ext))
}

fn compressed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(COMPRESS_SUFFIX);
    PathBuf::from(name)
}

/// First free backup name at or after `at`, stepping by one millisecond so a
/// rename never replaces an earlier backup
fn unused_backup_path(config: &RotationConfig, mut at: DateTime<Utc>) -> PathBuf {
    loop {
        let candidate = backup_path(config, at);
        if !candidate.exists() && !compressed_path(&candidate).exists() {
            return candidate;
        }
        at = at + Duration::milliseconds(1);
    }
}

fn parse_backup_time(config: &RotationConfig, raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, BACKUP_TIME_FORMAT).ok()?;
    if config.local_time {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    } else {
        Some(Utc.from_utc_datetime(&naive))
    }
}

fn list_backups(config: &RotationConfig) -> io::Result<Vec<Backup>> {
    let dir = log_dir(config);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let (stem, ext) = name_parts(config);
    let prefix = format!("{}-", stem);
    let compressed_ext = format!("{}{}", ext, COMPRESS_SUFFIX);

    let mut backups = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = match entry.file_name().to_str() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !name.starts_with(&prefix) {
            continue;
        }

        let (rest, compressed) = if let Some(rest) = name.strip_suffix(&compressed_ext) {
            (rest, true)
        } else if let Some(rest) = name.strip_suffix(ext.as_str()) {
            (rest, false)
        } else {
            continue;
        };
        let raw = match rest.get(prefix.len()..) {
            Some(raw) => raw,
            None => continue,
        };

        if let Some(timestamp) = parse_backup_time(config, raw) {
            backups.push(Backup {
                path: entry.path(),
                timestamp,
                compressed,
            });
        }
    }

    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(backups)
}

/// Apply the retention rules: backup count, backup age, compression
fn mill(config: &RotationConfig) -> Result<(), RotationError> {
    let mut backups = list_backups(config)?;
    let mut removals = Vec::new();

    if config.max_backups > 0 && backups.len() > config.max_backups {
        removals.extend(backups.split_off(config.max_backups));
    }

    if config.max_age_days > 0 {
        let cutoff = Utc::now() - Duration::days(config.max_age_days as i64);
        let (keep, expired): (Vec<_>, Vec<_>) =
            backups.into_iter().partition(|b| b.timestamp >= cutoff);
        backups = keep;
        removals.extend(expired);
    }

    for backup in &removals {
        fs::remove_file(&backup.path)?;
    }

    if config.compress {
        for backup in backups.iter().filter(|b| !b.compressed) {
            compress_log_file(&backup.path)?;
        }
    }

    Ok(())
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let write_len = buf.len() as u64;
        if write_len > self.max_size() {
            return Err(RotationError::WriteTooLarge {
                len: write_len,
                max: self.max_size(),
            }
            .into());
        }

        if self.file.is_none() {
            self.open_existing_or_new(write_len)?;
        } else if self.size + write_len > self.max_size() {
            self.roll_over()?;
        }

        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return Err(io::Error::new(io::ErrorKind::NotFound, "log file not open")),
        };
        file.write_all(buf)?;
        self.size += write_len;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Gzip a backup next to itself and remove the original
fn compress_log_file(path: &Path) -> io::Result<()> {
    let gz_path = compressed_path(path);

    let mut source = File::open(path)?;
    let mut encoder = GzEncoder::new(File::create(&gz_path)?, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
}

/// Shared handle to a [`RotatingFile`], usable as a `tracing_subscriber` writer
#[derive(Debug, Clone)]
pub struct RotatingWriter {
    file: Arc<Mutex<RotatingFile>>,
}

fn lock_file(file: &Mutex<RotatingFile>) -> io::Result<MutexGuard<'_, RotatingFile>> {
    file.lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
}

impl RotatingWriter {
    pub fn new(config: RotationConfig) -> Self {
        Self {
            file: Arc::new(Mutex::new(RotatingFile::new(config))),
        }
    }

    /// Force a rotation of the underlying file.
    ///
    /// Only the rename happens under the file lock; the call then waits for the
    /// retention pass without blocking writers.
    pub fn rotate(&self) -> Result<(), RotationError> {
        let retention = {
            let mut file = lock_file(&self.file)?;
            file.roll()?;
            file.retention()?
        };
        retention.run_and_wait()
    }

    /// Block until queued retention work has finished
    pub fn wait_for_retention(&self) -> Result<(), RotationError> {
        let retention = lock_file(&self.file)?.retention.clone();
        match retention {
            Some(retention) => retention.run_and_wait(),
            None => Ok(()),
        }
    }
}

/// Writer handed out per record; locks the file for each write
pub struct RotatingWriterHandle {
    file: Arc<Mutex<RotatingFile>>,
}

impl Write for RotatingWriterHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_file(&self.file)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriterHandle {
            file: Arc::clone(&self.file),
        }
    }
}

//! Line tailer
//!
//! Follows one append-only log file and yields complete text lines written
//! after attachment ("from current end" - pre-existing content is never
//! replayed). The tailer polls file length instead of relying on
//! platform watch APIs; game clients flush chat lines frequently and a
//! 100 ms poll keeps latency well below human reaction time.
//!
//! Recovery behavior:
//!
//! - observed length shrinking below the read offset, or the path resolving
//!   to a different file than the open handle (rename-over), means the file
//!   was truncated or replaced: the handle is reopened and reading resumes
//!   from the new file's current end
//! - transient metadata/read errors are reported once per error streak and
//!   retried on the next poll
//! - a partial trailing line (no newline yet) is carried until the writer
//!   completes it
//!
//! Opening the file at attach time is retried a bounded number of times
//! with linear backoff, then fails; the tailer never spins silently on a
//! path that cannot be opened.

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::event::UiSender;

/// Default interval between length polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Attempts to open the file before giving up
const OPEN_RETRIES: u32 = 5;

/// Base backoff between open attempts (multiplied by the attempt number)
const OPEN_BACKOFF: Duration = Duration::from_millis(250);

/// Read chunk size per poll
const READ_CHUNK: usize = 64 * 1024;

/// Follows one file and yields appended lines
#[derive(Debug)]
pub struct LineTailer {
    path: PathBuf,
    file: File,
    /// Identity of the open handle, to notice a rename-over
    identity: Option<(u64, u64)>,
    /// Byte offset of the next read
    offset: u64,
    /// Bytes of an incomplete trailing line
    carry: Vec<u8>,
    /// Complete lines not yet handed to the caller
    ready: VecDeque<String>,
    poll_interval: Duration,
    /// True while inside an error streak, to report it only once
    in_error: bool,
    ui: UiSender,
}

impl LineTailer {
    /// Open `path` and position at its current end.
    ///
    /// Retries the open a bounded number of times with backoff before
    /// returning [`PipelineError::Open`].
    pub async fn attach(path: &Path, poll_interval: Duration, ui: UiSender) -> Result<Self> {
        let mut attempt = 1;
        let file = loop {
            match File::open(path).await {
                Ok(file) => break file,
                Err(e) if attempt < OPEN_RETRIES => {
                    warn!(
                        path = %path.display(),
                        attempt,
                        error = %e,
                        "cannot open log file yet, retrying"
                    );
                    sleep(OPEN_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(PipelineError::Open {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            }
        };

        let meta = file.metadata().await.map_err(|e| PipelineError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let offset = meta.len();

        info!(path = %path.display(), offset, "tailer attached at end of file");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            identity: file_identity(&meta),
            offset,
            carry: Vec::new(),
            ready: VecDeque::new(),
            poll_interval,
            in_error: false,
            ui,
        })
    }

    /// Yield the next appended line.
    ///
    /// Suspends while waiting for new data. Returns `None` once `cancel`
    /// fires; a line already pulled from the file is still returned first,
    /// but no further data is read after cancellation.
    pub async fn next_line(&mut self, cancel: &CancellationToken) -> Option<String> {
        loop {
            // Cancellation wins over buffered lines: the line the caller is
            // currently processing may complete, but no further line is
            // handed out after the stop signal.
            if cancel.is_cancelled() {
                return None;
            }
            if let Some(line) = self.ready.pop_front() {
                return Some(line);
            }

            if let Err(e) = self.poll_once().await {
                warn!(path = %self.path.display(), error = %e, "tail read error, will retry");
                if !self.in_error {
                    self.in_error = true;
                    self.ui
                        .status(format!("Error reading {}: {e}", self.path.display()));
                }
            } else {
                self.in_error = false;
            }

            if self.ready.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = sleep(self.poll_interval) => {}
                }
            }
        }
    }

    /// One poll: detect truncation or replacement, read any appended bytes,
    /// split lines
    async fn poll_once(&mut self) -> std::io::Result<()> {
        let meta = tokio::fs::metadata(&self.path).await?;
        let len = meta.len();

        // A rename-over leaves the old handle readable but stale; the path
        // now names a different file, whose length may well exceed the old
        // read offset. Compare identities, not just lengths.
        let swapped = self.identity.is_some() && file_identity(&meta) != self.identity;
        if len < self.offset || swapped {
            warn!(
                path = %self.path.display(),
                previous_offset = self.offset,
                current_size = len,
                "log file truncated or replaced, re-attaching at new end"
            );
            self.ui.status(format!(
                "Log file {} was truncated or replaced, resuming from its current end",
                self.path.display()
            ));
            let file = File::open(&self.path).await?;
            let meta = file.metadata().await?;
            self.offset = meta.len();
            self.identity = file_identity(&meta);
            self.file = file;
            self.carry.clear();
            return Ok(());
        }

        if len == self.offset {
            return Ok(());
        }

        let want = (len - self.offset).min(READ_CHUNK as u64) as usize;
        let mut buf = vec![0u8; want];
        self.file.seek(SeekFrom::Start(self.offset)).await?;
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        buf.truncate(n);
        self.offset += n as u64;
        self.split_lines(&buf);
        Ok(())
    }

    /// Append bytes to the carry buffer and move complete lines to `ready`
    fn split_lines(&mut self, bytes: &[u8]) {
        self.carry.extend_from_slice(bytes);
        while let Some(newline) = self.carry.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.carry.drain(..=newline).collect();
            line.pop(); // the \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            debug!(len = line.len(), "tailed line");
            self.ready.push_back(line);
        }
    }
}

/// Device/inode pair naming the file itself, independent of its path.
/// `None` on platforms without inode semantics; there only the length
/// heuristic applies.
fn file_identity(meta: &std::fs::Metadata) -> Option<(u64, u64)> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Some((meta.dev(), meta.ino()))
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        None
    }
}

#[cfg(test)]
#[path = "tailer_test.rs"]
mod tests;

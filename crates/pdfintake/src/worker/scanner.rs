use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use notify::{Config as NotifyConfig, PollWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer_opt, Config as DebouncerConfig, DebouncedEventKind};
use walkdir::WalkDir;

use crate::error::WorkerError;
use crate::sanitize::is_pdf_filename;
use crate::worker::job::Job;

/// Watches a single folder for PDF files.
pub struct DirectoryScanner {
    watch_directory: PathBuf,
}

fn is_pdf_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(is_pdf_filename)
        .unwrap_or(false)
}

/// File names already handed to the watch callback. Modifications of a known
/// file are ignored until it leaves the folder.
#[derive(Debug, Default)]
struct KnownFiles {
    names: HashSet<OsString>,
}

impl KnownFiles {
    fn seed<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Self {
        let names = paths
            .into_iter()
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect();
        Self { names }
    }

    /// True the first time `path` is seen as an existing PDF.
    fn admit(&mut self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        if path.is_file() && is_pdf_path(path) {
            self.names.insert(name.to_os_string())
        } else {
            if !path.exists() {
                self.names.remove(name);
            }
            false
        }
    }
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(watch_directory: P) -> Self {
        Self {
            watch_directory: watch_directory.as_ref().to_path_buf(),
        }
    }

    pub fn watch_directory(&self) -> &Path {
        &self.watch_directory
    }

    /// Creates the watch folder if it does not exist yet.
    pub fn ensure_directory(&self) -> Result<(), WorkerError> {
        std::fs::create_dir_all(&self.watch_directory).map_err(|e| {
            WorkerError::WatchError(format!(
                "cannot create {}: {}",
                self.watch_directory.display(),
                e
            ))
        })
    }

    /// Lists the PDFs at the top level of the folder, one path job each.
    pub fn scan(&self) -> Result<Vec<Job>, WorkerError> {
        self.ensure_directory()?;
        let mut jobs = Vec::new();

        for entry in WalkDir::new(&self.watch_directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(WorkerError::ScanFailed {
                        path: self.watch_directory.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            if is_pdf_path(path) {
                debug!("Found PDF: {}", path.display());
                jobs.push(Job::from_path(path.to_path_buf()));
            }
        }

        info!(
            "Scanned {} PDFs in {}",
            jobs.len(),
            self.watch_directory.display()
        );
        Ok(jobs)
    }

    /// Blocks, calling `callback` for every PDF created in or moved into the
    /// folder, until `shutdown` is set. PDFs present when watching starts, and
    /// later writes to a known PDF, do not trigger the callback.
    pub fn watch<F>(&self, callback: F, shutdown: Arc<AtomicBool>) -> Result<(), WorkerError>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let existing = self.scan()?;
        let mut known = KnownFiles::seed(existing.iter().filter_map(|job| job.source_path()));
        let watch_dir = self.watch_directory.clone();

        // PollWatcher works on Docker volumes and network shares
        let poll_config = NotifyConfig::default().with_poll_interval(Duration::from_secs(2));

        let debouncer_config = DebouncerConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_notify_config(poll_config);

        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer_opt::<_, PollWatcher>(debouncer_config, tx)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        info!("Watching directory: {}", watch_dir.display());

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Watch mode shutting down...");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(events)) => {
                    for event in events {
                        if !matches!(event.kind, DebouncedEventKind::Any) {
                            continue;
                        }
                        let path = &event.path;

                        if known.admit(path) {
                            info!("New PDF detected: {}", path.display());
                            callback(path.to_path_buf());
                        }
                    }
                }
                Ok(Err(errors)) => {
                    warn!("Watch error: {:?}", errors);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    continue;
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watch channel disconnected");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = DirectoryScanner::new(temp_dir.path());

        let jobs = scanner.scan().unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_scan_only_pdfs() {
        let temp_dir = TempDir::new().unwrap();

        std::fs::write(temp_dir.path().join("doc1.pdf"), b"PDF content").unwrap();
        std::fs::write(temp_dir.path().join("DOC2.PDF"), b"PDF content").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"Text content").unwrap();
        std::fs::write(temp_dir.path().join("image.png"), b"PNG content").unwrap();

        let scanner = DirectoryScanner::new(temp_dir.path());
        let jobs = scanner.scan().unwrap();

        let mut names: Vec<&str> = jobs.iter().map(|j| j.filename.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["DOC2.PDF", "doc1.pdf"]);
    }

    #[test]
    fn test_scan_ignores_subdirectories() {
        let temp_dir = TempDir::new().unwrap();

        let sub_dir = temp_dir.path().join("processed");
        std::fs::create_dir(&sub_dir).unwrap();
        std::fs::write(sub_dir.join("nested.pdf"), b"Nested").unwrap();
        std::fs::write(temp_dir.path().join("top.pdf"), b"Top").unwrap();

        let scanner = DirectoryScanner::new(temp_dir.path());
        let jobs = scanner.scan().unwrap();

        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].source_path().unwrap().ends_with("top.pdf"));
    }

    #[test]
    fn test_scan_creates_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = temp_dir.path().join("inbox");

        let scanner = DirectoryScanner::new(&inbox);
        assert!(scanner.scan().unwrap().is_empty());
        assert!(inbox.is_dir());
    }

    #[test]
    fn test_known_files_admit_each_pdf_once() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("old.pdf");
        let new = temp_dir.path().join("new.pdf");
        std::fs::write(&old, b"v1").unwrap();

        let mut known = KnownFiles::seed([old.as_path()]);

        std::fs::write(&old, b"v2").unwrap();
        assert!(!known.admit(&old));

        std::fs::write(&new, b"partial").unwrap();
        assert!(known.admit(&new));
        std::fs::write(&new, b"partial, then complete").unwrap();
        assert!(!known.admit(&new));

        std::fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();
        assert!(!known.admit(&temp_dir.path().join("notes.txt")));
    }

    #[test]
    fn test_known_files_forget_removed_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("again.pdf");
        std::fs::write(&path, b"v1").unwrap();

        let mut known = KnownFiles::default();
        assert!(known.admit(&path));

        std::fs::remove_file(&path).unwrap();
        assert!(!known.admit(&path));

        std::fs::write(&path, b"v2").unwrap();
        assert!(known.admit(&path));
    }

    #[test]
    fn test_watch_ignores_edits_to_existing_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("old.pdf");
        std::fs::write(&old, b"original").unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let watcher = {
            let dir = temp_dir.path().to_path_buf();
            let seen = Arc::clone(&seen);
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                DirectoryScanner::new(dir)
                    .watch(move |path| seen.lock().unwrap().push(path), shutdown)
                    .unwrap();
            })
        };

        std::thread::sleep(Duration::from_secs(1));
        std::fs::write(&old, b"rewritten with different content").unwrap();
        std::fs::write(temp_dir.path().join("new.pdf"), b"fresh").unwrap();
        std::thread::sleep(Duration::from_secs(6));

        shutdown.store(true, Ordering::Relaxed);
        watcher.join().unwrap();

        let seen = seen.lock().unwrap();
        let names: Vec<String> = seen
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["new.pdf".to_string()]);
    }

    #[test]
    fn test_watch_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = DirectoryScanner::new(temp_dir.path());
        let shutdown = Arc::new(AtomicBool::new(true));

        scanner.watch(|_| {}, shutdown).unwrap();
    }
}

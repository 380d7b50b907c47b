//! Batch driver: runs one independent conversion per input item, each on its
//! own thread with its own book and buffers. A failed item never stops the
//! others; the caller decides what the failures mean for exit status.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::MakeError;
use crate::job;

#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    /// (input, error message) for every item that failed.
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.total - self.failures.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Expand a batch argument into input paths: a directory yields its
/// subdirectories and zip files, a file is read as one input path per
/// non-empty, non-comment line.
pub fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>, MakeError> {
    let meta = fs::metadata(path)?;
    let mut inputs = Vec::new();

    if meta.is_dir() {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();
            if entry.file_type()?.is_dir() {
                inputs.push(entry_path);
            } else if entry_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
            {
                inputs.push(entry_path);
            }
        }
        inputs.sort();
    } else {
        let text = fs::read_to_string(path)?;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            inputs.push(PathBuf::from(line));
        }
    }
    Ok(inputs)
}

/// Convert every input, one thread per item. `on_done` is called from worker
/// threads as each item finishes, for progress reporting.
pub fn run_batch<F>(inputs: &[PathBuf], outdir: Option<&Path>, on_done: F) -> BatchReport
where
    F: Fn(&Path, Result<&Path, &MakeError>) + Sync,
{
    let failures: Mutex<Vec<(PathBuf, String)>> = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for input in inputs {
            let failures = &failures;
            let on_done = &on_done;
            scope.spawn(move || match job::make_file(input, outdir, None) {
                Ok(output) => on_done(input, Ok(output.as_path())),
                Err(err) => {
                    on_done(input, Err(&err));
                    failures
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push((input.clone(), err.to_string()));
                }
            });
        }
    });

    let mut failures = failures
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    failures.sort();
    BatchReport {
        total: inputs.len(),
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write_book(dir: &Path, title: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("book.ini"), format!("[book]\nname={}\n", title)).unwrap();
        fs::write(
            dir.join("book.html"),
            "<html><head><title>t</title></head><body><h1>A</h1><p>x</p></body></html>",
        )
        .unwrap();
    }

    #[test]
    fn directory_inputs_are_subdirs_and_zips() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("alpha")).unwrap();
        fs::create_dir(tmp.path().join("beta")).unwrap();
        fs::write(tmp.path().join("gamma.zip"), b"PK").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let inputs = collect_inputs(tmp.path()).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma.zip"]);
    }

    #[test]
    fn list_file_inputs_skip_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let list = tmp.path().join("batch.txt");
        fs::write(&list, "# comment\nbooks/one\n\nbooks/two\n").unwrap();
        let inputs = collect_inputs(&list).unwrap();
        assert_eq!(inputs, vec![PathBuf::from("books/one"), PathBuf::from("books/two")]);
    }

    #[test]
    fn failures_do_not_stop_other_items() {
        let tmp = tempfile::tempdir().unwrap();
        write_book(&tmp.path().join("good"), "Good");
        fs::create_dir(tmp.path().join("bad")).unwrap(); // no book.ini

        let outdir = tmp.path().join("out");
        fs::create_dir(&outdir).unwrap();
        let inputs = vec![tmp.path().join("good"), tmp.path().join("bad")];

        let done = AtomicUsize::new(0);
        let report = run_batch(&inputs, Some(&outdir), |_, _| {
            done.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.failures[0].0.ends_with("bad"));
        assert!(outdir.join("good.epub").exists());
    }
}

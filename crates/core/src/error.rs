/// Top-level error type. One conversion job fails with exactly one of these;
/// a failure never affects other jobs in a batch.
#[derive(Debug, thiserror::Error)]
pub enum MakeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input folder error: {0}")]
    Folder(#[from] FolderError),

    #[error("Split error: {0}")]
    Split(#[from] SplitError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Pack error: {0}")]
    Pack(#[from] PackError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Missing or unreadable reserved input files (`book.ini`, `book.html`).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Required input file '{name}' is missing or unreadable: {detail}")]
    MissingInput { name: String, detail: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    #[error("File not found in input folder: {path}")]
    NotFound { path: String },

    #[error("Malformed zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("Main document has no <{tag}> element")]
    MissingElement { tag: &'static str },

    #[error(transparent)]
    Render(#[from] std::fmt::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Render(#[from] std::fmt::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("Zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("'{path}' has no {what} tag")]
    Malformed { path: String, what: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

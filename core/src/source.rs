//! Document sources.
//!
//! A document source yields parsed value trees; the engine never touches
//! files directly. Definitions are loaded from one folder per record kind:
//! - **Parameters**: each top-level field becomes a parameter
//! - **Addons**: one add-on record per file
//! - **Actions**: one action record per file

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::UTF_8;
use loopmod_types::{EngineConfig, ParameterValue};
use thiserror::Error;

/// One parsed record file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Where the document came from (file name or a caller-chosen label)
    pub origin: String,
    pub value: ParameterValue,
}

impl Document {
    pub fn new(origin: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            origin: origin.into(),
            value: value.into(),
        }
    }
}

/// Errors that can occur while reading a source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Result of reading a source: every document that parsed, plus the
/// failures for the ones that did not.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub failures: Vec<SourceError>,
}

/// Supplies documents of one kind.
pub trait DocumentSource: Send + Sync {
    /// Read every document. Per-document failures do not abort the load.
    fn load(&self) -> LoadedDocuments;

    /// Human-readable location for log messages.
    fn describe(&self) -> String;
}

/// Reads `*.json` and `*.toml` files of a single directory in file-name order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentSource for DirectorySource {
    fn load(&self) -> LoadedDocuments {
        let mut loaded = LoadedDocuments::default();

        if !self.dir.is_dir() {
            tracing::warn!(dir = %self.dir.display(), "Definition folder not found");
            return loaded;
        }

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                loaded.failures.push(SourceError::Io {
                    path: self.dir.clone(),
                    source: e,
                });
                return loaded;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && DocumentFormat::from_path(path).is_some())
            .collect();
        // First-wins deduplication downstream depends on a stable order
        paths.sort();

        for path in paths {
            match load_file(&path) {
                Ok(document) => loaded.documents.push(document),
                Err(e) => loaded.failures.push(e),
            }
        }

        tracing::debug!(
            dir = %self.dir.display(),
            documents = loaded.documents.len(),
            failures = loaded.failures.len(),
            "Loaded definition folder"
        );
        loaded
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else {
            None
        }
    }
}

/// Load a single JSON or TOML document
pub fn load_file(path: &Path) -> Result<Document, SourceError> {
    let bytes = fs::read(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Strips a leading BOM, which serde_json would otherwise reject
    let (text, _, _) = UTF_8.decode(&bytes);

    let value = match DocumentFormat::from_path(path) {
        Some(DocumentFormat::Toml) => {
            ParameterValue::from_toml_str(&text).map_err(|e| e.to_string())
        }
        _ => ParameterValue::from_json_str(&text).map_err(|e| e.to_string()),
    }
    .map_err(|reason| SourceError::Parse {
        path: path.to_path_buf(),
        reason,
    })?;

    let origin = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Document { origin, value })
}

/// Fixed in-memory documents, for embedding hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    documents: Vec<Document>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            documents: Vec::new(),
        }
    }

    /// Add a document, named after its position when no origin is given.
    pub fn with(mut self, value: impl Into<ParameterValue>) -> Self {
        let origin = format!("{}#{}", self.label, self.documents.len());
        self.documents.push(Document::new(origin, value));
        self
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

impl DocumentSource for MemorySource {
    fn load(&self) -> LoadedDocuments {
        LoadedDocuments {
            documents: self.documents.clone(),
            failures: Vec::new(),
        }
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.label)
    }
}

/// The three definition folders of a mods root.
pub struct ModFolders {
    pub parameters: Box<dyn DocumentSource>,
    pub addons: Box<dyn DocumentSource>,
    pub actions: Box<dyn DocumentSource>,
}

impl ModFolders {
    pub fn new(
        parameters: impl DocumentSource + 'static,
        addons: impl DocumentSource + 'static,
        actions: impl DocumentSource + 'static,
    ) -> Self {
        Self {
            parameters: Box::new(parameters),
            addons: Box::new(addons),
            actions: Box::new(actions),
        }
    }

    /// Directory-backed folders as laid out by the config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            DirectorySource::new(config.parameters_dir()),
            DirectorySource::new(config.addons_dir()),
            DirectorySource::new(config.actions_dir()),
        )
    }

    /// No documents at all.
    pub fn empty() -> Self {
        Self::new(
            MemorySource::new("parameters"),
            MemorySource::new("addons"),
            MemorySource::new("actions"),
        )
    }
}

impl std::fmt::Debug for ModFolders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModFolders")
            .field("parameters", &self.parameters.describe())
            .field("addons", &self.addons.describe())
            .field("actions", &self.actions.describe())
            .finish()
    }
}

//! List alias table
//!
//! Maps short names to ClickUp ids per category. The table is a JSON file
//! (`{"lists": {"backlog": "901234"}}`) read when the resolver is opened and
//! rewritten atomically under an advisory lock on every mutation. Resolution
//! reads only the in-memory table, so an edit is visible to the very next
//! resolve.

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::RemoteId;

/// Maximum alias file size (1 MB)
pub const MAX_ALIAS_FILE_SIZE: u64 = 1024 * 1024;

/// Alias errors
#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    /// Reference is neither a raw id nor a known alias
    #[error("unknown {category} alias '{alias}'. {}", available_hint(.available))]
    UnknownAlias {
        /// Category searched
        category: AliasCategory,
        /// Reference that failed to resolve
        alias: String,
        /// Aliases defined in the category
        available: Vec<String>,
    },

    /// Alias name or target rejected
    #[error("invalid alias: {0}")]
    InvalidAlias(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Alias file exceeds the size limit
    #[error("alias file too large: {size} bytes exceeds maximum {max} bytes")]
    TableTooLarge {
        /// File size
        size: u64,
        /// Maximum size
        max: u64,
    },
}

/// Result type for alias operations
pub type AliasResult<T> = Result<T, AliasError>;

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        "No aliases configured".to_string()
    } else {
        format!("Available: {}", available.join(", "))
    }
}

/// Alias category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AliasCategory {
    /// Default lists (task containers)
    Lists,
}

impl AliasCategory {
    /// Key in the alias file
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasCategory::Lists => "lists",
        }
    }
}

impl fmt::Display for AliasCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AliasCategory::Lists => "list",
        };
        write!(f, "{s}")
    }
}

/// On-disk alias table: category key to (alias to id)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<String, BTreeMap<String, RemoteId>>);

impl AliasTable {
    /// Aliases of one category
    pub fn category(&self, category: AliasCategory) -> Option<&BTreeMap<String, RemoteId>> {
        self.0.get(category.as_str())
    }

    fn category_mut(&mut self, category: AliasCategory) -> &mut BTreeMap<String, RemoteId> {
        self.0.entry(category.as_str().to_string()).or_default()
    }

    fn lookup(&self, category: AliasCategory, alias: &str) -> Option<&RemoteId> {
        self.category(category)?.get(alias)
    }

    fn names(&self, category: AliasCategory) -> Vec<String> {
        self.category(category)
            .map(|aliases| aliases.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Resolves references to ids and edits the alias table
#[derive(Debug, Clone)]
pub struct AliasResolver {
    path: Option<PathBuf>,
    table: AliasTable,
}

impl AliasResolver {
    /// Open the table at `path`; a missing file is an empty table
    pub fn open(path: impl Into<PathBuf>) -> AliasResult<Self> {
        let path = path.into();
        let table = load_table(&path)?;
        Ok(Self {
            path: Some(path),
            table,
        })
    }

    /// Resolver over `table` that never touches disk
    pub fn in_memory(table: AliasTable) -> Self {
        Self { path: None, table }
    }

    /// Backing file, if persisted
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Resolve a reference in `category`.
    ///
    /// A reference shaped like a raw id is returned unchanged without
    /// consulting the table.
    pub fn resolve(&self, category: AliasCategory, reference: &str) -> AliasResult<RemoteId> {
        let reference = reference.trim();
        if RemoteId::is_raw_reference(reference) {
            return Ok(RemoteId::new(reference));
        }

        self.table
            .lookup(category, reference)
            .cloned()
            .ok_or_else(|| AliasError::UnknownAlias {
                category,
                alias: reference.to_string(),
                available: self.table.names(category),
            })
    }

    /// Resolve a list reference
    pub fn resolve_list(&self, reference: &str) -> AliasResult<RemoteId> {
        self.resolve(AliasCategory::Lists, reference)
    }

    /// Aliases in `category`, sorted by name
    pub fn list(&self, category: AliasCategory) -> BTreeMap<String, RemoteId> {
        self.table.category(category).cloned().unwrap_or_default()
    }

    /// Map `alias` to `id`, replacing any previous mapping. Returns the previous id.
    pub fn set(
        &mut self,
        category: AliasCategory,
        alias: &str,
        id: &str,
    ) -> AliasResult<Option<RemoteId>> {
        let alias = validate_alias(alias)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(AliasError::InvalidAlias(format!(
                "target id for '{alias}' cannot be empty"
            )));
        }

        let previous = self.mutate(|table| {
            table
                .category_mut(category)
                .insert(alias.to_string(), RemoteId::new(id))
        })?;

        info!(category = category.as_str(), alias = %alias, id = %id, "Alias set");
        Ok(previous)
    }

    /// Remove `alias`, returning the id it pointed to
    pub fn remove(&mut self, category: AliasCategory, alias: &str) -> AliasResult<RemoteId> {
        let alias = alias.trim();
        if self.table.lookup(category, alias).is_none() {
            return Err(AliasError::UnknownAlias {
                category,
                alias: alias.to_string(),
                available: self.table.names(category),
            });
        }

        let removed = self.mutate(|table| {
            let aliases = table.category_mut(category);
            let removed = aliases.remove(alias);
            if aliases.is_empty() {
                table.0.remove(category.as_str());
            }
            removed
        })?;

        // the on-disk table may have lost the alias to a concurrent writer
        let removed = removed.ok_or_else(|| AliasError::UnknownAlias {
            category,
            alias: alias.to_string(),
            available: self.table.names(category),
        })?;
        info!(category = category.as_str(), alias = %alias, "Alias removed");
        Ok(removed)
    }

    /// Apply `change` to the freshest table and persist it atomically.
    ///
    /// The file is re-read under the write lock so edits from another
    /// process are not lost; only this change overrides them.
    fn mutate<T>(&mut self, change: impl FnOnce(&mut AliasTable) -> T) -> AliasResult<T> {
        let Some(path) = self.path.clone() else {
            return Ok(change(&mut self.table));
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AliasError::IoError(e.to_string()))?;
            }
        }

        let mut lock = RwLock::new(open_lock_file(&path)?);
        let _guard = lock
            .write()
            .map_err(|e| AliasError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let mut table = read_table(&path)?;
        let result = change(&mut table);
        write_table(&path, &table)?;
        self.table = table;
        Ok(result)
    }
}

fn validate_alias(alias: &str) -> AliasResult<&str> {
    let alias = alias.trim();
    if alias.is_empty() {
        return Err(AliasError::InvalidAlias("alias cannot be empty".to_string()));
    }
    if RemoteId::is_raw_reference(alias) {
        return Err(AliasError::InvalidAlias(format!(
            "'{alias}' looks like a raw id and would never be looked up"
        )));
    }
    if alias.chars().any(char::is_whitespace) {
        return Err(AliasError::InvalidAlias(format!(
            "'{alias}' cannot contain whitespace"
        )));
    }
    Ok(alias)
}

fn open_lock_file(path: &Path) -> AliasResult<File> {
    let lock_path = path.with_extension("lock");
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| AliasError::LockError(format!("Failed to create lock file: {e}")))
}

fn load_table(path: &Path) -> AliasResult<AliasTable> {
    if !path.exists() {
        debug!(path = %path.display(), "Alias file not found, starting empty");
        return Ok(AliasTable::default());
    }

    let lock = RwLock::new(open_lock_file(path)?);
    let _guard = lock
        .read()
        .map_err(|e| AliasError::LockError(format!("Failed to acquire read lock: {e}")))?;
    read_table(path)
}

/// Read the table; caller holds the lock
fn read_table(path: &Path) -> AliasResult<AliasTable> {
    if !path.exists() {
        return Ok(AliasTable::default());
    }

    let metadata = std::fs::metadata(path).map_err(|e| AliasError::IoError(e.to_string()))?;
    if metadata.len() > MAX_ALIAS_FILE_SIZE {
        return Err(AliasError::TableTooLarge {
            size: metadata.len(),
            max: MAX_ALIAS_FILE_SIZE,
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| AliasError::IoError(e.to_string()))?;
    if contents.trim().is_empty() {
        return Ok(AliasTable::default());
    }
    serde_json::from_str(&contents).map_err(|e| AliasError::SerializationError(e.to_string()))
}

/// Write-temp-then-rename; caller holds the lock
fn write_table(path: &Path, table: &AliasTable) -> AliasResult<()> {
    let json = serde_json::to_string_pretty(table)
        .map_err(|e| AliasError::SerializationError(e.to_string()))?;

    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
        .map_err(|e| AliasError::IoError(format!("Failed to create temp file: {e}")))?;
    temp_file
        .write_all(json.as_bytes())
        .map_err(|e| AliasError::IoError(format!("Failed to write temp file: {e}")))?;
    temp_file
        .flush()
        .map_err(|e| AliasError::IoError(format!("Failed to flush temp file: {e}")))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| AliasError::IoError(format!("Failed to sync temp file: {e}")))?;
    temp_file
        .persist(path)
        .map_err(|e| AliasError::IoError(format!("Failed to persist alias file: {e}")))?;

    if let Ok(dir) = File::open(parent_dir) {
        let _ = dir.sync_all();
    }

    debug!(path = %path.display(), "Alias table written");
    Ok(())
}

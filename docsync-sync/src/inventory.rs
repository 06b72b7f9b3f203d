//! The local document tree and the remote root's entries, each keyed by
//! [`Title`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::{DirEntry, WalkDir};

use docsync_core::{PageId, SyncConfig, Title};

use crate::error::{io_err, SyncError};
use crate::fingerprint;
use crate::remote::{ChildKind, RemoteStore};

// ---------------------------------------------------------------------------
// Local
// ---------------------------------------------------------------------------

/// One markdown file, read once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDocument {
    pub title: Title,
    pub path: PathBuf,
    pub content: String,
    /// Fingerprint of the raw file bytes.
    pub digest: String,
}

impl LocalDocument {
    pub fn new(title: Title, path: PathBuf, raw: Vec<u8>) -> Self {
        let digest = fingerprint::digest(&raw);
        let content = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };
        Self {
            title,
            path,
            content,
            digest,
        }
    }
}

/// Local documents in processing order (index document first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalInventory {
    docs: Vec<LocalDocument>,
}

impl LocalInventory {
    pub fn new(docs: Vec<LocalDocument>) -> Self {
        Self { docs }
    }

    pub fn titles(&self) -> Vec<Title> {
        self.docs.iter().map(|d| d.title.clone()).collect()
    }

    pub fn get(&self, title: &Title) -> Option<&LocalDocument> {
        self.docs.iter().find(|d| &d.title == title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalDocument> {
        self.docs.iter()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Identity of the file at `path` below `root`: the relative path with `/`
/// separators and without its `.md` extension.
pub fn derive_title(root: &Path, path: &Path) -> Option<Title> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let trimmed = joined.trim_start_matches('/');
    let title = trimmed.strip_suffix(".md").unwrap_or(trimmed);
    (!title.is_empty()).then(|| Title::from(title))
}

/// `list_local_at` using the run configuration.
pub fn list_local(config: &SyncConfig) -> Result<LocalInventory, SyncError> {
    list_local_at(&config.folder, &config.ignore, &config.index_name)
}

/// Enumerate every `*.md` file under `root` in traversal order, skipping
/// hidden entries and relative paths matching `ignore`, then move the
/// document titled `index_name` (if any) to the front.
pub fn list_local_at(
    root: &Path,
    ignore: &Pattern,
    index_name: &str,
) -> Result<LocalInventory, SyncError> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    let mut docs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| SyncError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || entry.path().extension().map_or(true, |e| e != "md") {
            continue;
        }
        let Some(title) = derive_title(root, entry.path()) else {
            continue;
        };
        if ignore.matches(&format!("{title}.md")) {
            tracing::debug!(path = %entry.path().display(), "ignored");
            continue;
        }
        let raw = std::fs::read(entry.path()).map_err(|e| io_err(entry.path(), e))?;
        docs.push(LocalDocument::new(title, entry.path().to_path_buf(), raw));
    }

    if let Some(pos) = docs.iter().position(|d| d.title.as_str() == index_name) {
        let index = docs.remove(pos);
        docs.insert(0, index);
    }

    tracing::debug!(count = docs.len(), root = %root.display(), "local documents enumerated");
    Ok(LocalInventory::new(docs))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

/// A titled child of the remote root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub title: Title,
    pub id: PageId,
    pub kind: ChildKind,
}

impl RemoteEntry {
    /// The page this entry's content lives in; only child pages have one.
    pub fn page_handle(&self) -> Option<&PageId> {
        matches!(self.kind, ChildKind::Page).then_some(&self.id)
    }
}

/// Remote entries in listing order, unique by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteInventory {
    entries: Vec<RemoteEntry>,
}

impl RemoteInventory {
    /// Build from entries; later duplicates of a title are dropped.
    pub fn new(entries: Vec<RemoteEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| {
                let first = seen.insert(entry.title.clone());
                if !first {
                    tracing::warn!(title = %entry.title, id = %entry.id, "duplicate remote title ignored");
                }
                first
            })
            .collect();
        Self { entries }
    }

    pub fn titles(&self) -> Vec<Title> {
        self.entries.iter().map(|e| e.title.clone()).collect()
    }

    pub fn get(&self, title: &Title) -> Option<&RemoteEntry> {
        self.entries.iter().find(|e| &e.title == title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Retrieve the root container, then list its titled children.
///
/// Failing to retrieve the root is fatal and happens before any mutation.
pub fn list_remote<S: RemoteStore + ?Sized>(
    store: &S,
    root: &PageId,
) -> Result<RemoteInventory, SyncError> {
    store
        .retrieve_page(root)
        .map_err(|source| SyncError::RootNotFound {
            root: root.clone(),
            source,
        })?;

    let children = store
        .list_children(root)
        .map_err(|source| SyncError::RemoteInventory {
            root: root.clone(),
            source,
        })?;

    let entries = children
        .into_iter()
        .filter_map(|child| {
            let title = child.title?;
            match child.kind {
                ChildKind::Page | ChildKind::Database => Some(RemoteEntry {
                    title: Title::from(title),
                    id: child.id,
                    kind: child.kind,
                }),
                ChildKind::Content(_) => None,
            }
        })
        .collect();

    let inventory = RemoteInventory::new(entries);
    tracing::debug!(count = inventory.len(), root = %root, "remote entries listed");
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn pattern(p: &str) -> Pattern {
        Pattern::new(p).unwrap()
    }

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn title_strips_root_and_extension() {
        let root = Path::new("/docs");
        assert_eq!(
            derive_title(root, Path::new("/docs/guide/setup.md")),
            Some(Title::from("guide/setup"))
        );
        assert_eq!(
            derive_title(root, Path::new("/docs/README.md")),
            Some(Title::from("README"))
        );
        assert_eq!(derive_title(root, Path::new("/elsewhere/a.md")), None);
    }

    #[test]
    fn index_promoted_regardless_of_traversal_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "a");
        write(tmp.path(), "guide/setup.md", "s");
        write(tmp.path(), "zeta.md", "z");
        write(tmp.path(), "index.md", "i");

        let inv = list_local_at(tmp.path(), &pattern("node_modules/**"), "zeta").unwrap();
        let titles: Vec<String> = inv.titles().into_iter().map(|t| t.0).collect();
        assert_eq!(titles, vec!["zeta", "a", "guide/setup", "index"]);
    }

    #[test]
    fn only_markdown_and_not_ignored_or_hidden() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "README.md", "r");
        write(tmp.path(), "notes.txt", "n");
        write(tmp.path(), "node_modules/pkg/README.md", "dep");
        write(tmp.path(), ".github/PULL_REQUEST_TEMPLATE.md", "t");

        let inv = list_local_at(tmp.path(), &pattern("node_modules/**"), "README").unwrap();
        assert_eq!(inv.titles(), vec![Title::from("README")]);
    }

    #[test]
    fn digest_covers_raw_bytes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "line\r\n");
        let inv = list_local_at(tmp.path(), &pattern("x"), "README").unwrap();
        let doc = inv.get(&Title::from("a")).unwrap();
        assert_eq!(doc.digest, fingerprint::digest(b"line\r\n"));
        assert_eq!(doc.content, "line\r\n");
    }

    #[test]
    fn remote_duplicates_keep_first() {
        let inv = RemoteInventory::new(vec![
            RemoteEntry {
                title: Title::from("a"),
                id: PageId::from("1"),
                kind: ChildKind::Page,
            },
            RemoteEntry {
                title: Title::from("a"),
                id: PageId::from("2"),
                kind: ChildKind::Page,
            },
        ]);
        assert_eq!(inv.len(), 1);
        assert_eq!(inv.get(&Title::from("a")).unwrap().id, PageId::from("1"));
    }

    #[test]
    fn databases_have_no_page_handle() {
        let entry = RemoteEntry {
            title: Title::from("Tasks"),
            id: PageId::from("db"),
            kind: ChildKind::Database,
        };
        assert!(entry.page_handle().is_none());
    }
}

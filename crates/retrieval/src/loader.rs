//! Knowledge document loading.
//!
//! Candidates are tried in order; the first file that reads and parses wins.
//! Every failure is soft: it is logged and the next candidate is tried, and
//! when nothing works an empty document comes back so the pipeline can still
//! answer (without context).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use askfolio_config::AppConfig;
use askfolio_core::KnowledgeDocument;
use tracing::{debug, info, warn};

/// Load the first readable, parseable candidate.
pub fn load_document(candidates: &[PathBuf]) -> KnowledgeDocument {
    match load_first(candidates) {
        Some((path, doc)) => {
            info!(path = %path.display(), "Loaded knowledge base");
            doc
        }
        None => {
            warn!(
                candidates = candidates.len(),
                "No knowledge base could be loaded, continuing without context"
            );
            KnowledgeDocument::default()
        }
    }
}

fn load_first(candidates: &[PathBuf]) -> Option<(PathBuf, KnowledgeDocument)> {
    candidates
        .iter()
        .find_map(|path| read_candidate(path).map(|doc| (path.clone(), doc)))
}

fn read_candidate(path: &Path) -> Option<KnowledgeDocument> {
    if !path.exists() {
        debug!(path = %path.display(), "Knowledge candidate not present");
        return None;
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read knowledge base");
            return None;
        }
    };

    match serde_json::from_str::<KnowledgeDocument>(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Knowledge base is not valid JSON");
            None
        }
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

struct Cached {
    path: PathBuf,
    modified: Option<SystemTime>,
    /// Higher-priority candidates that did not load, with their mtimes
    /// (`None` when absent) at load time.
    shadowed: Vec<(PathBuf, Option<SystemTime>)>,
    document: Arc<KnowledgeDocument>,
}

/// Shared, optionally cached access to the knowledge document.
///
/// A cached document is reused until the winning file changes on disk
/// (its modification time moves) or disappears, or until a higher-priority
/// candidate appears or changes. Empty results are never cached, so a
/// knowledge file created after startup is picked up.
pub struct KnowledgeStore {
    candidates: Vec<PathBuf>,
    cache_enabled: bool,
    cached: RwLock<Option<Cached>>,
    disk_loads: AtomicUsize,
}

impl KnowledgeStore {
    pub fn new(candidates: Vec<PathBuf>, cache_enabled: bool) -> Self {
        Self {
            candidates,
            cache_enabled,
            cached: RwLock::new(None),
            disk_loads: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.knowledge.candidate_paths(), config.knowledge.cache)
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// How many times the candidates have been read from disk.
    pub fn disk_loads(&self) -> usize {
        self.disk_loads.load(Ordering::Relaxed)
    }

    /// The candidate that currently loads, if any. Always reads from disk.
    pub fn resolve(&self) -> Option<PathBuf> {
        load_first(&self.candidates).map(|(path, _)| path)
    }

    /// Current document; reloads when caching is off or the file changed.
    pub fn document(&self) -> Arc<KnowledgeDocument> {
        if self.cache_enabled {
            if let Some(doc) = self.fresh_cached() {
                return doc;
            }
        }

        self.disk_loads.fetch_add(1, Ordering::Relaxed);
        if !self.cache_enabled {
            return Arc::new(load_document(&self.candidates));
        }

        let Some((path, doc)) = load_first(&self.candidates) else {
            warn!(
                candidates = self.candidates.len(),
                "No knowledge base could be loaded, continuing without context"
            );
            return Arc::new(KnowledgeDocument::default());
        };

        info!(path = %path.display(), "Loaded knowledge base");
        let document = Arc::new(doc);
        if document.is_empty() {
            return document;
        }

        let shadowed = self
            .candidates
            .iter()
            .take_while(|candidate| **candidate != path)
            .map(|candidate| (candidate.clone(), modified_at(candidate)))
            .collect();

        if let Ok(mut slot) = self.cached.write() {
            *slot = Some(Cached {
                modified: modified_at(&path),
                shadowed,
                path,
                document: Arc::clone(&document),
            });
        }
        document
    }

    /// Drop the cached document; the next read goes to disk.
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.cached.write() {
            *slot = None;
        }
    }

    fn fresh_cached(&self) -> Option<Arc<KnowledgeDocument>> {
        let slot = self.cached.read().ok()?;
        let cached = slot.as_ref()?;
        if !cached.path.exists() || modified_at(&cached.path) != cached.modified {
            debug!(path = %cached.path.display(), "Knowledge base changed on disk");
            return None;
        }
        if let Some((path, _)) = cached
            .shadowed
            .iter()
            .find(|(path, modified)| modified_at(path) != *modified)
        {
            debug!(path = %path.display(), "Higher-priority knowledge candidate changed");
            return None;
        }
        Some(Arc::clone(&cached.document))
    }
}

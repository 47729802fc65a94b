//! In-memory object store for intermediate results.
//!
//! Tools that are asked not to write a file put their result here and hand
//! back an opaque `obj://<uuid>` reference. Any tool input that names a clip
//! accepts either such a reference or a file path.

use crate::clip::{Clip, Frame};
use crate::engine::MediaEngine;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use video_edit_mcp_common::error::{Error, ResolutionError, Result};

/// Scheme prefix of every object reference.
pub const REFERENCE_PREFIX: &str = "obj://";

/// Opaque handle to a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(Uuid);

impl ObjectRef {
    /// A fresh reference that names nothing until the store binds it.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", REFERENCE_PREFIX, self.0)
    }
}

impl FromStr for ObjectRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s
            .strip_prefix(REFERENCE_PREFIX)
            .ok_or_else(|| Error::validation(format!("'{}' is not an object reference", s)))?;
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|_| Error::validation(format!("malformed object reference '{}'", s)))
    }
}

/// A tool input naming a clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A media file on disk.
    Path(PathBuf),
    /// An object previously put in the store.
    Reference(ObjectRef),
}

impl Identifier {
    /// Classify a caller-supplied string.
    ///
    /// ```
    /// use video_edit_mcp::store::Identifier;
    ///
    /// assert!(matches!(Identifier::parse("clip.mp4"), Ok(Identifier::Path(_))));
    /// assert!(Identifier::parse("obj://not-a-uuid").is_err());
    /// assert!(Identifier::parse("  ").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("identifier cannot be empty"));
        }
        if trimmed.starts_with(REFERENCE_PREFIX) {
            return trimmed.parse().map(Identifier::Reference);
        }
        Ok(Identifier::Path(PathBuf::from(trimmed)))
    }

    /// Whether the clip will be opened from disk (and therefore owned by
    /// whoever loads it).
    pub fn is_path(&self) -> bool {
        matches!(self, Identifier::Path(_))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Identifier::Path(p) => Some(p),
            Identifier::Reference(_) => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Path(p) => write!(f, "{}", p.display()),
            Identifier::Reference(r) => r.fmt(f),
        }
    }
}

/// Something held by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredObject {
    Clip(Clip),
    /// Decoded frames from `extract_frames`.
    Frames(Arc<Vec<Frame>>),
}

impl StoredObject {
    fn describe(&self) -> &'static str {
        match self {
            StoredObject::Clip(_) => "a clip",
            StoredObject::Frames(_) => "a frame sequence",
        }
    }
}

impl From<Clip> for StoredObject {
    fn from(clip: Clip) -> Self {
        StoredObject::Clip(clip)
    }
}

impl From<Vec<Frame>> for StoredObject {
    fn from(frames: Vec<Frame>) -> Self {
        StoredObject::Frames(Arc::new(frames))
    }
}

#[derive(Debug, Default)]
struct Entries {
    objects: HashMap<ObjectRef, StoredObject>,
    // Insertion order, for capacity eviction.
    order: VecDeque<ObjectRef>,
}

/// Process-wide map from references to stored objects.
///
/// Unbounded unless built with [`ObjectStore::with_capacity`], in which case
/// the oldest objects are evicted first.
#[derive(Debug, Default)]
pub struct ObjectStore {
    entries: RwLock<Entries>,
    capacity: Option<usize>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that keeps at most `capacity` objects.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: RwLock::default(),
            capacity: capacity.filter(|c| *c > 0),
        }
    }

    /// Store `object` under a fresh reference.
    pub async fn store(&self, object: impl Into<StoredObject>) -> ObjectRef {
        let reference = ObjectRef::new();
        let mut entries = self.entries.write().await;
        entries.objects.insert(reference, object.into());
        entries.order.push_back(reference);

        if let Some(capacity) = self.capacity {
            while entries.objects.len() > capacity {
                let Some(oldest) = entries.order.pop_front() else {
                    break;
                };
                if entries.objects.remove(&oldest).is_some() {
                    debug!(reference = %oldest, "Evicted stored object");
                }
            }
        }
        debug!(%reference, "Stored object");
        reference
    }

    /// Look up a stored object.
    pub async fn get(&self, reference: &ObjectRef) -> Option<StoredObject> {
        self.entries.read().await.objects.get(reference).cloned()
    }

    /// Resolve `identifier` to a clip: stored clips are returned as-is,
    /// paths are opened through `engine`.
    pub async fn load(&self, identifier: &Identifier, engine: &dyn MediaEngine) -> Result<Clip> {
        match identifier {
            Identifier::Reference(reference) => match self.get(reference).await {
                Some(StoredObject::Clip(clip)) => Ok(clip),
                Some(other) => Err(ResolutionError::NotAClip {
                    reference: reference.to_string(),
                    actual: other.describe(),
                }
                .into()),
                None => Err(ResolutionError::UnknownReference(reference.to_string()).into()),
            },
            Identifier::Path(path) => engine.open(path).await,
        }
    }

    /// Drop a stored object. Returns whether it was present.
    // TODO: reclaim rendered-text artifacts once no stored graph uses them.
    pub async fn release(&self, reference: &ObjectRef) -> bool {
        let mut entries = self.entries.write().await;
        let removed = entries.objects.remove(reference).is_some();
        if removed {
            entries.order.retain(|r| r != reference);
            debug!(%reference, "Released stored object");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.objects.is_empty()
    }

    /// Every live reference, oldest first.
    pub async fn references(&self) -> Vec<ObjectRef> {
        let entries = self.entries.read().await;
        entries
            .order
            .iter()
            .filter(|r| entries.objects.contains_key(r))
            .copied()
            .collect()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

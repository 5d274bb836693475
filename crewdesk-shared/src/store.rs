/// Generic entity store
///
/// Each entity type lives in its own `Collection`, owned by exactly one
/// service. The store guarantees per-document atomicity and nothing across
/// documents or collections; cross-service consistency is the bus protocol's
/// job, not the store's.
///
/// `update_by_id` applies a mutator closure under the collection's write
/// lock, so set-add/set-remove on denormalized ID lists never loses a
/// concurrent update to the same document.
///
/// A change-notification hook fires after every insert/update/remove. It is
/// a cache-invalidation side channel: hooks must be cheap and must not call
/// back into the store.
///
/// # Example
///
/// ```
/// use crewdesk_shared::store::{Collection, Entity};
/// use uuid::Uuid;
///
/// #[derive(Debug, Clone)]
/// struct Note { id: Uuid, text: String }
///
/// impl Entity for Note {
///     fn id(&self) -> Uuid { self.id }
/// }
///
/// # async fn example() {
/// let notes: Collection<Note> = Collection::new("notes");
/// let note = notes.insert(Note { id: Uuid::new_v4(), text: "hi".into() }).await;
/// assert!(notes.find_by_id(note.id).await.is_some());
/// # }
/// ```
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A stored document with a unique ID
pub trait Entity: Clone + Send + Sync + 'static {
    /// Unique document ID
    fn id(&self) -> Uuid;
}

/// What a change notification describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Document was inserted
    Inserted,

    /// Document was updated in place
    Updated,

    /// Document was removed
    Removed,
}

/// Change-notification callback, invoked after the write completes
pub type ChangeHook<T> = Arc<dyn Fn(ChangeKind, &T) + Send + Sync>;

/// In-memory collection of one entity type
///
/// Backed by `RwLock<HashMap<Uuid, T>>`; strongly consistent per document,
/// no cross-collection transactions.
pub struct Collection<T: Entity> {
    name: &'static str,
    docs: RwLock<HashMap<Uuid, T>>,
    hooks: std::sync::RwLock<Vec<ChangeHook<T>>>,
}

impl<T: Entity> Collection<T> {
    /// Creates an empty collection
    pub fn new(name: &'static str) -> Self {
        Collection {
            name,
            docs: RwLock::new(HashMap::new()),
            hooks: std::sync::RwLock::new(Vec::new()),
        }
    }

    /// Collection name (for logging)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers a change-notification hook
    pub fn on_change(&self, hook: ChangeHook<T>) {
        self.hooks
            .write()
            .expect("change hook lock poisoned")
            .push(hook);
    }

    /// Finds a document by ID
    pub async fn find_by_id(&self, id: Uuid) -> Option<T> {
        self.docs.read().await.get(&id).cloned()
    }

    /// Finds the first document matching the filter
    ///
    /// Iteration order is unspecified; callers use this for unique-field
    /// lookups (email, organisation name) where at most one document matches.
    pub async fn find_one<F>(&self, filter: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.docs.read().await.values().find(|d| filter(d)).cloned()
    }

    /// Finds all documents matching the filter
    pub async fn find<F>(&self, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.docs
            .read()
            .await
            .values()
            .filter(|d| filter(d))
            .cloned()
            .collect()
    }

    /// Inserts a document and returns it
    pub async fn insert(&self, doc: T) -> T {
        let id = doc.id();
        self.docs.write().await.insert(id, doc.clone());
        self.fire(ChangeKind::Inserted, &doc);
        doc
    }

    /// Applies a mutator to a document under the write lock
    ///
    /// Returns the updated document, or `None` if no document has that ID.
    /// The mutator runs while the lock is held: concurrent read-modify-write
    /// on the same document cannot interleave, which is what keeps the
    /// denormalized back-reference lists free of lost updates.
    pub async fn update_by_id<F>(&self, id: Uuid, mutate: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let updated = {
            let mut docs = self.docs.write().await;
            let doc = docs.get_mut(&id)?;
            mutate(doc);
            doc.clone()
        };
        self.fire(ChangeKind::Updated, &updated);
        Some(updated)
    }

    /// Removes a document by ID
    ///
    /// Returns `true` if a document was removed, `false` if the ID was
    /// already absent.
    pub async fn remove_by_id(&self, id: Uuid) -> bool {
        let removed = self.docs.write().await.remove(&id);
        match removed {
            Some(doc) => {
                self.fire(ChangeKind::Removed, &doc);
                true
            }
            None => false,
        }
    }

    /// Number of stored documents
    pub async fn count(&self) -> usize {
        self.docs.read().await.len()
    }

    fn fire(&self, kind: ChangeKind, doc: &T) {
        let hooks = self.hooks.read().expect("change hook lock poisoned");
        for hook in hooks.iter() {
            hook(kind, doc);
        }
    }
}

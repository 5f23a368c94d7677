use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::video::{BackendError, MediaBackend, SoftBackend};

use super::upload::bind_entity;
use super::{GpuTextureId, GpuUploader, TextureEntity, TextureError, TextureKey};

/// Dense identifier of a registry slot.
///
/// The generation changes whenever the slot is vacated, so a stale id never
/// aliases a newer entity stored in the same slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

struct Entry {
    entity: Arc<TextureEntity>,
    refs: usize,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct Registry {
    index: HashMap<TextureKey, EntityId>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Registry {
    fn entry_mut(&mut self, id: EntityId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn insert(&mut self, entity: Arc<TextureEntity>) -> EntityId {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = Some(Entry { entity, refs: 1 });
        EntityId { index, generation: slot.generation }
    }

    fn remove(&mut self, id: EntityId) -> Option<Arc<TextureEntity>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.index.remove(entry.entity.key());
        Some(entry.entity)
    }

    fn drain(&mut self) -> Vec<Arc<TextureEntity>> {
        self.index.clear();
        self.free.clear();
        let mut out = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(entry) = slot.entry.take() {
                slot.generation = slot.generation.wrapping_add(1);
                out.push(entry.entity);
            }
            self.free.push(i as u32);
        }
        out
    }
}

pub(crate) struct Shared {
    registry: Mutex<Registry>,
    /// Number of live leases. Also serializes backend init/teardown.
    inuse: Mutex<u32>,
    backend: Arc<dyn MediaBackend>,
}

impl Shared {
    fn retain(&self, id: EntityId) {
        if let Some(entry) = self.registry.lock().entry_mut(id) {
            entry.refs += 1;
        }
    }

    fn release(&self, id: EntityId) {
        let doomed = {
            let mut registry = self.registry.lock();
            let Some(entry) = registry.entry_mut(id) else {
                return;
            };
            entry.refs -= 1;
            if entry.refs > 0 {
                return;
            }
            registry.remove(id)
        };

        // Destruction may join a decoder thread; never under the registry lock.
        if let Some(entity) = doomed {
            entity.destroy();
        }
    }

    fn detach(&self) {
        let mut inuse = self.inuse.lock();
        *inuse = inuse.saturating_sub(1);
        if *inuse > 0 {
            return;
        }

        let doomed = self.registry.lock().drain();
        if !doomed.is_empty() {
            log::debug!("destroying {} textures still cached at teardown", doomed.len());
        }
        for entity in doomed {
            entity.destroy();
        }

        self.backend.deinit();
        log::debug!("media backend `{}` shut down", self.backend.name());
    }
}

/// Registry of texture entities, shared by everything drawing into one
/// rendering context.
///
/// Cloning is cheap; clones refer to the same registry. Entities are
/// deduplicated by [`TextureKey`] and reference counted through
/// [`TextureHandle`]: the entity is destroyed when the last handle drops.
#[derive(Clone)]
pub struct TextureManager {
    shared: Arc<Shared>,
}

/// Result of [`TextureManager::acquire`].
#[derive(Debug)]
pub struct Acquired {
    pub handle: TextureHandle,
    /// The entity was created by this call and still needs initialization.
    pub fresh: bool,
}

impl TextureManager {
    /// Creates a registry driving the built-in software media backend.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(SoftBackend::new()))
    }

    pub fn with_backend(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                inuse: Mutex::new(0),
                backend,
            }),
        }
    }

    /// Registers a user of the registry (typically a window).
    ///
    /// The first lease initializes the media backend; dropping the last lease
    /// destroys every cached entity and shuts the backend down.
    pub fn attach(&self) -> Result<ManagerLease, BackendError> {
        let mut inuse = self.shared.inuse.lock();
        if *inuse == 0 {
            self.shared.backend.init()?;
            log::debug!("media backend `{}` initialized", self.shared.backend.name());
        }
        *inuse += 1;
        Ok(ManagerLease {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Returns the entity for `key`, creating an empty one if needed.
    pub fn acquire(&self, key: TextureKey) -> Result<Acquired, TextureError> {
        if key.is_empty() {
            return Err(TextureError::EmptyKey);
        }

        let mut registry = self.shared.registry.lock();
        if let Some(id) = registry.index.get(&key).copied() {
            if let Some(entry) = registry.entry_mut(id) {
                entry.refs += 1;
                let entity = Arc::clone(&entry.entity);
                return Ok(Acquired {
                    handle: self.handle(id, entity),
                    fresh: false,
                });
            }
        }

        let entity = Arc::new(TextureEntity::new(key.clone()));
        let id = registry.insert(Arc::clone(&entity));
        registry.index.insert(key, id);
        drop(registry);

        log::trace!("texture `{}` created", entity.key());
        Ok(Acquired {
            handle: self.handle(id, entity),
            fresh: true,
        })
    }

    /// Gives up one reference. Equivalent to dropping the handle.
    pub fn release(&self, handle: TextureHandle) {
        drop(handle);
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.shared.registry.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &TextureKey) -> bool {
        self.shared.registry.lock().index.contains_key(key)
    }

    /// Current reference count of `key`, if cached.
    pub fn refcount(&self, key: &TextureKey) -> Option<usize> {
        let mut registry = self.shared.registry.lock();
        let id = registry.index.get(key).copied()?;
        registry.entry_mut(id).map(|e| e.refs)
    }

    /// Makes the texture usable on the GPU; see [`TextureHandle::bind`].
    pub fn bind(
        &self,
        texture: &TextureHandle,
        uploader: &dyn GpuUploader,
    ) -> Result<Option<GpuTextureId>, TextureError> {
        texture.bind(uploader)
    }

    /// Base level size of `texture`, once known.
    pub fn size(&self, texture: &TextureHandle) -> Option<(u32, u32)> {
        texture.size()
    }

    pub(crate) fn backend(&self) -> &Arc<dyn MediaBackend> {
        &self.shared.backend
    }

    fn handle(&self, id: EntityId, entity: Arc<TextureEntity>) -> TextureHandle {
        TextureHandle {
            shared: Arc::clone(&self.shared),
            id,
            entity,
        }
    }
}

impl Default for TextureManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the registry's native subsystems alive. See [`TextureManager::attach`].
pub struct ManagerLease {
    shared: Arc<Shared>,
}

impl Drop for ManagerLease {
    fn drop(&mut self) {
        self.shared.detach();
    }
}

/// Counted reference to a cached entity.
///
/// Cloning increments the entity's reference count; dropping decrements it.
pub struct TextureHandle {
    shared: Arc<Shared>,
    id: EntityId,
    entity: Arc<TextureEntity>,
}

impl TextureHandle {
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn key(&self) -> &TextureKey {
        self.entity.key()
    }

    #[inline]
    pub fn entity(&self) -> &Arc<TextureEntity> {
        &self.entity
    }

    /// Non-counting reference for draw commands.
    pub fn texture_ref(&self) -> TextureRef {
        TextureRef(Arc::clone(&self.entity))
    }

    /// Uploads or refreshes the GPU texture as needed.
    ///
    /// Returns `Ok(None)` while the entity has no pixel data yet; the caller
    /// skips the draw instead of waiting.
    pub fn bind(&self, uploader: &dyn GpuUploader) -> Result<Option<GpuTextureId>, TextureError> {
        bind_entity(&self.entity, uploader)
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.entity.size()
    }
}

impl Clone for TextureHandle {
    fn clone(&self) -> Self {
        self.shared.retain(self.id);
        Self {
            shared: Arc::clone(&self.shared),
            id: self.id,
            entity: Arc::clone(&self.entity),
        }
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        self.shared.release(self.id);
    }
}

impl PartialEq for TextureHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entity, &other.entity)
    }
}

impl std::fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandle")
            .field("key", self.key())
            .field("id", &self.id)
            .finish()
    }
}

/// Entity reference that does not hold a count.
///
/// Once the entity is destroyed, binding it yields `None`.
#[derive(Clone)]
pub struct TextureRef(Arc<TextureEntity>);

impl TextureRef {
    #[inline]
    pub fn key(&self) -> &TextureKey {
        self.0.key()
    }

    pub fn bind(&self, uploader: &dyn GpuUploader) -> Result<Option<GpuTextureId>, TextureError> {
        bind_entity(&self.0, uploader)
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.0.size()
    }

    pub(crate) fn entity(&self) -> &TextureEntity {
        &self.0
    }
}

impl PartialEq for TextureRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for TextureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureRef").field(self.key()).finish()
    }
}

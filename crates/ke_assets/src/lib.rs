//! Refcounted asset registry, indexed by `(kind, asset_id)`.
//!
//! The registry owns every loaded value. Loaders run lazily on first
//! acquisition; unloaders run exactly once when the last reference is
//! released (or on [`AssetRegistry::clear`]).

use std::collections::HashMap;

/// Loaded asset values are type-erased; callers downcast through
/// [`AssetRegistry::get`].
pub type AssetValue = Box<dyn std::any::Any + Send + Sync>;

pub type AssetLoader = Box<dyn FnMut(&str) -> anyhow::Result<AssetValue> + Send>;
pub type AssetUnloader = Box<dyn FnMut(AssetValue) -> anyhow::Result<()> + Send>;

/// Opaque handle for a loaded asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    pub kind: String,
    pub asset_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown asset kind: {0}")]
    UnknownKind(String),

    #[error("asset not loaded: kind={kind} id={asset_id}")]
    NotLoaded { kind: String, asset_id: String },

    #[error("asset loader failed for kind={kind} id={asset_id}")]
    Loader {
        kind: String,
        asset_id: String,
        #[source]
        source: anyhow::Error,
    },
}

struct LoadedAsset {
    value: AssetValue,
    refs: usize,
}

struct KindEntry {
    loader: AssetLoader,
    unloader: Option<AssetUnloader>,
}

/// Registry that loads, caches and releases assets by kind and id.
#[derive(Default)]
pub struct AssetRegistry {
    kinds: HashMap<String, KindEntry>,
    loaded: HashMap<(String, String), LoadedAsset>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader (and optional unloader) for one asset kind.
    pub fn register_kind(
        &mut self,
        kind: &str,
        loader: AssetLoader,
        unloader: Option<AssetUnloader>,
    ) -> Result<(), AssetError> {
        let normalized = kind.trim();
        if normalized.is_empty() {
            return Err(AssetError::InvalidArgument("kind must not be empty".to_owned()));
        }
        self.kinds
            .insert(normalized.to_owned(), KindEntry { loader, unloader });
        Ok(())
    }

    /// Load or acquire a cached asset and return its handle.
    pub fn load(&mut self, kind: &str, asset_id: &str) -> Result<AssetHandle, AssetError> {
        let key = (kind.to_owned(), asset_id.to_owned());
        if let Some(loaded) = self.loaded.get_mut(&key) {
            loaded.refs += 1;
            return Ok(AssetHandle {
                kind: key.0,
                asset_id: key.1,
            });
        }
        let entry = self
            .kinds
            .get_mut(kind)
            .ok_or_else(|| AssetError::UnknownKind(kind.to_owned()))?;
        let value = (entry.loader)(asset_id).map_err(|source| AssetError::Loader {
            kind: kind.to_owned(),
            asset_id: asset_id.to_owned(),
            source,
        })?;
        self.loaded.insert(key.clone(), LoadedAsset { value, refs: 1 });
        Ok(AssetHandle {
            kind: key.0,
            asset_id: key.1,
        })
    }

    /// Resolve a handle to its loaded value.
    pub fn get(&self, handle: &AssetHandle) -> Result<&(dyn std::any::Any + Send + Sync), AssetError> {
        let key = (handle.kind.clone(), handle.asset_id.clone());
        self.loaded
            .get(&key)
            .map(|loaded| loaded.value.as_ref())
            .ok_or_else(|| AssetError::NotLoaded {
                kind: handle.kind.clone(),
                asset_id: handle.asset_id.clone(),
            })
    }

    /// Current reference count for a handle; 0 when absent.
    pub fn ref_count(&self, handle: &AssetHandle) -> usize {
        let key = (handle.kind.clone(), handle.asset_id.clone());
        self.loaded.get(&key).map_or(0, |loaded| loaded.refs)
    }

    /// Release one reference. Unknown handles are a no-op.
    ///
    /// At refcount zero the entry is dropped and the kind's unloader (if
    /// any) runs exactly once; unloader failures are logged and swallowed.
    pub fn release(&mut self, handle: &AssetHandle) {
        let key = (handle.kind.clone(), handle.asset_id.clone());
        let Some(loaded) = self.loaded.get_mut(&key) else {
            return;
        };
        loaded.refs -= 1;
        if loaded.refs > 0 {
            return;
        }
        if let Some(loaded) = self.loaded.remove(&key) {
            self.run_unloader(&handle.kind, &handle.asset_id, loaded.value);
        }
    }

    /// Release all loaded assets, running every unloader.
    pub fn clear(&mut self) {
        let entries: Vec<((String, String), LoadedAsset)> = self.loaded.drain().collect();
        for ((kind, asset_id), loaded) in entries {
            self.run_unloader(&kind, &asset_id, loaded.value);
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    fn run_unloader(&mut self, kind: &str, asset_id: &str, value: AssetValue) {
        let Some(entry) = self.kinds.get_mut(kind) else {
            return;
        };
        let Some(unloader) = entry.unloader.as_mut() else {
            return;
        };
        if let Err(err) = unloader(value) {
            ke_log::warn!(
                "asset unloader failed for kind={kind} id={asset_id}: {}",
                ke_error::format(&err)
            );
        }
    }
}

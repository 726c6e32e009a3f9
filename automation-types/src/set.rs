//! Uniquely-keyed, sorted asset collection.

use crate::asset::{Asset, AssetKey, AssetKind};
use crate::item::SyncStatus;
use std::collections::BTreeMap;

/// Assets keyed by `(kind, name)`; no two entries share an identity.
#[derive(Clone, Debug, Default)]
pub struct AssetSet {
    items: BTreeMap<AssetKey, Asset>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an asset, returning the entry it replaced, if any.
    pub fn insert(&mut self, asset: Asset) -> Option<Asset> {
        self.items.insert(asset.key(), asset)
    }

    pub fn get(&self, key: &AssetKey) -> Option<&Asset> {
        self.items.get(key)
    }

    pub fn find(&self, kind: AssetKind, name: &str) -> Option<&Asset> {
        self.items.get(&AssetKey::new(kind, name))
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.items.contains_key(key)
    }

    pub fn remove(&mut self, key: &AssetKey) -> Option<Asset> {
        self.items.remove(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in `(kind, name)` order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.items.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.items.keys()
    }

    pub fn of_kind(&self, kind: AssetKind) -> impl Iterator<Item = &Asset> {
        self.items
            .iter()
            .filter(move |(key, _)| key.kind == kind)
            .map(|(_, asset)| asset)
    }

    pub fn status_counts(&self) -> BTreeMap<SyncStatus, usize> {
        let mut counts = BTreeMap::new();
        for asset in self.items.values() {
            *counts.entry(asset.sync_status()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<Asset> for AssetSet {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Asset> for AssetSet {
    fn extend<I: IntoIterator<Item = Asset>>(&mut self, iter: I) {
        for asset in iter {
            self.insert(asset);
        }
    }
}

impl IntoIterator for AssetSet {
    type Item = Asset;
    type IntoIter = std::collections::btree_map::IntoValues<AssetKey, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_values()
    }
}

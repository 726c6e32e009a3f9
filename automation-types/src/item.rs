//! Authoring item identity and sync status.

use crate::timestamp::{self, quantize, truncate_millis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Local-vs-cloud freshness of an authoring item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    LocalOnly,
    CloudOnly,
    InSync,
    UpdatedLocally,
    UpdatedInCloud,
}

impl SyncStatus {
    /// Derives the status from an optional local and cloud timestamp.
    ///
    /// Both timestamps are compared at whole-second precision. Returns `None`
    /// when neither timestamp is present, which no item can be.
    pub fn from_timestamps(
        local: Option<DateTime<Utc>>,
        cloud: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        match (local, cloud) {
            (None, None) => None,
            (Some(_), None) => Some(SyncStatus::LocalOnly),
            (None, Some(_)) => Some(SyncStatus::CloudOnly),
            (Some(local), Some(cloud)) => Some(compare(local, cloud)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::LocalOnly => "Local only",
            SyncStatus::CloudOnly => "Cloud only",
            SyncStatus::InSync => "In sync",
            SyncStatus::UpdatedLocally => "Updated locally",
            SyncStatus::UpdatedInCloud => "Updated in cloud",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compare(local: DateTime<Utc>, cloud: DateTime<Utc>) -> SyncStatus {
    match quantize(cloud).cmp(&quantize(local)) {
        Ordering::Greater => SyncStatus::UpdatedInCloud,
        Ordering::Less => SyncStatus::UpdatedLocally,
        Ordering::Equal => SyncStatus::InSync,
    }
}

/// Which timestamps an item carries. At least one is always present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Timestamps {
    Local(DateTime<Utc>),
    Cloud(DateTime<Utc>),
    Both {
        local: DateTime<Utc>,
        cloud: DateTime<Utc>,
    },
}

/// Name and timestamps shared by every authoring item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemMeta {
    name: String,
    timestamps: Timestamps,
}

impl ItemMeta {
    /// An item known only to the local workspace.
    pub fn local(name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            timestamps: Timestamps::Local(truncate_millis(last_modified)),
        }
    }

    /// An item known only to the cloud service.
    pub fn cloud(name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            timestamps: Timestamps::Cloud(truncate_millis(last_modified)),
        }
    }

    /// An item present on both sides.
    pub fn both(name: impl Into<String>, local: DateTime<Utc>, cloud: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            timestamps: Timestamps::Both {
                local: truncate_millis(local),
                cloud: truncate_millis(cloud),
            },
        }
    }

    /// A freshly authored item, stamped with the current time.
    pub fn created_now(name: impl Into<String>) -> Self {
        Self::local(name, timestamp::now())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_modified_local(&self) -> Option<DateTime<Utc>> {
        match self.timestamps {
            Timestamps::Local(local) | Timestamps::Both { local, .. } => Some(local),
            Timestamps::Cloud(_) => None,
        }
    }

    pub fn last_modified_cloud(&self) -> Option<DateTime<Utc>> {
        match self.timestamps {
            Timestamps::Cloud(cloud) | Timestamps::Both { cloud, .. } => Some(cloud),
            Timestamps::Local(_) => None,
        }
    }

    /// The timestamp written to the local store: local if known, else cloud.
    pub fn last_modified(&self) -> DateTime<Utc> {
        match self.timestamps {
            Timestamps::Local(local) | Timestamps::Both { local, .. } => local,
            Timestamps::Cloud(cloud) => cloud,
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        match self.timestamps {
            Timestamps::Local(_) => SyncStatus::LocalOnly,
            Timestamps::Cloud(_) => SyncStatus::CloudOnly,
            Timestamps::Both { local, cloud } => compare(local, cloud),
        }
    }

    pub fn set_last_modified_local(&mut self, ts: DateTime<Utc>) {
        let local = truncate_millis(ts);
        self.timestamps = match self.timestamps {
            Timestamps::Local(_) => Timestamps::Local(local),
            Timestamps::Cloud(cloud) | Timestamps::Both { cloud, .. } => {
                Timestamps::Both { local, cloud }
            }
        };
    }

    /// Marks the item as edited locally just now.
    pub fn touch_local(&mut self) {
        self.set_last_modified_local(timestamp::now());
    }

    /// Aligns the local timestamp with the cloud one, as after a download.
    /// No-op for local-only items.
    pub fn adopt_cloud_timestamp(&mut self) {
        if let Some(cloud) = self.last_modified_cloud() {
            self.timestamps = Timestamps::Both {
                local: cloud,
                cloud,
            };
        }
    }
}

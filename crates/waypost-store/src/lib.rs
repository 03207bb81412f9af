//! Durable storage for Waypost tracking records.
//!
//! Persists the durable subset of each [`TrackedRecord`] — policy, allow
//! list, anchor, color — to a single pretty-printed JSON file keyed by actor
//! UUID. Viewer membership sets and last-known positions are ephemeral and
//! never written; they are rebuilt from connected-viewer state at runtime.
//!
//! Loading is lenient by contract: a missing file means "no tracked
//! entities", a malformed entity entry is logged and skipped, and an anchor
//! whose dimension no longer resolves loads without its position (the
//! dimension name is retained on the [`LoadedRecord`] for later
//! re-resolution).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod error;
mod schema;

pub use error::StoreError;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use waypost_core::{
    ActorId, Anchor, BlockPos, Dimension, MarkerColor, TrackedRecord, VisibilityPolicy,
};

use schema::{StoredAnchor, StoredFile, StoredRecord};

/// A record as reconstructed from disk.
///
/// Distinct from [`TrackedRecord`] because load-time resolution can leave
/// partial state: when the anchor's dimension no longer resolves, `anchor`
/// is `None` but `retained_anchor_dimension` keeps the name so a host can
/// re-resolve it after dimensions finish registering.
#[derive(Clone, Debug)]
pub struct LoadedRecord {
    /// The tracked entity.
    pub id: ActorId,
    /// Persisted visibility policy.
    pub policy: VisibilityPolicy,
    /// Persisted allow list.
    pub allow_list: HashSet<ActorId>,
    /// The anchor, when its dimension resolved.
    pub anchor: Option<Anchor>,
    /// Anchor dimension name kept when resolution failed.
    pub retained_anchor_dimension: Option<Dimension>,
    /// Persisted display color.
    pub color: Option<MarkerColor>,
}

impl LoadedRecord {
    /// Build a live [`TrackedRecord`] from the persisted fields.
    ///
    /// Membership sets start empty and last-known state starts unset; the
    /// engine repopulates both from the world view.
    pub fn into_record(self) -> TrackedRecord {
        let mut record = TrackedRecord::new(self.id);
        record.policy = self.policy;
        record.allow_list = self.allow_list;
        record.anchor = self.anchor;
        record.color = self.color;
        record
    }
}

/// Result of a [`RecordStore::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully decoded records.
    pub records: Vec<LoadedRecord>,
    /// Number of entity entries skipped as malformed.
    pub skipped: usize,
}

/// Saves and loads tracking records at a fixed file path.
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// A store backed by the given file path. Nothing is touched on disk
    /// until the first [`save`](Self::save) or [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the durable fields of every record, replacing the file.
    ///
    /// Entities are written in ascending UUID order so that repeated saves
    /// produce stable, diffable output. Returns the number of records
    /// written.
    pub fn save<'a>(
        &self,
        records: impl IntoIterator<Item = &'a TrackedRecord>,
    ) -> Result<usize, StoreError> {
        let mut entries: Vec<(String, StoredRecord)> = records
            .into_iter()
            .map(|record| (record.id.to_string(), encode_record(record)))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut file = StoredFile::default();
        for (id, stored) in entries {
            let value = serde_json::to_value(stored).map_err(|e| StoreError::Format {
                reason: e.to_string(),
            })?;
            file.entities.insert(id, value);
        }
        let count = file.entities.len();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let body = serde_json::to_string_pretty(&file).map_err(|e| StoreError::Format {
            reason: e.to_string(),
        })?;
        fs::write(&self.path, body).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        log::info!("saved {count} tracking record(s) to {}", self.path.display());
        Ok(count)
    }

    /// Read every decodable record from disk.
    ///
    /// `resolve` reports whether a persisted dimension name still exists;
    /// anchors in unresolvable dimensions are dropped (position discarded,
    /// name retained). A missing file yields an empty report.
    pub fn load(
        &self,
        resolve: impl Fn(&Dimension) -> bool,
    ) -> Result<LoadReport, StoreError> {
        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadReport::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let file: StoredFile = serde_json::from_str(&body).map_err(|e| StoreError::Format {
            reason: e.to_string(),
        })?;

        let mut report = LoadReport::default();
        for (id_text, value) in file.entities {
            let Ok(uuid) = Uuid::parse_str(&id_text) else {
                log::warn!("skipping record with invalid actor id '{id_text}'");
                report.skipped += 1;
                continue;
            };
            let stored: StoredRecord = match serde_json::from_value(value) {
                Ok(stored) => stored,
                Err(e) => {
                    log::warn!("skipping malformed record for {id_text}: {e}");
                    report.skipped += 1;
                    continue;
                }
            };
            report
                .records
                .push(decode_record(ActorId(uuid), stored, &resolve));
        }

        log::info!(
            "loaded {} tracking record(s) from {} ({} skipped)",
            report.records.len(),
            self.path.display(),
            report.skipped
        );
        Ok(report)
    }

    /// Delete the backing file, if it exists.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn encode_record(record: &TrackedRecord) -> StoredRecord {
    let mut allow: Vec<String> = record.allow_list.iter().map(|id| id.to_string()).collect();
    allow.sort();

    StoredRecord {
        policy: Some(record.policy.name().to_string()),
        allow,
        anchor: record.anchor.as_ref().map(|anchor| StoredAnchor {
            dimension: anchor.dimension.as_str().to_string(),
            x: anchor.position.x,
            y: anchor.position.y,
            z: anchor.position.z,
        }),
        color: record.color.map(MarkerColor::to_hex),
    }
}

fn decode_record(
    id: ActorId,
    stored: StoredRecord,
    resolve: &impl Fn(&Dimension) -> bool,
) -> LoadedRecord {
    let policy = stored
        .policy
        .as_deref()
        .and_then(VisibilityPolicy::parse)
        .unwrap_or_default();

    let allow_list = stored
        .allow
        .iter()
        .filter_map(|text| match Uuid::parse_str(text) {
            Ok(uuid) => Some(ActorId(uuid)),
            Err(_) => {
                log::warn!("dropping unparsable allow-list member '{text}' for {id}");
                None
            }
        })
        .collect();

    // Invalid color encodings decode to the default, not an error.
    let color = stored
        .color
        .as_deref()
        .and_then(|text| MarkerColor::from_hex(text).ok());

    let mut anchor = None;
    let mut retained_anchor_dimension = None;
    if let Some(stored_anchor) = stored.anchor {
        let dimension = Dimension::from(stored_anchor.dimension);
        if resolve(&dimension) {
            anchor = Some(Anchor {
                position: BlockPos::new(stored_anchor.x, stored_anchor.y, stored_anchor.z),
                dimension,
            });
        } else {
            log::warn!(
                "anchor dimension '{dimension}' for {id} does not resolve; dropping position"
            );
            retained_anchor_dimension = Some(dimension);
        }
    }

    LoadedRecord {
        id,
        policy,
        allow_list,
        anchor,
        retained_anchor_dimension,
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn actor(n: u128) -> ActorId {
        ActorId(Uuid::from_u128(n))
    }

    fn store_in(dir: &tempfile::TempDir) -> RecordStore {
        RecordStore::new(dir.path().join("records.json"))
    }

    fn sample_record() -> TrackedRecord {
        let mut record = TrackedRecord::new(actor(1));
        record.expose_to(actor(2));
        record.expose_to(actor(3));
        record.color = Some(MarkerColor::from_hex("#FF8800").unwrap());
        record.set_anchor(BlockPos::new(10, 64, -3), Dimension::from("overworld"));
        record
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let report = store_in(&dir).load(|_| true).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn round_trips_every_durable_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let record = sample_record();

        assert_eq!(store.save([&record]).unwrap(), 1);
        let report = store.load(|_| true).unwrap();
        assert_eq!(report.records.len(), 1);

        let loaded = &report.records[0];
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.policy, record.policy);
        assert_eq!(loaded.allow_list, record.allow_list);
        assert_eq!(loaded.anchor, record.anchor);
        assert_eq!(loaded.color, record.color);
        assert!(loaded.retained_anchor_dimension.is_none());
    }

    #[test]
    fn membership_sets_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut record = sample_record();
        record.live_viewers.insert(actor(9));
        record.anchor_viewers.insert(actor(9));

        store.save([&record]).unwrap();
        let body = fs::read_to_string(store.path()).unwrap();
        assert!(!body.contains("viewers"));

        let report = store.load(|_| true).unwrap();
        let rebuilt = report.records[0].clone().into_record();
        assert!(rebuilt.live_viewers.is_empty());
        assert!(rebuilt.anchor_viewers.is_empty());
    }

    #[test]
    fn unresolvable_dimension_drops_position_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save([&sample_record()]).unwrap();

        let report = store.load(|_| false).unwrap();
        let loaded = &report.records[0];
        assert!(loaded.anchor.is_none());
        assert_eq!(
            loaded.retained_anchor_dimension,
            Some(Dimension::from("overworld"))
        );
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let good = Uuid::from_u128(1);
        let body = format!(
            r#"{{"entities": {{
                "{good}": {{"policy": "hide_from_all"}},
                "not-a-uuid": {{"policy": "expose_to_all"}},
                "{}": {{"anchor": "not-an-object"}}
            }}}}"#,
            Uuid::from_u128(2)
        );
        fs::write(store.path(), body).unwrap();

        let report = store.load(|_| true).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.records[0].id, ActorId(good));
        assert_eq!(report.records[0].policy, VisibilityPolicy::HideFromAll);
    }

    #[test]
    fn lenient_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let id = Uuid::from_u128(5);
        let body = format!(
            r##"{{"entities": {{"{id}": {{
                "policy": "EXPOSE_TO_ALL",
                "allow": ["also-not-a-uuid"],
                "color": "#GGGGGG"
            }}}}}}"##
        );
        fs::write(store.path(), body).unwrap();

        let report = store.load(|_| true).unwrap();
        assert_eq!(report.skipped, 0);
        let loaded = &report.records[0];
        assert_eq!(loaded.policy, VisibilityPolicy::ExposeToAll);
        assert!(loaded.allow_list.is_empty());
        assert!(loaded.color.is_none());
    }

    #[test]
    fn broken_json_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(
            store.load(|_| true),
            Err(StoreError::Format { .. })
        ));
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save([&sample_record()]).unwrap();
        assert!(store.path().exists());
        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing an absent file is fine too.
        store.clear().unwrap();
    }

    #[test]
    fn saved_output_is_stable_across_saves() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let a = sample_record();
        let mut b = TrackedRecord::new(actor(7));
        b.hide_from_all();

        store.save([&a, &b]).unwrap();
        let first = fs::read_to_string(store.path()).unwrap();
        store.save([&b, &a]).unwrap();
        let second = fs::read_to_string(store.path()).unwrap();
        assert_eq!(first, second);
    }
}

//! Inventory repository - owns the device collections and their persistence.
//!
//! The repository is the only writer of the four persisted collections
//! (active devices, archived devices, notes, change logs). Every mutation
//! updates the in-memory collection first and then writes the affected
//! collection through the injected store before returning. Operations that
//! target a missing identifier are tolerated as no-ops and report
//! `Ok(false)` instead of failing; errors are reserved for storage trouble.

use crate::changelog::{diff_devices, ChangeLogEntry};
use crate::device::{now_iso, ArchivedDevice, Device, DeviceDraft, Note};
use crate::store::{StateStore, StoreKey};
use crate::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info};

type NoteMap = BTreeMap<i64, Vec<Note>>;
type ChangeLogMap = BTreeMap<i64, Vec<ChangeLogEntry>>;

/// Authoritative owner of the inventory state.
pub struct InventoryRepository<S: StateStore> {
    store: S,
    devices: Vec<Device>,
    archived: Vec<ArchivedDevice>,
    notes: NoteMap,
    change_logs: ChangeLogMap,
    last_id: i64,
}

impl<S: StateStore> InventoryRepository<S> {
    /// Load saved state from the store, falling back to the built-in seed
    /// inventory when no device collection has been saved yet.
    pub fn load(store: S) -> Result<Self> {
        let devices: Vec<Device> = store
            .get(StoreKey::Devices)?
            .unwrap_or_else(crate::device::seed_devices);
        let archived: Vec<ArchivedDevice> = store.get(StoreKey::Archived)?.unwrap_or_default();
        let notes: NoteMap = store.get(StoreKey::Notes)?.unwrap_or_default();
        let change_logs: ChangeLogMap = store.get(StoreKey::ChangeLogs)?.unwrap_or_default();

        let last_id = devices
            .iter()
            .map(|d| d.id)
            .chain(archived.iter().map(|a| a.device.id))
            .chain(notes.values().flatten().map(|n| n.id))
            .max()
            .unwrap_or(0);

        info!(
            devices = devices.len(),
            archived = archived.len(),
            "inventory state loaded"
        );

        Ok(Self {
            store,
            devices,
            archived,
            notes,
            change_logs,
            last_id,
        })
    }

    /// Fresh identifiers are time-derived and strictly increasing, so they
    /// stay unique even when several are assigned within one millisecond.
    fn next_id(&mut self) -> i64 {
        let candidate = Utc::now().timestamp_millis();
        self.last_id = if candidate > self.last_id {
            candidate
        } else {
            self.last_id + 1
        };
        self.last_id
    }

    // --- Device operations ---

    /// Add a new device. The identifier is assigned here and the record
    /// starts active.
    pub fn add_device(&mut self, draft: DeviceDraft) -> Result<i64> {
        let id = self.next_id();
        self.devices.push(draft.into_device(id));
        self.persist_devices()?;
        info!(id, "device added");
        Ok(id)
    }

    /// Replace a device record in place, recording field-level changes.
    /// An update that changes nothing appends no change-log entries.
    pub fn update_device(&mut self, updated: Device) -> Result<bool> {
        let Some(pos) = self.devices.iter().position(|d| d.id == updated.id) else {
            debug!(id = updated.id, "update target not found, ignoring");
            return Ok(false);
        };

        let changes = diff_devices(&self.devices[pos], &updated);
        if !changes.is_empty() {
            info!(id = updated.id, fields = changes.len(), "device updated");
            self.change_logs.entry(updated.id).or_default().extend(changes);
            self.persist_change_logs()?;
        }

        self.devices[pos] = updated;
        self.persist_devices()?;
        Ok(true)
    }

    /// Move a device from the active collection to the archive, stamping
    /// the archival time. Notes and change logs stay where they are.
    pub fn archive_device(&mut self, device_id: i64) -> Result<bool> {
        let Some(pos) = self.devices.iter().position(|d| d.id == device_id) else {
            debug!(id = device_id, "archive target not found, ignoring");
            return Ok(false);
        };

        let device = self.devices.remove(pos);
        self.archived.push(ArchivedDevice {
            device,
            archived_at: now_iso(),
        });
        self.persist_archived()?;
        self.persist_devices()?;
        info!(id = device_id, "device archived");
        Ok(true)
    }

    /// Move an archived device back to the active collection, dropping the
    /// archival timestamp. The record keeps its identifier and fields.
    pub fn restore_device(&mut self, device_id: i64) -> Result<bool> {
        let Some(pos) = self.archived.iter().position(|a| a.device.id == device_id) else {
            debug!(id = device_id, "restore target not found, ignoring");
            return Ok(false);
        };

        let archived = self.archived.remove(pos);
        self.devices.push(archived.device);
        self.persist_devices()?;
        self.persist_archived()?;
        info!(id = device_id, "device restored");
        Ok(true)
    }

    /// Import externally supplied rows as one batch of new active devices.
    pub fn bulk_import(&mut self, rows: Vec<DeviceDraft>) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(rows.len());
        for draft in rows {
            let id = self.next_id();
            self.devices.push(draft.into_device(id));
            ids.push(id);
        }
        self.persist_devices()?;
        info!(count = ids.len(), "devices imported");
        Ok(ids)
    }

    // --- Note operations ---

    /// Append a note to a device's list, creating the list if needed.
    /// Blank-input rejection is the caller's concern.
    pub fn add_note(&mut self, device_id: i64, text: impl Into<String>) -> Result<i64> {
        let id = self.next_id();
        let note = Note {
            id,
            text: text.into(),
            created_at: now_iso(),
        };
        self.notes.entry(device_id).or_default().push(note);
        self.persist_notes()?;
        info!(device_id, note_id = id, "note added");
        Ok(id)
    }

    /// Remove one note from a device's list; no-op when absent.
    pub fn delete_note(&mut self, device_id: i64, note_id: i64) -> Result<bool> {
        let Some(list) = self.notes.get_mut(&device_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|n| n.id != note_id);
        if list.len() == before {
            return Ok(false);
        }
        self.persist_notes()?;
        info!(device_id, note_id, "note deleted");
        Ok(true)
    }

    // --- Read access ---

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn archived(&self) -> &[ArchivedDevice] {
        &self.archived
    }

    pub fn device(&self, device_id: i64) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    /// A device's notes in insertion order; empty when none exist.
    pub fn notes_for(&self, device_id: i64) -> &[Note] {
        self.notes.get(&device_id).map_or(&[], Vec::as_slice)
    }

    /// A device's change history in append order; empty when none exists.
    pub fn change_log_for(&self, device_id: i64) -> &[ChangeLogEntry] {
        self.change_logs.get(&device_id).map_or(&[], Vec::as_slice)
    }

    /// Distinct unit names in first-seen order, for filter choices.
    pub fn units(&self) -> Vec<String> {
        let mut units: Vec<String> = Vec::new();
        for device in &self.devices {
            if !units.contains(&device.unit) {
                units.push(device.unit.clone());
            }
        }
        units
    }

    /// Distinct status values in first-seen order, for filter choices.
    pub fn statuses(&self) -> Vec<String> {
        let mut statuses: Vec<String> = Vec::new();
        for device in &self.devices {
            if !statuses.contains(&device.status) {
                statuses.push(device.status.clone());
            }
        }
        statuses
    }

    // --- Persistence ---

    fn persist_devices(&self) -> Result<()> {
        self.store.put(StoreKey::Devices, &self.devices)
    }

    fn persist_archived(&self) -> Result<()> {
        self.store.put(StoreKey::Archived, &self.archived)
    }

    fn persist_notes(&self) -> Result<()> {
        self.store.put(StoreKey::Notes, &self.notes)
    }

    fn persist_change_logs(&self) -> Result<()> {
        self.store.put(StoreKey::ChangeLogs, &self.change_logs)
    }
}

#[cfg(test)]
mod tests;

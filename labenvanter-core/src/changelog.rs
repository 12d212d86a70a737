//! Field-level change tracking for device edits.

use crate::device::{now_iso, Device, DeviceField};
use serde::{Deserialize, Serialize};

/// One recorded field transition. Entries are append-only per device and
/// capture the values as text at the time of the edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    #[serde(rename = "alan")]
    pub field: String,
    #[serde(rename = "eski")]
    pub previous: String,
    #[serde(rename = "yeni")]
    pub new: String,
    #[serde(rename = "tarih")]
    pub timestamp: String,
}

/// Compare two records of the same device and produce one entry per field
/// whose value changed, in canonical field order. The identifier is never
/// compared. Typed values are compared directly, so a numeric field only
/// counts as changed when the number itself changed.
pub fn diff_devices(old: &Device, new: &Device) -> Vec<ChangeLogEntry> {
    let timestamp = now_iso();
    let mut changes = Vec::new();
    for field in DeviceField::ALL {
        let before = field.value(old);
        let after = field.value(new);
        if before != after {
            changes.push(ChangeLogEntry {
                field: field.label().to_string(),
                previous: before.to_string(),
                new: after.to_string(),
                timestamp: timestamp.clone(),
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::seed_devices;

    #[test]
    fn identical_records_produce_no_entries() {
        let device = seed_devices().remove(0);
        assert!(diff_devices(&device, &device.clone()).is_empty());
    }

    #[test]
    fn changed_fields_produce_one_entry_each() {
        let old = seed_devices().remove(0);
        let mut new = old.clone();
        new.status = "Bakımda".to_string();
        new.calibration_period_months = 6;

        let changes = diff_devices(&old, &new);
        assert_eq!(changes.len(), 2);

        // Canonical order: period column comes before status.
        assert_eq!(changes[0].field, "Kalibrasyon Periyodu (ay)");
        assert_eq!(changes[0].previous, "12");
        assert_eq!(changes[0].new, "6");
        assert_eq!(changes[1].field, "Durum");
        assert_eq!(changes[1].previous, "Çalışıyor");
        assert_eq!(changes[1].new, "Bakımda");
    }

    #[test]
    fn active_flag_change_is_recorded_as_text() {
        let old = seed_devices().remove(1);
        let mut new = old.clone();
        new.active = crate::device::ActiveFlag::No;

        let changes = diff_devices(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "Aktif");
        assert_eq!(changes[0].previous, "Evet");
        assert_eq!(changes[0].new, "Hayır");
    }

    #[test]
    fn entry_serializes_with_original_labels() {
        let entry = ChangeLogEntry {
            field: "Durum".to_string(),
            previous: "Çalışıyor".to_string(),
            new: "Bakımda".to_string(),
            timestamp: "2025-01-01T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["alan"], "Durum");
        assert_eq!(json["eski"], "Çalışıyor");
        assert_eq!(json["yeni"], "Bakımda");
        assert_eq!(json["tarih"], "2025-01-01T00:00:00.000Z");
    }
}

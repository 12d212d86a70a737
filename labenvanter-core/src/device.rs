//! Device data model and the canonical field schema.
//!
//! The serialized field labels match the persisted state of the original
//! deployment, so an exported state snapshot keeps loading unchanged. The
//! `DeviceField` enum is the compile-time schema: diffing, searching,
//! sorting and export all iterate it instead of enumerating keys at runtime.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a device is in active use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveFlag {
    #[serde(rename = "Evet")]
    Yes,
    #[serde(rename = "Hayır")]
    No,
}

impl ActiveFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveFlag::Yes => "Evet",
            ActiveFlag::No => "Hayır",
        }
    }

    /// Parse the stored representation. Unknown input is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Evet" => Some(ActiveFlag::Yes),
            "Hayır" => Some(ActiveFlag::No),
            _ => None,
        }
    }
}

impl fmt::Display for ActiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked piece of laboratory equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Ekipman")]
    pub equipment: String,
    #[serde(rename = "Birim Kodu")]
    pub unit_code: String,
    #[serde(rename = "Birim")]
    pub unit: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Seri No")]
    pub serial_no: String,
    #[serde(rename = "Kalibrasyon Tarihi")]
    pub calibration_date: String,
    #[serde(rename = "Kalibrasyon Periyodu (ay)")]
    pub calibration_period_months: u32,
    #[serde(rename = "Son Kalibrasyon")]
    pub last_calibration: String,
    #[serde(rename = "Durum")]
    pub status: String,
    #[serde(rename = "Aktif")]
    pub active: ActiveFlag,
}

/// A device that has been moved out of the active collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedDevice {
    #[serde(flatten)]
    pub device: Device,
    #[serde(rename = "Arşivlenme Tarihi")]
    pub archived_at: String,
}

/// A free-text annotation attached to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "not_metni")]
    pub text: String,
    #[serde(rename = "tarih")]
    pub created_at: String,
}

/// Device fields supplied by a caller; identifier and active flag are
/// assigned by the repository on creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDraft {
    pub equipment: String,
    pub unit_code: String,
    pub unit: String,
    pub model: String,
    pub serial_no: String,
    pub calibration_date: String,
    pub calibration_period_months: u32,
    pub last_calibration: String,
    pub status: String,
}

impl DeviceDraft {
    /// Promote the draft to a full record. New devices always start active.
    pub(crate) fn into_device(self, id: i64) -> Device {
        Device {
            id,
            equipment: self.equipment,
            unit_code: self.unit_code,
            unit: self.unit,
            model: self.model,
            serial_no: self.serial_no,
            calibration_date: self.calibration_date,
            calibration_period_months: self.calibration_period_months,
            last_calibration: self.last_calibration,
            status: self.status,
            active: ActiveFlag::Yes,
        }
    }

    /// Build a draft from an imported row mapping (field label -> raw cell
    /// value). Missing cells become empty values; a malformed period
    /// becomes zero.
    pub fn from_row(row: &BTreeMap<String, String>) -> Self {
        let cell = |field: DeviceField| row.get(field.label()).cloned().unwrap_or_default();
        DeviceDraft {
            equipment: cell(DeviceField::Equipment),
            unit_code: cell(DeviceField::UnitCode),
            unit: cell(DeviceField::Unit),
            model: cell(DeviceField::Model),
            serial_no: cell(DeviceField::SerialNo),
            calibration_date: cell(DeviceField::CalibrationDate),
            calibration_period_months: cell(DeviceField::CalibrationPeriodMonths)
                .trim()
                .parse()
                .unwrap_or(0),
            last_calibration: cell(DeviceField::LastCalibration),
            status: cell(DeviceField::Status),
        }
    }
}

/// The ten non-identifier device fields, in canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceField {
    Equipment,
    UnitCode,
    Unit,
    Model,
    SerialNo,
    CalibrationDate,
    CalibrationPeriodMonths,
    LastCalibration,
    Status,
    Active,
}

impl DeviceField {
    /// Canonical field order. Drives diffing, export columns and sorting.
    pub const ALL: [DeviceField; 10] = [
        DeviceField::Equipment,
        DeviceField::UnitCode,
        DeviceField::Unit,
        DeviceField::Model,
        DeviceField::SerialNo,
        DeviceField::CalibrationDate,
        DeviceField::CalibrationPeriodMonths,
        DeviceField::LastCalibration,
        DeviceField::Status,
        DeviceField::Active,
    ];

    /// The persisted column label for this field.
    pub fn label(self) -> &'static str {
        match self {
            DeviceField::Equipment => "Ekipman",
            DeviceField::UnitCode => "Birim Kodu",
            DeviceField::Unit => "Birim",
            DeviceField::Model => "Model",
            DeviceField::SerialNo => "Seri No",
            DeviceField::CalibrationDate => "Kalibrasyon Tarihi",
            DeviceField::CalibrationPeriodMonths => "Kalibrasyon Periyodu (ay)",
            DeviceField::LastCalibration => "Son Kalibrasyon",
            DeviceField::Status => "Durum",
            DeviceField::Active => "Aktif",
        }
    }

    /// Look a field up by its column label.
    pub fn parse_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }

    /// Typed read access to the field's current value.
    pub fn value(self, device: &Device) -> FieldValue<'_> {
        match self {
            DeviceField::Equipment => FieldValue::Text(&device.equipment),
            DeviceField::UnitCode => FieldValue::Text(&device.unit_code),
            DeviceField::Unit => FieldValue::Text(&device.unit),
            DeviceField::Model => FieldValue::Text(&device.model),
            DeviceField::SerialNo => FieldValue::Text(&device.serial_no),
            DeviceField::CalibrationDate => FieldValue::Text(&device.calibration_date),
            DeviceField::CalibrationPeriodMonths => {
                FieldValue::Number(i64::from(device.calibration_period_months))
            }
            DeviceField::LastCalibration => FieldValue::Text(&device.last_calibration),
            DeviceField::Status => FieldValue::Text(&device.status),
            DeviceField::Active => FieldValue::Text(device.active.as_str()),
        }
    }

    /// Write a raw textual value into the field. Returns `false` when the
    /// value cannot be parsed for a numeric or flag field; the device is
    /// left unchanged in that case.
    pub fn set_value(self, device: &mut Device, raw: &str) -> bool {
        match self {
            DeviceField::Equipment => device.equipment = raw.to_string(),
            DeviceField::UnitCode => device.unit_code = raw.to_string(),
            DeviceField::Unit => device.unit = raw.to_string(),
            DeviceField::Model => device.model = raw.to_string(),
            DeviceField::SerialNo => device.serial_no = raw.to_string(),
            DeviceField::CalibrationDate => device.calibration_date = raw.to_string(),
            DeviceField::CalibrationPeriodMonths => match raw.trim().parse() {
                Ok(months) => device.calibration_period_months = months,
                Err(_) => return false,
            },
            DeviceField::LastCalibration => device.last_calibration = raw.to_string(),
            DeviceField::Status => device.status = raw.to_string(),
            DeviceField::Active => match ActiveFlag::parse(raw) {
                Some(flag) => device.active = flag,
                None => return false,
            },
        }
        true
    }
}

/// A field value read through the schema. Numeric fields stay numeric so
/// that comparisons never depend on textual formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(i64),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(value) => f.write_str(value),
            FieldValue::Number(value) => write!(f, "{}", value),
        }
    }
}

/// Current time in the stored timestamp format (UTC, millisecond precision).
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The built-in sample inventory used when no saved state exists.
pub fn seed_devices() -> Vec<Device> {
    vec![
        Device {
            id: 1,
            equipment: "Dijital Pipet".to_string(),
            unit_code: "P-001".to_string(),
            unit: "Kimya Lab".to_string(),
            model: "Pipetman L".to_string(),
            serial_no: "SN-12345".to_string(),
            calibration_date: "2024-12-15".to_string(),
            calibration_period_months: 12,
            last_calibration: "2023-12-15".to_string(),
            status: "Çalışıyor".to_string(),
            active: ActiveFlag::Yes,
        },
        Device {
            id: 2,
            equipment: "Analitik Terazi".to_string(),
            unit_code: "T-005".to_string(),
            unit: "Fizik Lab".to_string(),
            model: "Explorer EX224".to_string(),
            serial_no: "SN-67890".to_string(),
            calibration_date: "2024-08-01".to_string(),
            calibration_period_months: 6,
            last_calibration: "2024-02-01".to_string(),
            status: "Çalışıyor".to_string(),
            active: ActiveFlag::Yes,
        },
        Device {
            id: 3,
            equipment: "Klimatik Kabin".to_string(),
            unit_code: "KK-002".to_string(),
            unit: "Ar-Ge Merkezi".to_string(),
            model: "Climacell EVO".to_string(),
            serial_no: "SN-ABCDE".to_string(),
            calibration_date: "2024-07-20".to_string(),
            calibration_period_months: 12,
            last_calibration: "2023-07-20".to_string(),
            status: "Bakımda".to_string(),
            active: ActiveFlag::Yes,
        },
        Device {
            id: 4,
            equipment: "Santrifüj".to_string(),
            unit_code: "S-010".to_string(),
            unit: "Biyoloji Lab".to_string(),
            model: "5424 R".to_string(),
            serial_no: "SN-FGHIJ".to_string(),
            calibration_date: "2023-10-10".to_string(),
            calibration_period_months: 24,
            last_calibration: "2021-10-10".to_string(),
            status: "Kalibrasyon Geçmiş".to_string(),
            active: ActiveFlag::Yes,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_serializes_with_original_labels() {
        let device = seed_devices().remove(0);
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["ID"], 1);
        assert_eq!(json["Ekipman"], "Dijital Pipet");
        assert_eq!(json["Birim Kodu"], "P-001");
        assert_eq!(json["Kalibrasyon Periyodu (ay)"], 12);
        assert_eq!(json["Aktif"], "Evet");
    }

    #[test]
    fn device_roundtrips_original_snapshot() {
        let raw = r#"{
            "ID": 42,
            "Ekipman": "Etüv",
            "Birim Kodu": "E-001",
            "Birim": "Mikrobiyoloji",
            "Model": "UF55",
            "Seri No": "SN-X",
            "Kalibrasyon Tarihi": "2025-01-01",
            "Kalibrasyon Periyodu (ay)": 6,
            "Son Kalibrasyon": "2024-07-01",
            "Durum": "Çalışıyor",
            "Aktif": "Hayır"
        }"#;
        let device: Device = serde_json::from_str(raw).unwrap();
        assert_eq!(device.id, 42);
        assert_eq!(device.active, ActiveFlag::No);
        let back = serde_json::to_string(&device).unwrap();
        let reparsed: Device = serde_json::from_str(&back).unwrap();
        assert_eq!(device, reparsed);
    }

    #[test]
    fn archived_device_flattens_fields() {
        let archived = ArchivedDevice {
            device: seed_devices().remove(1),
            archived_at: "2025-03-01T10:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&archived).unwrap();
        assert_eq!(json["Ekipman"], "Analitik Terazi");
        assert_eq!(json["Arşivlenme Tarihi"], "2025-03-01T10:00:00.000Z");
    }

    #[test]
    fn field_labels_roundtrip() {
        for field in DeviceField::ALL {
            assert_eq!(DeviceField::parse_label(field.label()), Some(field));
        }
        assert_eq!(DeviceField::parse_label("ID"), None);
    }

    #[test]
    fn set_value_parses_typed_fields() {
        let mut device = seed_devices().remove(0);
        assert!(DeviceField::CalibrationPeriodMonths.set_value(&mut device, "18"));
        assert_eq!(device.calibration_period_months, 18);
        assert!(!DeviceField::CalibrationPeriodMonths.set_value(&mut device, "soon"));
        assert_eq!(device.calibration_period_months, 18);

        assert!(DeviceField::Active.set_value(&mut device, "Hayır"));
        assert_eq!(device.active, ActiveFlag::No);
        assert!(!DeviceField::Active.set_value(&mut device, "maybe"));
        assert_eq!(device.active, ActiveFlag::No);
    }

    #[test]
    fn draft_from_row_reads_canonical_labels() {
        let mut row = BTreeMap::new();
        row.insert("Ekipman".to_string(), "Spektrofotometre".to_string());
        row.insert("Birim".to_string(), "Kimya Lab".to_string());
        row.insert("Kalibrasyon Periyodu (ay)".to_string(), "12".to_string());
        let draft = DeviceDraft::from_row(&row);
        assert_eq!(draft.equipment, "Spektrofotometre");
        assert_eq!(draft.unit, "Kimya Lab");
        assert_eq!(draft.calibration_period_months, 12);
        assert_eq!(draft.serial_no, "");
    }
}

use super::*;
use crate::device::{seed_devices, ActiveFlag, DeviceField};
use crate::store::MemoryStore;

fn seeded_repo() -> InventoryRepository<MemoryStore> {
    InventoryRepository::load(MemoryStore::new()).unwrap()
}

fn draft(equipment: &str, unit: &str) -> DeviceDraft {
    DeviceDraft {
        equipment: equipment.to_string(),
        unit: unit.to_string(),
        status: "Çalışıyor".to_string(),
        ..Default::default()
    }
}

#[test]
fn loads_seed_inventory_when_store_is_empty() {
    let repo = seeded_repo();
    assert_eq!(repo.devices().len(), 4);
    assert_eq!(repo.devices()[0].equipment, "Dijital Pipet");
    assert!(repo.archived().is_empty());
}

#[test]
fn loads_saved_state_instead_of_seeds() {
    let store = MemoryStore::new();
    store
        .put(StoreKey::Devices, &vec![seed_devices().remove(3)])
        .unwrap();
    let repo = InventoryRepository::load(store).unwrap();
    assert_eq!(repo.devices().len(), 1);
    assert_eq!(repo.devices()[0].equipment, "Santrifüj");
}

#[test]
fn add_device_assigns_unique_increasing_ids() {
    let mut repo = seeded_repo();
    let mut ids: Vec<i64> = repo.devices().iter().map(|d| d.id).collect();
    for i in 0..100 {
        ids.push(repo.add_device(draft(&format!("Cihaz {}", i), "Lab")).unwrap());
    }
    let mut deduped = ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
}

#[test]
fn added_device_starts_active() {
    let mut repo = seeded_repo();
    let id = repo.add_device(draft("Etüv", "Mikrobiyoloji")).unwrap();
    let device = repo.device(id).unwrap();
    assert_eq!(device.active, ActiveFlag::Yes);
    assert_eq!(device.equipment, "Etüv");
}

#[test]
fn bulk_import_assigns_fresh_ids_in_one_batch() {
    let mut repo = seeded_repo();
    let ids = repo
        .bulk_import(vec![draft("A", "Lab 1"), draft("B", "Lab 2"), draft("C", "Lab 3")])
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(repo.devices().len(), 7);
    for id in &ids {
        assert!(repo.device(*id).is_some());
        assert_eq!(repo.device(*id).unwrap().active, ActiveFlag::Yes);
    }
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 3);
}

#[test]
fn update_replaces_record_in_place() {
    let mut repo = seeded_repo();
    let mut updated = repo.devices()[1].clone();
    updated.status = "Bakımda".to_string();

    assert!(repo.update_device(updated).unwrap());

    // Position in the iteration order is preserved.
    assert_eq!(repo.devices()[1].id, 2);
    assert_eq!(repo.devices()[1].status, "Bakımda");
}

#[test]
fn update_records_one_entry_per_changed_field() {
    let mut repo = seeded_repo();
    let mut updated = repo.devices()[0].clone();
    updated.model = "Pipetman M".to_string();
    updated.calibration_period_months = 6;

    repo.update_device(updated).unwrap();

    let log = repo.change_log_for(1);
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].field, DeviceField::Model.label());
    assert_eq!(log[0].previous, "Pipetman L");
    assert_eq!(log[0].new, "Pipetman M");
    assert_eq!(log[1].field, DeviceField::CalibrationPeriodMonths.label());
    assert_eq!(log[1].previous, "12");
    assert_eq!(log[1].new, "6");
}

#[test]
fn noop_update_appends_nothing() {
    let mut repo = seeded_repo();
    let unchanged = repo.devices()[0].clone();
    assert!(repo.update_device(unchanged).unwrap());
    assert!(repo.change_log_for(1).is_empty());
}

#[test]
fn update_of_missing_device_is_tolerated() {
    let mut repo = seeded_repo();
    let mut ghost = repo.devices()[0].clone();
    ghost.id = 99_999;
    assert!(!repo.update_device(ghost).unwrap());
    assert_eq!(repo.devices().len(), 4);
    assert!(repo.change_log_for(99_999).is_empty());
}

#[test]
fn archive_then_restore_roundtrips_the_record() {
    let mut repo = seeded_repo();
    let original = repo.device(3).unwrap().clone();

    assert!(repo.archive_device(3).unwrap());
    assert!(repo.device(3).is_none());
    assert_eq!(repo.archived().len(), 1);
    assert_eq!(repo.archived()[0].device, original);
    assert!(!repo.archived()[0].archived_at.is_empty());

    assert!(repo.restore_device(3).unwrap());
    assert!(repo.archived().is_empty());
    let restored: Vec<_> = repo.devices().iter().filter(|d| d.id == 3).collect();
    assert_eq!(restored.len(), 1);
    assert_eq!(*restored[0], original);
}

#[test]
fn identifier_never_lives_in_both_collections() {
    let mut repo = seeded_repo();
    repo.archive_device(2).unwrap();
    for archived in repo.archived() {
        assert!(repo.device(archived.device.id).is_none());
    }
    repo.restore_device(2).unwrap();
    assert!(repo.archived().iter().all(|a| a.device.id != 2));
    assert!(repo.device(2).is_some());
}

#[test]
fn archive_and_restore_of_missing_ids_are_tolerated() {
    let mut repo = seeded_repo();
    assert!(!repo.archive_device(42).unwrap());
    assert!(!repo.restore_device(42).unwrap());
    assert_eq!(repo.devices().len(), 4);
    assert!(repo.archived().is_empty());
}

#[test]
fn notes_are_isolated_per_device() {
    let mut repo = seeded_repo();
    let note_x = repo.add_note(1, "filtre değişti").unwrap();
    let note_y = repo.add_note(2, "kapı contası gevşek").unwrap();

    assert!(repo.delete_note(1, note_x).unwrap());
    assert!(repo.notes_for(1).is_empty());
    assert_eq!(repo.notes_for(2).len(), 1);
    assert_eq!(repo.notes_for(2)[0].id, note_y);
}

#[test]
fn deleting_a_missing_note_is_tolerated() {
    let mut repo = seeded_repo();
    assert!(!repo.delete_note(1, 12345).unwrap());
    repo.add_note(1, "tek not").unwrap();
    assert!(!repo.delete_note(1, 12345).unwrap());
    assert_eq!(repo.notes_for(1).len(), 1);
}

#[test]
fn archiving_does_not_touch_notes() {
    let mut repo = seeded_repo();
    repo.add_note(3, "sertifika bekleniyor").unwrap();
    repo.archive_device(3).unwrap();
    assert_eq!(repo.notes_for(3).len(), 1);
    repo.restore_device(3).unwrap();
    assert_eq!(repo.notes_for(3).len(), 1);
}

#[test]
fn units_and_statuses_are_distinct_in_first_seen_order() {
    let mut repo = seeded_repo();
    repo.add_device(draft("Yedek Terazi", "Fizik Lab")).unwrap();
    assert_eq!(
        repo.units(),
        vec!["Kimya Lab", "Fizik Lab", "Ar-Ge Merkezi", "Biyoloji Lab"]
    );
    assert_eq!(
        repo.statuses(),
        vec!["Çalışıyor", "Bakımda", "Kalibrasyon Geçmiş"]
    );
}

#[test]
fn mutations_write_through_to_the_store() {
    let store = MemoryStore::new();
    let mut repo = InventoryRepository::load(store.clone()).unwrap();

    repo.archive_device(4).unwrap();
    repo.add_note(1, "ilk not").unwrap();
    let mut updated = repo.devices()[0].clone();
    updated.status = "Bakımda".to_string();
    repo.update_device(updated).unwrap();

    // A second repository over the same store sees the persisted state.
    let reloaded = InventoryRepository::load(store).unwrap();
    assert_eq!(reloaded.devices().len(), 3);
    assert_eq!(reloaded.archived().len(), 1);
    assert_eq!(reloaded.archived()[0].device.id, 4);
    assert_eq!(reloaded.notes_for(1).len(), 1);
    assert_eq!(reloaded.change_log_for(1).len(), 1);
}

#[test]
fn seed_scenario_archive_restore_then_edit_status() {
    let mut repo = seeded_repo();

    assert!(repo.archive_device(3).unwrap());
    assert!(repo.restore_device(3).unwrap());

    let mut updated = repo.device(3).unwrap().clone();
    updated.status = "Maintenance".to_string();
    assert!(repo.update_device(updated).unwrap());

    assert_eq!(repo.devices().len(), 4);
    assert!(repo.archived().is_empty());
    let log = repo.change_log_for(3);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].field, "Durum");
    assert_eq!(log[0].previous, "Bakımda");
    assert_eq!(log[0].new, "Maintenance");
}

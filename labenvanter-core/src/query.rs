//! Derived views over the inventory.
//!
//! Everything in this module is a pure projection: filters and sorting
//! never touch the underlying collections, and identical inputs always
//! produce the same output.

use crate::device::{ActiveFlag, Device, DeviceField, FieldValue, Note};
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;

/// Filter state for the active device view. All criteria compose by
/// conjunction; an unset criterion passes everything through.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    /// Exact match on unit name.
    pub unit: Option<String>,
    /// Case-insensitive substring match against any field's textual form.
    pub search: Option<String>,
    /// Exact match on status.
    pub status: Option<String>,
    /// Exact match on the active flag.
    pub active: Option<ActiveFlag>,
    /// Inclusive lower bound on the calibration date.
    pub calibration_from: Option<NaiveDate>,
    /// Inclusive upper bound on the calibration date.
    pub calibration_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub field: DeviceField,
    pub direction: SortDirection,
}

impl SortState {
    /// Selecting the column already sorted ascending flips it to
    /// descending; any other selection resets to ascending on that column.
    pub fn toggle(current: Option<SortState>, field: DeviceField) -> SortState {
        match current {
            Some(state)
                if state.field == field && state.direction == SortDirection::Ascending =>
            {
                SortState {
                    field,
                    direction: SortDirection::Descending,
                }
            }
            _ => SortState {
                field,
                direction: SortDirection::Ascending,
            },
        }
    }
}

/// Apply all filters, then sort. Returns references into the input slice;
/// the input is never reordered or mutated.
pub fn filter_and_sort<'a>(
    devices: &'a [Device],
    filter: &DeviceFilter,
    sort: Option<SortState>,
) -> Vec<&'a Device> {
    let mut view: Vec<&Device> = devices
        .iter()
        .filter(|device| matches_filter(device, filter))
        .collect();

    if let Some(sort) = sort {
        view.sort_by(|a, b| {
            let ordering = compare_field(a, b, sort.field);
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }
    view
}

fn matches_filter(device: &Device, filter: &DeviceFilter) -> bool {
    if let Some(unit) = &filter.unit {
        if device.unit != *unit {
            return false;
        }
    }
    if let Some(term) = &filter.search {
        if !term.is_empty() && !matches_search(device, term) {
            return false;
        }
    }
    if let Some(status) = &filter.status {
        if device.status != *status {
            return false;
        }
    }
    if let Some(active) = filter.active {
        if device.active != active {
            return false;
        }
    }
    // A date bound only admits devices whose calibration date parses and
    // satisfies the comparison; unparseable dates fail the bound.
    if let Some(from) = filter.calibration_from {
        match parse_date(&device.calibration_date) {
            Some(date) if date >= from => {}
            _ => return false,
        }
    }
    if let Some(to) = filter.calibration_to {
        match parse_date(&device.calibration_date) {
            Some(date) if date <= to => {}
            _ => return false,
        }
    }
    true
}

fn matches_search(device: &Device, term: &str) -> bool {
    let needle = term.to_lowercase();
    if device.id.to_string().contains(&needle) {
        return true;
    }
    DeviceField::ALL
        .into_iter()
        .any(|field| field.value(device).to_string().to_lowercase().contains(&needle))
}

fn compare_field(a: &Device, b: &Device, field: DeviceField) -> Ordering {
    match (field.value(a), field.value(b)) {
        (FieldValue::Number(x), FieldValue::Number(y)) => x.cmp(&y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

/// Parse a stored calibration date (`YYYY-MM-DD`).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Notes whose text contains the term, case-insensitively, in insertion
/// order. An empty term returns the full list. Display layers reverse the
/// result to show the newest note first.
pub fn filter_notes<'a>(notes: &'a [Note], term: &str) -> Vec<&'a Note> {
    if term.is_empty() {
        return notes.iter().collect();
    }
    let needle = term.to_lowercase();
    notes
        .iter()
        .filter(|note| note.text.to_lowercase().contains(&needle))
        .collect()
}

/// Derived urgency classification for a calibration date. Never persisted
/// and never part of filtering or sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Calibration date is strictly before today.
    Overdue,
    /// Calibration date falls within the next 30 days, inclusive.
    DueSoon,
    Normal,
}

/// Classify a calibration date relative to `today`. Empty or unparseable
/// dates are normal.
pub fn calibration_status(calibration_date: &str, today: NaiveDate) -> CalibrationStatus {
    let Some(date) = parse_date(calibration_date) else {
        return CalibrationStatus::Normal;
    };
    if date < today {
        CalibrationStatus::Overdue
    } else if date <= today + Duration::days(30) {
        CalibrationStatus::DueSoon
    } else {
        CalibrationStatus::Normal
    }
}

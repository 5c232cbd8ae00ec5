//! Open-stroke registry.
//!
//! Tracks which strokes are still receiving input. Two keying strategies
//! share one interface, selected at construction: a single global slot
//! (one device inks at a time) or a per-device map. Records outlive their
//! registry entry: `detach` stops further input while the handoff
//! coordinator still owns the record, `forget` destroys it.
//!
//! All mutation happens under the engine mutex held by the caller.

use crate::config::RegistryMode;
use crate::stroke::{StrokeId, StrokeRecord};
use liveink_core::{DeviceId, Ticks};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

pub(crate) struct StrokeRegistry {
    mode: RegistryMode,
    records: SlotMap<StrokeId, StrokeRecord>,
    /// Open strokes, single-slot mode.
    single: Vec<StrokeId>,
    /// Open strokes keyed by device, per-device mode.
    per_device: FxHashMap<DeviceId, Vec<StrokeId>>,
}

impl StrokeRegistry {
    pub fn new(mode: RegistryMode) -> Self {
        Self {
            mode,
            records: SlotMap::with_key(),
            single: Vec::new(),
            per_device: FxHashMap::default(),
        }
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    /// Insert a new open record.
    pub fn insert(&mut self, record: StrokeRecord) -> StrokeId {
        let device = record.device;
        let id = self.records.insert(record);
        match self.mode {
            RegistryMode::SingleStroke => self.single.push(id),
            RegistryMode::PerDevice => self.per_device.entry(device).or_default().push(id),
        }
        id
    }

    /// Find the open record whose window contains `timestamp`. Single-slot
    /// mode scans every open record; per-device mode scans only the given
    /// device's list.
    pub fn find(&self, device: DeviceId, timestamp: Ticks) -> Option<StrokeId> {
        let candidates = match self.mode {
            RegistryMode::SingleStroke => self.single.as_slice(),
            RegistryMode::PerDevice => self
                .per_device
                .get(&device)
                .map(|list| list.as_slice())
                .unwrap_or(&[]),
        };
        candidates
            .iter()
            .copied()
            .find(|&id| self.records[id].is_timestamp_within(timestamp))
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: StrokeId) -> Option<&StrokeRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: StrokeId) -> Option<&mut StrokeRecord> {
        self.records.get_mut(id)
    }

    /// Stop routing input to a record. The record itself stays alive until
    /// `forget`; detaching does not release any visuals.
    pub fn detach(&mut self, id: StrokeId) {
        self.single.retain(|&open| open != id);
        for list in self.per_device.values_mut() {
            list.retain(|&open| open != id);
        }
        self.per_device.retain(|_, list| !list.is_empty());
    }

    /// Destroy a record.
    pub fn forget(&mut self, id: StrokeId) -> Option<StrokeRecord> {
        self.detach(id);
        self.records.remove(id)
    }

    /// Number of records still receiving input.
    pub fn open_count(&self) -> usize {
        match self.mode {
            RegistryMode::SingleStroke => self.single.len(),
            RegistryMode::PerDevice => self.per_device.values().map(|l| l.len()).sum(),
        }
    }

    /// Every live record, open or mid-handoff.
    pub fn all_ids(&self) -> Vec<StrokeId> {
        self.records.keys().collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityConfig;
    use crate::host_slot::SlotIndex;
    use liveink_core::{InkStyle, PolylineBuilder};

    fn record(device: DeviceId, start: Ticks) -> StrokeRecord {
        StrokeRecord::new(
            device,
            start,
            InkStyle::default(),
            SlotIndex::A,
            Box::new(PolylineBuilder::new(2.0)),
            &QualityConfig::permissive(),
        )
    }

    #[test]
    fn test_single_mode_finds_any_open_record() {
        let mut registry = StrokeRegistry::new(RegistryMode::SingleStroke);
        let id = registry.insert(record(1, 100));

        // Open records claim every timestamp, regardless of device key.
        assert_eq!(registry.find(1, 150), Some(id));
        assert_eq!(registry.find(7, 150), Some(id));
    }

    #[test]
    fn test_per_device_mode_scopes_lookup() {
        let mut registry = StrokeRegistry::new(RegistryMode::PerDevice);
        let first = registry.insert(record(1, 100));
        let second = registry.insert(record(2, 100));

        assert_eq!(registry.find(1, 150), Some(first));
        assert_eq!(registry.find(2, 150), Some(second));
        assert_eq!(registry.find(3, 150), None);
    }

    #[test]
    fn test_closed_record_found_only_inside_window() {
        let mut registry = StrokeRegistry::new(RegistryMode::SingleStroke);
        let id = registry.insert(record(1, 100));
        {
            let record = registry.get_mut(id).unwrap();
            record.last_time = 200;
            record.seen_up = true;
        }

        assert_eq!(registry.find(1, 150), Some(id));
        assert_eq!(registry.find(1, 250), None);
    }

    #[test]
    fn test_detach_keeps_record_alive() {
        let mut registry = StrokeRegistry::new(RegistryMode::PerDevice);
        let id = registry.insert(record(1, 100));

        registry.detach(id);
        assert_eq!(registry.find(1, 150), None);
        assert_eq!(registry.open_count(), 0);
        assert!(registry.contains(id));
        assert_eq!(registry.record_count(), 1);

        assert!(registry.forget(id).is_some());
        assert!(!registry.contains(id));
    }
}

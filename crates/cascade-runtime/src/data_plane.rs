//! Routing of port values between engines.
//!
//! Every standard-component port gets a [`VId`] the first time it is seen.
//! Ids are stable for the life of the runtime, so engines kept across a
//! rebuild keep talking about the same ports.

use std::collections::HashMap;

use cascade_core::bits::Bits;

use crate::engine::VId;

#[derive(Debug, Default)]
pub struct DataPlane {
    names: HashMap<String, VId>,
    last: Vec<Option<Bits>>,
    readers: Vec<Vec<usize>>,
}

impl DataPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of a port variable, allocating one on first use.
    pub fn vid(&mut self, name: &str) -> VId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = self.last.len();
        self.names.insert(name.to_string(), id);
        self.last.push(None);
        self.readers.push(Vec::new());
        id
    }

    pub fn lookup(&self, name: &str) -> Option<VId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    pub fn clear_readers(&mut self) {
        for r in &mut self.readers {
            r.clear();
        }
    }

    pub fn add_reader(&mut self, vid: VId, engine: usize) {
        if let Some(r) = self.readers.get_mut(vid) {
            if !r.contains(&engine) {
                r.push(engine);
            }
        }
    }

    /// Record a write. Returns the engines to notify, which is empty when the
    /// value did not change.
    pub fn write(&mut self, vid: VId, value: &Bits) -> &[usize] {
        let Some(slot) = self.last.get_mut(vid) else {
            return &[];
        };
        if slot.as_ref().is_some_and(|old| old == value) {
            return &[];
        }
        *slot = Some(value.clone());
        &self.readers[vid]
    }

    /// Engines that read `vid`.
    pub fn readers(&self, vid: VId) -> &[usize] {
        self.readers.get(vid).map_or(&[], Vec::as_slice)
    }

    pub fn last(&self, vid: VId) -> Option<&Bits> {
        self.last.get(vid).and_then(Option::as_ref)
    }

    /// Overwrite the recorded value without notifying anyone.
    pub fn force(&mut self, vid: VId, value: Bits) {
        if let Some(slot) = self.last.get_mut(vid) {
            *slot = Some(value);
        }
    }
}

//! Context windows around a matched verse
//!
//! All mapping entries live in one flat array in storage order, next to a
//! parallel array of section ids. A window is found by scanning outward from
//! the target slot and stopping, on each side, at the first unit that is in
//! another section or further than `radius` ordinals away. A window therefore
//! never crosses a section boundary: near the start or end of a book it is
//! simply shorter on that side. Units dropped at ingestion leave ordinal gaps,
//! which the distance rule skips over.

use std::collections::HashMap;

use crate::errors::Result;
use crate::errors::VerseRagError;
use crate::models::CorpusUnit;

/// Ordered corpus units with id lookup and section-bounded neighborhoods
#[derive(Debug, Clone)]
pub struct CorpusArena {
    units: Vec<CorpusUnit>,
    section_ids: Vec<i64>,
    positions: HashMap<i64, usize>,
}

impl CorpusArena {
    pub fn new(units: Vec<CorpusUnit>) -> Self {
        let section_ids = units.iter().map(|u| u.section_id).collect();
        let positions = units
            .iter()
            .enumerate()
            .map(|(slot, unit)| (unit.id, slot))
            .collect();
        Self {
            units,
            section_ids,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&CorpusUnit> {
        self.units.get(slot)
    }

    pub fn position_of(&self, unit_id: i64) -> Option<usize> {
        self.positions.get(&unit_id).copied()
    }

    pub fn units(&self) -> &[CorpusUnit] {
        &self.units
    }

    /// Slots of the neighbors of `slot`, in storage order, target excluded
    pub fn window_slots(&self, slot: usize, radius: usize) -> Vec<usize> {
        let Some(target) = self.units.get(slot) else {
            return Vec::new();
        };
        if radius == 0 {
            return Vec::new();
        }
        let section = self.section_ids[slot];
        let radius = radius as u64;

        let mut before = Vec::new();
        let mut j = slot;
        while j > 0 {
            j -= 1;
            if self.section_ids[j] != section {
                break;
            }
            let ordinal = self.units[j].ordinal;
            if ordinal >= target.ordinal || u64::from(target.ordinal - ordinal) > radius {
                break;
            }
            before.push(j);
        }
        before.reverse();

        let mut after = Vec::new();
        for j in slot + 1..self.units.len() {
            if self.section_ids[j] != section {
                break;
            }
            let ordinal = self.units[j].ordinal;
            if ordinal <= target.ordinal || u64::from(ordinal - target.ordinal) > radius {
                break;
            }
            after.push(j);
        }

        before.extend(after);
        before
    }

    /// Up to `radius` units on each side of `unit_id`, same section only
    pub fn context(&self, unit_id: i64, radius: usize) -> Result<Vec<CorpusUnit>> {
        let slot = self
            .position_of(unit_id)
            .ok_or_else(|| VerseRagError::Validation(format!("unknown unit id {unit_id}")))?;
        Ok(self.context_at(slot, radius))
    }

    pub(crate) fn context_at(&self, slot: usize, radius: usize) -> Vec<CorpusUnit> {
        self.window_slots(slot, radius)
            .into_iter()
            .map(|j| self.units[j].clone())
            .collect()
    }
}

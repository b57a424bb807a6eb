//! Texture slot assignment for one batch.

use super::texture::TextureId;

/// Outcome of [`TextureSlotTable::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotBind {
    /// Texture already held this slot.
    Existing(u32),
    /// Texture was given the next free slot.
    Assigned(u32),
    /// Every slot is taken by another texture; the batch must flush first.
    Exhausted,
}

impl SlotBind {
    pub fn slot(self) -> Option<u32> {
        match self {
            SlotBind::Existing(slot) | SlotBind::Assigned(slot) => Some(slot),
            SlotBind::Exhausted => None,
        }
    }
}

/// Maps textures to sampler slots `0..capacity` in first-seen order.
///
/// A slot, once assigned, is stable until [`clear`](Self::clear). There is no
/// eviction: when the table is full the only way forward is a flush.
#[derive(Debug, Clone)]
pub struct TextureSlotTable {
    slots: Vec<TextureId>,
    capacity: u32,
}

impl TextureSlotTable {
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity as usize),
            capacity,
        }
    }

    pub fn bind(&mut self, texture: TextureId) -> SlotBind {
        if let Some(slot) = self.slot_of(texture) {
            return SlotBind::Existing(slot);
        }
        if self.is_full() {
            return SlotBind::Exhausted;
        }
        self.slots.push(texture);
        SlotBind::Assigned(self.slots.len() as u32 - 1)
    }

    pub fn slot_of(&self, texture: TextureId) -> Option<u32> {
        self.slots.iter().position(|&t| t == texture).map(|i| i as u32)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Change the number of slots. Only valid on an empty table.
    pub fn set_capacity(&mut self, capacity: u32) {
        debug_assert!(self.slots.is_empty(), "resizing a slot table in use");
        self.slots.clear();
        self.capacity = capacity.max(1);
    }

    /// Textures in slot order.
    pub fn textures(&self) -> &[TextureId] {
        &self.slots
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() as u32 >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut table = TextureSlotTable::new(4);
        assert_eq!(table.bind(TextureId(7)), SlotBind::Assigned(0));
        assert_eq!(table.bind(TextureId(3)), SlotBind::Assigned(1));
        assert_eq!(table.bind(TextureId(7)), SlotBind::Existing(0));
        assert_eq!(table.bind(TextureId(5)), SlotBind::Assigned(2));
        assert_eq!(table.textures(), &[TextureId(7), TextureId(3), TextureId(5)]);
    }

    #[test]
    fn test_exhausted_leaves_table_unchanged() {
        let mut table = TextureSlotTable::new(2);
        table.bind(TextureId(1));
        table.bind(TextureId(2));
        assert_eq!(table.bind(TextureId(3)), SlotBind::Exhausted);
        assert_eq!(table.len(), 2);
        // Resident textures still resolve on a full table.
        assert_eq!(table.bind(TextureId(2)), SlotBind::Existing(1));
    }

    #[test]
    fn test_clear_restarts_assignment() {
        let mut table = TextureSlotTable::new(2);
        table.bind(TextureId(1));
        table.bind(TextureId(2));
        table.clear();
        assert_eq!(table.bind(TextureId(2)), SlotBind::Assigned(0));
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        let mut table = TextureSlotTable::new(0);
        assert_eq!(table.capacity(), 1);
        table.set_capacity(0);
        assert_eq!(table.bind(TextureId(9)).slot(), Some(0));
    }
}

use super::Slot;
use molten_api::{MoltenError, MoltenResult};
use std::convert::Infallible;

/// A fixed-width array of slots that is bound with a single batched call.
///
/// `bind_all` computes the smallest contiguous range of slots whose pending value differs from
/// the bound value and hands exactly that range to the binder. Unchanged slots between two changed
/// slots are included so the range stays contiguous.
///
/// The range computed by the last `bind_all` remains readable through `first_changed`,
/// `last_changed` and `num_slots_changed` until the next `bind_all` begins.
#[derive(Debug, Clone, Default)]
pub struct SlotGroup<T> {
    slots: Vec<Slot<T>>,
    first_changed: u32,
    last_changed: u32,
    num_slots_changed: u32,
    // Reused for every batched bind, never grows past the group width
    scratch: Vec<T>,
}

impl<T: Clone + PartialEq + Default> SlotGroup<T> {
    pub fn new(slot_count: u32) -> Self {
        SlotGroup {
            slots: (0..slot_count).map(Slot::new).collect(),
            first_changed: 0,
            last_changed: 0,
            num_slots_changed: 0,
            scratch: Vec::with_capacity(slot_count as usize),
        }
    }

    /// Number of slots in the group
    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(
        &self,
        index: u32,
    ) -> Option<&Slot<T>> {
        self.slots.get(index as usize)
    }

    pub fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    pub fn set_pending(
        &mut self,
        index: u32,
        value: T,
    ) -> MoltenResult<()> {
        let slot_count = self.slots.len();
        let slot = self.slots.get_mut(index as usize).ok_or_else(|| {
            MoltenError::invalid_operation(format!(
                "slot {} is out of range, the group has {} slots",
                index, slot_count
            ))
        })?;
        slot.set_pending(value);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.slots.iter().any(|x| x.is_dirty())
    }

    pub fn first_changed(&self) -> Option<u32> {
        if self.num_slots_changed > 0 {
            Some(self.first_changed)
        } else {
            None
        }
    }

    pub fn last_changed(&self) -> Option<u32> {
        if self.num_slots_changed > 0 {
            Some(self.last_changed)
        } else {
            None
        }
    }

    /// Number of slots that actually differed in the last batched bind. This can be smaller than
    /// the width of the range handed to the binder.
    pub fn num_slots_changed(&self) -> u32 {
        self.num_slots_changed
    }

    fn reset_changed_range(&mut self) {
        self.first_changed = 0;
        self.last_changed = 0;
        self.num_slots_changed = 0;
    }

    /// Bind every changed slot in one call to `binder(first_slot, values)`.
    ///
    /// Returns true if the binder ran. On failure the bound values are left untouched and the
    /// changed range is cleared.
    pub fn bind_all<E, F: FnOnce(u32, &[T]) -> Result<(), E>>(
        &mut self,
        binder: F,
    ) -> Result<bool, E> {
        self.reset_changed_range();

        let mut first = u32::MAX;
        let mut last = 0;
        let mut num_changed = 0;
        for slot in &self.slots {
            if slot.is_dirty() {
                first = first.min(slot.index());
                last = last.max(slot.index());
                num_changed += 1;
            }
        }

        if num_changed == 0 {
            return Ok(false);
        }

        let range = first as usize..=last as usize;

        self.scratch.clear();
        self.scratch.extend(
            self.slots[range.clone()]
                .iter()
                .map(|x| x.pending().clone()),
        );

        let result = (binder)(first, &self.scratch);

        // Don't hold on to resource references between binds
        self.scratch.clear();
        result?;

        for slot in &mut self.slots[range] {
            slot.mark_bound();
        }

        self.first_changed = first;
        self.last_changed = last;
        self.num_slots_changed = num_changed;
        Ok(true)
    }

    /// `bind_all` for binders that cannot fail
    pub(crate) fn bind_all_infallible<F: FnOnce(u32, &[T])>(
        &mut self,
        binder: F,
    ) -> bool {
        let result = self.bind_all(|first_slot, values| -> Result<(), Infallible> {
            (binder)(first_slot, values);
            Ok(())
        });

        match result {
            Ok(changed) => changed,
            Err(never) => match never {},
        }
    }

    pub(crate) fn invalidate_bound(&mut self) {
        for slot in &mut self.slots {
            slot.invalidate_bound();
        }
        self.reset_changed_range();
    }

    pub(crate) fn reset_pending(&mut self) {
        for slot in &mut self.slots {
            slot.reset_pending();
        }
    }

    pub(crate) fn request_bound_of(
        &mut self,
        other: &SlotGroup<T>,
    ) {
        for (slot, other_slot) in self.slots.iter_mut().zip(&other.slots) {
            slot.request_bound_of(other_slot);
        }
    }

    pub(crate) fn copy_from(
        &mut self,
        other: &SlotGroup<T>,
    ) {
        self.slots.truncate(other.slots.len());
        for (slot, other_slot) in self.slots.iter_mut().zip(&other.slots) {
            slot.copy_from(other_slot);
        }

        let existing = self.slots.len();
        self.slots
            .extend(other.slots[existing..].iter().cloned());

        self.first_changed = other.first_changed;
        self.last_changed = other.last_changed;
        self.num_slots_changed = other.num_slots_changed;
        self.scratch.reserve(self.slots.len());
    }

    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
        self.reset_changed_range();
    }

    pub(crate) fn bindings_eq(
        &self,
        other: &SlotGroup<T>,
    ) -> bool {
        self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| a.bindings_eq(b))
    }
}

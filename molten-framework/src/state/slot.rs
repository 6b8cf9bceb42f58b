use std::convert::Infallible;

/// A single binding point in the pipeline.
///
/// A slot holds two values: the *pending* value (what the next draw wants) and the *bound* value
/// (what was last issued to the command list). `bind` only issues a command when the two differ,
/// which is what keeps redundant state changes out of the command stream.
#[derive(Debug, Clone, Default)]
pub struct Slot<T> {
    index: u32,
    pending: T,
    bound: T,
    version: u64,
}

impl<T: Clone + PartialEq + Default> Slot<T> {
    pub fn new(index: u32) -> Self {
        Slot {
            index,
            pending: T::default(),
            bound: T::default(),
            version: 0,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn pending(&self) -> &T {
        &self.pending
    }

    pub fn bound(&self) -> &T {
        &self.bound
    }

    /// Incremented every time the pending value changes
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.pending != self.bound
    }

    pub fn set_pending(
        &mut self,
        value: T,
    ) {
        if self.pending != value {
            self.pending = value;
            self.version += 1;
        }
    }

    /// Issue the pending value through `binder` if it differs from the bound value.
    ///
    /// Returns true if the binder ran. If the binder fails, the bound value is left untouched so
    /// the next call retries.
    pub fn bind<E, F: FnOnce(u32, &T) -> Result<(), E>>(
        &mut self,
        binder: F,
    ) -> Result<bool, E> {
        if !self.is_dirty() {
            return Ok(false);
        }

        (binder)(self.index, &self.pending)?;
        self.bound = self.pending.clone();
        Ok(true)
    }

    /// `bind` for binders that cannot fail
    pub(crate) fn bind_infallible<F: FnOnce(u32, &T)>(
        &mut self,
        binder: F,
    ) -> bool {
        let result = self.bind(|index, value| -> Result<(), Infallible> {
            (binder)(index, value);
            Ok(())
        });

        match result {
            Ok(changed) => changed,
            Err(never) => match never {},
        }
    }

    /// Record that the pending value was issued by something other than `bind` (a batched group
    /// bind, for example)
    pub(crate) fn mark_bound(&mut self) {
        if self.is_dirty() {
            self.bound = self.pending.clone();
        }
    }

    /// Forget what is bound. Used when recording moves to a command list that has no state yet.
    pub(crate) fn invalidate_bound(&mut self) {
        self.bound = T::default();
    }

    /// Reset the pending value to its default. Bound state is unaffected.
    pub(crate) fn reset_pending(&mut self) {
        self.set_pending(T::default());
    }

    /// Ask for whatever `other` has bound. Used when a saved state is restored during recording.
    pub(crate) fn request_bound_of(
        &mut self,
        other: &Slot<T>,
    ) {
        self.set_pending(other.bound.clone());
    }

    /// Become an exact copy of `other`, reusing existing allocations where possible
    pub(crate) fn copy_from(
        &mut self,
        other: &Slot<T>,
    ) {
        self.index = other.index;
        self.pending.clone_from(&other.pending);
        self.bound.clone_from(&other.bound);
        self.version = other.version;
    }

    /// Drop both values so a pooled slot does not keep resources alive
    pub(crate) fn clear(&mut self) {
        self.pending = T::default();
        self.bound = T::default();
        self.version = 0;
    }

    pub(crate) fn bindings_eq(
        &self,
        other: &Slot<T>,
    ) -> bool {
        self.pending == other.pending && self.bound == other.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molten_api::{MoltenError, MoltenResult};

    #[test]
    fn test_bind_is_idempotent() {
        let mut slot = Slot::<Option<u32>>::new(3);
        slot.set_pending(Some(7));

        let mut issued = Vec::new();
        let changed = slot
            .bind(|index, value| -> MoltenResult<()> {
                issued.push((index, *value));
                Ok(())
            })
            .unwrap();
        assert!(changed);

        // Same pending value, nothing should be issued
        let changed = slot
            .bind(|index, value| -> MoltenResult<()> {
                issued.push((index, *value));
                Ok(())
            })
            .unwrap();
        assert!(!changed);
        assert_eq!(issued, vec![(3, Some(7))]);
        assert_eq!(*slot.bound(), Some(7));
    }

    #[test]
    fn test_unbinding_is_a_change() {
        let mut slot = Slot::<Option<u32>>::new(1);
        slot.set_pending(Some(7));
        slot.bind(|_, _| -> MoltenResult<()> { Ok(()) }).unwrap();

        slot.set_pending(None);
        let mut issued = Vec::new();
        let changed = slot
            .bind(|index, value| -> MoltenResult<()> {
                issued.push((index, *value));
                Ok(())
            })
            .unwrap();
        assert!(changed);
        assert_eq!(issued, vec![(1, None)]);
        assert_eq!(*slot.bound(), None);
    }

    #[test]
    fn test_failed_bind_leaves_bound_value() {
        let mut slot = Slot::<Option<u32>>::new(0);
        slot.set_pending(Some(1));

        let result = slot.bind(|_, _| Err(MoltenError::StringError("nope".to_string())));
        assert!(result.is_err());
        assert_eq!(*slot.bound(), None);
        assert!(slot.is_dirty());
    }

    #[test]
    fn test_version_tracks_pending_changes() {
        let mut slot = Slot::<u32>::new(0);
        slot.set_pending(4);
        slot.set_pending(4);
        assert_eq!(slot.version(), 1);
        slot.set_pending(5);
        assert_eq!(slot.version(), 2);
    }
}

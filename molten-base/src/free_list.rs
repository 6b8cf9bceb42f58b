/// A free-list of reusable objects.
///
/// Unlike a drop-guard pool, values are handed out by value and must be given back explicitly with
/// `release`. The reset function runs on release so that a value sitting in the free-list never
/// holds references that would extend the lifetime of something else (resources, callbacks, etc.)
pub struct FreeList<T> {
    free: Vec<T>,
    num_acquired: usize,
    num_created: usize,
    init_fn: fn() -> T,
    reset_fn: fn(&mut T),
}

impl<T> FreeList<T> {
    pub fn new(
        init_fn: fn() -> T,
        reset_fn: fn(&mut T),
    ) -> Self {
        Self::with_capacity(0, init_fn, reset_fn)
    }

    /// Creates the free-list and pre-populates it with `initial_count` values
    pub fn with_capacity(
        initial_count: usize,
        init_fn: fn() -> T,
        reset_fn: fn(&mut T),
    ) -> Self {
        let mut free = Vec::with_capacity(initial_count);
        for _ in 0..initial_count {
            free.push((init_fn)());
        }

        FreeList {
            free,
            num_acquired: 0,
            num_created: initial_count,
            init_fn,
            reset_fn,
        }
    }

    /// Take a value out of the free-list, constructing a new one if the list is empty
    pub fn acquire(&mut self) -> T {
        self.num_acquired += 1;
        if let Some(value) = self.free.pop() {
            value
        } else {
            self.num_created += 1;
            (self.init_fn)()
        }
    }

    /// Return a value to the free-list. The value is scrubbed with the reset function first.
    ///
    /// Values that were constructed elsewhere may be released too. They are only kept while fewer
    /// values are outstanding than were handed out, otherwise they are dropped, so the list never
    /// holds more than `num_created` values.
    pub fn release(
        &mut self,
        mut value: T,
    ) {
        if self.num_acquired == 0 {
            log::trace!(
                "Dropped a {} that was not acquired from this free-list",
                core::any::type_name::<T>()
            );
            return;
        }

        (self.reset_fn)(&mut value);
        self.num_acquired -= 1;
        self.free.push(value);
    }

    /// Number of values currently handed out
    pub fn num_acquired(&self) -> usize {
        self.num_acquired
    }

    /// Number of values waiting in the free-list
    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    /// Total number of values ever constructed by this free-list
    pub fn num_created(&self) -> usize {
        self.num_created
    }
}

use std::fmt;

/// Identifies a callback registered with a `CallbackList`. Pass it to `unregister` to remove the
/// callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(u64);

type BoxedCallback<ArgsT> = Box<dyn FnMut(&ArgsT) + Send>;

/// An ordered list of callbacks. Callbacks are invoked in the order they were registered.
pub struct CallbackList<ArgsT> {
    callbacks: Vec<(CallbackHandle, BoxedCallback<ArgsT>)>,
    next_handle: u64,
}

impl<ArgsT> Default for CallbackList<ArgsT> {
    fn default() -> Self {
        CallbackList {
            callbacks: Vec::default(),
            next_handle: 1,
        }
    }
}

impl<ArgsT> fmt::Debug for CallbackList<ArgsT> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CallbackList")
            .field("len", &self.callbacks.len())
            .finish()
    }
}

impl<ArgsT> CallbackList<ArgsT> {
    pub fn register<F: FnMut(&ArgsT) + Send + 'static>(
        &mut self,
        callback: F,
    ) -> CallbackHandle {
        let handle = CallbackHandle(self.next_handle);
        self.next_handle += 1;
        self.callbacks.push((handle, Box::new(callback)));
        handle
    }

    /// Returns true if the callback was registered
    pub fn unregister(
        &mut self,
        handle: CallbackHandle,
    ) -> bool {
        let len_before = self.callbacks.len();
        self.callbacks.retain(|(h, _)| *h != handle);
        len_before != self.callbacks.len()
    }

    pub fn invoke(
        &mut self,
        args: &ArgsT,
    ) {
        for (_, callback) in &mut self.callbacks {
            (callback)(args);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}

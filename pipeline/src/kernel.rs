use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use frame_filter_common::kernel::Kernel;

/// A [`Kernel`] shared between the editor (writer) and convolution stages (readers).
///
/// Readers take an immutable snapshot; writers build a modified copy and swap
/// it in. A reader therefore sees either every weight of an edit or none.
/// Writers are serialized so concurrent edits cannot lose each other's changes.
#[derive(Debug, Clone)]
pub struct SharedKernel {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    current: ArcSwap<Kernel>,
    write: Mutex<()>,
}

impl SharedKernel {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: ArcSwap::from_pointee(kernel),
                write: Mutex::new(()),
            }),
        }
    }

    /// The kernel as of now. Later edits do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<Kernel> {
        self.inner.current.load_full()
    }

    /// Apply `edit` to a copy of the current kernel and publish the result.
    ///
    /// If `edit` fails nothing is published and the current kernel is kept.
    pub fn update<T, E>(&self, edit: impl FnOnce(&mut Kernel) -> Result<T, E>) -> Result<T, E> {
        let _guard = self
            .inner
            .write
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = Kernel::clone(&self.inner.current.load());
        let out = edit(&mut next)?;
        self.inner.current.store(Arc::new(next));
        Ok(out)
    }

    /// True if both handles refer to the same shared kernel.
    pub fn ptr_eq(&self, other: &SharedKernel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

//! The strong & weak counts of an ownership group.

use core::cell::Cell;

/// A reference count with a strong and weak counts.
///
/// The strong count represents the number of `SharedPtr` of the group. The managed object is dropped when the strong
/// count reaches 0.
///
/// The weak count represents the number of `WeakPtr` of the group. The control block is deallocated when both counts
/// have reached 0.
///
/// The counts only ever _report_ transitions, it is up to the caller to act on them, so that no reference to the
/// counts is held while the control block is being deallocated.
#[derive(Debug)]
pub(crate) struct RefCounts {
    strong: Cell<usize>,
    weak: Cell<usize>,
}

impl RefCounts {
    /// Constructs the counts of a freshly created ownership group: a single strong handle, and no weak handle.
    #[inline(always)]
    pub(crate) const fn new() -> Self {
        let strong = Cell::new(1);
        let weak = Cell::new(0);

        Self { strong, weak }
    }

    /// Returns the strong count.
    #[inline(always)]
    pub(crate) fn strong_count(&self) -> usize {
        self.strong.get()
    }

    /// Returns the weak count.
    #[inline(always)]
    pub(crate) fn weak_count(&self) -> usize {
        self.weak.get()
    }

    /// Increments the strong count.
    ///
    /// #   Safety
    ///
    /// -   Alive: the strong count is at least 1, the caller holds a strong handle.
    #[inline(always)]
    pub(crate) unsafe fn increment_strong(&self) {
        debug_assert!(self.strong.get() > 0);

        self.strong.set(self.strong.get() + 1);
    }

    /// Tries to increment the strong count, unless it is already zero.
    ///
    /// Returns whether the increment succeeded.
    #[inline(always)]
    pub(crate) fn try_increment_strong(&self) -> bool {
        let strong = self.strong.get();

        if strong == 0 {
            return false;
        }

        self.strong.set(strong + 1);

        true
    }

    /// Decrements the strong count.
    ///
    /// Returns whether the strong count reached 0, in which case the managed object MUST be dropped.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller relinquishes one strong handle.
    #[inline(always)]
    #[must_use]
    pub(crate) unsafe fn decrement_strong(&self) -> bool {
        debug_assert!(self.strong.get() > 0);

        let strong = self.strong.get() - 1;
        self.strong.set(strong);

        strong == 0
    }

    /// Increments the weak count.
    #[inline(always)]
    pub(crate) fn increment_weak(&self) {
        self.weak.set(self.weak.get() + 1);
    }

    /// Decrements the weak count.
    ///
    /// Returns whether both counts are now 0, in which case the control block MUST be deallocated.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller relinquishes one weak handle.
    #[inline(always)]
    #[must_use]
    pub(crate) unsafe fn decrement_weak(&self) -> bool {
        debug_assert!(self.weak.get() > 0);

        let weak = self.weak.get() - 1;
        self.weak.set(weak);

        weak == 0 && self.strong.get() == 0
    }
}

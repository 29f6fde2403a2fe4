//! The weak handle of an ownership group, the equivalent of `Weak<T>`.

use core::{
    fmt,
    marker::PhantomData,
    mem,
    panic::{RefUnwindSafe, UnwindSafe},
    ptr::NonNull,
};

use crate::{RawBlock, SharedPtr};

/// A nullable, non-owning, pointer.
///
/// A `WeakPtr` keeps the control block of its ownership group alive, but not the managed object. It can check whether
/// the object is still alive, with `expired`, and attempt to promote itself to a `SharedPtr`, with `lock` or `upgrade`.
pub struct WeakPtr<T>
where
    T: ?Sized,
{
    //  Invariant:
    //  -   Weak: if `Some`, this instance accounts for one weak count.
    block: Option<RawBlock>,
    //  Only valid while the strong count of `block` is positive.
    observer: Option<NonNull<T>>,
    //  Whether `observer` may be written through, as per the `SharedPtr` it was created from.
    writable: bool,
    _marker: PhantomData<T>,
}

//
//  Construction
//

impl<T> WeakPtr<T>
where
    T: ?Sized,
{
    /// Creates an empty instance, which is always expired.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            block: None,
            observer: None,
            writable: false,
            _marker: PhantomData,
        }
    }
}

impl<T> From<&SharedPtr<T>> for WeakPtr<T>
where
    T: ?Sized,
{
    fn from(shared: &SharedPtr<T>) -> Self {
        let (block, observer, writable) = SharedPtr::as_parts(shared);

        if let Some(block) = block {
            //  Safety:
            //  -   Alive: `shared` holds a strong count.
            //  -   Accounting: accounted for by the returned instance.
            unsafe { block.increment_weak() };
        }

        Self {
            block,
            observer,
            writable,
            _marker: PhantomData,
        }
    }
}

//
//  Promotion
//

impl<T> WeakPtr<T>
where
    T: ?Sized,
{
    /// Attempts to promote to a `SharedPtr`.
    ///
    /// Returns `None` if the managed object was already dropped, or if `self` is empty.
    #[inline]
    pub fn upgrade(&self) -> Option<SharedPtr<T>> {
        let block = self.block?;

        //  Safety:
        //  -   Alive: `self` holds a weak count.
        //  -   Accounting: on success, accounted for by the returned instance.
        let upgraded = unsafe { block.try_increment_strong() };

        //  Safety:
        //  -   Strong: incremented above.
        //  -   Valid: the object is alive, since the strong count was positive.
        //  -   Writable: as per the `SharedPtr` `self` was created from.
        upgraded.then(|| unsafe { SharedPtr::from_parts(Some(block), self.observer, self.writable) })
    }

    /// Attempts to promote to a `SharedPtr`.
    ///
    /// Returns an empty `SharedPtr` if the managed object was already dropped, or if `self` is empty.
    #[inline]
    pub fn lock(&self) -> SharedPtr<T> {
        self.upgrade().unwrap_or_default()
    }
}

//
//  Modifiers
//

impl<T> WeakPtr<T>
where
    T: ?Sized,
{
    /// Releases the weak count, leaving `self` empty.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Swaps the contents of `self` and `other`.
    #[inline(always)]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }
}

//
//  High-level Access
//

impl<T> WeakPtr<T>
where
    T: ?Sized,
{
    /// Returns the number of strong handles of the ownership group, or 0 if empty.
    #[inline(always)]
    pub fn use_count(&self) -> usize {
        //  Safety:
        //  -   Alive: `self` holds a weak count.
        self.block.map_or(0, |block| unsafe { block.strong_count() })
    }

    /// Returns the number of weak handles of the ownership group, or 0 if empty.
    #[inline(always)]
    pub fn weak_count(&self) -> usize {
        //  Safety:
        //  -   Alive: `self` holds a weak count.
        self.block.map_or(0, |block| unsafe { block.weak_count() })
    }

    /// Returns whether the managed object was already dropped, or `self` is empty.
    #[inline(always)]
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// Returns whether `self` and `other` belong to the same ownership group.
    ///
    /// Two empty pointers are considered to belong to the same, empty, group.
    #[inline(always)]
    pub fn owner_eq<U>(&self, other: &WeakPtr<U>) -> bool
    where
        U: ?Sized,
    {
        self.block.map(RawBlock::addr) == other.block.map(RawBlock::addr)
    }
}

//
//  Clone & Drop
//

impl<T> Clone for WeakPtr<T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            //  Safety:
            //  -   Alive: `self` holds a weak count.
            //  -   Accounting: accounted for by the returned instance.
            unsafe { block.increment_weak() };
        }

        Self {
            block: self.block,
            observer: self.observer,
            writable: self.writable,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for WeakPtr<T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };

        //  Safety:
        //  -   Accounting: the weak count held by `self` is relinquished, and `block` no longer used.
        unsafe { block.release_weak() };
    }
}

impl<T> Default for WeakPtr<T>
where
    T: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

//
//  Formatting
//

impl<T> fmt::Debug for WeakPtr<T>
where
    T: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("WeakPtr")
            .field("use_count", &self.use_count())
            .field("weak_count", &self.weak_count())
            .finish()
    }
}

//
//  Markers
//

impl<T> Unpin for WeakPtr<T> where T: ?Sized {}

impl<T> UnwindSafe for WeakPtr<T> where T: ?Sized + RefUnwindSafe {}

// mod tests

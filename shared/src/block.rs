//! Handles the actual memory finnicky details of reference counting, independently of the managed type.

use core::ptr::NonNull;

use alloc::boxed::Box;

use crate::RefCounts;

/// The contract of a control block, whichever its layout.
///
/// The control block holds the counts of an ownership group, and the means to drop the managed object. It is only
/// ever manipulated through `RawBlock`, which erases its concrete type.
///
/// #   Safety
///
/// -   Stable: `counts` always returns a reference to the same instance.
/// -   Drop: `drop_object` drops the managed object, and nothing else; dropping the block itself MUST NOT drop the
///     managed object.
pub(crate) unsafe trait ControlBlock {
    /// Returns the counts of the ownership group.
    fn counts(&self) -> &RefCounts;

    /// Drops the managed object.
    ///
    /// #   Safety
    ///
    /// -   Once: invoked at most once, after the strong count reached 0.
    unsafe fn drop_object(&self);

    /// Returns the name of the layout, for diagnostics.
    fn kind(&self) -> &'static str;
}

/// A type-erased pointer to a heap-allocated control block.
///
/// `RawBlock` is `Copy`: it does not, by itself, own anything. The handles holding it are responsible for maintaining
/// the counts faithfully.
#[derive(Clone, Copy)]
pub(crate) struct RawBlock {
    //  Safety:
    //  -   Allocated: obtained from `Box::into_raw`, and deallocated only once both counts reached 0.
    ptr: NonNull<dyn ControlBlock>,
}

//
//  Construction
//

impl RawBlock {
    /// Moves `block` onto the heap, and returns a type-erased handle to it, as well as a typed pointer to it.
    ///
    /// The strong count of `block` is expected to be 1, and accounted for by the caller.
    #[inline]
    pub(crate) fn allocate<B>(block: B) -> (Self, NonNull<B>)
    where
        B: ControlBlock + 'static,
    {
        debug_assert_eq!(1, block.counts().strong_count());
        debug_assert_eq!(0, block.counts().weak_count());

        trace!("allocating {} control block", block.kind());

        let typed = NonNull::from(Box::leak(Box::new(block)));
        let ptr: NonNull<dyn ControlBlock> = typed;

        (Self { ptr }, typed)
    }
}

//
//  Counts
//

impl RawBlock {
    /// Returns the number of strong handles.
    ///
    /// #   Safety
    ///
    /// -   Alive: the block is still allocated, ie the caller holds a handle.
    #[inline(always)]
    pub(crate) unsafe fn strong_count(self) -> usize {
        //  Safety:
        //  -   Alive: as per pre-condition.
        unsafe { self.counts().strong_count() }
    }

    /// Returns the number of weak handles.
    ///
    /// #   Safety
    ///
    /// -   Alive: the block is still allocated, ie the caller holds a handle.
    #[inline(always)]
    pub(crate) unsafe fn weak_count(self) -> usize {
        //  Safety:
        //  -   Alive: as per pre-condition.
        unsafe { self.counts().weak_count() }
    }

    /// Increments the strong count.
    ///
    /// #   Safety
    ///
    /// -   Strong: the caller holds a strong handle.
    /// -   Accounting: the caller guarantees that the incremented count faithfully represents the number of strong
    ///     handles.
    #[inline(always)]
    pub(crate) unsafe fn increment_strong(self) {
        //  Safety:
        //  -   Alive: as per Strong pre-condition.
        let counts = unsafe { self.counts() };

        //  Safety:
        //  -   Alive: as per Strong pre-condition.
        unsafe { counts.increment_strong() };
    }

    /// Increments the strong count, unless the managed object is already dropped.
    ///
    /// Returns whether the increment succeeded.
    ///
    /// #   Safety
    ///
    /// -   Alive: the block is still allocated, ie the caller holds a handle.
    /// -   Accounting: on success, the caller guarantees that the incremented count faithfully represents the number
    ///     of strong handles.
    #[inline(always)]
    pub(crate) unsafe fn try_increment_strong(self) -> bool {
        //  Safety:
        //  -   Alive: as per pre-condition.
        unsafe { self.counts().try_increment_strong() }
    }

    /// Increments the weak count.
    ///
    /// #   Safety
    ///
    /// -   Alive: the block is still allocated, ie the caller holds a handle.
    /// -   Accounting: the caller guarantees that the incremented count faithfully represents the number of weak
    ///     handles.
    #[inline(always)]
    pub(crate) unsafe fn increment_weak(self) {
        //  Safety:
        //  -   Alive: as per pre-condition.
        unsafe { self.counts().increment_weak() };
    }

    /// Decrements the strong count, dropping the managed object if it reaches 0, and deallocating the block if the
    /// weak count is 0 as well.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller relinquishes one strong handle, and will not use this block afterwards.
    #[inline]
    pub(crate) unsafe fn release_strong(self) {
        //  Safety:
        //  -   Alive: the caller holds a strong handle.
        //  -   Accounting: as per pre-condition.
        let last = unsafe { self.counts().decrement_strong() };

        if !last {
            return;
        }

        //  Safety:
        //  -   Once: the strong count just reached 0.
        unsafe { self.drop_object() };
    }

    /// Decrements the weak count, deallocating the block if both counts are 0.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller relinquishes one weak handle, and will not use this block afterwards.
    #[inline]
    pub(crate) unsafe fn release_weak(self) {
        //  Safety:
        //  -   Alive: the caller holds a weak handle.
        //  -   Accounting: as per pre-condition.
        let last = unsafe { self.counts().decrement_weak() };

        if !last {
            return;
        }

        //  Safety:
        //  -   EndOfLife: both counts reached 0, no handle remains.
        unsafe { self.deallocate() };
    }
}

//
//  Identity
//

impl RawBlock {
    /// Returns the address of the block, identifying the ownership group.
    #[inline(always)]
    pub(crate) fn addr(self) -> *const () {
        self.ptr.as_ptr().cast_const().cast()
    }
}

//
//  Implementation
//

impl RawBlock {
    //  Safety:
    //  -   Alive: the lifetime of the returned reference is only guaranteed until both counts reach 0.
    #[inline(always)]
    unsafe fn counts<'a>(self) -> &'a RefCounts {
        //  Safety:
        //  -   Convertible: as per pre-condition.
        unsafe { self.ptr.as_ref().counts() }
    }

    //  Safety:
    //  -   Once: should only be invoked when the strong count reaches 0.
    #[inline(never)]
    unsafe fn drop_object(self) {
        //  Releases the weak count borrowed for the duration of the drop, even if it panics.
        struct WeakGuard(RawBlock);

        impl Drop for WeakGuard {
            fn drop(&mut self) {
                //  Safety:
                //  -   Accounting: releases the weak count acquired below.
                unsafe { self.0.release_weak() };
            }
        }

        //  Dropping the object may release weak handles to this very block, such as a `SelfRef`: the block must
        //  survive until the drop completes.
        //
        //  Safety:
        //  -   Alive: the strong count only just reached 0, hence the block is still allocated.
        unsafe { self.increment_weak() };

        let _guard = WeakGuard(self);

        //  Safety:
        //  -   Alive: the weak count acquired above keeps the block allocated.
        let block = unsafe { self.ptr.as_ref() };

        trace!("dropping object managed by {} control block", block.kind());

        //  Safety:
        //  -   Once: as per pre-condition.
        unsafe { block.drop_object() };
    }

    //  Safety:
    //  -   EndOfLife: should only be invoked once both counts reach 0.
    #[inline(never)]
    unsafe fn deallocate(self) {
        trace!("deallocating control block");

        //  Safety:
        //  -   Allocated: as per invariant, obtained from `Box::into_raw`, via `Box::leak`.
        //  -   EndOfLife: as per pre-condition.
        let block = unsafe { Box::from_raw(self.ptr.as_ptr()) };

        //  Does not drop the managed object, as per `ControlBlock` contract.
        drop(block);
    }
}

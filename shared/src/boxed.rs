//! The control block of an object allocated separately, in its own `Box`.

use core::ptr::NonNull;

use alloc::boxed::Box;

use crate::{ControlBlock, RawBlock, RefCounts};

/// A control block pointing to a separately allocated object.
///
/// The object is not allocated by the block, it is taken over from an existing `Box<T>`. It is dropped, and its memory
/// freed, by reconstituting the `Box<T>` once the strong count reaches 0.
pub(crate) struct BoxedBlock<T>
where
    T: ?Sized,
{
    counts: RefCounts,
    //  Safety:
    //  -   Boxed: obtained from `Box::into_raw`, and valid until `drop_object` is invoked.
    object: NonNull<T>,
}

impl<T> BoxedBlock<T>
where
    T: ?Sized + 'static,
{
    /// Takes over `object`, returning a handle to the new block, and a pointer to the object.
    ///
    /// The strong count of the block is 1, which the caller is responsible for.
    #[inline]
    pub(crate) fn allocate(object: Box<T>) -> (RawBlock, NonNull<T>) {
        //  Safety:
        //  -   Boxed: from `Box::into_raw`.
        unsafe { Self::allocate_raw(NonNull::from(Box::leak(object))) }
    }

    /// Takes over `object`, returning a handle to the new block, and a pointer to the object.
    ///
    /// The strong count of the block is 1, which the caller is responsible for.
    ///
    /// #   Safety
    ///
    /// -   Boxed: `object` was obtained from `Box::into_raw`, or equivalent.
    /// -   Unique: `object` is not owned by anything else.
    #[inline]
    pub(crate) unsafe fn allocate_raw(object: NonNull<T>) -> (RawBlock, NonNull<T>) {
        let counts = RefCounts::new();

        let (raw, _) = RawBlock::allocate(Self { counts, object });

        (raw, object)
    }
}

//  Safety:
//  -   Stable: always returns `self.counts`.
//  -   Drop: only the object is dropped, `BoxedBlock` itself has no drop glue for it.
unsafe impl<T> ControlBlock for BoxedBlock<T>
where
    T: ?Sized,
{
    fn counts(&self) -> &RefCounts {
        &self.counts
    }

    unsafe fn drop_object(&self) {
        //  Safety:
        //  -   Boxed: as per invariant.
        //  -   Once: as per pre-condition.
        let object = unsafe { Box::from_raw(self.object.as_ptr()) };

        drop(object);
    }

    fn kind(&self) -> &'static str {
        "boxed"
    }
}

//! The control block of an object colocated with its counts, in a single allocation.

use core::{
    cell::UnsafeCell,
    mem::ManuallyDrop,
    ptr::{self, NonNull},
};

use crate::{ControlBlock, RawBlock, RefCounts};

/// A control block embedding the object.
///
/// The object is moved in when the block is allocated, and dropped in place once the strong count reaches 0; its
/// storage is only freed alongside the block, once the weak count reaches 0 as well.
pub(crate) struct InlineBlock<T> {
    counts: RefCounts,
    //  Safety:
    //  -   Initialized: from construction until `drop_object` is invoked.
    object: UnsafeCell<ManuallyDrop<T>>,
}

impl<T> InlineBlock<T>
where
    T: 'static,
{
    /// Moves `object` into a new block, returning a handle to the block, and a pointer to the object.
    ///
    /// The strong count of the block is 1, which the caller is responsible for.
    #[inline]
    pub(crate) fn allocate(object: T) -> (RawBlock, NonNull<T>) {
        let counts = RefCounts::new();
        let object = UnsafeCell::new(ManuallyDrop::new(object));

        let (raw, block) = RawBlock::allocate(Self { counts, object });

        //  Safety:
        //  -   Alive: the block was just allocated.
        //  -   InBounds: `object` is a field of the block.
        let object = unsafe { ptr::addr_of_mut!((*block.as_ptr()).object) };

        //  `UnsafeCell` and `ManuallyDrop` are both `#[repr(transparent)]`.
        let object = object.cast::<T>();

        //  Safety:
        //  -   NonNull: derived from a non-null pointer, in bounds.
        let object = unsafe { NonNull::new_unchecked(object) };

        (raw, object)
    }
}

//  Safety:
//  -   Stable: always returns `self.counts`.
//  -   Drop: only the object is dropped, `ManuallyDrop` prevents `InlineBlock` from dropping it again.
unsafe impl<T> ControlBlock for InlineBlock<T> {
    fn counts(&self) -> &RefCounts {
        &self.counts
    }

    unsafe fn drop_object(&self) {
        //  Safety:
        //  -   Exclusive: the strong count is 0, hence no reference to the object remains.
        let object = unsafe { &mut *self.object.get() };

        //  Safety:
        //  -   Initialized: as per invariant.
        //  -   Once: as per pre-condition.
        unsafe { ManuallyDrop::drop(object) };
    }

    fn kind(&self) -> &'static str {
        "inline"
    }
}

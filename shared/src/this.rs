//! Self-reference: allowing a managed object to hand out pointers to itself.
//!
//! A type opts in by embedding a `SelfRef<Self>` and implementing `SharedFromThis`:
//!
//! ```
//! use endor_shared::{SelfRef, SharedFromThis, SharedPtr};
//!
//! struct Widget {
//!     this: SelfRef<Widget>,
//!     id: u32,
//! }
//!
//! impl SharedFromThis for Widget {
//!     fn self_ref(&self) -> &SelfRef<Self> {
//!         &self.this
//!     }
//! }
//!
//! let widget = SharedPtr::new_self_ref(Widget { this: SelfRef::new(), id: 42 });
//!
//! let again = widget.shared_from_this().unwrap();
//!
//! assert_eq!(42, again.id);
//! assert_eq!(2, SharedPtr::use_count(&widget));
//! ```
//!
//! The `SelfRef` only holds a weak handle, hence the object never keeps itself alive.

use core::{cell::RefCell, fmt};

use crate::{OwnershipError, SharedPtr, WeakPtr};

/// A weak handle of an object to itself, linked by the `*_self_ref` constructors of `SharedPtr`.
///
/// Cloning a `SelfRef` yields an unlinked `SelfRef`: a clone of the object is a different object, which will be part
/// of a different ownership group, if any.
pub struct SelfRef<T>
where
    T: ?Sized,
{
    weak: RefCell<WeakPtr<T>>,
}

impl<T> SelfRef<T>
where
    T: ?Sized,
{
    /// Creates an unlinked instance.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            weak: RefCell::new(WeakPtr::new()),
        }
    }

    /// Returns whether the instance was linked to an ownership group, and that group is still alive.
    #[inline]
    pub fn is_linked(&self) -> bool {
        !self.weak.borrow().expired()
    }

    /// Returns a strong handle to the object.
    ///
    /// Returns an error if the instance is not linked, or the ownership group is no longer alive.
    #[inline]
    pub fn shared(&self) -> Result<SharedPtr<T>, OwnershipError> {
        SharedPtr::try_from_weak(&self.weak.borrow())
    }

    /// Returns a weak handle to the object.
    ///
    /// The handle is empty if the instance is not linked.
    #[inline]
    pub fn weak(&self) -> WeakPtr<T> {
        self.weak.borrow().clone()
    }

    /// Links the instance to an ownership group.
    pub(crate) fn install(&self, weak: WeakPtr<T>) {
        //  The previous handle is released only once the cell is no longer borrowed.
        let previous = self.weak.replace(weak);

        drop(previous);
    }
}

impl<T> Clone for SelfRef<T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Default for SelfRef<T>
where
    T: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SelfRef<T>
where
    T: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("SelfRef").field("linked", &self.is_linked()).finish()
    }
}

/// The capability of an object to hand out pointers to itself.
///
/// The pointers are only available after the object was placed under shared ownership, through
/// `SharedPtr::new_self_ref`, `SharedPtr::from_box_self_ref` or `SharedPtr::from_raw_self_ref`, and until the last
/// external `SharedPtr` is released.
///
/// The plain constructors, `SharedPtr::new`, `SharedPtr::from_box` and `SharedPtr::from_raw`, leave the object
/// unlinked: `shared_from_this` then always fails with `OwnershipError::Expired`.
pub trait SharedFromThis {
    /// Returns the self-reference embedded in the object.
    fn self_ref(&self) -> &SelfRef<Self>;

    /// Returns a strong handle to `self`, incrementing the strong count of its ownership group.
    ///
    /// Returns an error if `self` is not under shared ownership, or no longer is.
    fn shared_from_this(&self) -> Result<SharedPtr<Self>, OwnershipError> {
        self.self_ref().shared()
    }

    /// Returns a weak handle to `self`.
    ///
    /// The handle is empty if `self` was never placed under shared ownership.
    fn weak_from_this(&self) -> WeakPtr<Self> {
        self.self_ref().weak()
    }
}

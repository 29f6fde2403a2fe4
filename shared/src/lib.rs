//! Single-threaded shared ownership, in the spirit of `Rc<T>` and `Weak<T>`, with an explicit, type-erased control
//! block.
//!
//! #   Available pointers
//!
//! -   `SharedPtr<T>`: a strong, nullable, handle. The managed object is dropped when the last `SharedPtr` of its
//!     ownership group is dropped or reset.
//! -   `WeakPtr<T>`: a weak, nullable, handle. It does not keep the object alive, only the control block, so that it
//!     can check whether the object is still alive and promote itself to a `SharedPtr`.
//! -   `SelfRef<T>` and `SharedFromThis`: an opt-in capability for a managed object to hand out pointers to itself.
//!
//! #   Layouts
//!
//! Two control blocks are available, both hidden behind the same `SharedPtr<T>`:
//!
//! -   Colocated, via `SharedPtr::new`: the counts and the object share a single allocation.
//! -   Separate, via `SharedPtr::from_box`: the counts are allocated next to an existing `Box<T>`, which is taken over.
//!
//! ```txt
//! Colocated                        Separate
//!
//! +--------+------+--------+       +--------+------+-----+       +--------+
//! | strong | weak | object |       | strong | weak | ptr | ----> | object |
//! +--------+------+--------+       +--------+------+-----+       +--------+
//! ```
//!
//! #   Aliasing
//!
//! The pointer used for access (the observer) need not be the pointer to the managed object. `SharedPtr::project`
//! creates a pointer to a sub-object (or any reference derived from the object) which shares the ownership of the
//! whole object. Equality compares observers, not ownership groups; use `SharedPtr::owner_eq` for the latter.
//!
//! #   Limits
//!
//! -   Counts are not atomic: neither pointer is `Send` nor `Sync`.
//! -   Cycles of `SharedPtr` are never collected, break them with `WeakPtr`.
//! -   Managed objects must be `'static`.

//  Use only core and alloc, guaranteeing no I/O nor threads.
#![cfg_attr(not(test), no_std)]
//  Ensure unsafe operations are duly checked.
#![deny(unsafe_op_in_unsafe_fn)]
//  Ensure proper documentation.
#![deny(missing_docs)]

//  Non-core must be explicitly depended on in no_std.
extern crate alloc;

//  Lifecycle events, compiled out entirely without the `log` feature.
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!(target: "endor_shared", $($arg)*);
    };
}

mod block;
mod boxed;
mod count;
mod error;
mod inline;
mod shared;
mod this;
mod weak;

pub use error::OwnershipError;
pub use shared::SharedPtr;
pub use this::{SelfRef, SharedFromThis};
pub use weak::WeakPtr;

pub(crate) use block::{ControlBlock, RawBlock};
pub(crate) use boxed::BoxedBlock;
pub(crate) use count::RefCounts;
pub(crate) use inline::InlineBlock;

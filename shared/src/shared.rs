//! The strong handle of an ownership group, the equivalent of `Rc<T>`.

use core::{
    fmt, hash,
    marker::PhantomData,
    mem::{self, ManuallyDrop},
    ops,
    panic::{RefUnwindSafe, UnwindSafe},
    ptr::{self, NonNull},
};

use alloc::boxed::Box;

use crate::{BoxedBlock, InlineBlock, OwnershipError, RawBlock, SharedFromThis, WeakPtr};

/// A nullable, reference-counted, pointer.
///
/// A `SharedPtr` is made of two parts:
///
/// -   The control block, which it holds a strong count on, and which governs the lifetime of the managed object.
/// -   The observer, which is the pointer dereferenced on access.
///
/// The observer is typically the managed object, but need not be: see `project` and `aliasing`.
///
/// Since `SharedPtr` implements `Deref`, its operations are associated functions, eg. `SharedPtr::use_count(&p)`.
pub struct SharedPtr<T>
where
    T: ?Sized,
{
    //  Invariant:
    //  -   Strong: if `Some`, this instance accounts for one strong count.
    block: Option<RawBlock>,
    //  Invariant:
    //  -   Valid: if `Some`, the pointee is valid for reads as long as the block's strong count is positive.
    observer: Option<NonNull<T>>,
    //  Invariant:
    //  -   Writable: if `true`, `observer` is the pointer to the managed object handed out by its control block, and
    //      may be written through when no other handle exists.
    writable: bool,
    _marker: PhantomData<T>,
}

//
//  Construction
//

impl<T> SharedPtr<T>
where
    T: ?Sized,
{
    /// Creates an empty instance, with neither block nor object.
    #[inline(always)]
    pub const fn empty() -> Self {
        Self {
            block: None,
            observer: None,
            writable: false,
            _marker: PhantomData,
        }
    }
}

impl<T> SharedPtr<T>
where
    T: 'static,
{
    /// Allocates a single memory block, holding both counts and `value`.
    ///
    /// This is the preferred way to create an ownership group.
    #[inline]
    pub fn new(value: T) -> Self {
        let (block, observer) = InlineBlock::allocate(value);

        //  Safety:
        //  -   Strong: a fresh block has a strong count of 1.
        unsafe { Self::from_parts(Some(block), Some(observer), true) }
    }
}

impl<T> SharedPtr<T>
where
    T: ?Sized + 'static,
{
    /// Takes over an already allocated object, allocating a separate control block for it.
    ///
    /// This allows managing unsized objects, such as `Box<dyn Trait>`.
    #[inline]
    pub fn from_box(object: Box<T>) -> Self {
        let (block, observer) = BoxedBlock::allocate(object);

        //  Safety:
        //  -   Strong: a fresh block has a strong count of 1.
        unsafe { Self::from_parts(Some(block), Some(observer), true) }
    }

    /// Takes over an already allocated object, allocating a separate control block for it.
    ///
    /// If `object` is null, returns an empty instance.
    ///
    /// #   Safety
    ///
    /// -   Boxed: `object` was obtained by `Box::into_raw`, or is null.
    /// -   Unique: `object` is not owned by anything else, in particular it is not already managed by another
    ///     ownership group.
    #[inline]
    pub unsafe fn from_raw(object: *mut T) -> Self {
        let Some(object) = NonNull::new(object) else {
            return Self::empty();
        };

        //  Safety:
        //  -   Boxed: as per pre-condition.
        //  -   Unique: as per pre-condition.
        let (block, observer) = unsafe { BoxedBlock::allocate_raw(object) };

        //  Safety:
        //  -   Strong: a fresh block has a strong count of 1.
        unsafe { Self::from_parts(Some(block), Some(observer), true) }
    }
}

impl<T> SharedPtr<T>
where
    T: SharedFromThis + 'static,
{
    /// Allocates a single memory block, holding both counts and `value`, then links `value` to its ownership group.
    ///
    /// Once linked, `value` can hand out pointers to itself, see `SharedFromThis`.
    #[inline]
    pub fn new_self_ref(value: T) -> Self {
        let this = Self::new(value);

        Self::link_self_ref(&this);

        this
    }

    /// Takes over an already allocated object, allocating a separate control block for it, then links `object` to
    /// its ownership group.
    ///
    /// Once linked, `object` can hand out pointers to itself, see `SharedFromThis`.
    #[inline]
    pub fn from_box_self_ref(object: Box<T>) -> Self {
        let this = Self::from_box(object);

        Self::link_self_ref(&this);

        this
    }

    /// Takes over an already allocated object, as per `from_raw`, then links `object` to its ownership group.
    ///
    /// If `object` is null, returns an empty instance, and nothing is linked.
    ///
    /// #   Safety
    ///
    /// -   Boxed: `object` was obtained by `Box::into_raw`, or is null.
    /// -   Unique: `object` is not owned by anything else, in particular it is not already managed by another
    ///     ownership group.
    #[inline]
    pub unsafe fn from_raw_self_ref(object: *mut T) -> Self {
        //  Safety:
        //  -   Boxed: as per pre-condition.
        //  -   Unique: as per pre-condition.
        let this = unsafe { Self::from_raw(object) };

        if !Self::is_empty(&this) {
            Self::link_self_ref(&this);
        }

        this
    }

    fn link_self_ref(this: &Self) {
        let weak = Self::downgrade(this);

        this.self_ref().install(weak);
    }
}

//
//  Conversion
//

impl<T> SharedPtr<T>
where
    T: ?Sized,
{
    /// Converts the pointer into a pointer to a part of the object, or another view of it, within the same ownership
    /// group.
    ///
    /// The strong count is unchanged. Typical uses are projecting to a field, or converting to a trait object:
    ///
    /// ```
    /// use core::fmt::Debug;
    ///
    /// use endor_shared::SharedPtr;
    ///
    /// let pair = SharedPtr::new((1u32, String::from("one")));
    ///
    /// let name = SharedPtr::map(pair.clone(), |pair| &pair.1);
    /// let debug = SharedPtr::map::<dyn Debug, _>(pair, |pair| pair);
    ///
    /// assert_eq!("one", &*name);
    /// assert_eq!(2, SharedPtr::use_count(&debug));
    /// ```
    ///
    /// On an empty pointer, `f` is not called, and the result is empty.
    #[inline]
    pub fn map<U, F>(this: Self, f: F) -> SharedPtr<U>
    where
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        let observer = Self::get(&this).map(|value| NonNull::from(f(value)));

        let (block, _) = Self::into_parts(this);

        //  Safety:
        //  -   Strong: the strong count of `this` is transferred.
        //  -   Valid: `observer` is derived from a reference to the managed object, or is `'static`.
        //  -   Writable: `observer` is derived from a shared reference, it is never written through.
        unsafe { SharedPtr::from_parts(block, observer, false) }
    }

    /// Creates a pointer to a part of the object, or another view of it, within the same ownership group.
    ///
    /// The strong count is incremented. See `map`.
    #[inline]
    pub fn project<U, F>(this: &Self, f: F) -> SharedPtr<U>
    where
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        Self::map(this.clone(), f)
    }

    /// Creates a pointer sharing the ownership group of `owner`, but observing `observer`.
    ///
    /// The strong count of `owner`, if any, is incremented. If `owner` is empty, the result has no control block,
    /// and `observer` is not kept alive by anything.
    ///
    /// #   Safety
    ///
    /// -   Valid: `observer` is valid for reads for as long as the ownership group of `owner` is alive, or forever if
    ///     `owner` is empty.
    #[inline]
    pub unsafe fn aliasing<Y>(owner: &SharedPtr<Y>, observer: NonNull<T>) -> Self
    where
        Y: ?Sized,
    {
        if let Some(block) = owner.block {
            //  Safety:
            //  -   Strong: `owner` holds a strong count.
            //  -   Accounting: accounted for by the returned instance.
            unsafe { block.increment_strong() };
        }

        //  Safety:
        //  -   Strong: incremented above.
        //  -   Valid: as per pre-condition.
        //  -   Writable: `observer` is only guaranteed valid for reads.
        unsafe { Self::from_parts(owner.block, Some(observer), false) }
    }

    /// Promotes a weak pointer.
    ///
    /// Returns an error if the managed object was already dropped, or if `weak` is empty.
    #[inline]
    pub fn try_from_weak(weak: &WeakPtr<T>) -> Result<Self, OwnershipError> {
        weak.upgrade().ok_or(OwnershipError::Expired)
    }

    /// Creates a new weak pointer to this ownership group.
    #[inline]
    pub fn downgrade(this: &Self) -> WeakPtr<T> {
        WeakPtr::from(this)
    }

    /// Moves out of `this`, leaving it empty.
    #[inline(always)]
    pub fn take(this: &mut Self) -> Self {
        mem::take(this)
    }
}

//
//  Modifiers
//

impl<T> SharedPtr<T>
where
    T: ?Sized,
{
    /// Releases the ownership, leaving `this` empty.
    ///
    /// If this was the last strong handle of the ownership group, the managed object is dropped.
    #[inline]
    pub fn reset(this: &mut Self) {
        *this = Self::empty();
    }

    /// Releases the ownership, then takes over `object`, as per `from_box`.
    #[inline]
    pub fn reset_with(this: &mut Self, object: Box<T>)
    where
        T: 'static,
    {
        Self::reset(this);

        *this = Self::from_box(object);
    }

    /// Swaps the contents of `this` and `other`.
    #[inline(always)]
    pub fn swap(this: &mut Self, other: &mut Self) {
        mem::swap(this, other);
    }
}

//
//  High-level Access
//

impl<T> SharedPtr<T>
where
    T: ?Sized,
{
    /// Returns whether `this` has no control block.
    #[inline(always)]
    pub fn is_empty(this: &Self) -> bool {
        this.block.is_none()
    }

    /// Returns the number of strong handles of the ownership group, or 0 if empty.
    #[inline(always)]
    pub fn use_count(this: &Self) -> usize {
        //  Safety:
        //  -   Alive: `this` holds a strong count.
        this.block.map_or(0, |block| unsafe { block.strong_count() })
    }

    /// Returns the number of weak handles of the ownership group, or 0 if empty.
    #[inline(always)]
    pub fn weak_count(this: &Self) -> usize {
        //  Safety:
        //  -   Alive: `this` holds a strong count.
        this.block.map_or(0, |block| unsafe { block.weak_count() })
    }

    /// Returns a reference to the observed object, if any.
    #[inline(always)]
    pub fn get(this: &Self) -> Option<&T> {
        //  Safety:
        //  -   Valid: as per invariant, the strong count held by `this` keeps the observed object alive.
        this.observer.map(|observer| unsafe { observer.as_ref() })
    }

    /// Returns a mutable reference to the observed object, if `this` is the only handle of its ownership group.
    ///
    /// Any other handle, strong or weak, including one linked by `new_self_ref`, results in `None`. So does a view
    /// created by `map`, `project` or `aliasing`, even when unique: it only ever grants read access.
    #[inline]
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if !this.writable {
            return None;
        }

        let block = this.block?;
        let mut observer = this.observer?;

        //  Safety:
        //  -   Alive: `this` holds a strong count.
        let unique = unsafe { block.strong_count() == 1 && block.weak_count() == 0 };

        //  Safety:
        //  -   Valid: as per invariant.
        //  -   Exclusive: no other handle exists, and `this` is mutably borrowed.
        unique.then(|| unsafe { observer.as_mut() })
    }

    /// Returns the observer.
    #[inline(always)]
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.observer
    }

    /// Returns whether `this` and `other` belong to the same ownership group, regardless of what they observe.
    ///
    /// Two empty pointers are considered to belong to the same, empty, group.
    #[inline(always)]
    pub fn owner_eq<U>(this: &Self, other: &SharedPtr<U>) -> bool
    where
        U: ?Sized,
    {
        this.block.map(RawBlock::addr) == other.block.map(RawBlock::addr)
    }
}

//
//  Low-level Access
//

impl<T> SharedPtr<T>
where
    T: ?Sized,
{
    /// Assembles an instance from its parts.
    ///
    /// #   Safety
    ///
    /// -   Strong: if `block` is `Some`, one strong count is transferred to the result.
    /// -   Valid: if `observer` is `Some`, it is valid for reads as long as the block's strong count is positive.
    /// -   Writable: if `writable`, `observer` is the pointer to the managed object handed out by `block`.
    #[inline(always)]
    pub(crate) unsafe fn from_parts(block: Option<RawBlock>, observer: Option<NonNull<T>>, writable: bool) -> Self {
        Self {
            block,
            observer,
            writable,
            _marker: PhantomData,
        }
    }

    /// Returns the parts of the instance, without affecting the counts.
    #[inline(always)]
    pub(crate) fn as_parts(this: &Self) -> (Option<RawBlock>, Option<NonNull<T>>, bool) {
        (this.block, this.observer, this.writable)
    }

    /// Disassembles the instance, the strong count it held, if any, is transferred to the caller.
    #[inline(always)]
    fn into_parts(this: Self) -> (Option<RawBlock>, Option<NonNull<T>>) {
        let this = ManuallyDrop::new(this);

        (this.block, this.observer)
    }

    #[inline(always)]
    fn addr(this: &Self) -> *const () {
        this.observer.map_or(ptr::null(), |observer| observer.as_ptr().cast_const().cast())
    }
}

//
//  Clone & Drop
//

impl<T> Clone for SharedPtr<T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            //  Safety:
            //  -   Strong: `self` holds a strong count.
            //  -   Accounting: accounted for by the returned instance.
            unsafe { block.increment_strong() };
        }

        //  Safety:
        //  -   Strong: incremented above.
        //  -   Valid: as per invariant of `self`.
        //  -   Writable: as per invariant of `self`.
        unsafe { Self::from_parts(self.block, self.observer, self.writable) }
    }
}

impl<T> Drop for SharedPtr<T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };

        //  Safety:
        //  -   Accounting: the strong count held by `self` is relinquished, and `block` no longer used.
        unsafe { block.release_strong() };
    }
}

impl<T> Default for SharedPtr<T>
where
    T: ?Sized,
{
    fn default() -> Self {
        Self::empty()
    }
}

//
//  Conversions
//

impl<T> From<T> for SharedPtr<T>
where
    T: 'static,
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> From<Box<T>> for SharedPtr<T>
where
    T: ?Sized + 'static,
{
    fn from(object: Box<T>) -> Self {
        Self::from_box(object)
    }
}

impl<T> TryFrom<&WeakPtr<T>> for SharedPtr<T>
where
    T: ?Sized,
{
    type Error = OwnershipError;

    fn try_from(weak: &WeakPtr<T>) -> Result<Self, Self::Error> {
        Self::try_from_weak(weak)
    }
}

//
//  Value Access
//

impl<T> ops::Deref for SharedPtr<T>
where
    T: ?Sized,
{
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match Self::get(self) {
            Some(value) => value,
            None => empty_deref(),
        }
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn empty_deref() -> ! {
    panic!("dereferenced an empty SharedPtr")
}

//
//  Formatting
//

impl<T> fmt::Debug for SharedPtr<T>
where
    T: ?Sized + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("SharedPtr")
            .field("use_count", &Self::use_count(self))
            .field("value", &Self::get(self))
            .finish()
    }
}

impl<T> fmt::Display for SharedPtr<T>
where
    T: ?Sized + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match Self::get(self) {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("(empty)"),
        }
    }
}

impl<T> fmt::Pointer for SharedPtr<T>
where
    T: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        fmt::Pointer::fmt(&Self::addr(self), f)
    }
}

//
//  Identity
//
//  Two pointers are equal if they observe the same address, regardless of their ownership group.
//

impl<T, U> PartialEq<SharedPtr<U>> for SharedPtr<T>
where
    T: ?Sized,
    U: ?Sized,
{
    #[inline(always)]
    fn eq(&self, other: &SharedPtr<U>) -> bool {
        Self::addr(self) == SharedPtr::addr(other)
    }
}

impl<T> Eq for SharedPtr<T> where T: ?Sized {}

impl<T> hash::Hash for SharedPtr<T>
where
    T: ?Sized,
{
    #[inline(always)]
    fn hash<HS>(&self, hasher: &mut HS)
    where
        HS: hash::Hasher,
    {
        Self::addr(self).hash(hasher);
    }
}

//
//  Markers
//

impl<T> Unpin for SharedPtr<T> where T: ?Sized {}

impl<T> UnwindSafe for SharedPtr<T> where T: ?Sized + RefUnwindSafe {}

#[cfg(test)]
mod tests {
    use core::{cell::Cell, fmt::Debug};
    use std::{collections::HashSet, rc::Rc};

    use super::*;

    use crate::SelfRef;

    #[test]
    fn decons_vanilla() {
        let _ = SharedPtr::new(value());
    }

    #[test]
    fn decons_boxed() {
        let _ = SharedPtr::from_box(Box::new(value()));
    }

    #[test]
    fn decons_boxed_unsized() {
        let object: Box<dyn Debug> = Box::new(value());

        let _: SharedPtr<dyn Debug> = SharedPtr::from_box(object);
    }

    #[test]
    fn decons_raw() {
        let object = Box::into_raw(Box::new(value()));

        let shared = unsafe { SharedPtr::from_raw(object) };

        assert_eq!("Hello, World!", *shared);
    }

    #[test]
    fn decons_raw_null() {
        let shared: SharedPtr<String> = unsafe { SharedPtr::from_raw(ptr::null_mut()) };

        assert!(SharedPtr::is_empty(&shared));
        assert_eq!(0, SharedPtr::use_count(&shared));
    }

    #[test]
    fn decons_zst() {
        let _ = SharedPtr::new(());
    }

    #[test]
    fn empty() {
        let shared: SharedPtr<String> = SharedPtr::default();

        assert!(SharedPtr::is_empty(&shared));
        assert_eq!(0, SharedPtr::use_count(&shared));
        assert_eq!(0, SharedPtr::weak_count(&shared));
        assert_eq!(None, SharedPtr::get(&shared));
        assert_eq!(None, SharedPtr::as_ptr(&shared));
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty SharedPtr")]
    fn deref_empty() {
        let shared: SharedPtr<String> = SharedPtr::empty();

        let _ = shared.len();
    }

    #[test]
    fn drop_once() {
        let drops = Rc::new(Cell::new(0));

        let first = SharedPtr::new(Tracked(drops.clone()));
        let second = first.clone();
        let third = second.clone();

        assert_eq!(3, SharedPtr::use_count(&first));

        drop(first);
        drop(second);

        assert_eq!(0, drops.get());
        assert_eq!(1, SharedPtr::use_count(&third));

        drop(third);

        assert_eq!(1, drops.get());
    }

    #[test]
    fn drop_once_boxed() {
        let drops = Rc::new(Cell::new(0));

        let first = SharedPtr::from_box(Box::new(Tracked(drops.clone())));
        let second = first.clone();

        drop(first);

        assert_eq!(0, drops.get());

        drop(second);

        assert_eq!(1, drops.get());
    }

    #[test]
    fn take() {
        let mut first = SharedPtr::new(value());

        let second = SharedPtr::take(&mut first);

        assert!(SharedPtr::is_empty(&first));
        assert_eq!(1, SharedPtr::use_count(&second));
        assert_eq!("Hello, World!", *second);
    }

    #[test]
    fn reset() {
        let drops = Rc::new(Cell::new(0));

        let mut first = SharedPtr::new(Tracked(drops.clone()));
        let second = first.clone();

        SharedPtr::reset(&mut first);

        assert!(SharedPtr::is_empty(&first));
        assert_eq!(1, SharedPtr::use_count(&second));
        assert_eq!(0, drops.get());

        //  Resetting an empty pointer is a no-op.
        SharedPtr::reset(&mut first);

        drop(second);

        assert_eq!(1, drops.get());
    }

    #[test]
    fn reset_with() {
        let drops = Rc::new(Cell::new(0));

        let mut shared = SharedPtr::new(Tracked(drops.clone()));

        SharedPtr::reset_with(&mut shared, Box::new(Tracked(drops.clone())));

        assert_eq!(1, drops.get());
        assert_eq!(1, SharedPtr::use_count(&shared));

        drop(shared);

        assert_eq!(2, drops.get());
    }

    #[test]
    fn swap() {
        let mut first = SharedPtr::new(1);
        let mut second = SharedPtr::new(2);

        SharedPtr::swap(&mut first, &mut second);

        assert_eq!(2, *first);
        assert_eq!(1, *second);
    }

    #[test]
    fn get_mut() {
        let mut shared = SharedPtr::new(value());

        SharedPtr::get_mut(&mut shared).expect("unique").make_ascii_lowercase();

        assert_eq!("hello, world!", *shared);

        let clone = shared.clone();

        assert_eq!(None, SharedPtr::get_mut(&mut shared));

        drop(clone);

        let weak = SharedPtr::downgrade(&shared);

        assert_eq!(None, SharedPtr::get_mut(&mut shared));

        drop(weak);

        assert!(SharedPtr::get_mut(&mut shared).is_some());
    }

    #[test]
    fn get_mut_view() {
        static LIMITS: [u8; 4] = [1, 2, 3, 4];

        //  Unique, but observing a static.
        let mut limits = SharedPtr::map(SharedPtr::new(0u8), |_| &LIMITS);

        assert_eq!(1, SharedPtr::use_count(&limits));
        assert_eq!(None, SharedPtr::get_mut(&mut limits));
        assert_eq!([1, 2, 3, 4], *limits);

        //  Unique, observing a field of the managed object.
        let mut second = SharedPtr::map(SharedPtr::new((value(), value())), |pair| &pair.1);

        assert_eq!(None, SharedPtr::get_mut(&mut second));

        //  Unique, observing the whole object.
        let mut whole = SharedPtr::map(SharedPtr::new(value()), |s| s);

        assert_eq!(None, SharedPtr::get_mut(&mut whole));

        //  Unique once the original is gone.
        let owner = SharedPtr::new(value());
        let mut projected = SharedPtr::project(&owner, |s| s.as_str());

        drop(owner);

        assert_eq!(None, SharedPtr::get_mut(&mut projected));
    }

    #[test]
    fn get_mut_aliasing() {
        static ANSWER: u32 = 42;

        let owner = SharedPtr::new(0u32);
        let mut alias: SharedPtr<u32> = unsafe { SharedPtr::aliasing(&owner, NonNull::from(&ANSWER)) };

        drop(owner);

        assert_eq!(1, SharedPtr::use_count(&alias));
        assert_eq!(None, SharedPtr::get_mut(&mut alias));
    }

    #[test]
    fn get_mut_upgraded() {
        let shared = SharedPtr::new(value());
        let weak = SharedPtr::downgrade(&shared);

        let mut upgraded = weak.lock();

        drop(shared);
        drop(weak);

        SharedPtr::get_mut(&mut upgraded).expect("unique").push('!');

        assert_eq!("Hello, World!!", *upgraded);
    }

    #[test]
    fn map_field() {
        let drops = Rc::new(Cell::new(0));

        let pair = SharedPtr::new((Tracked(drops.clone()), value()));
        let name = SharedPtr::map(pair, |pair| &pair.1);

        assert_eq!(1, SharedPtr::use_count(&name));
        assert_eq!("Hello, World!", *name);
        assert_eq!(0, drops.get());

        drop(name);

        assert_eq!(1, drops.get());
    }

    #[test]
    fn map_unsize() {
        let shared = SharedPtr::new(value());
        let debug = SharedPtr::map::<dyn Debug, _>(shared.clone(), |s| s);

        assert_eq!(2, SharedPtr::use_count(&debug));
        assert_eq!("\"Hello, World!\"", format!("{:?}", &*debug));
        assert!(shared == debug);
    }

    #[test]
    fn map_empty() {
        let called = Cell::new(false);
        let shared: SharedPtr<(u32, u32)> = SharedPtr::empty();

        let field = SharedPtr::map(shared, |pair| {
            called.set(true);
            &pair.0
        });

        assert!(SharedPtr::is_empty(&field));
        assert!(!called.get());
    }

    #[test]
    fn project() {
        let drops = Rc::new(Cell::new(0));

        let pair = SharedPtr::new((Tracked(drops.clone()), 42u32));
        let answer = SharedPtr::project(&pair, |pair| &pair.1);

        assert_eq!(42, *answer);
        assert_eq!(2, SharedPtr::use_count(&pair));

        //  Observers differ, ownership group is shared.
        assert!(pair != answer);
        assert!(SharedPtr::owner_eq(&pair, &answer));

        drop(pair);

        assert_eq!(0, drops.get());
        assert_eq!(42, *answer);

        drop(answer);

        assert_eq!(1, drops.get());
    }

    #[test]
    fn aliasing() {
        static ANSWER: u32 = 42;

        let drops = Rc::new(Cell::new(0));

        let owner = SharedPtr::new(Tracked(drops.clone()));
        let alias: SharedPtr<u32> = unsafe { SharedPtr::aliasing(&owner, NonNull::from(&ANSWER)) };

        assert_eq!(42, *alias);
        assert_eq!(2, SharedPtr::use_count(&owner));
        assert!(SharedPtr::owner_eq(&owner, &alias));

        drop(owner);

        assert_eq!(0, drops.get());

        drop(alias);

        assert_eq!(1, drops.get());
    }

    #[test]
    fn aliasing_empty() {
        static ANSWER: u32 = 42;

        let owner: SharedPtr<String> = SharedPtr::empty();
        let alias: SharedPtr<u32> = unsafe { SharedPtr::aliasing(&owner, NonNull::from(&ANSWER)) };

        assert!(SharedPtr::is_empty(&alias));
        assert_eq!(0, SharedPtr::use_count(&alias));
        assert_eq!(42, *alias);
    }

    #[test]
    fn equality() {
        let first = SharedPtr::new(1);
        let second = SharedPtr::new(1);

        assert_eq!(first, first.clone());
        assert_ne!(first, second);
        assert_eq!(SharedPtr::<u32>::empty(), SharedPtr::<String>::empty());

        let set: HashSet<_> = [first.clone(), first.clone(), second.clone()].into_iter().collect();

        assert_eq!(2, set.len());
    }

    #[test]
    fn formatting() {
        let shared = SharedPtr::new(value());
        let empty: SharedPtr<String> = SharedPtr::empty();

        assert_eq!("Hello, World!", shared.to_string());
        assert_eq!("(empty)", empty.to_string());
        assert_eq!("SharedPtr { use_count: 1, value: Some(\"Hello, World!\") }", format!("{shared:?}"));
        assert_eq!(format!("{:p}", SharedPtr::as_ptr(&shared).unwrap()), format!("{shared:p}"));
    }

    #[test]
    fn self_ref_linked() {
        struct Node {
            this: SelfRef<Node>,
            name: String,
        }

        impl SharedFromThis for Node {
            fn self_ref(&self) -> &SelfRef<Self> {
                &self.this
            }
        }

        let node = SharedPtr::new_self_ref(Node {
            this: SelfRef::new(),
            name: value(),
        });

        assert_eq!(1, SharedPtr::use_count(&node));
        assert_eq!(1, SharedPtr::weak_count(&node));

        let again = node.shared_from_this().expect("alive");

        assert_eq!(2, SharedPtr::use_count(&node));
        assert!(node == again);
        assert_eq!("Hello, World!", again.name);
    }

    #[test]
    fn self_ref_raw() {
        struct Node {
            this: SelfRef<Node>,
        }

        impl SharedFromThis for Node {
            fn self_ref(&self) -> &SelfRef<Self> {
                &self.this
            }
        }

        let object = Box::into_raw(Box::new(Node { this: SelfRef::new() }));

        let node = unsafe { SharedPtr::from_raw_self_ref(object) };

        assert!(node.this.is_linked());
        assert_eq!(1, SharedPtr::weak_count(&node));

        let again = node.shared_from_this().expect("alive");

        assert!(node == again);
        assert_eq!(2, SharedPtr::use_count(&node));

        let empty: SharedPtr<Node> = unsafe { SharedPtr::from_raw_self_ref(ptr::null_mut()) };

        assert!(SharedPtr::is_empty(&empty));
    }

    struct Tracked(Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    //  Why a String?
    //
    //  Using a String is the cheapest way to ensure that the destructor is properly called: Miri will error out with
    //  a memory leak if it is not.
    fn value() -> String {
        String::from("Hello, World!")
    }
} // mod tests

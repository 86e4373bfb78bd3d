//! The atomic target: a caller-owned memory location of scalar type `T`.
//!
//! A [`Slot<T>`] is laid out exactly like `T`'s word atomic, which in turn
//! is laid out exactly like the plain word. Callers that already own a
//! buffer of `T` (a mesh face array, a particle deposition grid) borrow it
//! as slots with [`Slot::from_mut_slice`]; nothing is copied or allocated.
//!
//! All operations go through the word view. The `T` view only exists at
//! the boundary, via [`Scalar::from_word`].

use crate::scalar::{AtomicWord, Scalar};
use crate::sync::ORDER;
use std::fmt;
use std::marker::PhantomData;

/// A shared memory location of scalar type `T`.
#[repr(transparent)]
pub struct Slot<T: Scalar> {
    cell: T::Atomic,
    _marker: PhantomData<T>,
}

impl<T: Scalar> Slot<T> {
    /// Create an owned slot holding `value`.
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            cell: T::Atomic::new(value.to_word()),
            _marker: PhantomData,
        }
    }

    /// Atomically read the current value.
    #[inline]
    pub fn load(&self) -> T {
        T::from_word(self.cell.load(ORDER))
    }

    /// Atomically overwrite the current value.
    ///
    /// This is a plain store, not one of the nine operations; it exists for
    /// initialization and for tests that need to interfere with a slot.
    #[inline]
    pub fn store(&self, value: T) {
        self.cell.store(value.to_word(), ORDER)
    }

    /// Consume the slot and return its value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.load()
    }

    /// The bit-pattern alias view of this slot.
    #[inline]
    pub(crate) fn word(&self) -> &T::Atomic {
        &self.cell
    }

    /// Stable identity of the location, used to pick a host lock stripe.
    #[inline]
    pub(crate) fn addr(&self) -> usize {
        self as *const Self as usize
    }
}

#[cfg(not(feature = "loom"))]
impl<T: Scalar> Slot<T> {
    /// Borrow a caller-owned buffer as a slice of slots.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not aligned for `T`'s word atomic. This can
    /// only happen for 64-bit scalars on targets where `u64` is less aligned
    /// than `AtomicU64` (e.g. 32-bit x86).
    pub fn from_mut_slice(values: &mut [T]) -> &[Slot<T>] {
        assert_eq!(std::mem::size_of::<Slot<T>>(), std::mem::size_of::<T>());
        let ptr = values.as_mut_ptr();
        assert!(
            ptr.align_offset(std::mem::align_of::<Slot<T>>()) == 0,
            "{} buffer is not aligned for atomic access",
            T::NAME
        );
        // SAFETY: Slot<T> is repr(transparent) over T::Atomic, which has the
        // same size as T (checked above) and the alignment checked above.
        // The exclusive borrow guarantees no non-atomic access for 'a.
        unsafe { std::slice::from_raw_parts(ptr as *const Slot<T>, values.len()) }
    }

    /// Borrow a caller-owned value as a slot.
    pub fn from_mut(value: &mut T) -> &Slot<T> {
        &Self::from_mut_slice(std::slice::from_mut(value))[0]
    }

    /// View a raw address as a slot.
    ///
    /// # Safety
    ///
    /// `ptr` must be non-null, aligned for `T`'s word atomic, and valid for
    /// reads and writes for `'a`. For the duration of `'a` every access to
    /// the location must go through atomic operations.
    pub unsafe fn from_ptr<'a>(ptr: *mut T) -> &'a Slot<T> {
        debug_assert!(!ptr.is_null());
        debug_assert!(ptr.align_offset(std::mem::align_of::<Slot<T>>()) == 0);
        // SAFETY: upheld by the caller, layout as in `from_mut_slice`.
        unsafe { &*(ptr as *const Slot<T>) }
    }
}

impl<T: Scalar + Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Scalar> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Scalar> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.load()).finish()
    }
}

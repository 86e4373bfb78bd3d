//! Operand types and their bit-pattern aliases.
//!
//! Every [`Scalar`] names a same-width integer [`Word`](Scalar::Word) and the
//! atomic that stores it. Values cross between the two views with
//! `to_bits`/`from_bits` (floats) or identity (integers), never through a
//! pointer cast, so the conversion is defined regardless of aliasing rules.
//!
//! ```text
//!   f32  <-- to_bits / from_bits -->  u32  <-- stored in -->  AtomicU32
//!   f64  <-- to_bits / from_bits -->  u64  <-- stored in -->  AtomicU64
//!   i32  <------- identity ------->   i32  <-- stored in -->  AtomicI32
//! ```
//!
//! The hardware compare-and-swap only ever compares words, so two floats
//! are "equal" to the emulator when their bits are, which is what lets the
//! loop make progress on values like NaN.

use crate::sync::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::fmt::Debug;

mod sealed {
    pub trait Sealed {}
}

/// An atomic integer cell that can back a [`Slot`](crate::Slot).
pub trait AtomicWord: Send + Sync + sealed::Sealed {
    /// The integer held by the cell.
    type Word: Copy + Eq + Debug + Send + Sync + 'static;

    /// A cell holding `word`.
    fn new(word: Self::Word) -> Self;

    /// Atomic load.
    fn load(&self, order: Ordering) -> Self::Word;

    /// Atomic store.
    fn store(&self, word: Self::Word, order: Ordering);

    /// Atomic swap.
    fn swap(&self, word: Self::Word, order: Ordering) -> Self::Word;

    /// Hardware compare-and-swap. `Err` carries the word actually present.
    fn compare_exchange(
        &self,
        current: Self::Word,
        new: Self::Word,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self::Word, Self::Word>;

    /// Library CAS loop, as in `std`.
    fn fetch_update<F>(
        &self,
        set_order: Ordering,
        fetch_order: Ordering,
        f: F,
    ) -> Result<Self::Word, Self::Word>
    where
        F: FnMut(Self::Word) -> Option<Self::Word>;
}

/// Integer read-modify-write instructions exposed by the host ISA.
pub trait IntegerAtomic: AtomicWord {
    /// Wrapping add.
    fn fetch_add(&self, word: Self::Word, order: Ordering) -> Self::Word;

    /// Minimum, compared with the word's own signedness.
    fn fetch_min(&self, word: Self::Word, order: Ordering) -> Self::Word;

    /// Maximum, compared with the word's own signedness.
    fn fetch_max(&self, word: Self::Word, order: Ordering) -> Self::Word;

    /// Bitwise or.
    fn fetch_or(&self, word: Self::Word, order: Ordering) -> Self::Word;

    /// Bitwise and.
    fn fetch_and(&self, word: Self::Word, order: Ordering) -> Self::Word;
}

macro_rules! atomic_word {
    ($($atomic:ty => $word:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $atomic {}

            impl AtomicWord for $atomic {
                type Word = $word;

                #[inline]
                fn new(word: $word) -> Self {
                    <$atomic>::new(word)
                }

                #[inline]
                fn load(&self, order: Ordering) -> $word {
                    <$atomic>::load(self, order)
                }

                #[inline]
                fn store(&self, word: $word, order: Ordering) {
                    <$atomic>::store(self, word, order)
                }

                #[inline]
                fn swap(&self, word: $word, order: Ordering) -> $word {
                    <$atomic>::swap(self, word, order)
                }

                #[inline]
                fn compare_exchange(
                    &self,
                    current: $word,
                    new: $word,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<$word, $word> {
                    <$atomic>::compare_exchange(self, current, new, success, failure)
                }

                #[inline]
                fn fetch_update<F>(
                    &self,
                    set_order: Ordering,
                    fetch_order: Ordering,
                    f: F,
                ) -> Result<$word, $word>
                where
                    F: FnMut($word) -> Option<$word>,
                {
                    <$atomic>::fetch_update(self, set_order, fetch_order, f)
                }
            }

            impl IntegerAtomic for $atomic {
                #[inline]
                fn fetch_add(&self, word: $word, order: Ordering) -> $word {
                    <$atomic>::fetch_add(self, word, order)
                }

                #[inline]
                fn fetch_min(&self, word: $word, order: Ordering) -> $word {
                    <$atomic>::fetch_min(self, word, order)
                }

                #[inline]
                fn fetch_max(&self, word: $word, order: Ordering) -> $word {
                    <$atomic>::fetch_max(self, word, order)
                }

                #[inline]
                fn fetch_or(&self, word: $word, order: Ordering) -> $word {
                    <$atomic>::fetch_or(self, word, order)
                }

                #[inline]
                fn fetch_and(&self, word: $word, order: Ordering) -> $word {
                    <$atomic>::fetch_and(self, word, order)
                }
            }
        )*
    };
}

atomic_word! {
    AtomicI32 => i32,
    AtomicU32 => u32,
    AtomicI64 => i64,
    AtomicU64 => u64,
}

/// A fixed-width value that can be the target of an atomic operation.
///
/// Implemented for `i32`, `u32`, `i64`, `u64`, `f32` and `f64`.
pub trait Scalar: Copy + PartialOrd + Debug + Send + Sync + 'static + sealed::Sealed {
    /// Same-width integer the value is reinterpreted as for compare-and-swap.
    type Word: Copy + Eq + Debug + Send + Sync + 'static;

    /// Atomic cell holding [`Self::Word`].
    type Atomic: AtomicWord<Word = Self::Word>;

    /// Short type name, used in diagnostics and bench output.
    const NAME: &'static str;

    /// Reinterpret as the word alias.
    fn to_word(self) -> Self::Word;

    /// Reinterpret a word alias back to the value.
    fn from_word(word: Self::Word) -> Self;

    /// Addition as the `Add` operation defines it: wrapping for integers,
    /// IEEE for floats.
    fn accumulate(self, rhs: Self) -> Self;

    /// Bit-exact equality, as the hardware compare-and-swap sees it.
    #[inline]
    fn same_bits(self, other: Self) -> bool {
        self.to_word() == other.to_word()
    }
}

/// Integer scalars: the word alias is the value itself.
pub trait Integer: Scalar<Word = Self, Atomic: IntegerAtomic<Word = Self>> {}

macro_rules! integer {
    ($($ty:ty => $atomic:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                type Word = $ty;
                type Atomic = $atomic;

                const NAME: &'static str = stringify!($ty);

                #[inline(always)]
                fn to_word(self) -> $ty {
                    self
                }

                #[inline(always)]
                fn from_word(word: $ty) -> $ty {
                    word
                }

                #[inline(always)]
                fn accumulate(self, rhs: $ty) -> $ty {
                    self.wrapping_add(rhs)
                }
            }

            impl Integer for $ty {}
        )*
    };
}

macro_rules! float {
    ($($ty:ty => $word:ty, $atomic:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                type Word = $word;
                type Atomic = $atomic;

                const NAME: &'static str = stringify!($ty);

                #[inline(always)]
                fn to_word(self) -> $word {
                    self.to_bits()
                }

                #[inline(always)]
                fn from_word(word: $word) -> $ty {
                    <$ty>::from_bits(word)
                }

                #[inline(always)]
                fn accumulate(self, rhs: $ty) -> $ty {
                    self + rhs
                }
            }
        )*
    };
}

integer! {
    i32 => AtomicI32,
    u32 => AtomicU32,
    i64 => AtomicI64,
    u64 => AtomicU64,
}

float! {
    f32 => u32, AtomicU32,
    f64 => u64, AtomicU64,
}

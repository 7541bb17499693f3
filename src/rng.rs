//! Sources of `#RANDOM` draws.
//!
//! The reducer draws through whatever [`Rng`] the renderer was built with, never from a global
//! generator. Handing it a seeded [`RandRng`] or an [`RngMock`] makes a run reproducible.

use core::ops::RangeInclusive;

/// Draws the value of a `#RANDOM n` block.
///
/// Implementations should return a value in `range`. A value outside it is not an error, it
/// just matches no `#IF` branch.
pub trait Rng {
    /// Draws one integer from `range`, both ends included.
    ///
    /// ```rust
    /// use bms_mixdown::rng::{Rng, RngMock};
    ///
    /// let mut rng = RngMock([5]);
    /// assert_eq!(rng.generate(1..=10), 5);
    /// ```
    fn generate(&mut self, range: RangeInclusive<u64>) -> u64;
}

impl<R: Rng + ?Sized> Rng for &mut R {
    fn generate(&mut self, range: RangeInclusive<u64>) -> u64 {
        (**self).generate(range)
    }
}

/// Replays fixed values in a loop, whatever the range. For tests.
///
/// ```rust
/// use bms_mixdown::rng::{Rng, RngMock};
///
/// let mut rng = RngMock([1, 2]);
/// let draws: Vec<_> = (0..3).map(|_| rng.generate(1..=10)).collect();
/// assert_eq!(draws, [1, 2, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RngMock<const N: usize>(pub [u64; N]);

impl<const N: usize> Rng for RngMock<N> {
    fn generate(&mut self, _range: RangeInclusive<u64>) -> u64 {
        if N == 0 {
            return 0;
        }
        self.0.rotate_left(1);
        self.0.last().copied().unwrap_or_default()
    }
}

/// Uniform draws from any [`rand::RngCore`].
///
/// ```rust
/// use bms_mixdown::rng::{RandRng, Rng};
/// use rand::{SeedableRng, rngs::StdRng};
///
/// let mut rng = RandRng(StdRng::seed_from_u64(42));
/// assert!((1..=10).contains(&rng.generate(1..=10)));
/// ```
#[cfg(feature = "rand")]
#[derive(Debug, Clone)]
pub struct RandRng<R>(pub R);

#[cfg(feature = "rand")]
impl<R: rand::RngCore> Rng for RandRng<R> {
    fn generate(&mut self, range: RangeInclusive<u64>) -> u64 {
        use rand::Rng as _;

        if range.is_empty() {
            return *range.start();
        }
        self.0.random_range(range)
    }
}

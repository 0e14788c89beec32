use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Floating point values that can be accumulated concurrently from multiple
/// threads.
///
/// There are no atomic floating point types in the standard library, so the
/// value is stored as its bit pattern inside an atomic integer of the same
/// size, and additions are done with a compare-and-swap loop.
pub trait AtomicAdd: Copy {
    /// Atomic storage for a single value
    type Atomic: Send + Sync;

    /// Create a new atomic storage containing `value`
    fn new_atomic(value: Self) -> Self::Atomic;

    /// Add `value` to the content of `atomic`
    fn atomic_add(atomic: &Self::Atomic, value: Self);

    /// Consume the atomic storage and get the value back
    fn into_value(atomic: Self::Atomic) -> Self;
}

macro_rules! impl_atomic_add {
    ($float: ty, $atomic: ty) => {
        impl AtomicAdd for $float {
            type Atomic = $atomic;

            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value.to_bits())
            }

            #[inline]
            fn atomic_add(atomic: &Self::Atomic, value: Self) {
                let mut current = atomic.load(Ordering::Relaxed);
                loop {
                    let new = (<$float>::from_bits(current) + value).to_bits();
                    match atomic.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed) {
                        Ok(_) => return,
                        Err(actual) => current = actual,
                    }
                }
            }

            fn into_value(atomic: Self::Atomic) -> Self {
                <$float>::from_bits(atomic.into_inner())
            }
        }
    };
}

impl_atomic_add!(f32, AtomicU32);
impl_atomic_add!(f64, AtomicU64);

#[cfg(test)]
mod tests {
    use super::AtomicAdd;
    use rayon::prelude::*;

    #[test]
    fn concurrent_add() {
        let atomic = f64::new_atomic(1.5);
        (0..10_000).into_par_iter().for_each(|_| f64::atomic_add(&atomic, 0.25));
        assert_eq!(f64::into_value(atomic), 2501.5);

        let atomic = f32::new_atomic(0.0);
        (0..1024).into_par_iter().for_each(|_| f32::atomic_add(&atomic, -0.5));
        assert_eq!(f32::into_value(atomic), -512.0);
    }
}

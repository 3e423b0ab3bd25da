/// Source of the random draws a simulation makes.
///
/// Every tick draws through this trait so tests can replace the real
/// generator with a scripted one and assert exact markers and outcomes.
pub trait RandomSource: Send {
    /// A byte drawn uniformly from `0..=255`.
    fn next_octet(&mut self) -> u8;

    /// A float drawn uniformly from `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// An index drawn uniformly from `0..len`. `len` must be non-zero.
    fn next_index(&mut self, len: usize) -> usize {
        let scaled = (self.next_unit() * len as f64) as usize;
        scaled.min(len.saturating_sub(1))
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_octet(&mut self) -> u8 {
        (**self).next_octet()
    }

    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }

    fn next_index(&mut self, len: usize) -> usize {
        (**self).next_index(len)
    }
}

#[cfg(test)]
mod tests {
    use super::RandomSource;

    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_octet(&mut self) -> u8 {
            0
        }

        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    #[test]
    fn next_index_scales_unit_draws() {
        assert_eq!(Fixed(0.0).next_index(5), 0);
        assert_eq!(Fixed(0.39).next_index(5), 1);
        assert_eq!(Fixed(0.999_999).next_index(5), 4);
    }

    #[test]
    fn next_index_never_reaches_len() {
        // Out-of-contract draws of 1.0 still land on the last slot.
        assert_eq!(Fixed(1.0).next_index(3), 2);
    }
}

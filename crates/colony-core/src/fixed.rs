use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Exact ratio `num / den` as Fixed64, computed with integer math only.
///
/// Returns `None` when `den` is zero.
#[inline]
pub fn ratio(num: i32, den: i32) -> Option<Fixed64> {
    Fixed64::from_num(num).checked_div(Fixed64::from_num(den))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_exact() {
        let a = ratio(3, 2).unwrap();
        let b = ratio(2, 1).unwrap();
        assert_eq!(a + b, ratio(7, 2).unwrap());
    }

    #[test]
    fn ratio_by_zero_is_none() {
        assert!(ratio(1, 0).is_none());
    }

    #[test]
    fn twenty_four_twenty_fourths_reach_threshold() {
        let step = ratio(1, 24).unwrap();
        let mut total = Fixed64::ZERO;
        for _ in 0..23 {
            total += step;
        }
        assert!(total < ratio(99, 100).unwrap());
        total += step;
        assert!(total >= ratio(99, 100).unwrap());
    }

    #[test]
    fn fixed64_determinism() {
        let a = ratio(1, 3).unwrap();
        let b = ratio(1, 3).unwrap();
        assert_eq!(a * Fixed64::from_num(3), b * Fixed64::from_num(3));
    }
}

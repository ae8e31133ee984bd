//! Bounded binary search used as a membership test over sorted sample indices.
use crate::error::Error;
use crate::Result;
use log::trace;
use std::borrow::Cow;
use std::fmt::Display;

/// Default cap on comparison rounds
pub const DEFAULT_MAX_ROUNDS: usize = 10_000;

/// Returns `Ok(true)` if `target` is in `arr`.
///
/// `arr` is sorted on a copy first unless `presorted` is set. Fails with
/// [`Error::TargetNotFound`] when the target is absent and with
/// [`Error::IterationLimit`] once more than `max_rounds` comparisons were needed.
pub fn binary_search<T>(target: T, arr: &[T], presorted: bool, max_rounds: usize) -> Result<bool>
where
    T: Ord + Copy + Display,
{
    let arr: Cow<'_, [T]> = if presorted {
        Cow::Borrowed(arr)
    } else {
        let mut sorted = arr.to_vec();
        sorted.sort_unstable();
        Cow::Owned(sorted)
    };

    // exclusive bounds, `low` may sit one before the first element
    let mut low: isize = -1;
    let mut high = arr.len() as isize;
    let mut rounds = 0;

    while high - low > 1 {
        rounds += 1;
        if rounds > max_rounds {
            return Err(Error::IterationLimit(max_rounds));
        }

        let mid = (low + high) / 2;
        let value = arr[mid as usize];
        trace!("Round {}: {} at {} in ({}, {})", rounds, value, mid, low, high);

        if target == value {
            return Ok(true);
        } else if target < value {
            high = mid;
        } else {
            low = mid;
        }
    }

    Err(Error::TargetNotFound(target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_present_target() {
        let arr: Vec<usize> = (0..1000).map(|i| i * 3).collect();
        for target in &[0, 3, 1500, 2997] {
            assert!(binary_search(*target, &arr, true, DEFAULT_MAX_ROUNDS).unwrap());
        }
    }

    #[test]
    fn logarithmic_rounds() {
        let arr: Vec<u64> = (0..1_000_000).collect();
        // 2^20 > 10^6
        assert!(binary_search(999_999, &arr, true, 21).unwrap());
        assert!(binary_search(0, &arr, true, 21).unwrap());
    }

    #[test]
    fn absent_target() {
        let arr = [1, 5, 9, 13];
        match binary_search(6, &arr, true, DEFAULT_MAX_ROUNDS) {
            Err(Error::TargetNotFound(value)) => assert_eq!(value, "6"),
            other => panic!("expected TargetNotFound, got {:?}", other),
        }
        assert!(binary_search(42, &[], true, DEFAULT_MAX_ROUNDS).is_err());
    }

    #[test]
    fn sorts_unless_presorted() {
        let arr = [13, 1, 9, 5, 21, 2];
        assert!(binary_search(2, &arr, false, DEFAULT_MAX_ROUNDS).unwrap());
        // on unsorted input the caller's promise is trusted and the search goes astray
        assert!(matches!(
            binary_search(2, &arr, true, DEFAULT_MAX_ROUNDS),
            Err(Error::TargetNotFound(_))
        ));
    }

    #[test]
    fn round_cap() {
        let arr: Vec<i64> = (0..1024).collect();
        match binary_search(1, &arr, true, 3) {
            Err(Error::IterationLimit(rounds)) => assert_eq!(rounds, 3),
            other => panic!("expected IterationLimit, got {:?}", other),
        }
    }
}

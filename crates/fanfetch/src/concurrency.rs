use crate::{Error, Result};

/// Computes how many worker groups a dispatch call spawns.
///
/// The level is `route_count / max_concurrency` rounded down, and never less
/// than `1`. While every route fits under the ceiling
/// (`route_count <= max_concurrency`, including the empty case) a single group
/// is used. Routes beyond a whole multiple of the ceiling are spread over the
/// existing groups by [`partition_routes`](crate::partition_routes) rather
/// than getting a group of their own.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `max_concurrency` is zero.
///
/// # Example
/// ```
/// use fanfetch::concurrency_level;
///
/// assert_eq!(concurrency_level(0, 100).unwrap(), 1);
/// assert_eq!(concurrency_level(20, 20).unwrap(), 1);
/// assert_eq!(concurrency_level(110, 20).unwrap(), 5);
/// ```
pub fn concurrency_level(route_count: usize, max_concurrency: usize) -> Result<usize> {
    if max_concurrency == 0 {
        return Err(Error::configuration(
            "max_concurrency must be greater than 0",
        ));
    }

    Ok((route_count / max_concurrency).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_group_when_routes_fit() {
        assert_eq!(concurrency_level(0, 100).unwrap(), 1);
        assert_eq!(concurrency_level(1, 20).unwrap(), 1);
        assert_eq!(concurrency_level(20, 20).unwrap(), 1);
    }

    #[test]
    fn buckets_when_routes_exceed_ceiling() {
        assert_eq!(concurrency_level(110, 20).unwrap(), 5);
        assert_eq!(concurrency_level(21, 20).unwrap(), 1);
        assert_eq!(concurrency_level(39, 20).unwrap(), 1);
        assert_eq!(concurrency_level(40, 20).unwrap(), 2);
        assert_eq!(concurrency_level(5, 1).unwrap(), 5);
        assert_eq!(concurrency_level(101, 10).unwrap(), 10);
    }

    #[test]
    fn level_formula_holds() {
        for routes in 0..=300 {
            for ceiling in 1..=40 {
                let level = concurrency_level(routes, ceiling).unwrap();
                let expected = if routes <= ceiling { 1 } else { routes / ceiling };
                assert_eq!(level, expected, "routes={routes} ceiling={ceiling}");
                assert!(level >= 1);
                assert!(routes == 0 || level <= routes);
            }
        }
    }

    #[test]
    fn zero_ceiling_is_a_configuration_error() {
        let err = concurrency_level(10, 0).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}

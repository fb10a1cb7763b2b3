//! Workgroup width for the normal-recompute pass.
//!
//! The normal kernel stages one triangle per three consecutive invocations in
//! workgroup memory, so a group must never split a triangle: its width has to
//! be a multiple of 3 and has to divide the vertex count exactly.

/// Candidate widths, largest first.
pub const GROUP_WIDTH_CANDIDATES: [u32; 10] = [30, 27, 24, 21, 18, 15, 12, 9, 6, 3];

/// Smallest candidate; valid for every vertex count that is a multiple of 3.
pub const FALLBACK_GROUP_WIDTH: u32 = 3;

/// Largest candidate evenly dividing `vertex_count`, or 3.
///
/// Does not look at the device's workgroup limits; see
/// [`best_group_width_capped`].
pub fn best_group_width(vertex_count: u32) -> u32 {
    GROUP_WIDTH_CANDIDATES
        .iter()
        .copied()
        .find(|width| vertex_count % width == 0)
        .unwrap_or(FALLBACK_GROUP_WIDTH)
}

/// Like [`best_group_width`], skipping candidates wider than `device_max`.
///
/// The candidate list stops at 30, so larger device limits never produce
/// wider groups.
pub fn best_group_width_capped(vertex_count: u32, device_max: u32) -> u32 {
    GROUP_WIDTH_CANDIDATES
        .iter()
        .copied()
        .filter(|&width| width <= device_max)
        .find(|width| vertex_count % width == 0)
        .unwrap_or(FALLBACK_GROUP_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(best_group_width(90), 30);
        assert_eq!(best_group_width(81), 27);
        assert_eq!(best_group_width(24), 24);
        assert_eq!(best_group_width(3), 3);
    }

    #[test]
    fn test_tile_vertex_counts() {
        // 50x50, 25x25 and 5x5 quads at 6 vertices each
        assert_eq!(best_group_width(15_000), 30);
        assert_eq!(best_group_width(3_750), 30);
        assert_eq!(best_group_width(150), 30);
        // 2x2 quads
        assert_eq!(best_group_width(24), 24);
    }

    #[test]
    fn test_result_is_largest_dividing_candidate() {
        for n in (3..=3000u32).step_by(3) {
            let width = best_group_width(n);
            assert_eq!(n % width, 0, "n={n} width={width}");
            assert_eq!(width % 3, 0);
            for &larger in GROUP_WIDTH_CANDIDATES.iter().filter(|&&c| c > width) {
                assert_ne!(n % larger, 0, "n={n}: {larger} divides but {width} was chosen");
            }
        }
    }

    #[test]
    fn test_prime_multiple_of_three_falls_back() {
        assert_eq!(best_group_width(3 * 31), 3);
    }

    #[test]
    fn test_cap_skips_wider_candidates() {
        assert_eq!(best_group_width_capped(90, 64), 30);
        assert_eq!(best_group_width_capped(90, 16), 15);
        assert_eq!(best_group_width_capped(81, 20), 9);
        assert_eq!(best_group_width_capped(90, 1), 3);
    }

    #[test]
    fn test_cap_never_exceeds_thirty() {
        assert_eq!(best_group_width_capped(120, 1024), 30);
    }
}

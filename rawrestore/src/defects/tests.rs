use common::Buffer2;

use super::*;
use crate::raw::{CfaPattern, CfaType, RawFrame, XTransPattern};
use crate::testing::{XTRANS_TEST_TILE, init_tracing, noise_grid};

/// Gradient-weighted estimate for `(k, a, b)` pairs.
fn weighted(pairs: &[(f32, f32, f32)]) -> f32 {
    let mut sum = 0.0f32;
    let mut norm = 0.0f32;
    for &(k, a, b) in pairs {
        let w = k / ((a - b).abs() + 1.0);
        sum += w * (a + b);
        norm += w;
    }
    sum / (2.0 * norm)
}

fn bits_equal(a: &Buffer2<f32>, b: &Buffer2<f32>) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn xtrans() -> XTransPattern {
    XTransPattern::new(XTRANS_TEST_TILE)
}

// ============================================================================
// DefectMap
// ============================================================================

#[test]
fn test_defect_map_set_get_clear() {
    let mut map = DefectMap::new(130, 3);
    assert!(map.is_empty());
    map.set(0, 0);
    map.set(63, 1);
    map.set(64, 1);
    map.set(129, 2);
    assert!(map.get(0, 0));
    assert!(map.get(63, 1));
    assert!(map.get(64, 1));
    assert!(map.get(129, 2));
    assert!(!map.get(1, 0));
    assert!(!map.get(129, 1));
    assert_eq!(map.count(), 4);

    map.clear(63, 1);
    assert!(!map.get(63, 1));
    assert_eq!(map.count(), 3);
}

#[test]
fn test_defect_map_skip_if_zero() {
    let mut map = DefectMap::new(200, 2);
    // Clean word: distance to the end of the 64-site word
    assert_eq!(map.skip_if_zero(0, 0), 64);
    assert_eq!(map.skip_if_zero(10, 0), 54);
    assert_eq!(map.skip_if_zero(70, 0), 58);

    map.set(100, 0);
    // Word 64..128 of row 0 is dirty now
    assert_eq!(map.skip_if_zero(70, 0), 0);
    assert_eq!(map.skip_if_zero(127, 0), 0);
    // Row 1 and the other words are untouched
    assert_eq!(map.skip_if_zero(70, 1), 58);
    assert_eq!(map.skip_if_zero(130, 0), 62);
}

#[test]
fn test_defect_map_set_positions_ignores_outside() {
    let mut map = DefectMap::new(10, 8);
    let applied = map.set_positions(&[(1, 1), (9, 7), (10, 0), (0, 8), (3, 3), (3, 3)]);
    assert_eq!(applied, 4);
    assert_eq!(map.count(), 3);
    assert!(map.get(9, 7));
}

#[test]
fn test_defect_map_merge_and_iter() {
    let mut a = DefectMap::new(70, 4);
    let mut b = DefectMap::new(70, 4);
    a.set(2, 0);
    b.set(69, 3);
    b.set(2, 0);
    a.merge(&b);
    assert_eq!(a.iter().collect::<Vec<_>>(), vec![(2, 0), (69, 3)]);
}

#[test]
#[should_panic(expected = "don't match")]
fn test_defect_map_merge_size_mismatch() {
    let mut a = DefectMap::new(8, 8);
    a.merge(&DefectMap::new(8, 9));
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn test_hot_dead_ratio() {
    assert!((hot_dead_ratio(0.0) - 1.0 / 24.0).abs() < 1e-7);
    assert!((hot_dead_ratio(100.0) - 21.0 / 24.0).abs() < 1e-7);
}

#[test]
fn test_find_hot_pixel_isolated() {
    let mut grid = Buffer2::new_filled(12, 12, 100.0f32);
    grid[(6, 6)] = 1000.0;
    let mut map = DefectMap::new(12, 12);

    let found = find_hot_dead_pixels(&grid, &mut map, 100.0, true, true);

    assert_eq!(found, 1);
    assert_eq!(map.iter().collect::<Vec<_>>(), vec![(6, 6)]);
}

#[test]
fn test_find_hot_disabled() {
    let mut grid = Buffer2::new_filled(12, 12, 100.0f32);
    grid[(6, 6)] = 1000.0;
    let mut map = DefectMap::new(12, 12);

    assert_eq!(find_hot_dead_pixels(&grid, &mut map, 100.0, false, true), 0);
    assert!(map.is_empty());
}

#[test]
fn test_find_dead_pixel() {
    let mut grid = Buffer2::new_filled(12, 12, 100.0f32);
    grid[(5, 7)] = 1.0;
    let mut map = DefectMap::new(12, 12);

    assert_eq!(find_hot_dead_pixels(&grid, &mut map, 50.0, true, false), 0);
    assert_eq!(find_hot_dead_pixels(&grid, &mut map, 50.0, false, true), 1);
    assert!(map.get(5, 7));
}

#[test]
fn test_find_hot_dead_never_flags_border() {
    let mut grid = noise_grid(40, 30, 0.0, 1000.0, 7);
    // Extreme values right on the guard band
    grid[(1, 1)] = 1e6;
    grid[(38, 28)] = 1e6;
    grid[(0, 15)] = 0.0;
    let mut map = DefectMap::new(40, 30);

    find_hot_dead_pixels(&grid, &mut map, 0.0, true, true);

    for (x, y) in map.iter() {
        assert!(
            (EDGE_GUARD..40 - EDGE_GUARD).contains(&x) && (EDGE_GUARD..30 - EDGE_GUARD).contains(&y),
            "flagged border site ({x}, {y})"
        );
    }
}

#[test]
fn test_find_hot_dead_flat_grid_flags_nothing() {
    let grid = Buffer2::new_filled(16, 16, 512.0f32);
    let mut map = DefectMap::new(16, 16);
    assert_eq!(find_hot_dead_pixels(&grid, &mut map, 0.0, true, true), 0);
}

#[test]
fn test_find_hot_dead_tiny_grid() {
    let grid = Buffer2::new_filled(4, 4, 1.0f32);
    let mut map = DefectMap::new(4, 4);
    assert_eq!(find_hot_dead_pixels(&grid, &mut map, 0.0, true, true), 0);
}

#[test]
fn test_find_zero_pixels_exact_set() {
    let mut grid = noise_grid(33, 9, 1.0, 50.0, 3);
    let zeros = [(0, 0), (32, 8), (5, 4), (17, 0)];
    for &(x, y) in &zeros {
        grid[(x, y)] = 0.0;
    }
    grid[(6, 4)] = f32::MIN_POSITIVE;
    grid[(7, 4)] = -0.0;
    let mut map = DefectMap::new(33, 9);

    let found = find_zero_pixels(&grid, &mut map);

    // -0.0 == 0.0 in IEEE comparison
    let mut expected: Vec<(usize, usize)> = zeros.to_vec();
    expected.push((7, 4));
    expected.sort_by_key(|&(x, y)| (y, x));
    assert_eq!(found, expected.len());
    assert_eq!(map.iter().collect::<Vec<_>>(), expected);
}

// ============================================================================
// Bayer repair
// ============================================================================

#[test]
fn test_bayer_green_two_diagonal_pairs() {
    // Green site at (5, 4) in RGGB; horizontal and vertical pairs blocked.
    let (x, y) = (5, 4);
    let mut grid = Buffer2::new_filled(11, 9, 50.0f32);
    grid[(x, y)] = 9999.0;
    grid[(x - 1, y - 1)] = 100.0;
    grid[(x + 1, y + 1)] = 200.0;
    grid[(x + 1, y - 1)] = 120.0;
    grid[(x - 1, y + 1)] = 130.0;

    let mut map = DefectMap::new(11, 9);
    map.set(x, y);
    map.set(x - 2, y);
    map.set(x, y - 2);

    interpolate_bayer(&map, &mut grid, CfaPattern::Rggb);

    let expected = weighted(&[(0.707_106_78, 100.0, 200.0), (0.707_106_78, 120.0, 130.0)]);
    assert!(
        (grid[(x, y)] - expected).abs() < 1e-3,
        "expected {expected}, got {}",
        grid[(x, y)]
    );
}

#[test]
fn test_bayer_red_uses_corners_and_axes() {
    let grid0 = noise_grid(12, 12, 100.0, 400.0, 11);
    let mut grid = grid0.clone();
    let (x, y) = (6, 6); // red in RGGB
    let mut map = DefectMap::new(12, 12);
    map.set(x, y);

    assert_eq!(interpolate_bayer(&map, &mut grid, CfaPattern::Rggb), 1);

    let g = |dx: isize, dy: isize| grid0[((x as isize + dx) as usize, (y as isize + dy) as usize)];
    let expected = weighted(&[
        (0.353_553_39, g(-2, -2), g(2, 2)),
        (0.353_553_39, g(2, -2), g(-2, 2)),
        (0.5, g(-2, 0), g(2, 0)),
        (0.5, g(0, -2), g(0, 2)),
    ]);
    assert!((grid[(x, y)] - expected).abs() < 1e-3);
}

#[test]
fn test_bayer_fallback_mean() {
    let grid0 = noise_grid(10, 10, 10.0, 90.0, 5);
    let mut grid = grid0.clone();
    let (x, y) = (4, 4); // red in RGGB
    let mut map = DefectMap::new(10, 10);
    for &(fx, fy) in &[(4, 4), (2, 2), (6, 2), (2, 4), (4, 2)] {
        map.set(fx, fy);
    }

    interpolate_bayer(&map, &mut grid, CfaPattern::Rggb);

    let expected = (grid0[(6, 4)] + grid0[(2, 6)] + grid0[(4, 6)] + grid0[(6, 6)]) / 4.0;
    assert!((grid[(x, y)] - expected).abs() < 1e-4);
}

#[test]
fn test_bayer_fallback_with_no_neighbours_is_noop() {
    let mut grid = noise_grid(9, 9, 10.0, 90.0, 9);
    let before = grid[(4, 4)];
    let mut map = DefectMap::new(9, 9);
    for y in [2, 4, 6] {
        for x in [2, 4, 6] {
            map.set(x, y);
        }
    }

    interpolate_bayer(&map, &mut grid, CfaPattern::Rggb);

    assert_eq!(grid[(4, 4)], before);
}

#[test]
fn test_bayer_empty_map_is_identity() {
    let mut grid = noise_grid(40, 20, 0.0, 1000.0, 1);
    let before = grid.clone();
    let map = DefectMap::new(40, 20);

    assert_eq!(interpolate_bayer(&map, &mut grid, CfaPattern::Grbg), 0);
    assert!(bits_equal(&grid, &before));
}

#[test]
fn test_bayer_touches_only_flagged_and_is_idempotent() {
    let before = noise_grid(70, 40, 0.0, 1000.0, 21);
    let mut grid = before.clone();
    let mut map = DefectMap::new(70, 40);
    let mut state = 17u32;
    for _ in 0..150 {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        map.set((state >> 8) as usize % 70, (state >> 20) as usize % 40);
    }

    interpolate_bayer(&map, &mut grid, CfaPattern::Bggr);
    for y in 0..40 {
        for x in 0..70 {
            if !map.get(x, y) {
                assert_eq!(grid[(x, y)].to_bits(), before[(x, y)].to_bits());
            }
        }
    }

    let once = grid.clone();
    interpolate_bayer(&map, &mut grid, CfaPattern::Bggr);
    assert!(bits_equal(&grid, &once));
}

// ============================================================================
// N-colour repair
// ============================================================================

#[test]
fn test_ncolor_pairs_per_channel() {
    let colors = 3;
    let grid0 = noise_grid(8 * colors, 8, 100.0, 300.0, 4);
    let mut grid = grid0.clone();
    let (x, y) = (4, 3);
    let mut map = DefectMap::new(8, 8);
    map.set(x, y);

    assert_eq!(interpolate_ncolor(&map, &mut grid, colors), 1);

    for c in 0..colors {
        let g = |sx: usize, sy: usize| grid0[(sx * colors + c, sy)];
        let expected = weighted(&[
            (0.707_106_78, g(x - 1, y - 1), g(x + 1, y + 1)),
            (0.707_106_78, g(x + 1, y - 1), g(x - 1, y + 1)),
            (1.0, g(x - 1, y), g(x + 1, y)),
            (1.0, g(x, y - 1), g(x, y + 1)),
        ]);
        let got = grid[(x * colors + c, y)];
        assert!((got - expected).abs() < 1e-3, "channel {c}: expected {expected}, got {got}");
    }
    // Neighbouring site untouched
    for c in 0..colors {
        assert_eq!(grid[((x + 1) * colors + c, y)], grid0[((x + 1) * colors + c, y)]);
    }
}

#[test]
fn test_ncolor_fallback_mean() {
    let colors = 2;
    let grid0 = noise_grid(9 * colors, 9, 0.0, 100.0, 8);
    let mut grid = grid0.clone();
    let (x, y) = (4, 4);
    let mut map = DefectMap::new(9, 9);
    map.set(x, y);
    for dy in [-1isize, 0, 1] {
        for dx in [-1isize, 0, 1] {
            map.set((x as isize + dx) as usize, (y as isize + dy) as usize);
        }
    }

    interpolate_ncolor(&map, &mut grid, colors);

    for c in 0..colors {
        let g = |sx: usize, sy: usize| grid0[(sx * colors + c, sy)];
        let neighbours = [
            g(2, 2),
            g(4, 2),
            g(6, 2),
            g(2, 4),
            g(6, 4),
            g(2, 6),
            g(4, 6),
            g(6, 6),
        ];
        let expected = neighbours.iter().sum::<f32>() / 8.0;
        assert!((grid[(x * colors + c, y)] - expected).abs() < 1e-3);
    }
}

#[test]
fn test_ncolor_empty_map_is_identity() {
    let mut grid = noise_grid(30, 10, 0.0, 1.0, 2);
    let before = grid.clone();
    assert_eq!(interpolate_ncolor(&DefectMap::new(10, 10), &mut grid, 3), 0);
    assert!(bits_equal(&grid, &before));
}

// ============================================================================
// X-Trans repair
// ============================================================================

#[test]
fn test_xtrans_red_uses_virtual_counterpart() {
    // Red at tile (2, 1): no same-colour site at (-2, 0), so the mirror of the
    // distance-2 site at (+2, 0) is synthesized from (-2, -1) and (-2, +1).
    let grid0 = noise_grid(16, 16, 100.0, 500.0, 31);
    let mut grid = grid0.clone();
    let (x, y) = (7, 8);
    let pattern = xtrans();
    assert_eq!(pattern.color_at(y, x), crate::raw::RED);
    assert_ne!(pattern.color_at(y, x - 2), crate::raw::RED);
    assert_ne!(pattern.color_at(y - 2, x), crate::raw::RED);
    assert_ne!(pattern.color_at(y + 2, x), crate::raw::RED);

    let mut map = DefectMap::new(16, 16);
    map.set(x, y);
    assert_eq!(interpolate_xtrans(&map, &mut grid, &pattern), 1);

    let g = |sx: usize, sy: usize| grid0[(sx, sy)];
    let virtual_pixel = 0.5 * (g(5, 7) + g(5, 9));
    let expected = weighted(&[
        (0.447_213_59, g(8, 6), g(5, 9)),
        (0.447_213_59, g(8, 10), g(5, 7)),
        (0.5, virtual_pixel, g(9, 8)),
    ]);
    assert!(
        (grid[(x, y)] - expected).abs() < 1e-3,
        "expected {expected}, got {}",
        grid[(x, y)]
    );
}

#[test]
fn test_xtrans_block_green() {
    // Green at tile (0, 0) is the top-left of a 2x2 green block.
    let grid0 = noise_grid(16, 16, 100.0, 500.0, 12);
    let mut grid = grid0.clone();
    let (x, y) = (6, 6);
    let mut map = DefectMap::new(16, 16);
    map.set(x, y);

    interpolate_xtrans(&map, &mut grid, &xtrans());

    let g = |sx: usize, sy: usize| grid0[(sx, sy)];
    let expected = weighted(&[
        (0.707_106_78, g(5, 5), g(7, 7)),
        (1.0, g(7, 6), g(6, 7)),
        (0.447_213_59, g(8, 5), g(5, 8)),
    ]);
    assert!((grid[(x, y)] - expected).abs() < 1e-3);
}

#[test]
fn test_xtrans_solitary_green() {
    let grid0 = noise_grid(16, 16, 100.0, 500.0, 13);
    let mut grid = grid0.clone();
    let (x, y) = (8, 8); // tile (2, 2)
    let mut map = DefectMap::new(16, 16);
    map.set(x, y);

    interpolate_xtrans(&map, &mut grid, &xtrans());

    let g = |sx: usize, sy: usize| grid0[(sx, sy)];
    let expected = weighted(&[
        (0.707_106_78, g(7, 7), g(9, 9)),
        (0.707_106_78, g(9, 7), g(7, 9)),
        (0.447_213_59, g(7, 6), g(9, 10)),
        (0.447_213_59, g(9, 6), g(7, 10)),
        (0.447_213_59, g(6, 7), g(10, 9)),
        (0.447_213_59, g(10, 7), g(6, 9)),
    ]);
    assert!((grid[(x, y)] - expected).abs() < 1e-3);
}

#[test]
fn test_xtrans_without_pairs_leaves_site() {
    let mut grid = noise_grid(16, 16, 100.0, 500.0, 14);
    let (x, y) = (8, 8);
    let before = grid[(x, y)];
    let mut map = DefectMap::new(16, 16);
    map.set(x, y);
    // One member of every solitary-green pair
    for &(fx, fy) in &[(7, 7), (9, 7), (7, 6), (9, 6), (6, 7), (10, 7)] {
        map.set(fx, fy);
    }

    interpolate_xtrans(&map, &mut grid, &xtrans());

    assert_eq!(grid[(x, y)], before);
}

#[test]
fn test_xtrans_empty_map_is_identity_and_repair_idempotent() {
    let before = noise_grid(36, 24, 0.0, 1000.0, 15);
    let mut grid = before.clone();
    assert_eq!(interpolate_xtrans(&DefectMap::new(36, 24), &mut grid, &xtrans()), 0);
    assert!(bits_equal(&grid, &before));

    // Isolated defects, far enough apart that no neighbourhood overlaps
    let mut map = DefectMap::new(36, 24);
    for y in (3..21).step_by(6) {
        for x in (3..33).step_by(7) {
            map.set(x, y);
        }
    }
    let repaired = interpolate_xtrans(&map, &mut grid, &xtrans());
    assert_eq!(repaired, map.count());

    let once = grid.clone();
    interpolate_xtrans(&map, &mut grid, &xtrans());
    assert!(bits_equal(&grid, &once));
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_correct_defects_bayer() {
    init_tracing();
    let mut data = Buffer2::new_filled(16, 16, 200.0f32);
    data[(5, 5)] = 0.0;
    data[(8, 9)] = 5000.0;
    let mut frame = RawFrame::new(data, CfaType::Bayer(CfaPattern::Rggb));
    let config = DefectConfig {
        zero_is_bad: true,
        hot_pixel_filter: true,
        dead_pixel_filter: false,
        static_defects: vec![(3, 3), (100, 100)],
        ..Default::default()
    };

    let report = correct_defects(&mut frame, &config);

    assert_eq!(report.zero, 1);
    assert_eq!(report.listed, 1);
    assert_eq!(report.hot_dead, 1);
    assert_eq!(report.repaired, 3);
    assert!(frame.data.iter().all(|&v| (v - 200.0).abs() < 1e-3));
}

#[test]
fn test_correct_defects_nothing_flagged() {
    let data = noise_grid(20, 20, 10.0, 100.0, 3);
    let mut frame = RawFrame::new(data.clone(), CfaType::Bayer(CfaPattern::Gbrg));

    let report = correct_defects(&mut frame, &DefectConfig::default());

    assert_eq!(report, DefectReport::default());
    assert!(bits_equal(&frame.data, &data));
}

#[test]
fn test_correct_defects_xtrans_skips_hot_dead_detection() {
    let mut data = Buffer2::new_filled(18, 18, 300.0f32);
    data[(8, 8)] = 1e5;
    data[(6, 6)] = 0.0;
    let mut frame = RawFrame::new(data, CfaType::XTrans(xtrans()));
    let config = DefectConfig {
        zero_is_bad: true,
        hot_pixel_filter: true,
        dead_pixel_filter: true,
        ..Default::default()
    };

    let report = correct_defects(&mut frame, &config);

    assert_eq!(report.hot_dead, 0);
    assert_eq!(report.repaired, 1);
    assert!((frame.data[(6, 6)] - 300.0).abs() < 1e-3);
    assert_eq!(frame.data[(8, 8)], 1e5);
}

#[test]
fn test_correct_defects_interleaved_zero_site() {
    let colors = 3;
    let mut data = Buffer2::new_filled(10 * colors, 10, 40.0f32);
    data[(5 * colors + 1, 5)] = 0.0;
    let mut frame = RawFrame::new(data, CfaType::Interleaved { colors });
    let config = DefectConfig {
        zero_is_bad: true,
        ..Default::default()
    };

    let report = correct_defects(&mut frame, &config);

    assert_eq!(report.zero, 1);
    assert_eq!(report.repaired, 1);
    assert!(frame.data.iter().all(|&v| (v - 40.0).abs() < 1e-3));
}

#[test]
#[should_panic(expected = "threshold must be a non-negative finite percentage")]
fn test_defect_config_validate() {
    let config = DefectConfig {
        threshold: -1.0,
        ..Default::default()
    };
    config.validate();
}

#[test]
fn test_defect_config_yaml() {
    let config = DefectConfig {
        hot_pixel_filter: true,
        threshold: 40.0,
        static_defects: vec![(1, 2)],
        ..Default::default()
    };
    let yaml = serde_yml::to_string(&config).unwrap();
    let parsed: DefectConfig = serde_yml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);

    // Missing fields fall back to defaults
    let partial: DefectConfig = serde_yml::from_str("zero_is_bad: true\n").unwrap();
    assert!(partial.zero_is_bad);
    assert_eq!(partial.threshold, 100.0);
}

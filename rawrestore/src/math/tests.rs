use super::*;

#[test]
fn test_median9_sorted_and_reversed() {
    let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
    assert_eq!(median9(sorted), 5.0);
    let mut reversed = sorted;
    reversed.reverse();
    assert_eq!(median9(reversed), 5.0);
}

#[test]
fn test_median9_matches_sort_on_permutations() {
    // Deterministic shuffles of distinct values plus duplicates
    let base = [3.5, -1.0, 8.0, 8.0, 0.0, 2.25, 100.0, -7.5, 4.0];
    let mut expected = base;
    expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for shift in 0..9 {
        for stride in [1usize, 2, 4, 5, 7, 8] {
            let mut v = [0.0f32; 9];
            for (i, slot) in v.iter_mut().enumerate() {
                *slot = base[(shift + i * stride) % 9];
            }
            assert_eq!(median9(v), expected[4], "shift {shift} stride {stride}");
        }
    }
}

#[test]
fn test_plane_stats_constant_is_exact() {
    for value in [0.0f32, 0.1, 1234.567, 32767.0, -3.3] {
        let plane = Buffer2::new_filled(97, 53, value);
        let stats = plane_stats(&plane);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.mean, value);
        assert_eq!(stats.min, value);
        assert_eq!(stats.max, value);
    }
}

#[test]
fn test_plane_stats_known_values() {
    // Values 1..=4: mean 2.5, population variance 1.25
    let plane = Buffer2::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let stats = plane_stats(&plane);
    assert!((stats.mean - 2.5).abs() < 1e-6);
    assert!((stats.stddev - 1.25f32.sqrt()).abs() < 1e-6);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 4.0);
}

#[test]
fn test_plane_stats_large_offset() {
    // Half 16000, half 16002 over many rows: mean 16001, stddev 1
    let width = 64;
    let height = 80;
    let pixels = (0..width * height)
        .map(|i| if i % 2 == 0 { 16000.0 } else { 16002.0 })
        .collect();
    let stats = plane_stats(&Buffer2::new(width, height, pixels));
    assert!((stats.mean - 16001.0).abs() < 1e-3);
    assert!((stats.stddev - 1.0).abs() < 1e-3);
}

#[test]
fn test_plane_stats_empty() {
    let stats = plane_stats(&Buffer2::new_default(0, 0));
    assert_eq!(stats.mean, 0.0);
    assert_eq!(stats.stddev, 0.0);
}

#[test]
fn test_intp() {
    assert_eq!(intp(0.0, 10.0, 2.0), 2.0);
    assert_eq!(intp(1.0, 10.0, 2.0), 10.0);
    assert_eq!(intp(0.25, 10.0, 2.0), 4.0);
}

#[test]
fn test_plane_stats_independent_of_thread_count() {
    let plane = crate::testing::noise_grid(257, 131, 1000.0, 50000.0, 11);
    let stats_in_pool = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| plane_stats(&plane))
    };

    let single = stats_in_pool(1);
    for threads in [2, 7] {
        let multi = stats_in_pool(threads);
        assert_eq!(single.mean.to_bits(), multi.mean.to_bits());
        assert_eq!(single.stddev.to_bits(), multi.stddev.to_bits());
        assert_eq!(single.min.to_bits(), multi.min.to_bits());
        assert_eq!(single.max.to_bits(), multi.max.to_bits());
    }
}

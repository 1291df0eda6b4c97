/// Maps a Lab hue angle in radians onto the HSV hue wheel in `[0, 1]`.
///
/// The mapping is piecewise linear through the primary and secondary hues
/// (red near 0.93 to 1.0, yellow near 0.17, green near 0.42, blue near 0.67).
/// Angles outside `[-3.14159, 3.14159)` map to 0.
#[allow(clippy::approx_constant)]
pub fn huelab_to_huehsv(h: f32) -> f32 {
    let hr = if (0.0..0.6).contains(&h) {
        0.11666 * h + 0.93
    } else if (0.6..1.4).contains(&h) {
        0.1125 * h - 0.0675
    } else if (1.4..2.0).contains(&h) {
        0.2666 * h - 0.2833
    } else if (2.0..3.14159).contains(&h) {
        0.1489 * h - 0.04785
    } else if (-3.14159..-2.8).contains(&h) {
        0.23419 * h + 1.1557
    } else if (-2.8..-2.3).contains(&h) {
        0.16 * h + 0.948
    } else if (-2.3..-0.9).contains(&h) {
        0.12143 * h + 0.85928
    } else if (-0.9..-0.1).contains(&h) {
        0.2125 * h + 0.94125
    } else if (-0.1..0.0).contains(&h) {
        0.1 * h + 0.93
    } else {
        0.0
    };

    if hr < 0.0 {
        hr + 1.0
    } else if hr > 1.0 {
        hr - 1.0
    } else {
        hr
    }
}

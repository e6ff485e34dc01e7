/// `true` when `left` and `right` differ by at most `tolerance`.
#[expect(
    clippy::float_arithmetic,
    reason = "Comparing floats needs their difference."
)]
pub(crate) fn approx_eq(left: f64, right: f64, tolerance: f64) -> bool {
    (left - right).abs() <= tolerance
}

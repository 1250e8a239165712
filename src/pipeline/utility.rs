/// Mean of the prices that are present, with how many there were.
/// Returns `None` when every price is missing.
pub fn mean_present(prices: &[Option<f64>]) -> Option<(f64, usize)> {
    let present: Vec<f64> = prices.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    Some((mean, present.len()))
}

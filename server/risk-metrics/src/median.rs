//! Sample median (mean of the two middle values for even sizes).

/// `None` for an empty sample.
pub fn median(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);
  let mid = sorted.len() / 2;
  if sorted.len() % 2 == 0 {
    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
  } else {
    Some(sorted[mid])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn odd_and_even_samples() {
    assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    assert_eq!(median(&[]), None);
  }
}

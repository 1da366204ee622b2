//! Small statistics helpers backing the aggregation endpoints. Pure
//! functions over slices; all SQL stays in `db`.

/// Ordinary least squares fit of y on x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub correlation: f64,
}

/// Fit a line through the points. Returns `None` with fewer than two points
/// or when x has no variance (a vertical line has no defined slope).
pub fn linear_regression(points: &[(f64, f64)]) -> Option<Regression> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    let mut ss_xy = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        ss_xx += dx * dx;
        ss_yy += dy * dy;
        ss_xy += dx * dy;
    }

    if ss_xx == 0.0 {
        return None;
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;
    let correlation = if ss_yy == 0.0 {
        0.0
    } else {
        ss_xy / (ss_xx * ss_yy).sqrt()
    };

    Some(Regression {
        slope,
        intercept,
        r_squared: correlation * correlation,
        correlation,
    })
}

/// Fixed-range histogram as densities: each bin value is
/// `count / (total * bin_width)` so the area under the histogram is 1.
/// Values outside `[min, max]` are clamped into the edge bins.
pub fn histogram_density(values: &[f64], bins: usize, min: f64, max: f64) -> Vec<f64> {
    let mut counts = vec![0usize; bins];
    if values.is_empty() || bins == 0 || max <= min {
        return counts.iter().map(|_| 0.0).collect();
    }

    let width = (max - min) / bins as f64;
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let total = values.len() as f64;
    counts.iter().map(|&c| c as f64 / (total * width)).collect()
}

/// Centers of the bins `histogram_density` fills.
pub fn bin_centers(bins: usize, min: f64, max: f64) -> Vec<f64> {
    let width = (max - min) / bins as f64;
    (0..bins).map(|i| min + width * (i as f64 + 0.5)).collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_recovers_exact_line() {
        // y = 2x + 1
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        let fit = linear_regression(&points).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!((fit.correlation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn regression_needs_variance_in_x() {
        assert!(linear_regression(&[(1.0, 2.0), (1.0, 5.0)]).is_none());
        assert!(linear_regression(&[(1.0, 2.0)]).is_none());
    }

    #[test]
    fn regression_flat_y_has_zero_slope() {
        let fit = linear_regression(&[(0.0, 4.0), (1.0, 4.0), (2.0, 4.0)]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.correlation, 0.0);
    }

    #[test]
    fn histogram_integrates_to_one() {
        let values: Vec<f64> = (0..100).map(|i| -1.0 + 0.02 * i as f64).collect();
        let density = histogram_density(&values, 50, -1.0, 1.0);
        let width = 2.0 / 50.0;
        let area: f64 = density.iter().map(|d| d * width).sum();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn histogram_clamps_edge_values() {
        let density = histogram_density(&[1.0, -1.0], 50, -1.0, 1.0);
        assert!(density[0] > 0.0);
        assert!(density[49] > 0.0);
    }

    #[test]
    fn bin_centers_are_midpoints() {
        let centers = bin_centers(4, 0.0, 4.0);
        assert_eq!(centers, vec![0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn std_dev_of_constant_is_zero() {
        assert_eq!(std_dev(&[2.0, 2.0, 2.0]), 0.0);
    }
}

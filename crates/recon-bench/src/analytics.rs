use statrs::statistics::{Data, Distribution};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

/// Aggregate statistics over one per-game measurement series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci95_half_width: f64,
    pub count: usize,
}

/// Mean, standard deviation, and a normal-approximation 95% confidence
/// half-width. Returns `None` for an empty series.
pub fn summarize(values: &[f64]) -> Option<SummaryStats> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let data = Data::new(values.to_vec());
    let mean = data.mean()?;
    let std_dev = data.std_dev().unwrap_or(0.0);
    let ci95_half_width = if count > 1 {
        CONFIDENCE_Z * std_dev / (count as f64).sqrt()
    } else {
        0.0
    };
    Some(SummaryStats {
        mean,
        std_dev,
        ci95_half_width,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_has_no_summary() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn constant_series_has_zero_spread() {
        let stats = summarize(&[3.0, 3.0, 3.0]).expect("summary");
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.ci95_half_width, 0.0);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn spread_series_reports_sane_interval() {
        let stats = summarize(&[1.0, 2.0, 3.0, 4.0]).expect("summary");
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!(stats.std_dev > 0.0);
        assert!(stats.ci95_half_width > 0.0);
        assert!(stats.ci95_half_width < stats.std_dev * 2.0);
    }
}

use serde::Serialize;

use crate::schema::{BillingAccount, ValueClass};

/// Interpolate the `q`-th quantile (`0.0..=1.0`) of a **sorted** slice.
///
/// Linear interpolation between closest ranks with `rank = q * (n - 1)`,
/// the default method of pandas and NumPy. Returns `0.0` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Non-null amounts of `accounts`, ascending.
pub fn sorted_amounts(accounts: &[BillingAccount]) -> Vec<f64> {
    let mut amounts: Vec<f64> = accounts.iter().filter_map(|a| a.amount).collect();
    amounts.sort_by(f64::total_cmp);
    amounts
}

/// Descriptive statistics of `amount`.
///
/// An empty input yields `count == 0` with every other field at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    /// Sample standard deviation; zero with fewer than two amounts.
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn from_sorted(sorted: &[f64]) -> Self {
        let count = sorted.len();
        if count == 0 {
            return Statistics::default();
        }
        let sum: f64 = sorted.iter().sum();
        let mean = sum / count as f64;
        let std = if count < 2 {
            0.0
        } else {
            let squares: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count as f64 - 1.0)).sqrt()
        };
        Statistics {
            count,
            sum,
            mean,
            std,
            min: sorted[0],
            p25: quantile(sorted, 0.25),
            p50: quantile(sorted, 0.50),
            p75: quantile(sorted, 0.75),
            max: sorted[count - 1],
        }
    }
}

pub fn describe(accounts: &[BillingAccount]) -> Statistics {
    Statistics::from_sorted(&sorted_amounts(accounts))
}

/// IQR fences and the accounts above the upper one.
///
/// There is no lower fence: negative and zero amounts are reported by
/// [`classify_values`] instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutlierReport {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub upper_fence: f64,
    /// In input order.
    pub outliers: Vec<BillingAccount>,
}

/// Flag accounts above `Q3 + 1.5 * IQR`.
///
/// Adding a large amount can raise Q3 and with it the fence, so earlier
/// outliers only stay flagged while the new fence remains below them.
pub fn classify_outliers(accounts: &[BillingAccount]) -> OutlierReport {
    let sorted = sorted_amounts(accounts);
    if sorted.is_empty() {
        return OutlierReport::default();
    }
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let upper_fence = q3 + 1.5 * iqr;
    let outliers = accounts
        .iter()
        .filter(|a| a.amount.is_some_and(|v| v > upper_fence))
        .cloned()
        .collect();
    OutlierReport {
        q1,
        q3,
        iqr,
        upper_fence,
        outliers,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValueClassSummary {
    pub missing: usize,
    pub negative: usize,
    pub negative_total: f64,
    pub zero: usize,
    pub positive: usize,
    pub positive_total: f64,
}

/// Count accounts by the sign of their amount.
pub fn classify_values(accounts: &[BillingAccount]) -> ValueClassSummary {
    let mut summary = ValueClassSummary::default();
    for account in accounts {
        match account.value_class() {
            ValueClass::Missing => summary.missing += 1,
            ValueClass::Negative => {
                summary.negative += 1;
                summary.negative_total += account.amount.unwrap_or_default();
            }
            ValueClass::Zero => summary.zero += 1,
            ValueClass::Positive => {
                summary.positive += 1;
                summary.positive_total += account.amount.unwrap_or_default();
            }
        }
    }
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of `amount` over `[min, max]`.
///
/// Bins are half-open except the last, which also holds `max`. Data with a
/// single distinct value collapses to one bin.
pub fn histogram(accounts: &[BillingAccount], bins: usize) -> Vec<HistogramBin> {
    let sorted = sorted_amounts(accounts);
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: sorted.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for value in sorted {
        let index = (((value - min) / width) as usize).min(bins - 1);
        result[index].count += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mock_account;

    fn with_amounts(amounts: &[Option<f64>]) -> Vec<BillingAccount> {
        amounts.iter().map(|&a| mock_account(a, Some("2024-01-01"))).collect()
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let data = [100.0, 100.0, 10000.0];
        assert_eq!(quantile(&data, 0.25), 100.0);
        assert_eq!(quantile(&data, 0.75), 5050.0);
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile(&[7.0], 0.9), 7.0);
        assert_eq!(quantile(&[], 0.5), 0.0);
    }

    /// Test that describe ignores null amounts and matches pandas' describe().
    #[test]
    fn test_describe() {
        let accounts = with_amounts(&[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)]);
        let stats = describe(&accounts);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.sum, 10.0);
        assert_eq!(stats.mean, 2.5);
        assert!((stats.std - 1.2909944487).abs() < 1e-9);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.p25, 1.75);
        assert_eq!(stats.p50, 2.5);
        assert_eq!(stats.p75, 3.25);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_describe_empty_and_single() {
        let empty = describe(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty, Statistics::default());

        let single = describe(&with_amounts(&[Some(42.0)]));
        assert_eq!(single.count, 1);
        assert_eq!(single.std, 0.0);
        assert_eq!(single.p50, 42.0);
    }

    /// Test the three-account scenario: Q1=100, Q3=5050, fence 12475.
    /// Expected: the 10000 account stays below the fence and is not flagged.
    #[test]
    fn test_classify_outliers_scenario() {
        let accounts = with_amounts(&[Some(100.0), Some(100.0), Some(10000.0)]);
        let report = classify_outliers(&accounts);
        assert_eq!(report.q1, 100.0);
        assert_eq!(report.q3, 5050.0);
        assert_eq!(report.iqr, 4950.0);
        assert_eq!(report.upper_fence, 12475.0);
        assert!(report.outliers.is_empty());
    }

    #[test]
    fn test_classify_outliers_flags_above_fence() {
        let mut amounts: Vec<Option<f64>> = (1..=10).map(|v| Some(v as f64 * 10.0)).collect();
        amounts.push(Some(5000.0));
        amounts.push(Some(-300.0));
        let report = classify_outliers(&with_amounts(&amounts));
        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].amount, Some(5000.0));
    }

    /// Test that identical amounts give IQR 0 and only amounts above Q3 are flagged.
    #[test]
    fn test_classify_outliers_degenerate_iqr() {
        let same = with_amounts(&[Some(50.0), Some(50.0), Some(50.0)]);
        let report = classify_outliers(&same);
        assert_eq!(report.iqr, 0.0);
        assert_eq!(report.upper_fence, 50.0);
        assert!(report.outliers.is_empty());

        let mut amounts = vec![Some(50.0); 8];
        amounts.push(Some(50.01));
        let report = classify_outliers(&with_amounts(&amounts));
        assert_eq!(report.upper_fence, 50.0);
        assert_eq!(report.outliers.len(), 1);
    }

    /// Test that an account above the fence can lift Q3 enough to unflag earlier outliers.
    /// Expected: fence moves from 280 to 672.5 and 400 is no longer flagged.
    #[test]
    fn test_classify_outliers_fence_can_rise_past_outliers() {
        let mut accounts = with_amounts(&[Some(10.0), Some(20.0), Some(30.0), Some(400.0)]);
        let before = classify_outliers(&accounts);
        assert_eq!(before.upper_fence, 280.0);
        assert_eq!(before.outliers.len(), 1);

        accounts.push(mock_account(Some(281.0), None));
        let after = classify_outliers(&accounts);
        assert_eq!(after.q3, 281.0);
        assert_eq!(after.upper_fence, 672.5);
        assert!(after.outliers.is_empty());
    }

    /// Test that earlier outliers stay flagged while the new fence stays below them.
    #[test]
    fn test_classify_outliers_kept_when_fence_stays_below() {
        let mut amounts: Vec<Option<f64>> = (1..=10).map(|v| Some(v as f64 * 10.0)).collect();
        amounts.push(Some(5000.0));
        let mut accounts = with_amounts(&amounts);
        let before = classify_outliers(&accounts);
        assert_eq!(before.upper_fence, 160.0);

        accounts.push(mock_account(Some(before.upper_fence + 1.0), None));
        let after = classify_outliers(&accounts);
        assert_eq!(after.upper_fence, 175.0);
        assert!(after.outliers.iter().any(|a| a.amount == Some(5000.0)));
        assert!(after.outliers.len() >= before.outliers.len());
    }

    #[test]
    fn test_classify_values() {
        let accounts = with_amounts(&[Some(-10.0), Some(-5.0), Some(0.0), Some(7.0), None]);
        let summary = classify_values(&accounts);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.negative, 2);
        assert_eq!(summary.negative_total, -15.0);
        assert_eq!(summary.zero, 1);
        assert_eq!(summary.positive, 1);
        assert_eq!(summary.positive_total, 7.0);
    }

    #[test]
    fn test_histogram() {
        let accounts = with_amounts(&[Some(0.0), Some(1.0), Some(2.0), Some(10.0), None]);
        let bins = histogram(&accounts, 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins[4].upper, 10.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);

        let flat = histogram(&with_amounts(&[Some(3.0), Some(3.0)]), 50);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 2);
        assert!(histogram(&[], 10).is_empty());
    }
}

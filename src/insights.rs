use chrono::NaiveDate;
use serde::Serialize;

use crate::aging::days_pending;
use crate::groups::{group_by, payer_key, sorted_by_total};
use crate::schema::BillingAccount;
use crate::stats::{classify_outliers, quantile, sorted_amounts};

/// Accounts pending longer than this many days are called out.
pub const STALE_AFTER_DAYS: i64 = 90;

/// Number of leading payers whose concentration is reported.
pub const TOP_PAYERS: usize = 2;

/// Headline findings shown above the detailed tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    pub median_amount: f64,
    /// Share of all accounts whose amount is strictly below the median;
    /// accounts without an amount count as not below.
    pub percent_below_median: f64,
    pub outlier_count: usize,
    pub upper_fence: f64,
    pub top_payers: Vec<String>,
    /// Share of the total amount held by `top_payers`.
    pub top_payers_percent: f64,
    pub stale_accounts: usize,
}

pub fn generate(accounts: &[BillingAccount], as_of: NaiveDate) -> Insights {
    let sorted = sorted_amounts(accounts);
    let median_amount = quantile(&sorted, 0.5);
    let percent_below_median = if accounts.is_empty() {
        0.0
    } else {
        let below = sorted.iter().filter(|&&v| v < median_amount).count();
        below as f64 / accounts.len() as f64 * 100.0
    };

    let outliers = classify_outliers(accounts);

    let by_payer = sorted_by_total(group_by(accounts, payer_key));
    let grand_total: f64 = by_payer.iter().map(|g| g.total_amount).sum();
    let leaders = &by_payer[..by_payer.len().min(TOP_PAYERS)];
    let leaders_total: f64 = leaders.iter().map(|g| g.total_amount).sum();
    let top_payers_percent = if grand_total == 0.0 {
        0.0
    } else {
        leaders_total / grand_total * 100.0
    };

    let stale_accounts = accounts
        .iter()
        .filter(|a| days_pending(a, as_of).is_some_and(|days| days > STALE_AFTER_DAYS))
        .count();

    Insights {
        median_amount,
        percent_below_median,
        outlier_count: outliers.outliers.len(),
        upper_fence: outliers.upper_fence,
        top_payers: leaders.iter().map(|g| g.key.clone()).collect(),
        top_payers_percent,
        stale_accounts,
    }
}

use chrono::NaiveDate;
use serde::Serialize;

use crate::aging::{AgedAccount, AgingDistribution, aging_distribution, bucket_aging, oldest_accounts};
use crate::bottleneck::{SectorBottleneck, identify_bottlenecks};
use crate::charts::{BoxSummary, Flow, payer_box_summaries, status_payer_flows};
use crate::groups::{
    GroupSummary, group_by, month_key, payer_key, physician_key, sector_key, sorted_by_total,
};
use crate::insights::{Insights, generate};
use crate::kpi::{KpiSet, compute_kpis};
use crate::schema::BillingAccount;
use crate::stats::{
    HistogramBin, OutlierReport, Statistics, ValueClassSummary, classify_outliers,
    classify_values, describe, histogram,
};

/// Parameters shared by every time-relative report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub as_of: NaiveDate,
    pub threshold_days: i64,
    /// How many of the oldest accounts to list.
    pub oldest_limit: usize,
    pub histogram_bins: usize,
}

impl AnalysisOptions {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            threshold_days: 90,
            oldest_limit: 20,
            histogram_bins: 50,
        }
    }
}

/// Every aggregate for one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountsReport {
    pub as_of: NaiveDate,
    pub threshold_days: i64,
    pub statistics: Statistics,
    pub kpis: KpiSet,
    pub insights: Insights,
    /// Outliers are listed largest amount first.
    pub outliers: OutlierReport,
    pub value_classes: ValueClassSummary,
    pub aging: AgingDistribution,
    pub oldest: Vec<AgedAccount>,
    pub by_payer: Vec<GroupSummary>,
    pub by_sector: Vec<GroupSummary>,
    pub by_physician: Vec<GroupSummary>,
    /// Chronological.
    pub by_month: Vec<GroupSummary>,
    pub bottlenecks: Vec<SectorBottleneck>,
    pub histogram: Vec<HistogramBin>,
    pub payer_boxes: Vec<BoxSummary>,
    pub flows: Vec<Flow>,
}

impl AccountsReport {
    pub fn build(accounts: &[BillingAccount], options: &AnalysisOptions) -> Self {
        tracing::info!(
            accounts = accounts.len(),
            as_of = %options.as_of,
            threshold_days = options.threshold_days,
            "Building accounts report"
        );

        let mut outliers = classify_outliers(accounts);
        outliers.outliers.sort_by(|a, b| {
            b.amount
                .unwrap_or_default()
                .total_cmp(&a.amount.unwrap_or_default())
        });

        AccountsReport {
            as_of: options.as_of,
            threshold_days: options.threshold_days,
            statistics: describe(accounts),
            kpis: compute_kpis(accounts, options.as_of),
            insights: generate(accounts, options.as_of),
            outliers,
            value_classes: classify_values(accounts),
            aging: aging_distribution(accounts, options.as_of),
            oldest: bucket_aging(
                &oldest_accounts(accounts, options.oldest_limit),
                options.as_of,
            ),
            by_payer: sorted_by_total(group_by(accounts, payer_key)),
            by_sector: sorted_by_total(group_by(accounts, sector_key)),
            by_physician: sorted_by_total(group_by(accounts, physician_key)),
            by_month: group_by(accounts, month_key),
            bottlenecks: identify_bottlenecks(accounts, options.as_of, options.threshold_days),
            histogram: histogram(accounts, options.histogram_bins),
            payer_boxes: payer_box_summaries(accounts),
            flows: status_payer_flows(accounts),
        }
    }
}

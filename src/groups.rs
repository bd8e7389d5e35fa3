//! Generic roll-ups of account amounts by a grouping key.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{BillingAccount, UNKNOWN_LABEL};
use crate::stats::quantile;

/// Amount roll-up for one group.
///
/// `count` and the amount figures only use accounts with a non-null amount;
/// `rows` counts every account in the group. Amount figures are zero when no
/// account in the group has an amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
    pub rows: usize,
    pub total_amount: f64,
    pub mean_amount: f64,
    pub median_amount: f64,
    pub min_amount: f64,
    pub max_amount: f64,
}

impl GroupSummary {
    fn from_members(key: String, members: &[&BillingAccount]) -> Self {
        let mut sorted: Vec<f64> = members.iter().filter_map(|a| a.amount).collect();
        sorted.sort_by(f64::total_cmp);
        let total_amount: f64 = sorted.iter().sum();
        let (mean_amount, min_amount, max_amount) = match (sorted.first(), sorted.last()) {
            (Some(&min), Some(&max)) => (total_amount / sorted.len() as f64, min, max),
            _ => (0.0, 0.0, 0.0),
        };
        GroupSummary {
            key,
            count: sorted.len(),
            rows: members.len(),
            total_amount,
            mean_amount,
            median_amount: quantile(&sorted, 0.5),
            min_amount,
            max_amount,
        }
    }
}

/// Group `accounts` by `key_fn` and summarise each group.
///
/// Accounts for which `key_fn` returns `None` are left out. The result is in
/// ascending key order.
pub fn group_by<F>(accounts: &[BillingAccount], key_fn: F) -> Vec<GroupSummary>
where
    F: Fn(&BillingAccount) -> Option<String>,
{
    let mut members: BTreeMap<String, Vec<&BillingAccount>> = BTreeMap::new();
    for account in accounts {
        if let Some(key) = key_fn(account) {
            members.entry(key).or_default().push(account);
        }
    }
    members
        .into_iter()
        .map(|(key, group)| GroupSummary::from_members(key, &group))
        .collect()
}

/// Reorder summaries by total amount, largest first.
///
/// The sort is stable, so equal totals keep the incoming (key) order.
pub fn sorted_by_total(mut summaries: Vec<GroupSummary>) -> Vec<GroupSummary> {
    summaries.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
    summaries
}

fn label_or_unknown(value: &Option<String>) -> Option<String> {
    Some(value.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()))
}

pub fn payer_key(account: &BillingAccount) -> Option<String> {
    label_or_unknown(&account.payer)
}

pub fn sector_key(account: &BillingAccount) -> Option<String> {
    label_or_unknown(&account.sector)
}

pub fn physician_key(account: &BillingAccount) -> Option<String> {
    label_or_unknown(&account.physician)
}

/// `YYYY-MM` of the entry date; undated accounts are left out.
pub fn month_key(account: &BillingAccount) -> Option<String> {
    account.year_month()
}

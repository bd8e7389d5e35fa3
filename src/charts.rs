//! Data behind the dashboard charts: box plots per payer and the
//! status-to-payer flow diagram. Rendering is left to the caller.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::groups::payer_key;
use crate::schema::{BillingAccount, UNKNOWN_LABEL};
use crate::stats::quantile;

/// Five-number summary with Tukey whiskers for one payer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub payer: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Most extreme amounts still within 1.5 × IQR of the quartiles.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
}

/// Box summaries per payer, in payer order. Payers with no amounts are omitted.
pub fn payer_box_summaries(accounts: &[BillingAccount]) -> Vec<BoxSummary> {
    let mut amounts: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for account in accounts {
        if let (Some(payer), Some(amount)) = (payer_key(account), account.amount) {
            amounts.entry(payer).or_default().push(amount);
        }
    }

    amounts
        .into_iter()
        .map(|(payer, mut values)| {
            values.sort_by(f64::total_cmp);
            let q1 = quantile(&values, 0.25);
            let q3 = quantile(&values, 0.75);
            let reach = 1.5 * (q3 - q1);
            let lower_whisker = values
                .iter()
                .copied()
                .find(|v| *v >= q1 - reach)
                .unwrap_or(q1);
            let upper_whisker = values
                .iter()
                .rev()
                .copied()
                .find(|v| *v <= q3 + reach)
                .unwrap_or(q3);
            BoxSummary {
                payer,
                count: values.len(),
                min: values[0],
                q1,
                median: quantile(&values, 0.5),
                q3,
                max: values[values.len() - 1],
                lower_whisker,
                upper_whisker,
            }
        })
        .collect()
}

/// Number of accounts moving from one status to one payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flow {
    pub status: String,
    pub payer: String,
    pub count: usize,
}

/// Status → payer link counts, largest first; ties ordered by status then payer.
pub fn status_payer_flows(accounts: &[BillingAccount]) -> Vec<Flow> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for account in accounts {
        let status = account.status.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let payer = account.payer.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        *counts.entry((status, payer)).or_default() += 1;
    }

    let mut flows: Vec<Flow> = counts
        .into_iter()
        .map(|((status, payer), count)| Flow { status, payer, count })
        .collect();
    flows.sort_by(|a, b| b.count.cmp(&a.count));
    flows
}

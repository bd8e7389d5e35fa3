use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aging::days_pending;
use crate::schema::BillingAccount;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AgeBand {
    pub count: usize,
    pub amount: f64,
}

impl AgeBand {
    fn add(&mut self, amount: Option<f64>) {
        self.count += 1;
        self.amount += amount.unwrap_or_default();
    }
}

/// Headline receivables indicators for one filtered view.
///
/// Ratios are zero whenever their denominator is zero. Age bands only hold
/// dated accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSet {
    pub total_accounts: usize,
    /// Accounts deduplicated by account id; rows without an id count once each.
    pub distinct_accounts: usize,
    pub total_amount: f64,
    pub average_ticket: f64,
    pub average_age: f64,
    pub up_to_30: AgeBand,
    pub days_31_to_60: AgeBand,
    pub days_61_to_90: AgeBand,
    pub over_90: AgeBand,
    pub percent_over_90: f64,
    pub value_at_risk: f64,
    pub percent_value_at_risk: f64,
}

pub fn compute_kpis(accounts: &[BillingAccount], as_of: NaiveDate) -> KpiSet {
    let mut kpis = KpiSet {
        total_accounts: accounts.len(),
        ..KpiSet::default()
    };

    let mut ids: HashSet<&str> = HashSet::new();
    let mut anonymous = 0;
    let mut age_sum = 0i64;
    let mut dated = 0usize;

    for account in accounts {
        match account.account_id.as_deref() {
            Some(id) => {
                ids.insert(id);
            }
            None => anonymous += 1,
        }
        kpis.total_amount += account.amount.unwrap_or_default();

        let Some(days) = days_pending(account, as_of) else {
            continue;
        };
        age_sum += days;
        dated += 1;
        let band = match days {
            i64::MIN..=30 => &mut kpis.up_to_30,
            31..=60 => &mut kpis.days_31_to_60,
            61..=90 => &mut kpis.days_61_to_90,
            _ => &mut kpis.over_90,
        };
        band.add(account.amount);
    }

    kpis.distinct_accounts = ids.len() + anonymous;
    kpis.value_at_risk = kpis.over_90.amount;
    if kpis.total_accounts > 0 {
        kpis.average_ticket = kpis.total_amount / kpis.total_accounts as f64;
        kpis.percent_over_90 = kpis.over_90.count as f64 / kpis.total_accounts as f64 * 100.0;
    }
    if dated > 0 {
        kpis.average_age = age_sum as f64 / dated as f64;
    }
    if kpis.total_amount != 0.0 {
        kpis.percent_value_at_risk = kpis.value_at_risk / kpis.total_amount * 100.0;
    }

    tracing::debug!(
        total_accounts = kpis.total_accounts,
        over_90 = kpis.over_90.count,
        value_at_risk = kpis.value_at_risk,
        "Computed KPIs"
    );
    kpis
}

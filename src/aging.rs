use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema::BillingAccount;

/// Fixed aging ranges on days pending since entry.
///
/// Upper bounds are inclusive: 30 days is still `Days0To30`, 31 is
/// `Days31To60`. Negative ages (entry after the reference date) count as
/// `Days0To30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgingBucket {
    #[serde(rename = "0-30")]
    Days0To30,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "91-180")]
    Days91To180,
    #[serde(rename = "181-365")]
    Days181To365,
    #[serde(rename = "365+")]
    Over365,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 6] = [
        AgingBucket::Days0To30,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Days91To180,
        AgingBucket::Days181To365,
        AgingBucket::Over365,
    ];

    pub fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=30 => AgingBucket::Days0To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            91..=180 => AgingBucket::Days91To180,
            181..=365 => AgingBucket::Days181To365,
            _ => AgingBucket::Over365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgingBucket::Days0To30 => "0-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Days91To180 => "91-180",
            AgingBucket::Days181To365 => "181-365",
            AgingBucket::Over365 => "365+",
        }
    }
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Days elapsed between the account's entry day and `as_of`.
pub fn days_pending(account: &BillingAccount, as_of: NaiveDate) -> Option<i64> {
    account
        .entry_day()
        .map(|entry| (as_of - entry).num_days())
}

/// Days elapsed since discharge; `None` when no discharge date was loaded.
pub fn days_since_discharge(account: &BillingAccount, as_of: NaiveDate) -> Option<i64> {
    account
        .discharge_date
        .map(|ts| (as_of - ts.date()).num_days())
}

/// An account with its derived, per-row aging fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgedAccount {
    pub account: BillingAccount,
    pub year_month: Option<String>,
    pub days_pending: Option<i64>,
    pub bucket: Option<AgingBucket>,
    pub days_since_discharge: Option<i64>,
}

/// Derive aging fields for every account, in input order.
///
/// Each derived value depends only on the account itself and `as_of`.
pub fn bucket_aging(accounts: &[BillingAccount], as_of: NaiveDate) -> Vec<AgedAccount> {
    accounts
        .iter()
        .map(|account| {
            let days = days_pending(account, as_of);
            AgedAccount {
                year_month: account.year_month(),
                days_pending: days,
                bucket: days.map(AgingBucket::from_days),
                days_since_discharge: days_since_discharge(account, as_of),
                account: account.clone(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketTotals {
    pub bucket: AgingBucket,
    pub count: usize,
    pub total_amount: f64,
}

/// Count and amount per bucket, always all six buckets in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingDistribution {
    pub buckets: Vec<BucketTotals>,
    /// Accounts without an entry date, left out of every bucket.
    pub undated: usize,
}

pub fn aging_distribution(accounts: &[BillingAccount], as_of: NaiveDate) -> AgingDistribution {
    let mut buckets: Vec<BucketTotals> = AgingBucket::ALL
        .iter()
        .map(|&bucket| BucketTotals {
            bucket,
            count: 0,
            total_amount: 0.0,
        })
        .collect();
    let mut undated = 0;

    for account in accounts {
        match days_pending(account, as_of) {
            Some(days) => {
                let slot = &mut buckets[AgingBucket::from_days(days) as usize];
                slot.count += 1;
                slot.total_amount += account.amount.unwrap_or_default();
            }
            None => undated += 1,
        }
    }

    AgingDistribution { buckets, undated }
}

/// The `limit` accounts with the earliest entry date. Undated accounts are
/// skipped; equal dates keep input order.
pub fn oldest_accounts(accounts: &[BillingAccount], limit: usize) -> Vec<BillingAccount> {
    let mut dated: Vec<&BillingAccount> = accounts.iter().filter(|a| a.entry_date.is_some()).collect();
    dated.sort_by_key(|a| a.entry_date);
    dated.into_iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mock_account;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    fn entered_days_ago(days: i64) -> BillingAccount {
        let entry = as_of() - chrono::Duration::days(days);
        mock_account(Some(10.0), Some(&entry.format("%Y-%m-%d").to_string()))
    }

    /// Test the bucket boundaries: 0 and 30 in 0-30, 31 in 31-60, 366 in 365+.
    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(AgingBucket::from_days(0), AgingBucket::Days0To30);
        assert_eq!(AgingBucket::from_days(30), AgingBucket::Days0To30);
        assert_eq!(AgingBucket::from_days(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::from_days(60), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::from_days(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::from_days(91), AgingBucket::Days91To180);
        assert_eq!(AgingBucket::from_days(365), AgingBucket::Days181To365);
        assert_eq!(AgingBucket::from_days(366), AgingBucket::Over365);
        assert_eq!(AgingBucket::from_days(-4), AgingBucket::Days0To30);
    }

    #[test]
    fn test_bucket_aging_derives_fields() {
        let accounts = vec![entered_days_ago(30), entered_days_ago(31), mock_account(Some(1.0), None)];
        let aged = bucket_aging(&accounts, as_of());
        assert_eq!(aged[0].days_pending, Some(30));
        assert_eq!(aged[0].bucket, Some(AgingBucket::Days0To30));
        assert_eq!(aged[1].bucket, Some(AgingBucket::Days31To60));
        assert_eq!(aged[1].year_month.as_deref(), Some("2024-11"));
        assert_eq!(aged[2].days_pending, None);
        assert_eq!(aged[2].bucket, None);
    }

    /// Test that aging is a pure function of the accounts and the reference date.
    #[test]
    fn test_bucket_aging_idempotent() {
        let accounts = vec![entered_days_ago(5), entered_days_ago(400)];
        assert_eq!(bucket_aging(&accounts, as_of()), bucket_aging(&accounts, as_of()));
    }

    #[test]
    fn test_days_since_discharge() {
        let mut account = entered_days_ago(20);
        assert_eq!(days_since_discharge(&account, as_of()), None);
        account.discharge_date = NaiveDate::from_ymd_opt(2024, 12, 21).and_then(|d| d.and_hms_opt(8, 0, 0));
        assert_eq!(days_since_discharge(&account, as_of()), Some(10));
    }

    #[test]
    fn test_aging_distribution() {
        let accounts = vec![
            entered_days_ago(1),
            entered_days_ago(29),
            entered_days_ago(100),
            entered_days_ago(1000),
            mock_account(Some(99.0), None),
        ];
        let distribution = aging_distribution(&accounts, as_of());
        assert_eq!(distribution.buckets.len(), 6);
        assert_eq!(distribution.buckets[0].count, 2);
        assert_eq!(distribution.buckets[0].total_amount, 20.0);
        assert_eq!(distribution.buckets[3].count, 1);
        assert_eq!(distribution.buckets[5].bucket, AgingBucket::Over365);
        assert_eq!(distribution.buckets[5].count, 1);
        assert_eq!(distribution.undated, 1);
    }

    #[test]
    fn test_oldest_accounts() {
        let mut first = entered_days_ago(200);
        first.account_id = Some("first".to_string());
        let mut tie = entered_days_ago(200);
        tie.account_id = Some("tie".to_string());
        let accounts = vec![
            entered_days_ago(3),
            first,
            mock_account(Some(1.0), None),
            tie,
            entered_days_ago(50),
        ];
        let oldest = oldest_accounts(&accounts, 3);
        let ids: Vec<Option<&str>> = oldest.iter().map(|a| a.account_id.as_deref()).collect();
        assert_eq!(ids[0], Some("first"));
        assert_eq!(ids[1], Some("tie"));
        assert_eq!(oldest[2].entry_date, accounts[4].entry_date);
    }
}

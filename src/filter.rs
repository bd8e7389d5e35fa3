use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::schema::BillingAccount;

/// Choice for one categorical filter dimension.
///
/// `AllOf` keeps every account, including those with a null value.
/// `SubsetOf` keeps only accounts whose value is present and in the set; an
/// empty set therefore keeps nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    AllOf,
    SubsetOf(BTreeSet<String>),
}

impl Selection {
    pub fn subset<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::SubsetOf(values.into_iter().map(Into::into).collect())
    }

    /// `AllOf` when no values were given, `SubsetOf` otherwise.
    pub fn from_values(values: Vec<String>) -> Self {
        if values.is_empty() {
            Selection::AllOf
        } else {
            Selection::subset(values)
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::AllOf => true,
            Selection::SubsetOf(set) => value.is_some_and(|v| set.contains(v)),
        }
    }
}

/// Conjunction of all filter predicates for one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// Inclusive bounds on the entry date. Undated accounts fail any set bound.
    pub entry_from: Option<NaiveDate>,
    pub entry_to: Option<NaiveDate>,
    pub payers: Selection,
    pub physicians: Selection,
    pub statuses: Selection,
    pub sectors: Selection,
}

impl AccountFilter {
    pub fn matches(&self, account: &BillingAccount) -> bool {
        self.matches_dates(account)
            && self.payers.matches(account.payer.as_deref())
            && self.physicians.matches(account.physician.as_deref())
            && self.statuses.matches(account.status.as_deref())
            && self.sectors.matches(account.sector.as_deref())
    }

    fn matches_dates(&self, account: &BillingAccount) -> bool {
        if self.entry_from.is_none() && self.entry_to.is_none() {
            return true;
        }
        let Some(day) = account.entry_day() else {
            return false;
        };
        self.entry_from.is_none_or(|from| day >= from) && self.entry_to.is_none_or(|to| day <= to)
    }
}

/// Narrow `accounts` to those matching every predicate. The source slice is
/// left untouched and input order is preserved.
pub fn filter(accounts: &[BillingAccount], predicates: &AccountFilter) -> Vec<BillingAccount> {
    let kept: Vec<BillingAccount> = accounts
        .iter()
        .filter(|account| predicates.matches(account))
        .cloned()
        .collect();
    tracing::debug!(before = accounts.len(), after = kept.len(), "Applied account filter");
    kept
}

/// Sorted distinct non-null values of one field, for building selection menus.
pub fn distinct_values<F>(accounts: &[BillingAccount], field: F) -> Vec<String>
where
    F: Fn(&BillingAccount) -> Option<&str>,
{
    accounts
        .iter()
        .filter_map(&field)
        .map(str::to_string)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

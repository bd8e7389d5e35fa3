use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aging::days_pending;
use crate::groups::sector_key;
use crate::schema::BillingAccount;

/// One sector in the bottleneck ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorBottleneck {
    pub sector: String,
    pub count: usize,
    pub total_amount: f64,
    pub mean_age: f64,
    /// Running share of the aged-account count, in ranking order.
    pub cumulative_percent: f64,
}

#[derive(Default)]
struct SectorTally {
    count: usize,
    total_amount: f64,
    age_sum: i64,
}

/// Rank sectors by how many accounts have been pending longer than
/// `threshold_days`.
///
/// Sectors are sorted by count descending, ties by sector name ascending.
/// The last row's `cumulative_percent` is 100 whenever the report is not empty.
pub fn identify_bottlenecks(
    accounts: &[BillingAccount],
    as_of: NaiveDate,
    threshold_days: i64,
) -> Vec<SectorBottleneck> {
    let mut tallies: BTreeMap<String, SectorTally> = BTreeMap::new();
    for account in accounts {
        let Some(days) = days_pending(account, as_of).filter(|&days| days > threshold_days) else {
            continue;
        };
        let Some(sector) = sector_key(account) else {
            continue;
        };
        let tally = tallies.entry(sector).or_default();
        tally.count += 1;
        tally.total_amount += account.amount.unwrap_or_default();
        tally.age_sum += days;
    }

    let aged_total: usize = tallies.values().map(|t| t.count).sum();

    let mut ranked: Vec<(String, SectorTally)> = tallies.into_iter().collect();
    // BTreeMap order is by name, so a stable sort on count keeps name ties ascending.
    ranked.sort_by(|(_, a), (_, b)| b.count.cmp(&a.count));

    let mut running = 0usize;
    ranked
        .into_iter()
        .map(|(sector, tally)| {
            running += tally.count;
            SectorBottleneck {
                sector,
                count: tally.count,
                total_amount: tally.total_amount,
                mean_age: tally.age_sum as f64 / tally.count as f64,
                cumulative_percent: running as f64 / aged_total as f64 * 100.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mock_account;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn aged(sector: Option<&str>, amount: f64, days: i64) -> BillingAccount {
        let entry = as_of() - chrono::Duration::days(days);
        let mut account = mock_account(Some(amount), Some(&entry.format("%Y-%m-%d").to_string()));
        account.sector = sector.map(str::to_string);
        account
    }

    /// Test ranking, tie-breaking by name and the Pareto column.
    /// Expected: Faturamento (2) first, then Auditoria and Recepção tied at 1 in name order.
    #[test]
    fn test_identify_bottlenecks_ranking() {
        let accounts = vec![
            aged(Some("Recepção"), 10.0, 120),
            aged(Some("Faturamento"), 100.0, 95),
            aged(Some("Auditoria"), 40.0, 200),
            aged(Some("Faturamento"), 300.0, 105),
            aged(Some("Faturamento"), 999.0, 10),
        ];
        let report = identify_bottlenecks(&accounts, as_of(), 90);
        let sectors: Vec<&str> = report.iter().map(|r| r.sector.as_str()).collect();
        assert_eq!(sectors, vec!["Faturamento", "Auditoria", "Recepção"]);

        assert_eq!(report[0].count, 2);
        assert_eq!(report[0].total_amount, 400.0);
        assert_eq!(report[0].mean_age, 100.0);
        assert_eq!(report[0].cumulative_percent, 50.0);
        assert_eq!(report[1].cumulative_percent, 75.0);
        assert_eq!(report[2].cumulative_percent, 100.0);
    }

    #[test]
    fn test_identify_bottlenecks_threshold_is_exclusive() {
        let accounts = vec![aged(Some("Auditoria"), 1.0, 90), aged(None, 2.0, 91)];
        let report = identify_bottlenecks(&accounts, as_of(), 90);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].sector, "Desconhecido");
        assert_eq!(report[0].cumulative_percent, 100.0);
    }

    #[test]
    fn test_identify_bottlenecks_empty() {
        assert!(identify_bottlenecks(&[], as_of(), 90).is_empty());
        let fresh = vec![aged(Some("Auditoria"), 1.0, 3)];
        assert!(identify_bottlenecks(&fresh, as_of(), 90).is_empty());
    }
}

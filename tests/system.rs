use arlens::aging::{AgingBucket, bucket_aging};
use arlens::bottleneck::identify_bottlenecks;
use arlens::groups::{group_by, month_key, payer_key, physician_key, sector_key};
use arlens::kpi::compute_kpis;
use arlens::schema::BillingAccount;
use arlens::stats::{classify_outliers, describe};
use chrono::{Duration, NaiveDate};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
}

fn account(id: &str, amount: Option<f64>, days_ago: Option<i64>) -> BillingAccount {
    BillingAccount {
        account_id: Some(id.to_string()),
        status: Some("Aberta".to_string()),
        payer: Some((if id.len() % 2 == 0 { "Unimed" } else { "Amil" }).to_string()),
        sector: Some("Faturamento".to_string()),
        physician: Some("Dr. House".to_string()),
        amount,
        entry_date: days_ago.and_then(|d| (today() - Duration::days(d)).and_hms_opt(9, 30, 0)),
        ..BillingAccount::default()
    }
}

/// Test the reference scenario: two small recent accounts and one large old one.
/// Expected: Q1=100, Q3=5050, no outlier, one account over 90 days with 10000 at risk.
#[test]
fn test_reference_scenario() {
    let accounts = vec![
        account("a", Some(100.0), Some(10)),
        account("b", Some(100.0), Some(10)),
        account("c", Some(10000.0), Some(100)),
    ];

    let outliers = classify_outliers(&accounts);
    assert_eq!(outliers.q1, 100.0);
    assert_eq!(outliers.q3, 5050.0);
    assert_eq!(outliers.upper_fence, 5050.0 + 1.5 * 4950.0);
    assert!(outliers.outliers.is_empty());

    let kpis = compute_kpis(&accounts, today());
    assert_eq!(kpis.over_90.count, 1);
    assert_eq!(kpis.value_at_risk, 10000.0);
}

#[test]
fn test_describe_counts_non_null_amounts() {
    let accounts = vec![
        account("a", Some(1.0), None),
        account("b", None, Some(3)),
        account("c", Some(-4.0), Some(3)),
        account("d", Some(0.0), None),
    ];
    assert_eq!(describe(&accounts).count, 3);
}

/// Test that appending an account above the fence keeps every earlier outlier
/// the new fence still sits below.
#[test]
fn test_outliers_retained_below_new_fence() {
    let mut accounts: Vec<BillingAccount> = (1..=9)
        .map(|i| account(&format!("id{i}"), Some(i as f64 * 100.0), Some(i)))
        .collect();
    for step in 0..5 {
        let before = classify_outliers(&accounts);
        accounts.push(account(
            &format!("extra{step}"),
            Some(before.upper_fence + 1.0),
            Some(1),
        ));
        let after = classify_outliers(&accounts);
        for earlier in &before.outliers {
            let amount = earlier.amount.unwrap();
            if amount > after.upper_fence {
                assert!(after.outliers.iter().any(|a| a.account_id == earlier.account_id));
            }
        }
        assert!(after.outliers.iter().all(|a| a.amount.unwrap() > after.upper_fence));
    }
}

#[test]
fn test_bucket_aging_boundaries() {
    let accounts = vec![
        account("d0", Some(1.0), Some(0)),
        account("d30", Some(1.0), Some(30)),
        account("d31", Some(1.0), Some(31)),
        account("d366", Some(1.0), Some(366)),
        account("none", Some(1.0), None),
    ];
    let buckets: Vec<Option<AgingBucket>> =
        bucket_aging(&accounts, today()).iter().map(|a| a.bucket).collect();
    assert_eq!(
        buckets,
        vec![
            Some(AgingBucket::Days0To30),
            Some(AgingBucket::Days0To30),
            Some(AgingBucket::Days31To60),
            Some(AgingBucket::Over365),
            None,
        ]
    );
}

/// Test that bucket_aging depends only on the explicit reference date.
#[test]
fn test_bucket_aging_idempotent() {
    let accounts: Vec<BillingAccount> = (0..40)
        .map(|i| account(&format!("id{i}"), Some(10.0), Some(i * 13)))
        .collect();
    let first = bucket_aging(&accounts, today());
    let second = bucket_aging(&accounts, today());
    assert_eq!(first, second);

    let later = bucket_aging(&accounts, today() + Duration::days(30));
    assert_ne!(first, later);
}

/// Test that every categorical grouping partitions the grand total.
#[test]
fn test_group_partition_invariant() {
    let mut accounts: Vec<BillingAccount> = (0..30)
        .map(|i| account(&"x".repeat(i % 4 + 1), Some((i * 37 % 11) as f64 * 25.0), Some(i as i64)))
        .collect();
    accounts[3].payer = None;
    accounts[7].sector = None;
    accounts[9].physician = None;
    accounts[11].amount = None;

    let grand_total = describe(&accounts).sum;
    for key_fn in [payer_key, sector_key, physician_key, month_key] {
        let total: f64 = group_by(&accounts, key_fn).iter().map(|g| g.total_amount).sum();
        assert_eq!(total, grand_total);
    }
}

#[test]
fn test_kpis_on_empty_set() {
    let kpis = compute_kpis(&[], today());
    assert_eq!(kpis.total_accounts, 0);
    assert_eq!(kpis.average_ticket, 0.0);
    assert_eq!(kpis.percent_over_90, 0.0);
}

#[test]
fn test_bottleneck_pareto_reaches_full_share() {
    let mut accounts = Vec::new();
    for (i, sector) in ["Glosas", "Auditoria", "Glosas", "Recepção", "Glosas", "Auditoria"]
        .iter()
        .enumerate()
    {
        let mut aged = account(&format!("id{i}"), Some(100.0), Some(120 + i as i64));
        aged.sector = Some(sector.to_string());
        accounts.push(aged);
    }
    let report = identify_bottlenecks(&accounts, today(), 90);
    let ranking: Vec<(&str, usize)> = report.iter().map(|r| (r.sector.as_str(), r.count)).collect();
    assert_eq!(ranking, vec![("Glosas", 3), ("Auditoria", 2), ("Recepção", 1)]);
    assert_eq!(report.last().map(|r| r.cumulative_percent), Some(100.0));
    assert!(report.windows(2).all(|w| w[0].cumulative_percent <= w[1].cumulative_percent));
}

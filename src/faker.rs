use std::path::Path;

use chrono::{Duration, NaiveDate};
use fake::Fake;
use fake::faker::boolean::en::Boolean;
use fake::faker::name::en::Name;
use fake::faker::number::en::NumberWithFormat;
use rand::seq::IndexedRandom;

use crate::error::Result;
use crate::schema::{BillingAccount, columns};

const PAYERS: [&str; 6] = ["Unimed", "Bradesco Saúde", "SulAmérica", "Amil", "SUS", "Particular"];
const SECTORS: [&str; 5] = ["Faturamento", "Auditoria", "Recepção", "Contas Médicas", "Glosas"];
const STATUSES: [&str; 4] = ["Aberta", "Em auditoria", "Pendente documentação", "Aguardando envio"];
const ATTENDANCE_TYPES: [&str; 3] = ["Internação", "Ambulatorial", "Pronto Socorro"];
const CATEGORIES: [&str; 3] = ["Enfermaria", "Apartamento", "UTI"];

/// Column order of generated CSV files.
const HEADER: [&str; 15] = [
    columns::ACCOUNT,
    columns::ATTENDANCE,
    columns::STATUS,
    columns::ATTENDANCE_TYPE,
    columns::ATTENDANCE_STATUS,
    columns::PAYER,
    columns::CATEGORY,
    columns::AMOUNT,
    columns::PREVIOUS_STAGE,
    columns::SECTOR,
    columns::ATTENDANCE_SECTOR,
    columns::ESTABLISHMENT,
    columns::ENTRY_DATE,
    columns::PHYSICIAN,
    columns::DISCHARGE_DATE,
];

fn pick(options: &[&str]) -> Option<String> {
    options.choose(&mut rand::rng()).map(|value| value.to_string())
}

/// Generate a plausible pending account entered up to ~500 days before `as_of`.
///
/// A small share of accounts carry large, zero, negative or missing amounts
/// so every report section has something to show.
pub fn fake_account(as_of: NaiveDate) -> BillingAccount {
    let days_ago: i64 = (0..500).fake();
    let entry = as_of - Duration::days(days_ago);

    let amount = match (0..100).fake::<u8>() {
        0..=1 => None,
        2..=3 => Some(0.0),
        4 => Some(-(10.0..800.0).fake::<f64>()),
        5..=8 => Some((20_000.0..150_000.0).fake::<f64>()),
        _ => Some((80.0..6_000.0).fake::<f64>()),
    }
    .map(|value| (value * 100.0).round() / 100.0);

    let discharged: bool = Boolean(60).fake();
    let discharge_date = if discharged {
        let stay: i64 = (0..15).fake();
        (entry + Duration::days(stay)).and_hms_opt(12, 0, 0)
    } else {
        None
    };

    BillingAccount {
        account_id: Some(NumberWithFormat("######").fake()),
        attendance_id: Some(NumberWithFormat("#######").fake()),
        status: pick(&STATUSES),
        attendance_type: pick(&ATTENDANCE_TYPES),
        attendance_status: Some((if discharged { "Alta" } else { "Internado" }).to_string()),
        payer: pick(&PAYERS),
        category: pick(&CATEGORIES),
        amount,
        previous_stage: pick(&SECTORS),
        sector: pick(&SECTORS),
        attendance_sector: Some("Clínica Médica".to_string()),
        establishment: Some("Hospital Central".to_string()),
        entry_date: entry.and_hms_opt(0, 0, 0),
        physician: Some(format!("Dr(a). {}", Name().fake::<String>())),
        discharge_date,
    }
}

fn csv_row(account: &BillingAccount) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        text(&account.account_id),
        text(&account.attendance_id),
        text(&account.status),
        text(&account.attendance_type),
        text(&account.attendance_status),
        text(&account.payer),
        text(&account.category),
        account.amount.map(|v| format!("{v:.2}")).unwrap_or_default(),
        text(&account.previous_stage),
        text(&account.sector),
        text(&account.attendance_sector),
        text(&account.establishment),
        account
            .entry_date
            .map(|ts| ts.format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
        text(&account.physician),
        account
            .discharge_date
            .map(|ts| ts.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default(),
    ]
}

/// Write `n` fake accounts as a CSV export with the standard column labels.
pub fn write_fake_accounts_csv(path: &Path, n: usize, as_of: NaiveDate) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;
    for _ in 0..n {
        writer.write_record(csv_row(&fake_account(as_of)))?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), accounts = n, "Wrote fake accounts");
    Ok(())
}

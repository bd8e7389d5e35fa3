use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Column labels supplied by the spreadsheet export.
pub mod columns {
    pub const ACCOUNT: &str = "Conta";
    pub const ATTENDANCE: &str = "Atendimento";
    pub const STATUS: &str = "Status";
    pub const ATTENDANCE_TYPE: &str = "Tipo atendimento";
    pub const ATTENDANCE_STATUS: &str = "Status atendimento";
    pub const PAYER: &str = "Convênio";
    pub const CATEGORY: &str = "Categoria";
    pub const AMOUNT: &str = "Valor conta";
    pub const PREVIOUS_STAGE: &str = "Etapa anterior";
    pub const SECTOR: &str = "Último Setor destino";
    pub const ATTENDANCE_SECTOR: &str = "Setor atendimento";
    pub const ESTABLISHMENT: &str = "Estabelecimento";
    pub const ENTRY_DATE: &str = "Data entrada";
    pub const PHYSICIAN: &str = "Médico executor";
    pub const DISCHARGE_DATE: &str = "Data alta";

    /// Labels whose absence is reported back to the caller.
    pub const REQUIRED: [&str; 6] = [STATUS, PAYER, AMOUNT, ENTRY_DATE, SECTOR, PHYSICIAN];
}

/// Label used for accounts whose grouping field is null.
pub const UNKNOWN_LABEL: &str = "Desconhecido";

/// One pending billing account, already coerced from the spreadsheet row.
///
/// `amount`, `entry_date` and `discharge_date` are `None` when the cell was
/// empty or could not be parsed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BillingAccount {
    pub account_id: Option<String>,
    pub attendance_id: Option<String>,
    pub status: Option<String>,
    pub attendance_type: Option<String>,
    pub attendance_status: Option<String>,
    pub payer: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub previous_stage: Option<String>,
    pub sector: Option<String>,
    pub attendance_sector: Option<String>,
    pub establishment: Option<String>,
    pub entry_date: Option<NaiveDateTime>,
    pub physician: Option<String>,
    /// Absent from most exports; stays `None` when the column is missing.
    pub discharge_date: Option<NaiveDateTime>,
}

impl BillingAccount {
    pub fn entry_day(&self) -> Option<NaiveDate> {
        self.entry_date.map(|ts| ts.date())
    }

    /// `entryDate` truncated to month, formatted `YYYY-MM`.
    pub fn year_month(&self) -> Option<String> {
        self.entry_date.map(|ts| ts.format("%Y-%m").to_string())
    }

    pub fn value_class(&self) -> ValueClass {
        ValueClass::of(self.amount)
    }
}

/// Sign classification of an account amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueClass {
    Missing,
    Negative,
    Zero,
    Positive,
}

impl ValueClass {
    pub fn of(amount: Option<f64>) -> Self {
        match amount {
            None => ValueClass::Missing,
            Some(v) if v < 0.0 => ValueClass::Negative,
            Some(v) if v == 0.0 => ValueClass::Zero,
            Some(_) => ValueClass::Positive,
        }
    }
}

/// Mock account for testing
#[cfg(test)]
pub fn mock_account(amount: Option<f64>, entry: Option<&str>) -> BillingAccount {
    BillingAccount {
        account_id: Some("C-1001".to_string()),
        attendance_id: Some("A-77".to_string()),
        status: Some("Em auditoria".to_string()),
        attendance_type: Some("Internação".to_string()),
        attendance_status: Some("Alta".to_string()),
        payer: Some("Unimed".to_string()),
        category: Some("Enfermaria".to_string()),
        amount,
        previous_stage: Some("Faturamento".to_string()),
        sector: Some("Auditoria".to_string()),
        attendance_sector: Some("Clínica Médica".to_string()),
        establishment: Some("Hospital Central".to_string()),
        entry_date: entry.map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        }),
        physician: Some("Dra. Ana Souza".to_string()),
        discharge_date: None,
    }
}

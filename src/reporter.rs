use colored::Colorize;
use prettytable::{Table, format, row};

use crate::analysis::AccountsReport;
use crate::groups::GroupSummary;
use crate::reader::LoadedDataset;
use crate::schema::BillingAccount;

const BAR_WIDTH: usize = 40;

/// Format a value as Brazilian currency, e.g. `R$ 1.234,56` or `R$ -80,00`.
pub fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round();
    let negative = cents < 0.0;
    let fixed = format!("{:.2}", cents.abs() / 100.0);
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("R$ {sign}{grouped},{fraction}")
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn entry_date(account: &BillingAccount) -> String {
    account
        .entry_date
        .map(|ts| ts.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "█".repeat(width)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table
}

fn section(title: &str) {
    println!("\n{}", format!("--- {title} ---").bold().cyan());
}

/// Warn about columns that were absent and cells that could not be coerced.
pub fn print_dataset_notes(dataset: &LoadedDataset) {
    if !dataset.missing_columns.is_empty() {
        println!(
            "{} {}",
            "Missing columns:".yellow().bold(),
            dataset.missing_columns.join(", ")
        );
    }
    let coercion = &dataset.coercion;
    if coercion.latin1_fallback {
        println!("{} decoded as Latin-1", "Not UTF-8:".yellow().bold());
    }
    if coercion.non_numeric_amounts + coercion.unparseable_dates + coercion.skipped_lines > 0 {
        println!(
            "{} {} non-numeric amounts, {} unparseable dates, {} skipped lines",
            "Ignored cells:".yellow().bold(),
            coercion.non_numeric_amounts,
            coercion.unparseable_dates,
            coercion.skipped_lines
        );
    }
}

/// Print every section of the report to stdout. Ranked tables show at most
/// `top` rows.
pub fn print_report(report: &AccountsReport, top: usize) {
    println!(
        "\n{}",
        format!("Pending accounts analysis (as of {})", report.as_of.format("%d/%m/%Y"))
            .bold()
            .underline()
    );

    print_insights(report);
    print_kpis(report);
    print_statistics(report);
    print_aging(report);
    print_outliers(report, top);
    print_oldest(report);
    print_groups("By payer", "Payer", &report.by_payer, top);
    print_groups("By sector", "Sector", &report.by_sector, top);
    print_groups("By physician", "Physician", &report.by_physician, top);
    print_groups("By month", "Month", &report.by_month, usize::MAX);
    print_bottlenecks(report);
    print_histogram(report);
    print_boxes(report, top);
    print_flows(report, top);
}

fn print_insights(report: &AccountsReport) {
    let insights = &report.insights;
    section("Insights");
    if report.statistics.is_empty() {
        println!("No accounts match the current filters.");
        return;
    }
    println!(
        "- {:.0}% of accounts are below the median of {}.",
        insights.percent_below_median,
        format_brl(insights.median_amount)
    );
    println!(
        "- {} accounts are above {} (outliers) and deserve priority review.",
        insights.outlier_count.to_string().red().bold(),
        format_brl(insights.upper_fence)
    );
    if !insights.top_payers.is_empty() {
        println!(
            "- {} hold {:.0}% of the open amount.",
            insights.top_payers.join(", ").bold(),
            insights.top_payers_percent
        );
    }
    println!(
        "- {} accounts entered more than 90 days ago.",
        insights.stale_accounts.to_string().red().bold()
    );
}

fn print_kpis(report: &AccountsReport) {
    let kpis = &report.kpis;
    section("Key indicators");
    let mut table = new_table();
    table.add_row(row!["Accounts", kpis.total_accounts]);
    table.add_row(row!["Distinct accounts", kpis.distinct_accounts]);
    table.add_row(row!["Total amount", format_brl(kpis.total_amount)]);
    table.add_row(row!["Average ticket", format_brl(kpis.average_ticket)]);
    table.add_row(row!["Average age (days)", format!("{:.1}", kpis.average_age)]);
    for (label, band) in [
        ("Up to 30 days", kpis.up_to_30),
        ("31-60 days", kpis.days_31_to_60),
        ("61-90 days", kpis.days_61_to_90),
    ] {
        table.add_row(row![label, format!("{} / {}", band.count, format_brl(band.amount))]);
    }
    table.add_row(row![
        "Over 90 days",
        Fr->format!("{} / {}", kpis.over_90.count, format_brl(kpis.over_90.amount))
    ]);
    table.add_row(row!["% over 90 days", Fr->percent(kpis.percent_over_90)]);
    table.add_row(row!["Value at risk", Fr->format_brl(kpis.value_at_risk)]);
    table.add_row(row!["% value at risk", Fr->percent(kpis.percent_value_at_risk)]);
    table.printstd();
}

fn print_statistics(report: &AccountsReport) {
    let stats = &report.statistics;
    let classes = &report.value_classes;
    section("Descriptive statistics");
    let mut table = new_table();
    table.set_titles(row!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]);
    table.add_row(row![
        stats.count,
        format_brl(stats.mean),
        format_brl(stats.std),
        format_brl(stats.min),
        format_brl(stats.p25),
        format_brl(stats.p50),
        format_brl(stats.p75),
        format_brl(stats.max)
    ]);
    table.printstd();
    println!(
        "Negative: {} ({}), zero: {}, missing: {}",
        classes.negative,
        format_brl(classes.negative_total),
        classes.zero,
        classes.missing
    );
}

fn print_aging(report: &AccountsReport) {
    section("Aging");
    let max = report.aging.buckets.iter().map(|b| b.count).max().unwrap_or(0);
    let mut table = new_table();
    table.set_titles(row!["Bucket", "Accounts", "Amount", ""]);
    for bucket in &report.aging.buckets {
        table.add_row(row![
            bucket.bucket,
            r->bucket.count,
            r->format_brl(bucket.total_amount),
            bar(bucket.count, max)
        ]);
    }
    table.printstd();
    if report.aging.undated > 0 {
        println!("{} accounts without entry date", report.aging.undated);
    }
}

fn account_table(accounts: &[BillingAccount]) -> Table {
    let mut table = new_table();
    table.set_titles(row!["Status", "Entry", "Amount", "Account", "Payer", "Sector", "Physician"]);
    for account in accounts {
        table.add_row(row![
            text(&account.status),
            entry_date(account),
            r->account.amount.map(format_brl).unwrap_or_else(|| "-".to_string()),
            text(&account.account_id),
            text(&account.payer),
            text(&account.sector),
            text(&account.physician)
        ]);
    }
    table
}

fn print_outliers(report: &AccountsReport, top: usize) {
    let outliers = &report.outliers;
    section("Outliers");
    println!(
        "Q1 {}, Q3 {}, IQR {}, upper fence {}",
        format_brl(outliers.q1),
        format_brl(outliers.q3),
        format_brl(outliers.iqr),
        format_brl(outliers.upper_fence).red()
    );
    if outliers.outliers.is_empty() {
        println!("No outliers.");
        return;
    }
    let shown = &outliers.outliers[..outliers.outliers.len().min(top)];
    account_table(shown).printstd();
}

fn print_oldest(report: &AccountsReport) {
    section("Oldest accounts");
    if report.oldest.is_empty() {
        println!("No dated accounts.");
        return;
    }
    let mut table = new_table();
    table.set_titles(row!["Entry", "Days", "Bucket", "Amount", "Account", "Status", "Payer", "Sector"]);
    for aged in &report.oldest {
        let account = &aged.account;
        table.add_row(row![
            entry_date(account),
            r->aged.days_pending.map(|d| d.to_string()).unwrap_or_default(),
            aged.bucket.map(|b| b.label()).unwrap_or("-"),
            r->account.amount.map(format_brl).unwrap_or_else(|| "-".to_string()),
            text(&account.account_id),
            text(&account.status),
            text(&account.payer),
            text(&account.sector)
        ]);
    }
    table.printstd();
}

fn print_groups(title: &str, key_label: &str, groups: &[GroupSummary], top: usize) {
    section(title);
    let mut table = new_table();
    table.set_titles(row![key_label, "Accounts", "Rows", "Total", "Mean", "Median", "Min", "Max"]);
    for group in groups.iter().take(top) {
        table.add_row(row![
            group.key,
            r->group.count,
            r->group.rows,
            r->format_brl(group.total_amount),
            r->format_brl(group.mean_amount),
            r->format_brl(group.median_amount),
            r->format_brl(group.min_amount),
            r->format_brl(group.max_amount)
        ]);
    }
    table.printstd();
}

fn print_bottlenecks(report: &AccountsReport) {
    section(&format!("Bottlenecks (over {} days)", report.threshold_days));
    if report.bottlenecks.is_empty() {
        println!("No sector holds accounts past the threshold.");
        return;
    }
    let mut table = new_table();
    table.set_titles(row!["Sector", "Accounts", "Total", "Mean age", "Cumulative %"]);
    for entry in &report.bottlenecks {
        table.add_row(row![
            entry.sector,
            r->entry.count,
            r->format_brl(entry.total_amount),
            r->format!("{:.1}", entry.mean_age),
            r->percent(entry.cumulative_percent)
        ]);
    }
    table.printstd();
}

fn print_histogram(report: &AccountsReport) {
    section("Amount distribution");
    let max = report.histogram.iter().map(|b| b.count).max().unwrap_or(0);
    for bin in report.histogram.iter().filter(|b| b.count > 0) {
        println!(
            "{:>18} .. {:<18} {:>5} {}",
            format_brl(bin.lower),
            format_brl(bin.upper),
            bin.count,
            bar(bin.count, max).green()
        );
    }
}

fn print_boxes(report: &AccountsReport, top: usize) {
    section("Amount spread by payer");
    let mut table = new_table();
    table.set_titles(row!["Payer", "n", "Low whisker", "Q1", "Median", "Q3", "High whisker", "Max"]);
    for summary in report.payer_boxes.iter().take(top) {
        table.add_row(row![
            summary.payer,
            r->summary.count,
            r->format_brl(summary.lower_whisker),
            r->format_brl(summary.q1),
            r->format_brl(summary.median),
            r->format_brl(summary.q3),
            r->format_brl(summary.upper_whisker),
            r->format_brl(summary.max)
        ]);
    }
    table.printstd();
}

fn print_flows(report: &AccountsReport, top: usize) {
    section("Status to payer");
    let mut table = new_table();
    table.set_titles(row!["Status", "Payer", "Accounts"]);
    for flow in report.flows.iter().take(top) {
        table.add_row(row![flow.status, flow.payer, r->flow.count]);
    }
    table.printstd();
}

/// Serialize the report for machine consumption.
pub fn render_json(report: &AccountsReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

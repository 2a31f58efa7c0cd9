//! Text summary builder for CLI output.
//!
//! Formats import job summaries and donation pages as human-readable lines.

use crate::listing::DonationListState;
use crate::model::ImportJobSummary;

/// Imported rows shown before the list is truncated.
pub const IMPORTED_ROWS_SHOWN: usize = 50;

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

fn dash(v: &Option<String>) -> &str {
    v.as_deref().filter(|s| !s.is_empty()).unwrap_or("-")
}

/// Counters, failed rows, the first imported rows and the email statuses.
pub fn build_import_summary(summary: &ImportJobSummary) -> TextSummary {
    let mut lines = Vec::new();

    if let Some(job) = summary.job_id.as_deref() {
        let year = summary.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into());
        lines.push(format!("Job: {job} (year {year})"));
    }
    lines.push(format!(
        "Donors created: {}  matched: {}  Donations imported: {}  Rows failed: {}",
        summary.donors_created, summary.donors_matched, summary.donations_imported, summary.rows_failed
    ));
    lines.push(format!(
        "Emails sent: {}  failed: {}",
        summary.emails_sent, summary.emails_failed
    ));

    if !summary.failed_row_dtos.is_empty() {
        lines.push(format!("Failed rows ({}):", summary.failed_row_dtos.len()));
        for r in &summary.failed_row_dtos {
            lines.push(format!(
                "  {} | {} | {} | {} | {} | {}",
                dash(&r.full_name),
                dash(&r.donation_amount_raw),
                dash(&r.email),
                dash(&r.phone),
                dash(&r.date_raw),
                dash(&r.error_message)
            ));
        }
    }

    if !summary.imported_rows.is_empty() {
        let total = summary.imported_rows.len();
        lines.push(format!("Imported rows ({total}):"));
        for r in summary.imported_rows.iter().take(IMPORTED_ROWS_SHOWN) {
            let amount = r
                .donation_amount
                .map(|a| format!("{a:.2}"))
                .unwrap_or_else(|| "-".into());
            lines.push(format!(
                "  {} | {} | {} | {} | {} | {}",
                dash(&r.donor_id),
                dash(&r.donor_name),
                dash(&r.email),
                amount,
                dash(&r.date_of_donation),
                dash(&r.status)
            ));
        }
        if total > IMPORTED_ROWS_SHOWN {
            lines.push(format!("  ... {} more", total - IMPORTED_ROWS_SHOWN));
        }
    }

    if !summary.email_statuses.is_empty() {
        lines.push(format!("Email statuses ({}):", summary.email_statuses.len()));
        for e in &summary.email_statuses {
            lines.push(format!(
                "  {} | {} | {} | attempts {} | {}",
                dash(&e.donor_id),
                dash(&e.email),
                e.status.as_str(),
                e.attempts,
                dash(&e.error_message)
            ));
        }
    }

    TextSummary { lines }
}

/// One line per donation plus a page footer.
pub fn build_donation_page(list: &DonationListState) -> TextSummary {
    let mut lines = Vec::new();
    if list.items.is_empty() {
        lines.push(format!("No donations found for {}.", list.year));
    }
    for d in &list.items {
        let amount = d
            .donation_amt
            .map(|a| format!("{a:.2}"))
            .unwrap_or_else(|| "-".into());
        lines.push(format!(
            "{:>8}  {:<10}  {:<28}  {:>10}  {:<12}  {}",
            d.donor_receipt_detail_id,
            dash(&d.date_of_donation).get(..10).unwrap_or(dash(&d.date_of_donation)),
            d.donor_name(),
            amount,
            dash(&d.donation_type),
            dash(&d.payment_mode)
        ));
    }
    lines.push(format!(
        "Page {} of {} ({} donations, sorted by {} {})",
        list.page,
        list.total_pages(),
        list.total_count,
        list.sort.as_str(),
        list.dir.as_str()
    ));
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImportedRow, DonationPage, DonationRow};

    #[test]
    fn imported_rows_truncate_at_fifty() {
        let summary = ImportJobSummary {
            imported_rows: (0..60)
                .map(|i| ImportedRow {
                    donor_id: Some(i.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let lines = build_import_summary(&summary).lines;
        assert!(lines.contains(&"Imported rows (60):".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("  ... 10 more"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("  ") && !l.contains("more")).count(), 50);
    }

    #[test]
    fn page_footer() {
        let mut list = DonationListState::new(2024);
        list.apply(DonationPage {
            items: vec![DonationRow {
                donor_receipt_detail_id: 7,
                date_of_donation: Some("2024-03-01T00:00:00Z".into()),
                donation_amt: Some(101.0),
                ..Default::default()
            }],
            total_count: 26,
        });
        let lines = build_donation_page(&list).lines;
        assert!(lines[0].contains("2024-03-01"));
        assert!(lines[0].contains("101.00"));
        assert_eq!(lines[1], "Page 1 of 2 (26 donations, sorted by date desc)");
    }
}

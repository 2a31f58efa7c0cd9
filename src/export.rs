//! CSV encoding and download naming for everything the console saves to disk.
//!
//! Client-side CSVs (failed rows, email statuses, a donation page) are built
//! from the summary currently held; server blobs (receipt ZIP, export CSV,
//! receipt PDF) are written byte for byte.

use crate::model::{DonationRow, EmailStatusEntry, FailedRow, ImportJobSummary};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const FAILED_ROWS_HEADER: [&str; 6] = [
    "FullName",
    "DonationAmountRaw",
    "Email",
    "Phone",
    "DateRaw",
    "ErrorMessage",
];

pub const EMAIL_STATUS_HEADER: [&str; 5] = ["DonorId", "Email", "Status", "Attempts", "ErrorMessage"];

pub const DONATION_LIST_HEADER: [&str; 9] = [
    "ReceiptId",
    "Date",
    "Donor",
    "Email",
    "Amount",
    "Type",
    "PaymentMode",
    "Reference",
    "Notes",
];

pub const DEFAULT_RECEIPT_FILE_NAME: &str = "DonationReceipt.pdf";

/// Encode a header and rows as CSV. Fields holding a delimiter, quote or line
/// break are quoted with inner quotes doubled; every record ends in `\n`.
pub fn encode_csv<I>(header: &[&str], rows: I) -> csv::Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    // Every field came in as &str/String, so the buffer is valid UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn failed_row(r: &FailedRow) -> Vec<String> {
    vec![
        text(&r.full_name),
        text(&r.donation_amount_raw),
        text(&r.email),
        text(&r.phone),
        text(&r.date_raw),
        text(&r.error_message),
    ]
}

fn email_status_row(e: &EmailStatusEntry) -> Vec<String> {
    vec![
        text(&e.donor_id),
        text(&e.email),
        e.status.as_str().to_string(),
        e.attempts.to_string(),
        text(&e.error_message),
    ]
}

fn donation_row(d: &DonationRow) -> Vec<String> {
    vec![
        d.donor_receipt_detail_id.to_string(),
        text(&d.date_of_donation),
        d.donor_name(),
        text(&d.donor_email),
        d.donation_amt.map(|a| format!("{a:.2}")).unwrap_or_default(),
        text(&d.donation_type),
        text(&d.payment_mode),
        text(&d.reference_no),
        text(&d.notes),
    ]
}

/// Failed rows of the held summary; `None` when there are none.
pub fn failed_rows_csv(summary: &ImportJobSummary) -> csv::Result<Option<String>> {
    if summary.failed_row_dtos.is_empty() {
        return Ok(None);
    }
    encode_csv(&FAILED_ROWS_HEADER, summary.failed_row_dtos.iter().map(failed_row)).map(Some)
}

/// Email statuses of the held summary; `None` when there are none.
pub fn email_status_csv(summary: &ImportJobSummary) -> csv::Result<Option<String>> {
    if summary.email_statuses.is_empty() {
        return Ok(None);
    }
    encode_csv(&EMAIL_STATUS_HEADER, summary.email_statuses.iter().map(email_status_row)).map(Some)
}

/// The currently loaded page of the donation list; `None` when it is empty.
pub fn donation_page_csv(items: &[DonationRow]) -> csv::Result<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    encode_csv(&DONATION_LIST_HEADER, items.iter().map(donation_row)).map(Some)
}

pub fn failed_rows_file_name(year: i32) -> String {
    format!("FailedRows_{year}.csv")
}

pub fn email_status_file_name(year: i32) -> String {
    format!("EmailStatus_{year}.csv")
}

/// `receipts_{year}_{jobId}.zip`; the year part is left empty when unknown.
pub fn receipts_zip_file_name(year: Option<i32>, job_id: &str) -> String {
    let year = year.map(|y| y.to_string()).unwrap_or_default();
    format!("receipts_{year}_{job_id}.zip")
}

pub fn donations_export_file_name(year: i32) -> String {
    format!("RAMA-Donations-{year}.csv")
}

pub fn donation_page_file_name(year: i32, page: u32) -> String {
    format!("Donations_{year}_page{page}.csv")
}

/// File name for a receipt PDF taken from a `Content-Disposition` header.
///
/// `filename*=UTF-8''...` wins over `filename=`; anything unusable falls
/// back to [`DEFAULT_RECEIPT_FILE_NAME`].
pub fn receipt_file_name(content_disposition: Option<&str>) -> String {
    let Some(header) = content_disposition else {
        return DEFAULT_RECEIPT_FILE_NAME.to_string();
    };

    let mut plain = None;
    let mut extended = None;
    for part in header.split(';') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value
                    .split_once("''")
                    .map(|(_, rest)| rest)
                    .unwrap_or(value);
                if let Ok(decoded) = urlencoding::decode(encoded) {
                    extended = Some(decoded.into_owned());
                }
            }
            "filename" => plain = Some(value.to_string()),
            _ => {}
        }
    }

    extended
        .or(plain)
        .map(|name| sanitize_file_name(&name))
        .filter(|name| !matches!(name.as_str(), "" | "." | ".."))
        .unwrap_or_else(|| DEFAULT_RECEIPT_FILE_NAME.to_string())
}

/// Keep only the last path component of a server-supplied name.
fn sanitize_file_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string()
}

/// Write `bytes` to `dir/name`, creating `dir` if needed.
pub fn save_bytes(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmailDeliveryStatus;

    #[test]
    fn awkward_field_is_quoted_and_round_trips() {
        let awkward = "Rao, \"Sri\"\nline two";
        let out = encode_csv(&["A", "B"], vec![vec![awkward.to_string(), "plain".to_string()]]).unwrap();
        assert_eq!(out, "A,B\n\"Rao, \"\"Sri\"\"\nline two\",plain\n");

        let mut rdr = csv::Reader::from_reader(out.as_bytes());
        let rec = rdr.records().next().unwrap().unwrap();
        assert_eq!(&rec[0], awkward);
        assert_eq!(&rec[1], "plain");
    }

    #[test]
    fn empty_sets_produce_nothing() {
        let summary = ImportJobSummary::default();
        assert_eq!(failed_rows_csv(&summary).unwrap(), None);
        assert_eq!(email_status_csv(&summary).unwrap(), None);
        assert_eq!(donation_page_csv(&[]).unwrap(), None);
    }

    #[test]
    fn failed_rows_keep_column_order() {
        let summary = ImportJobSummary {
            failed_row_dtos: vec![FailedRow {
                full_name: Some("Asha Iyer".into()),
                donation_amount_raw: Some("abc".into()),
                email: None,
                phone: Some("555-0100".into()),
                date_raw: Some("2024-13-01".into()),
                error_message: Some("Invalid amount".into()),
            }],
            ..Default::default()
        };
        let out = failed_rows_csv(&summary).unwrap().unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("FullName,DonationAmountRaw,Email,Phone,DateRaw,ErrorMessage")
        );
        assert_eq!(lines.next(), Some("Asha Iyer,abc,,555-0100,2024-13-01,Invalid amount"));
    }

    #[test]
    fn email_status_rows() {
        let summary = ImportJobSummary {
            email_statuses: vec![EmailStatusEntry {
                donor_id: Some("17".into()),
                email: Some("a@b.org".into()),
                status: EmailDeliveryStatus::Failed,
                attempts: 3,
                error_message: Some("mailbox full".into()),
            }],
            ..Default::default()
        };
        let out = email_status_csv(&summary).unwrap().unwrap();
        assert_eq!(
            out,
            "DonorId,Email,Status,Attempts,ErrorMessage\n17,a@b.org,Failed,3,mailbox full\n"
        );
    }

    #[test]
    fn file_names() {
        assert_eq!(failed_rows_file_name(2024), "FailedRows_2024.csv");
        assert_eq!(email_status_file_name(2024), "EmailStatus_2024.csv");
        assert_eq!(receipts_zip_file_name(Some(2024), "abc123"), "receipts_2024_abc123.zip");
        assert_eq!(receipts_zip_file_name(None, "abc123"), "receipts__abc123.zip");
        assert_eq!(donations_export_file_name(2023), "RAMA-Donations-2023.csv");
    }

    #[test]
    fn receipt_name_from_content_disposition() {
        assert_eq!(receipt_file_name(None), DEFAULT_RECEIPT_FILE_NAME);
        assert_eq!(
            receipt_file_name(Some("attachment; filename=\"Receipt_42.pdf\"")),
            "Receipt_42.pdf"
        );
        assert_eq!(
            receipt_file_name(Some(
                "attachment; filename=Receipt.pdf; filename*=UTF-8''Receipt%20Sri%20Rama.pdf"
            )),
            "Receipt Sri Rama.pdf"
        );
        assert_eq!(receipt_file_name(Some("attachment; filename=\"../../etc/x.pdf\"")), "x.pdf");
        assert_eq!(receipt_file_name(Some("inline")), DEFAULT_RECEIPT_FILE_NAME);
        assert_eq!(receipt_file_name(Some("attachment; filename=\"..\"")), DEFAULT_RECEIPT_FILE_NAME);
        assert_eq!(receipt_file_name(Some("attachment; filename=\"a/.\"")), DEFAULT_RECEIPT_FILE_NAME);
        assert_eq!(
            receipt_file_name(Some("attachment; filename*=UTF-8''%2E%2E")),
            DEFAULT_RECEIPT_FILE_NAME
        );
    }

    #[test]
    fn save_bytes_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let path = save_bytes(&target, "receipts_2024_abc.zip", b"PK\x03\x04").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"PK\x03\x04");
    }
}

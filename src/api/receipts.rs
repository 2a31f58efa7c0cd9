use super::{ApiClient, Blob};
use crate::error::ApiError;
use crate::export;
use crate::listing::{SortColumn, SortDir};
use crate::model::{CreatedDonation, DonationPage, NewDonation, QuickDonation, QuickDonationReceipt};

pub const DONOR_ID_HEADER: &str = "x-donor-id";
pub const RECEIPT_ID_HEADER: &str = "x-donor-receipt-detail-id";

/// Query for one page of the donation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationQuery {
    pub year: i32,
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub sort: SortColumn,
    pub dir: SortDir,
}

impl DonationQuery {
    /// Query pairs in the order the server documents; empty search is omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("year", self.year.to_string()),
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs.push(("sort", self.sort.as_str().to_string()));
        pairs.push(("dir", self.dir.as_str().to_string()));
        pairs
    }
}

impl ApiClient {
    /// POST /api/donorreceipts
    pub async fn record_donation(&self, donation: &NewDonation) -> Result<CreatedDonation, ApiError> {
        Self::send_json(self.post("/api/donorreceipts").json(donation)).await
    }

    /// GET /api/donorreceipts?year=&page=&pageSize=&search=&sort=&dir=
    pub async fn list_donations(&self, query: &DonationQuery) -> Result<DonationPage, ApiError> {
        let rb = self.get("/api/donorreceipts").query(&query.query_pairs());
        Self::send_json_or_default(rb).await
    }

    /// GET /api/donorreceipts/export?year= (CSV blob)
    pub async fn export_donations(&self, year: i32) -> Result<Blob, ApiError> {
        let rb = self
            .get("/api/donorreceipts/export")
            .query(&[("year", year)]);
        Self::send_blob(rb).await
    }

    /// POST /api/donorreceipts/quick-with-receipt
    ///
    /// The body is the PDF; donor and receipt ids travel in response headers.
    pub async fn quick_donation(&self, quick: &QuickDonation) -> Result<QuickDonationReceipt, ApiError> {
        let blob = Self::send_blob(self.post("/api/donorreceipts/quick-with-receipt").json(quick)).await?;
        let file_name = export::receipt_file_name(blob.header("content-disposition"));
        let donor_id = blob.header(DONOR_ID_HEADER).map(str::to_string);
        let receipt_id = blob.header(RECEIPT_ID_HEADER).map(str::to_string);
        Ok(QuickDonationReceipt {
            file_name,
            pdf: blob.bytes,
            donor_id,
            receipt_id,
        })
    }
}

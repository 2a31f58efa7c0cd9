use super::ApiClient;
use crate::error::ApiError;
use crate::forms::DonorSearch;
use crate::model::{CreatedDonor, Donor, NewDonor};

impl ApiClient {
    /// GET /api/donors/search?donorId=&phone=&email=
    pub async fn search_donors(&self, search: &DonorSearch) -> Result<Vec<Donor>, ApiError> {
        let rb = self.get("/api/donors/search").query(&search.query_pairs());
        Self::send_json_or_default(rb).await
    }

    /// GET /api/donors
    pub async fn list_donors(&self) -> Result<Vec<Donor>, ApiError> {
        Self::send_json_or_default(self.get("/api/donors")).await
    }

    /// POST /api/donors
    pub async fn create_donor(&self, donor: &NewDonor) -> Result<CreatedDonor, ApiError> {
        Self::send_json(self.post("/api/donors").json(donor)).await
    }

    /// DELETE /api/donors/{id}
    pub async fn delete_donor(&self, donor_id: i64) -> Result<(), ApiError> {
        Self::send_empty(self.delete(&format!("/api/donors/{donor_id}"))).await
    }
}

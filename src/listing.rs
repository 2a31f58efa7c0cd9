//! Paginated, sortable donation list.

use crate::api::{ApiClient, DonationQuery};
use crate::model::{DonationPage, DonationRow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortColumn {
    #[default]
    Date,
    Amount,
    Donor,
    ReceiptId,
}

impl SortColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            SortColumn::Date => "date",
            SortColumn::Amount => "amount",
            SortColumn::Donor => "donor",
            SortColumn::ReceiptId => "receiptid",
        }
    }
}

impl std::str::FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortColumn::Date),
            "amount" => Ok(SortColumn::Amount),
            "donor" => Ok(SortColumn::Donor),
            "receiptid" | "receipt" => Ok(SortColumn::ReceiptId),
            _ => Err(format!("unknown sort column '{s}' (date, amount, donor, receiptid)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

impl std::str::FromStr for SortDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            _ => Err(format!("unknown sort direction '{s}' (asc, desc)")),
        }
    }
}

/// What one donation list view holds between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationListState {
    pub year: i32,
    pub search: String,
    pub sort: SortColumn,
    pub dir: SortDir,
    pub page: u32,
    pub page_size: u32,
    pub items: Vec<DonationRow>,
    pub total_count: u64,
    pub error: Option<String>,
}

impl DonationListState {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            search: String::new(),
            sort: SortColumn::default(),
            dir: SortDir::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            items: Vec::new(),
            total_count: 0,
            error: None,
        }
    }

    pub fn query(&self) -> DonationQuery {
        DonationQuery {
            year: self.year,
            page: self.page,
            page_size: self.page_size,
            search: Some(self.search.clone()).filter(|s| !s.is_empty()),
            sort: self.sort,
            dir: self.dir,
        }
    }

    /// Same column flips direction; a new column starts ascending.
    pub fn toggle_sort(&mut self, column: SortColumn) {
        if self.sort == column {
            self.dir = self.dir.flipped();
        } else {
            self.sort = column;
            self.dir = SortDir::Asc;
        }
        self.page = 1;
    }

    pub fn change_year(&mut self, year: i32) {
        self.year = year;
        self.page = 1;
    }

    pub fn change_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.page = 1;
    }

    pub fn change_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn change_page_size(&mut self, page_size: u32) {
        self.page_size = page_size;
        self.page = 1;
    }

    /// The response is authoritative: previous items are discarded.
    pub fn apply(&mut self, page: DonationPage) {
        self.items = page.items;
        self.total_count = page.total_count;
        self.error = None;
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total_count.div_ceil(self.page_size as u64).max(1)
    }

    /// Fetch the page the state currently points at.
    pub async fn load(&mut self, client: &ApiClient) {
        self.error = None;
        match client.list_donations(&self.query()).await {
            Ok(page) => self.apply(page),
            Err(e) => {
                self.error = Some(
                    e.server_message()
                        .unwrap_or("Failed to load donations.")
                        .to_string(),
                );
            }
        }
    }
}

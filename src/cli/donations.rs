use super::Ctx;
use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use temple_admin::auth::Capability;
use temple_admin::export;
use temple_admin::forms::{self, DonationForm, QuickDonationForm};
use temple_admin::listing::{DonationListState, SortColumn, SortDir, DEFAULT_PAGE_SIZE};
use temple_admin::model::{DonationType, QuickDonor};
use temple_admin::text_summary::build_donation_page;
use time::OffsetDateTime;

#[derive(Debug, Subcommand, Clone)]
pub enum DonationCommand {
    /// Record a donation for an existing donor
    Add(AddArgs),
    /// Register a donor and donation in one step and save the PDF receipt
    Quick(QuickArgs),
    /// Show one page of a year's donations
    List(ListArgs),
    /// Download the server's CSV export for a year
    Export {
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Debug, Args, Clone)]
pub struct AddArgs {
    #[arg(long, default_value = "")]
    pub donor_id: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long)]
    pub amount: Option<f64>,
    #[arg(long = "type")]
    pub donation_type: Option<DonationType>,
    #[arg(long, default_value = "USD")]
    pub currency: String,
    /// YYYY-MM-DD (default: now)
    #[arg(long, default_value = "")]
    pub date: String,
    #[arg(long, default_value = "")]
    pub payment_method: String,
    #[arg(long, default_value = "")]
    pub reference: String,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub tax_deductible: bool,
    #[arg(long)]
    pub anonymous: bool,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Debug, Args, Clone)]
pub struct QuickArgs {
    #[arg(long, default_value = "")]
    pub first_name: String,
    #[arg(long, default_value = "")]
    pub last_name: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub city: String,
    #[arg(long, default_value = "")]
    pub state: String,
    #[arg(long, default_value = "")]
    pub country: String,
    #[arg(long, default_value = "")]
    pub postal_code: String,
    #[arg(long)]
    pub amount: Option<f64>,
    #[arg(long = "type")]
    pub donation_type: Option<DonationType>,
    /// YYYY-MM-DD (default: today)
    #[arg(long, default_value = "")]
    pub date: String,
    #[arg(long, default_value = "")]
    pub payment_mode: String,
    #[arg(long, default_value = "")]
    pub reference: String,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Defaults to the current year
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
    #[arg(long, default_value = "")]
    pub search: String,
    #[arg(long, default_value = "date")]
    pub sort: SortColumn,
    #[arg(long, default_value = "desc")]
    pub dir: SortDir,
    /// Also write the loaded page to a CSV file
    #[arg(long)]
    pub csv: bool,
}

fn current_year() -> i32 {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .year()
}

pub async fn run(ctx: &Ctx, cmd: DonationCommand) -> Result<()> {
    match cmd {
        DonationCommand::Add(a) => add(ctx, a).await,
        DonationCommand::Quick(a) => quick(ctx, a).await,
        DonationCommand::List(a) => list(ctx, a).await,
        DonationCommand::Export { year } => export_year(ctx, year.unwrap_or_else(current_year)).await,
    }
}

async fn add(ctx: &Ctx, a: AddArgs) -> Result<()> {
    ctx.require(Capability::RecordDonations)?;
    let form = DonationForm {
        donor_id: a.donor_id,
        phone: a.phone,
        email: a.email,
        amount: a.amount,
        donation_type: a.donation_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
        currency: a.currency,
        date_of_donation: a.date,
        payment_method: a.payment_method,
        payment_reference: a.reference,
        is_tax_deductible: a.tax_deductible,
        is_anonymous: a.anonymous,
        internal_notes: a.notes,
    };
    let (donor_id, created) = forms::record_donation(&ctx.client, &form)
        .await
        .map_err(|e| ctx.out.api_failed(&e, "Failed to record donation."))?;
    if ctx.out.json_mode() {
        ctx.out.print_json(&json!({
            "donorId": donor_id,
            "donorReceiptDetailId": created.donor_receipt_detail_id,
        }))?;
    }
    ctx.out.success(format!(
        "Donation recorded for donor {donor_id} (receipt ID {}).",
        created.donor_receipt_detail_id
    ));
    Ok(())
}

async fn quick(ctx: &Ctx, a: QuickArgs) -> Result<()> {
    ctx.require(Capability::RecordDonations)?;
    let form = QuickDonationForm {
        donor: QuickDonor {
            first_name: a.first_name.trim().to_string(),
            last_name: a.last_name.trim().to_string(),
            phone: a.phone,
            email: a.email,
            city: a.city,
            state: a.state,
            country: a.country,
            postal_code: a.postal_code,
            ..Default::default()
        },
        amount: a.amount,
        donation_type: a.donation_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
        date_of_donation: a.date,
        payment_mode: a.payment_mode,
        reference_no: a.reference,
        notes: a.notes,
    };
    let quick = form.validate().map_err(|e| ctx.out.form_failed(&e))?;
    let receipt = ctx
        .client
        .quick_donation(&quick)
        .await
        .map_err(|e| ctx.out.api_failed(&e, "Failed to record quick donation."))?;
    let path = export::save_bytes(&ctx.cfg.output_dir, &receipt.file_name, &receipt.pdf)?;

    if ctx.out.json_mode() {
        ctx.out.print_json(&json!({
            "donorId": receipt.donor_id,
            "receiptId": receipt.receipt_id,
            "file": path,
        }))?;
    }
    let ids = match (receipt.donor_id.as_deref(), receipt.receipt_id.as_deref()) {
        (Some(d), Some(r)) => format!(" (Donor ID {d}, Receipt ID {r})"),
        _ => String::new(),
    };
    ctx.out.success(format!(
        "Donation recorded{ids}. Receipt saved to {}.",
        path.display()
    ));
    Ok(())
}

async fn list(ctx: &Ctx, a: ListArgs) -> Result<()> {
    ctx.require(Capability::ViewDonations)?;
    let mut state = DonationListState::new(a.year.unwrap_or_else(current_year));
    state.change_search(a.search.trim());
    state.change_page_size(a.page_size);
    state.sort = a.sort;
    state.dir = a.dir;
    state.change_page(a.page);

    state.load(&ctx.client).await;
    if let Some(err) = state.error.as_deref() {
        return Err(ctx.out.failed(err));
    }

    if ctx.out.json_mode() {
        ctx.out.print_json(&json!({
            "items": state.items,
            "totalCount": state.total_count,
            "page": state.page,
            "totalPages": state.total_pages(),
        }))?;
    } else {
        ctx.out.lines(build_donation_page(&state).lines);
    }

    if a.csv {
        match export::donation_page_csv(&state.items)? {
            Some(csv) => {
                let name = export::donation_page_file_name(state.year, state.page);
                let path = export::save_bytes(&ctx.cfg.output_dir, &name, csv.as_bytes())?;
                ctx.out.note(format!("Saved: {}", path.display()));
            }
            None => ctx.out.info("Nothing to export."),
        }
    }
    Ok(())
}

async fn export_year(ctx: &Ctx, year: i32) -> Result<()> {
    ctx.require(Capability::ExportDonations)?;
    let blob = ctx
        .client
        .export_donations(year)
        .await
        .map_err(|e| ctx.out.api_failed(&e, "Export failed."))?;
    let name = export::donations_export_file_name(year);
    let path = export::save_bytes(&ctx.cfg.output_dir, &name, &blob.bytes)?;
    ctx.out.success(format!("Saved: {}", path.display()));
    Ok(())
}

use super::Ctx;
use anyhow::Result;
use clap::{Args, Subcommand};
use temple_admin::auth::Capability;
use temple_admin::forms::{lookup_donor, DonorForm};
use temple_admin::model::{Donor, DonorType};

#[derive(Debug, Subcommand, Clone)]
pub enum DonorCommand {
    /// Register a donor
    Add(DonorArgs),
    /// List active donors
    List,
    /// Find a donor by id, phone or email
    Search(SearchArgs),
    /// Remove a donor
    Delete { id: i64 },
}

#[derive(Debug, Args, Clone)]
pub struct DonorArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub address1: String,
    #[arg(long, default_value = "")]
    pub address2: String,
    #[arg(long, default_value = "")]
    pub city: String,
    #[arg(long, default_value = "")]
    pub state: String,
    #[arg(long, default_value = "")]
    pub country: String,
    #[arg(long, default_value = "")]
    pub postal_code: String,
    /// Registers an organization donor with this name
    #[arg(long)]
    pub organization: Option<String>,
    /// Mark the donor as corporate rather than individual
    #[arg(long)]
    pub corporate: bool,
    #[arg(long, default_value = "")]
    pub notes: String,
}

impl From<DonorArgs> for DonorForm {
    fn from(a: DonorArgs) -> Self {
        DonorForm {
            first_name: a.first_name,
            last_name: a.last_name,
            phone: a.phone,
            email: a.email,
            address1: a.address1,
            address2: a.address2,
            city: a.city,
            state: a.state,
            country: a.country,
            postal_code: a.postal_code,
            is_organization: a.organization.is_some(),
            organization_name: a.organization.unwrap_or_default(),
            donor_type: if a.corporate {
                DonorType::Corporate
            } else {
                DonorType::Individual
            },
            notes: a.notes,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    #[arg(long, default_value = "")]
    pub id: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
}

fn donor_line(d: &Donor) -> String {
    format!(
        "{:>6}  {:<28}  {:<28}  {}",
        d.donor_id,
        d.full_name(),
        d.email.as_deref().unwrap_or("-"),
        d.phone.as_deref().unwrap_or("-")
    )
}

pub async fn run(ctx: &Ctx, cmd: DonorCommand) -> Result<()> {
    match cmd {
        DonorCommand::Add(args) => {
            ctx.require(Capability::ManageDonors)?;
            let donor = DonorForm::from(args)
                .validate()
                .map_err(|e| ctx.out.form_failed(&e))?;
            let created = ctx
                .client
                .create_donor(&donor)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to create donor."))?;
            if ctx.out.json_mode() {
                ctx.out.print_json(&created)?;
            }
            ctx.out.success(format!("Donor created with ID {}.", created.donor_id));
        }
        DonorCommand::List => {
            ctx.require(Capability::ViewDonations)?;
            let donors = ctx
                .client
                .list_donors()
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to load donors."))?;
            if ctx.out.json_mode() {
                return ctx.out.print_json(&donors);
            }
            if donors.is_empty() {
                ctx.out.info("No donors found.");
            }
            ctx.out.lines(donors.iter().map(donor_line).collect());
        }
        DonorCommand::Search(a) => {
            ctx.require(Capability::ViewDonations)?;
            let donor = lookup_donor(&ctx.client, &a.id, &a.phone, &a.email)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Donor search failed."))?;
            if ctx.out.json_mode() {
                return ctx.out.print_json(&donor);
            }
            ctx.out.line(donor_line(&donor));
        }
        DonorCommand::Delete { id } => {
            ctx.require(Capability::ManageDonors)?;
            ctx.client
                .delete_donor(id)
                .await
                .map_err(|e| ctx.out.api_failed(&e, "Failed to delete donor."))?;
            ctx.out.success(format!("Donor {id} deleted."));
        }
    }
    Ok(())
}

//! Required-field checks that run before any request is made, plus the
//! small multi-step flows (donor lookup, donation recording) built on them.

use crate::api::ApiClient;
use crate::error::{ApiError, FormErrors};
use crate::model::{
    CreatedDonation, Donor, DonorType, NewDonation, NewDonor, QuickDonation, QuickDonationDetails,
    QuickDonor, DEFAULT_CURRENCY,
};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

fn trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Validated donor search criteria. At least one criterion is always set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorSearch {
    donor_id: Option<i64>,
    phone: Option<String>,
    email: Option<String>,
}

impl DonorSearch {
    pub fn from_inputs(donor_id: &str, phone: &str, email: &str) -> Result<Self, FormErrors> {
        let donor_id = trimmed(donor_id);
        let phone = trimmed(phone);
        let email = trimmed(email);
        if donor_id.is_none() && phone.is_none() && email.is_none() {
            return Err(FormErrors::single(
                "donorSearch",
                "Enter donor ID or phone or email to search.",
            ));
        }
        let donor_id = match donor_id {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| FormErrors::single("donorId", "Donor ID must be numeric."))?,
            ),
            None => None,
        };
        Ok(Self { donor_id, phone, email })
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.donor_id {
            pairs.push(("donorId", id.to_string()));
        }
        if let Some(phone) = &self.phone {
            pairs.push(("phone", phone.clone()));
        }
        if let Some(email) = &self.email {
            pairs.push(("email", email.clone()));
        }
        pairs
    }
}

/// Look up the first active donor matching the inputs.
///
/// Empty inputs fail locally without touching the network.
pub async fn lookup_donor(
    client: &ApiClient,
    donor_id: &str,
    phone: &str,
    email: &str,
) -> Result<Donor, ApiError> {
    let search = DonorSearch::from_inputs(donor_id, phone, email)?;
    let found = client.search_donors(&search).await?;
    found.into_iter().next().ok_or_else(|| {
        ApiError::Form(FormErrors::single(
            "donorSearch",
            "No matching active donor found.",
        ))
    })
}

/// Raw donor registration input.
#[derive(Debug, Clone, Default)]
pub struct DonorForm {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub is_organization: bool,
    pub organization_name: String,
    pub donor_type: DonorType,
    pub notes: String,
}

impl DonorForm {
    pub fn validate(&self) -> Result<NewDonor, FormErrors> {
        let mut errs = FormErrors::new();
        if self.first_name.trim().is_empty() {
            errs.insert("firstName", "First name is required.");
        }
        if self.last_name.trim().is_empty() {
            errs.insert("lastName", "Last name is required.");
        }
        if self.is_organization && self.organization_name.trim().is_empty() {
            errs.insert(
                "organizationName",
                "Organization name is required for organization donors.",
            );
        }
        errs.into_result()?;

        Ok(NewDonor {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: trimmed(&self.phone),
            email: trimmed(&self.email),
            address1: trimmed(&self.address1),
            address2: trimmed(&self.address2),
            city: trimmed(&self.city),
            state: trimmed(&self.state),
            country: trimmed(&self.country),
            postal_code: trimmed(&self.postal_code),
            is_organization: self.is_organization,
            organization_name: trimmed(&self.organization_name),
            donor_type: Some(self.donor_type.as_str().to_string()),
            notes: Some(self.notes.clone()).filter(|n| !n.is_empty()),
            allow_email: true,
            allow_sms: false,
            allow_mail: true,
        })
    }
}

/// Raw donation input; the donor is identified by id, phone or email.
#[derive(Debug, Clone)]
pub struct DonationForm {
    pub donor_id: String,
    pub phone: String,
    pub email: String,
    pub amount: Option<f64>,
    pub donation_type: String,
    pub currency: String,
    /// `YYYY-MM-DD`; empty means now.
    pub date_of_donation: String,
    pub payment_method: String,
    pub payment_reference: String,
    pub is_tax_deductible: bool,
    pub is_anonymous: bool,
    pub internal_notes: String,
}

impl Default for DonationForm {
    fn default() -> Self {
        Self {
            donor_id: String::new(),
            phone: String::new(),
            email: String::new(),
            amount: None,
            donation_type: String::new(),
            currency: DEFAULT_CURRENCY.to_string(),
            date_of_donation: String::new(),
            payment_method: String::new(),
            payment_reference: String::new(),
            is_tax_deductible: true,
            is_anonymous: false,
            internal_notes: String::new(),
        }
    }
}

impl DonationForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errs = FormErrors::new();
        if self.donor_id.trim().is_empty()
            && self.phone.trim().is_empty()
            && self.email.trim().is_empty()
        {
            errs.insert("donorSearch", "Provide at least donor ID, phone, or email.");
        }
        if !self.donor_id.trim().is_empty() && self.donor_id.trim().parse::<i64>().is_err() {
            errs.insert("donorId", "Donor ID must be numeric.");
        }
        if !self.amount.is_some_and(|a| a > 0.0) {
            errs.insert("donationAmt", "Donation amount must be greater than zero.");
        }
        if self.donation_type.trim().is_empty() {
            errs.insert("donationType", "Donation type is required.");
        }
        if self.payment_method.trim().is_empty() {
            errs.insert("paymentMethod", "Payment method is required.");
        }
        if !self.date_of_donation.trim().is_empty() && parse_day(&self.date_of_donation).is_none() {
            errs.insert("dateOfDonation", "Use YYYY-MM-DD.");
        }
        errs.into_result()
    }

    fn payload(&self, donor_id: i64) -> NewDonation {
        let date_of_donation = parse_day(&self.date_of_donation)
            .map(|d| d.midnight().assume_utc())
            .unwrap_or_else(OffsetDateTime::now_utc)
            .format(&Rfc3339)
            .unwrap_or_default();
        NewDonation {
            donor_id,
            donation_amt: self.amount.unwrap_or_default(),
            donation_type: self.donation_type.trim().to_string(),
            currency: trimmed(&self.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            date_of_donation,
            payment_method: self.payment_method.trim().to_string(),
            payment_reference: trimmed(&self.payment_reference),
            is_tax_deductible: self.is_tax_deductible,
            is_anonymous: self.is_anonymous,
            internal_notes: Some(self.internal_notes.clone()).filter(|n| !n.is_empty()),
        }
    }
}

fn parse_day(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Record a donation, resolving the donor through a search when no id is given.
///
/// Returns the donor id used and the created receipt.
pub async fn record_donation(
    client: &ApiClient,
    form: &DonationForm,
) -> Result<(i64, CreatedDonation), ApiError> {
    form.validate()?;
    let donor_id = match form.donor_id.trim().parse::<i64>() {
        Ok(id) => id,
        Err(_) => {
            let search = DonorSearch::from_inputs("", &form.phone, &form.email)?;
            let found = client.search_donors(&search).await?;
            match found.first() {
                Some(d) => d.donor_id,
                None => {
                    return Err(ApiError::Form(FormErrors::single(
                        "donorSearch",
                        "No matching active donor found for phone/email.",
                    )))
                }
            }
        }
    };
    let created = client.record_donation(&form.payload(donor_id)).await?;
    Ok((donor_id, created))
}

/// Quick donor-plus-donation input.
#[derive(Debug, Clone, Default)]
pub struct QuickDonationForm {
    pub donor: QuickDonor,
    pub amount: Option<f64>,
    pub donation_type: String,
    /// `YYYY-MM-DD`; empty means today.
    pub date_of_donation: String,
    pub payment_mode: String,
    pub reference_no: String,
    pub notes: String,
}

impl QuickDonationForm {
    pub fn validate(&self) -> Result<QuickDonation, FormErrors> {
        if self.donor.first_name.trim().is_empty() || self.donor.last_name.trim().is_empty() {
            return Err(FormErrors::single("global", "First name and last name are required."));
        }
        let amount = match self.amount {
            Some(a) if a > 0.0 => a,
            _ => {
                return Err(FormErrors::single(
                    "global",
                    "Donation amount must be greater than zero.",
                ))
            }
        };
        if self.donation_type.trim().is_empty() {
            return Err(FormErrors::single("global", "Donation type is required."));
        }
        let date = if self.date_of_donation.trim().is_empty() {
            today()
        } else {
            self.date_of_donation.trim().to_string()
        };
        let mut donor = self.donor.clone();
        if donor.donor_type.is_empty() {
            donor.donor_type = DonorType::Individual.as_str().to_string();
        }
        Ok(QuickDonation {
            donor,
            donation: QuickDonationDetails {
                donation_amt: amount,
                donation_type: self.donation_type.trim().to_string(),
                date_of_donation: date,
                payment_mode: self.payment_mode.clone(),
                reference_no: self.reference_no.clone(),
                notes: self.notes.clone(),
            },
        })
    }
}

fn today() -> String {
    OffsetDateTime::now_utc()
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Checks for the reset-password screen.
pub fn check_password_reset(token: &str, password: &str, confirm: &str) -> Result<(), FormErrors> {
    if token.trim().is_empty() {
        return Err(FormErrors::single("token", "Reset token is missing."));
    }
    if password != confirm {
        return Err(FormErrors::single("confirm", "Passwords do not match."));
    }
    Ok(())
}

//! Response envelope and the flat record written to the sheet.

use serde::Deserialize;
use serde_json::Value;

/// Column titles of the identity sheet, in row order.
pub const HEADER: [&str; 12] = [
    "Country",
    "First Name",
    "Last Name",
    "City",
    "Address",
    "Zip Code",
    "Date of Birth",
    "Phone",
    "Bank IBAN",
    "Credit Card Number",
    "Credit Card Expiration Date",
    "Credit Card CVV2",
];

/// Top-level body returned by `/api/identity/<country>`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub status: String,
    #[serde(default)]
    pub response: Option<IdentityPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPayload {
    #[serde(default)]
    pub country: Value,
    #[serde(default)]
    pub first_name: Value,
    #[serde(default)]
    pub last_name: Value,
    #[serde(default)]
    pub city: Value,
    #[serde(default)]
    pub address: Value,
    #[serde(default)]
    pub zip_code: Value,
    #[serde(default)]
    pub date_of_birth: Value,
    #[serde(default)]
    pub phone: Value,
    #[serde(default)]
    pub bank: BankInfo,
    #[serde(default)]
    pub credit_card: CreditCardInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankInfo {
    #[serde(default)]
    pub iban: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardInfo {
    #[serde(default)]
    pub number: Value,
    #[serde(default)]
    pub expiration_date: Value,
    #[serde(default)]
    pub cvv2: Value,
}

/// One identity, flattened into sheet cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub country: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub address: String,
    pub zip_code: String,
    pub date_of_birth: String,
    pub phone: String,
    pub bank_iban: String,
    pub credit_card_number: String,
    pub credit_card_expiration_date: String,
    pub credit_card_cvv2: String,
}

impl Record {
    pub fn from_payload(p: &IdentityPayload) -> Self {
        Self {
            country: cell_text(&p.country),
            first_name: cell_text(&p.first_name),
            last_name: cell_text(&p.last_name),
            city: cell_text(&p.city),
            address: cell_text(&p.address),
            zip_code: cell_text(&p.zip_code),
            date_of_birth: cell_text(&p.date_of_birth),
            phone: cell_text(&p.phone),
            bank_iban: cell_text(&p.bank.iban),
            credit_card_number: cell_text(&p.credit_card.number),
            credit_card_expiration_date: cell_text(&p.credit_card.expiration_date),
            credit_card_cvv2: cell_text(&p.credit_card.cvv2),
        }
    }

    /// Cells in `HEADER` order.
    pub fn to_row(&self) -> [&str; 12] {
        [
            &self.country,
            &self.first_name,
            &self.last_name,
            &self.city,
            &self.address,
            &self.zip_code,
            &self.date_of_birth,
            &self.phone,
            &self.bank_iban,
            &self.credit_card_number,
            &self.credit_card_expiration_date,
            &self.credit_card_cvv2,
        ]
    }
}

impl ApiEnvelope {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }

    /// Map an OK envelope to a record; otherwise return the reason it is skipped.
    pub fn into_record(self) -> Result<Record, String> {
        if !self.is_ok() {
            return Err(self
                .message
                .unwrap_or_else(|| format!("status {}", self.status)));
        }
        match self.response {
            Some(payload) => Ok(Record::from_payload(&payload)),
            None => Err("OK status without response object".to_string()),
        }
    }
}

/// Pass-through cell text: strings verbatim, null as empty, anything else as JSON text.
fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

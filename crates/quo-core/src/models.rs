//! Domain models for Quo

use chrono::{DateTime, Datelike, Month, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A normalized bank transaction
///
/// Amounts are always non-negative; direction lives in `mode`. The store
/// refuses records that break this before they reach any analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Provider id, or a `fp-` fingerprint when the provider sent none
    pub id: Option<String>,
    /// Free-text merchant/memo string from the provider
    pub description: String,
    /// Raw provider category label (may be generic, e.g. "Unknown")
    pub category: String,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub mode: TransactionMode,
}

impl Transaction {
    pub fn new(
        description: impl Into<String>,
        category: impl Into<String>,
        date: DateTime<Utc>,
        amount: f64,
    ) -> Self {
        Self {
            id: None,
            description: description.into(),
            category: category.into(),
            date,
            amount,
            mode: TransactionMode::Payment,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_mode(mut self, mode: TransactionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Calendar month this transaction falls in
    pub fn month_key(&self) -> MonthKey {
        MonthKey::from_date(&self.date)
    }

    /// Deterministic id derived from date, description and amount
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.date.to_rfc3339().as_bytes());
        hasher.update(self.description.as_bytes());
        hasher.update(self.amount.to_be_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("fp-{}", &digest[..16])
    }
}

/// How money moved, as tagged by the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionMode {
    #[default]
    Payment,
    Transfer,
    LoanInterest,
    LoanRepayment,
    /// Any other provider-defined tag, kept verbatim
    Other(String),
}

impl TransactionMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Payment => "payment",
            Self::Transfer => "transfer",
            Self::LoanInterest => "loan-interest",
            Self::LoanRepayment => "loan-repayment",
            Self::Other(tag) => tag,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer)
    }

    pub fn is_loan(&self) -> bool {
        matches!(self, Self::LoanInterest | Self::LoanRepayment)
    }
}

impl From<String> for TransactionMode {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "payment" => Self::Payment,
            "transfer" => Self::Transfer,
            "loan-interest" | "loan_interest" => Self::LoanInterest,
            "loan-repayment" | "loan_repayment" => Self::LoanRepayment,
            _ => Self::Other(s),
        }
    }
}

impl From<TransactionMode> for String {
    fn from(mode: TransactionMode) -> Self {
        mode.as_str().to_string()
    }
}

impl std::fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction record as handed over by the fetch step, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub amount: RawAmount,
    #[serde(default)]
    pub mode: Option<String>,
}

/// An amount as the provider sent it.
///
/// Feeds mix numbers and strings ("12.50", "$1,200.00", "(12.00)"), and some
/// send `null`. Nothing is rejected at deserialization; the store decides
/// whether the value is usable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
    #[default]
    Missing,
    Other(serde_json::Value),
}

impl RawAmount {
    /// Numeric value, if the amount can be read as one
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => crate::store::parse_amount(s).ok(),
            Self::Missing | Self::Other(_) => None,
        }
    }
}

impl From<f64> for RawAmount {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl std::fmt::Display for RawAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Missing => write!(f, "<missing>"),
            Self::Other(v) => write!(f, "{}", v),
        }
    }
}

/// A (year, month) bucket key, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// English month name ("January")
    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("Unknown")
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {}", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid month key: {}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month key: {}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Invalid month key: {}", s));
        }
        Ok(Self { year, month })
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Fixed set of super-categories that provider labels are folded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SuperCategory {
    #[serde(rename = "Health & Wellness")]
    HealthWellness,
    #[serde(rename = "Transportation")]
    Transportation,
    #[serde(rename = "Food & Dining")]
    FoodDining,
    #[serde(rename = "Shopping & Retail")]
    ShoppingRetail,
    #[serde(rename = "Financial Services")]
    FinancialServices,
    #[serde(rename = "Utilities & Services")]
    UtilitiesServices,
    #[serde(rename = "Entertainment & Leisure")]
    EntertainmentLeisure,
    #[serde(rename = "Education & Professional")]
    EducationProfessional,
    #[serde(rename = "Home & Living")]
    HomeLiving,
    #[serde(rename = "Other Services")]
    OtherServices,
    #[serde(rename = "Uncategorized")]
    Uncategorized,
}

impl SuperCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealthWellness => "Health & Wellness",
            Self::Transportation => "Transportation",
            Self::FoodDining => "Food & Dining",
            Self::ShoppingRetail => "Shopping & Retail",
            Self::FinancialServices => "Financial Services",
            Self::UtilitiesServices => "Utilities & Services",
            Self::EntertainmentLeisure => "Entertainment & Leisure",
            Self::EducationProfessional => "Education & Professional",
            Self::HomeLiving => "Home & Living",
            Self::OtherServices => "Other Services",
            Self::Uncategorized => "Uncategorized",
        }
    }

    pub fn all() -> &'static [SuperCategory] {
        &[
            Self::HealthWellness,
            Self::Transportation,
            Self::FoodDining,
            Self::ShoppingRetail,
            Self::FinancialServices,
            Self::UtilitiesServices,
            Self::EntertainmentLeisure,
            Self::EducationProfessional,
            Self::HomeLiving,
            Self::OtherServices,
            Self::Uncategorized,
        ]
    }
}

impl std::str::FromStr for SuperCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown super-category: {}", s))
    }
}

impl std::fmt::Display for SuperCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Total spend under one raw provider category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    pub amount: f64,
}

impl CategoryTotal {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Billing cadence of a recurring charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Weekly,
    BiWeekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi-weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }

    /// Nominal days between charges
    pub fn expected_interval_days(&self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::BiWeekly => 14,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Annual => 365,
        }
    }

    /// Multiplier that turns one charge into a monthly-equivalent cost
    pub fn monthly_factor(&self) -> f64 {
        match self {
            Self::Weekly => 52.0 / 12.0,
            Self::BiWeekly => 26.0 / 12.0,
            Self::Monthly => 1.0,
            Self::Quarterly => 1.0 / 3.0,
            Self::Annual => 1.0 / 12.0,
        }
    }

    /// Classify a mean charge interval (in days) into a cadence band.
    ///
    /// Bands: weekly 6–8, bi-weekly 13–15, monthly 25–35, quarterly 83–97,
    /// annual 355–375. Anything else is not a recognizable cadence.
    pub fn from_mean_interval(days: f64) -> Option<Self> {
        if (25.0..=35.0).contains(&days) {
            Some(Self::Monthly)
        } else if (355.0..=375.0).contains(&days) {
            Some(Self::Annual)
        } else if (83.0..=97.0).contains(&days) {
            Some(Self::Quarterly)
        } else if (13.0..=15.0).contains(&days) {
            Some(Self::BiWeekly)
        } else if (6.0..=8.0).contains(&days) {
            Some(Self::Weekly)
        } else {
            None
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "bi-weekly" | "biweekly" | "fortnightly" => Ok(Self::BiWeekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annual" | "yearly" => Ok(Self::Annual),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transaction_mode_round_trip_tags() {
        assert_eq!(
            TransactionMode::from("loan-interest".to_string()),
            TransactionMode::LoanInterest
        );
        assert_eq!(
            TransactionMode::from("Transfer".to_string()),
            TransactionMode::Transfer
        );
        let other = TransactionMode::from("direct-debit".to_string());
        assert_eq!(other, TransactionMode::Other("direct-debit".to_string()));
        assert_eq!(other.as_str(), "direct-debit");
        assert!(TransactionMode::LoanRepayment.is_loan());
        assert!(!TransactionMode::Payment.is_loan());
    }

    #[test]
    fn test_month_key_ordering_and_display() {
        let a = MonthKey::new(2023, 12);
        let b = MonthKey::new(2024, 1);
        assert!(a < b);
        assert_eq!(a.to_string(), "2023-12");
        assert_eq!("2024-01".parse::<MonthKey>().unwrap(), b);
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert_eq!(b.month_name(), "January");
    }

    #[test]
    fn test_super_category_parse_and_serde() {
        assert_eq!(
            "food & dining".parse::<SuperCategory>().unwrap(),
            SuperCategory::FoodDining
        );
        assert!("Groceries".parse::<SuperCategory>().is_err());
        let json = serde_json::to_string(&SuperCategory::HomeLiving).unwrap();
        assert_eq!(json, "\"Home & Living\"");
    }

    #[test]
    fn test_frequency_bands() {
        assert_eq!(Frequency::from_mean_interval(7.0), Some(Frequency::Weekly));
        assert_eq!(Frequency::from_mean_interval(14.0), Some(Frequency::BiWeekly));
        assert_eq!(Frequency::from_mean_interval(30.5), Some(Frequency::Monthly));
        assert_eq!(Frequency::from_mean_interval(91.0), Some(Frequency::Quarterly));
        assert_eq!(Frequency::from_mean_interval(365.0), Some(Frequency::Annual));
        assert_eq!(Frequency::from_mean_interval(10.0), None);
        assert_eq!(Frequency::from_mean_interval(50.0), None);
        assert_eq!(
            serde_json::to_string(&Frequency::BiWeekly).unwrap(),
            "\"bi-weekly\""
        );
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let a = Transaction::new("NETFLIX.COM", "Streaming Services", date, 15.99);
        let b = Transaction::new("NETFLIX.COM", "Other label", date, 15.99);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().starts_with("fp-"));
        assert_eq!(a.fingerprint().len(), 19);

        let c = Transaction::new("NETFLIX.COM", "Streaming Services", date, 16.99);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}

// 🧾 Subscription - the one entity this tool tracks
//
// "Name, amount, date and frequency are VALUES (edited in place),
//  the UUID is IDENTITY (assigned once, never changes)"

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::aggregator::next_due_date;
use crate::error::FormError;

/// Wire format for billing dates (ISO 8601 calendar date)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest accepted cost per billing cycle
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

// ============================================================================
// FREQUENCY
// ============================================================================

/// Billing cadence of a subscription.
///
/// Stored as its plain string name. Strings outside the four known cadences are
/// kept verbatim in `Other` so they survive a load/save cycle; they contribute
/// nothing to totals and never move the due date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Yearly,
    Other(String),
}

impl Frequency {
    /// The cadences offered by the add/edit form, in picker order
    pub const KNOWN: [Frequency; 4] = [
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Weekly => "Weekly",
            Frequency::Biweekly => "Biweekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
            Frequency::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Frequency::Other(_))
    }

    /// Next cadence in picker order (wraps around)
    pub fn next(&self) -> Self {
        match self {
            Frequency::Weekly => Frequency::Biweekly,
            Frequency::Biweekly => Frequency::Monthly,
            Frequency::Monthly => Frequency::Yearly,
            Frequency::Yearly => Frequency::Weekly,
            Frequency::Other(_) => Frequency::Monthly,
        }
    }

    /// Previous cadence in picker order (wraps around)
    pub fn previous(&self) -> Self {
        match self {
            Frequency::Weekly => Frequency::Yearly,
            Frequency::Biweekly => Frequency::Weekly,
            Frequency::Monthly => Frequency::Biweekly,
            Frequency::Yearly => Frequency::Monthly,
            Frequency::Other(_) => Frequency::Monthly,
        }
    }
}

impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Weekly" => Frequency::Weekly,
            "Biweekly" => Frequency::Biweekly,
            "Monthly" => Frequency::Monthly,
            "Yearly" => Frequency::Yearly,
            _ => Frequency::Other(raw),
        }
    }
}

impl From<&str> for Frequency {
    fn from(raw: &str) -> Self {
        Frequency::from(raw.to_string())
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// SUBSCRIPTION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Stable identity (UUID) - assigned at creation, NEVER changes
    pub id: String,

    /// Free-text label (e.g., "Netflix")
    pub name: String,

    /// Cost per billing cycle, non-negative
    #[serde(deserialize_with = "deserialize_stored_amount")]
    pub amount: f64,

    /// Current/next billing date
    #[serde(deserialize_with = "deserialize_billing_date")]
    pub date: NaiveDate,

    pub frequency: Frequency,
}

impl Subscription {
    /// Create a subscription with a fresh UUID
    pub fn new(name: String, amount: f64, date: NaiveDate, frequency: Frequency) -> Self {
        Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            amount,
            date,
            frequency,
        }
    }

    /// Rebuild a subscription around an existing identity
    pub fn with_id(
        id: String,
        name: String,
        amount: f64,
        date: NaiveDate,
        frequency: Frequency,
    ) -> Self {
        Subscription {
            id,
            name,
            amount,
            date,
            frequency,
        }
    }

    /// Replace every value but keep the identity
    pub fn apply(&mut self, values: ValidatedForm) {
        self.name = values.name;
        self.amount = values.amount;
        self.date = values.date;
        self.frequency = values.frequency;
    }

    /// Date of the billing cycle after `date`
    pub fn next_due(&self) -> NaiveDate {
        next_due_date(self.date, &self.frequency)
    }
}

/// Accepts either a calendar date (`2025-01-15`) or a full RFC 3339 timestamp
/// (`2025-01-15T08:00:00+09:00`), keeping the calendar date the timestamp
/// states in its own offset.
fn deserialize_billing_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_billing_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid billing date '{}'", raw))
    })
}

pub fn parse_billing_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

// ============================================================================
// ADD / EDIT FORM
// ============================================================================

/// Raw add/edit form input, exactly as typed.
///
/// Amount and date stay text until `validate` so an invalid entry can sit in the
/// form without ever reaching the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionForm {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "deserialize_amount_text")]
    pub amount: String,

    #[serde(default = "today_text")]
    pub date: String,

    #[serde(default)]
    pub frequency: Frequency,
}

/// Form values that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    pub name: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub frequency: Frequency,
}

impl Default for SubscriptionForm {
    fn default() -> Self {
        SubscriptionForm {
            name: String::new(),
            amount: String::new(),
            date: today_text(),
            frequency: Frequency::Monthly,
        }
    }
}

impl SubscriptionForm {
    pub fn new(name: &str, amount: &str, date: &str, frequency: Frequency) -> Self {
        SubscriptionForm {
            name: name.to_string(),
            amount: amount.to_string(),
            date: date.to_string(),
            frequency,
        }
    }

    /// Prefill the form for editing an existing subscription
    pub fn from_subscription(subscription: &Subscription) -> Self {
        SubscriptionForm {
            name: subscription.name.clone(),
            amount: subscription.amount.to_string(),
            date: subscription.date.format(DATE_FORMAT).to_string(),
            frequency: subscription.frequency.clone(),
        }
    }

    pub fn validate(&self) -> Result<ValidatedForm, FormError> {
        let amount = parse_amount(&self.amount)?;
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).map_err(|_| {
            FormError::InvalidDate {
                input: self.date.clone(),
            }
        })?;

        Ok(ValidatedForm {
            name: self.name.clone(),
            amount,
            date,
            frequency: self.frequency.clone(),
        })
    }

    /// Build a new subscription from this form.
    ///
    /// The entered date is the last billing date, so the stored date is one
    /// cycle later. Edits (`Subscription::apply`) keep the entered date as-is.
    pub fn create(&self) -> Result<Subscription, FormError> {
        let values = self.validate()?;
        let due = next_due_date(values.date, &values.frequency);
        Ok(Subscription::new(values.name, values.amount, due, values.frequency))
    }
}

/// Parse the amount field: finite, non-negative and at most `MAX_AMOUNT`
pub fn parse_amount(input: &str) -> Result<f64, FormError> {
    let value: f64 = input.trim().parse().map_err(|_| FormError::InvalidAmount {
        input: input.to_string(),
    })?;
    check_amount(value, input)
}

fn check_amount(value: f64, input: &str) -> Result<f64, FormError> {
    if !value.is_finite() {
        return Err(FormError::InvalidAmount {
            input: input.to_string(),
        });
    }
    if value < 0.0 {
        return Err(FormError::NegativeAmount {
            input: input.to_string(),
        });
    }
    if value > MAX_AMOUNT {
        return Err(FormError::AmountTooLarge {
            input: input.to_string(),
        });
    }

    Ok(value)
}

/// Stored and imported records go through the same amount rules as the form
fn deserialize_stored_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    check_amount(value, &value.to_string()).map_err(serde::de::Error::custom)
}

fn today_text() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

/// API clients may send the amount as a JSON number or as text
fn deserialize_amount_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AmountText {
        Number(f64),
        Text(String),
    }

    Ok(match AmountText::deserialize(deserializer)? {
        AmountText::Number(value) => value.to_string(),
        AmountText::Text(text) => text,
    })
}

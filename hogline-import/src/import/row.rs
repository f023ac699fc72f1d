//! Order-item row parsing
//!
//! Turns one raw CSV record into a typed [`OrderItemRow`], addressing
//! columns by header name. Validation and conversion happen here at the
//! boundary; downstream stages only see typed values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hogline_common::money::dollars_to_cents;
use std::collections::HashMap;
use thiserror::Error;

/// Row-level parse failure. Recoverable: the orchestrator records a
/// line-numbered warning and moves on to the next row.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("line {line}: expected {expected} columns, found {actual}")]
    ColumnCountMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: unparseable {column} value {value:?}")]
    InvalidMoney {
        line: usize,
        column: &'static str,
        value: String,
    },
}

/// Profile fragment embedded in an order row.
///
/// The primary curler carries the full profile; a second member (couple
/// products) only has name, email, and phone.
#[derive(Debug, Clone, PartialEq)]
pub struct CurlerProfile {
    pub external_id: Option<String>,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// One parsed order-item line from the curling.io export.
#[derive(Debug, Clone)]
pub struct OrderItemRow {
    /// 1-based CSV line number (header is line 1)
    pub line: usize,
    pub order_id: String,
    pub record_type: String,
    pub item_name: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub primary: CurlerProfile,
    pub second_member: Option<CurlerProfile>,
    pub discounts: Option<String>,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub hst_cents: i64,
    pub total_cents: i64,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderItemRow {
    /// Parse a record against its header row. The record must already be
    /// padded to header length; a genuinely mismatched count fails.
    pub fn from_record(
        headers: &[String],
        record: &[String],
        line: usize,
    ) -> Result<Self, RowError> {
        if record.len() != headers.len() {
            return Err(RowError::ColumnCountMismatch {
                line,
                expected: headers.len(),
                actual: record.len(),
            });
        }

        let fields: HashMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(record.iter().map(|v| v.trim()))
            .collect();
        let field = |name: &str| field_value(&fields, name);
        let optional = |name: &str| {
            let value = field_value(&fields, name);
            (!value.is_empty()).then(|| value.to_string())
        };
        let money = |column: &'static str| -> Result<i64, RowError> {
            let value = field_value(&fields, column);
            if value.is_empty() {
                return Ok(0);
            }
            dollars_to_cents(value).map_err(|_| RowError::InvalidMoney {
                line,
                column,
                value: value.to_string(),
            })
        };

        let buyer_email = field("User Email").to_string();

        // Primary profile; curler email falls back to the buyer email
        let curler_name = non_empty_or(field("Curler Name"), field("User Name"));
        let (first_name, last_name) = name_parts(
            &curler_name,
            optional("Curler First Name"),
            optional("Curler Last Name"),
        );
        let curler_email = non_empty_or(field("Curler Email"), &buyer_email);

        let primary = CurlerProfile {
            external_id: optional("Curler ID"),
            name: curler_name,
            first_name,
            last_name,
            email: curler_email,
            phone: optional("Curler Phone"),
            address: optional("Curler Address"),
            city: optional("Curler City"),
            province: optional("Curler Province"),
            postal_code: optional("Curler Postal Code"),
            date_of_birth: parse_date(field("Curler Date of Birth")),
            emergency_contact_name: optional("Curler Emergency Contact Name"),
            emergency_contact_phone: optional("Curler Emergency Contact Phone"),
        };

        // A second member exists only when both name and email are present
        let second_name = field("2nd Member Name");
        let second_email = field("2nd Member Email");
        let second_member = if !second_name.is_empty() && !second_email.is_empty() {
            let (first, last) = name_parts(second_name, None, None);
            Some(CurlerProfile {
                external_id: None,
                name: second_name.to_string(),
                first_name: first,
                last_name: last,
                email: second_email.to_string(),
                phone: optional("2nd Member Phone"),
                address: None,
                city: None,
                province: None,
                postal_code: None,
                date_of_birth: None,
                emergency_contact_name: None,
                emergency_contact_phone: None,
            })
        } else {
            None
        };

        Ok(Self {
            line,
            order_id: field("Order ID").to_string(),
            record_type: field("Type").to_string(),
            item_name: field("Item Name").to_string(),
            buyer_name: field("User Name").to_string(),
            buyer_email,
            primary,
            second_member,
            discounts: optional("Discounts"),
            amount_cents: money("Amount")?,
            discount_cents: money("Discount Amount")?,
            hst_cents: money("HST")?,
            total_cents: money("Total")?,
            status: field("Status").to_string(),
            created_at: parse_datetime(field("Created")),
        })
    }

    /// Adjustment rows represent a refund/cancellation against a prior
    /// purchase in the same order.
    pub fn is_adjustment(&self) -> bool {
        self.record_type == "Adjustment"
    }

    pub fn has_second_member(&self) -> bool {
        self.second_member.is_some()
    }

    /// Idempotency key shared between a purchase and its adjustments.
    pub fn purchase_reference(&self) -> String {
        format!("curlingio_order_{}", self.order_id)
    }
}

fn field_value<'v>(fields: &HashMap<&str, &'v str>, name: &str) -> &'v str {
    fields.get(name).copied().unwrap_or("")
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// First/last name from dedicated columns, else split the full name on its
/// last space ("Mary Anne Smith" -> "Mary Anne" / "Smith").
fn name_parts(
    full_name: &str,
    first: Option<String>,
    last: Option<String>,
) -> (Option<String>, Option<String>) {
    if first.is_some() || last.is_some() {
        return (first, last);
    }
    match full_name.rsplit_once(' ') {
        Some((first, last)) => (Some(first.to_string()), Some(last.to_string())),
        None if !full_name.is_empty() => (Some(full_name.to_string()), None),
        None => (None, None),
    }
}

/// Date-of-birth parsing: failures are swallowed, never fail the row.
fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Some(t.and_utc());
        }
    }
    None
}

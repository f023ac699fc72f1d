//! Domain models
//!
//! Plain structs mapping 1:1 onto the SQLite tables. Uuids and timestamps
//! are stored as TEXT (uuid string / RFC3339); money is integer cents.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product category within a season's catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    Membership,
    League,
    Addon,
    Program,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Membership => "membership",
            Self::League => "league",
            Self::Addon => "addon",
            Self::Program => "program",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "membership" => Some(Self::Membership),
            "league" => Some(Self::League),
            "addon" => Some(Self::Addon),
            "program" => Some(Self::Program),
            _ => None,
        }
    }
}

/// Status of a single product assignment (user_products.status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Active,
    Pending,
    Expired,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Aggregate membership status cached on the user record.
///
/// A projection of the user's membership-type assignments for the current
/// season, recomputed on demand; never a source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
    Active,
    Pending,
    Expired,
    Cancelled,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A membership year. Exactly one season is current at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub guid: Uuid,
    pub name: String,
    pub slug: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

impl Season {
    /// Membership expiry timestamp for assignments in this season
    /// (end of the season's final day, UTC).
    pub fn membership_expiry(&self) -> DateTime<Utc> {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        self.end_date.and_time(end_of_day).and_utc()
    }
}

/// A purchasable item belonging to a season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub guid: Uuid,
    pub season_guid: Uuid,
    /// Identifier from the upstream order-management system,
    /// unique within the season when present.
    pub external_id: Option<String>,
    pub slug: String,
    pub name: String,
    pub product_type: ProductType,
    pub membership_tier: Option<String>,
    pub price_cents: i64,
    pub is_available: bool,
    pub metadata: serde_json::Value,
}

/// An individual, uniquely identified by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub guid: Uuid,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    /// Upstream profile identifier, the most reliable re-link key.
    /// First write wins; treated as immutable once set.
    pub external_profile_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub current_membership_status: MembershipStatus,
    pub email_verified_at: Option<DateTime<Utc>>,
}

/// Assignment of one product to one user within one season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProduct {
    pub guid: Uuid,
    pub user_guid: Uuid,
    pub product_guid: Uuid,
    pub season_guid: Uuid,
    /// Price actually paid; may differ from the product's list price.
    pub price_paid_cents: i64,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Idempotency key derived from the external order id.
    pub purchase_reference: Option<String>,
    pub refund_amount_cents: Option<i64>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

//! Subscriber data models stored in the cache
//!
//! These mirror the JSON returned by the ISP billing API. Only the fields the
//! app relies on are typed; everything else is kept in an `extra` map so that a
//! value written to the cache reads back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Subscriber account and session details
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthData {
    /// Subscriber login name
    pub username: String,
    /// Account status as reported by the billing API (e.g. "active")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Current plan display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_plan: Option<String>,
    /// Current plan price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_price: Option<f64>,
    /// Plan expiry date as sent by the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    /// Operator account the subscriber belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_login_id: Option<String>,
    /// Any other fields from the API response
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A data plan offered to the subscriber
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "downloadSpeed", default, skip_serializing_if = "Option::is_none")]
    pub download_speed: Option<String>,
    #[serde(rename = "uploadSpeed", default, skip_serializing_if = "Option::is_none")]
    pub upload_speed: Option<String>,
    /// Validity in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Price including taxes
    #[serde(rename = "FinalAmount", default, skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Operator tax configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaxInfo {
    /// Whether every plan is offered, not only upgrades
    #[serde(rename = "isShowAllPlan", default)]
    pub show_all_plans: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Aggregate loaded by the plan upgrade flow and cached as a unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub auth_data: AuthData,
    pub plans_data: Vec<Plan>,
    #[serde(default)]
    pub tax_info: Option<TaxInfo>,
    /// Outstanding dues in currency units, as supplied by the caller
    #[serde(default)]
    pub pay_dues: f64,
    /// When the aggregate was assembled (epoch milliseconds)
    pub last_updated: i64,
}

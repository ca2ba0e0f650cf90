use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// Placeholder shown wherever an account has no salesperson attached.
pub const NO_SALESPERSON_LABEL: &str = "Sem Venda";

/// One CSV line of the historical (three month) ledger, kept as raw text so
/// the loader decides what is a parse error.
#[derive(Debug, Deserialize)]
pub struct HistoricalCsvRow {
    #[serde(rename = "id")]
    pub id: Option<String>,
    #[serde(rename = "cidade")]
    pub city: Option<String>,
    #[serde(rename = "cliente")]
    pub customer_name: Option<String>,
    #[serde(rename = "ago")]
    pub month1: Option<String>,
    #[serde(rename = "set")]
    pub month2: Option<String>,
    #[serde(rename = "out")]
    pub month3: Option<String>,
}

/// One CSV line of the current-period ledger.
#[derive(Debug, Deserialize)]
pub struct CurrentCsvRow {
    #[serde(rename = "id")]
    pub id: Option<String>,
    #[serde(rename = "cidade")]
    pub city: Option<String>,
    #[serde(rename = "cliente")]
    pub customer_name: Option<String>,
    #[serde(rename = "nov")]
    pub amount: Option<String>,
    #[serde(rename = "vendedor")]
    pub salesperson: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawHistoricalEntry {
    #[serde(rename = "id")]
    pub account_id: i64,
    #[serde(rename = "cidade", default)]
    pub city: String,
    #[serde(rename = "cliente", default)]
    pub customer_name: String,
    #[serde(rename = "ago", default)]
    pub month1_amount: f64,
    #[serde(rename = "set", default)]
    pub month2_amount: f64,
    #[serde(rename = "out", default)]
    pub month3_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCurrentEntry {
    #[serde(rename = "id")]
    pub account_id: i64,
    #[serde(rename = "cidade", default)]
    pub city: String,
    #[serde(rename = "cliente", default)]
    pub customer_name: String,
    #[serde(rename = "nov", default)]
    pub current_amount: f64,
    #[serde(rename = "vendedor", default)]
    pub salesperson: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalAccountSummary {
    pub account_id: i64,
    pub city: String,
    pub customer_name: String,
    pub month_totals: [f64; 3],
    pub total_quarter: f64,
    pub average_monthly: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentAccountSummary {
    pub account_id: i64,
    pub city: String,
    pub customer_name: String,
    pub salesperson: Option<String>,
    pub current_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Retention status of an account, comparing the historical monthly average
/// against the current period. Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AccountStatus {
    #[serde(rename = "Churn")]
    Churn,
    #[serde(rename = "Retained-Growth")]
    RetainedGrowth,
    #[serde(rename = "Retained-Decline")]
    RetainedDecline,
    #[serde(rename = "New-or-Recovered")]
    NewOrRecovered,
    #[serde(rename = "Inactive")]
    Inactive,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 5] = [
        AccountStatus::Churn,
        AccountStatus::RetainedGrowth,
        AccountStatus::RetainedDecline,
        AccountStatus::NewOrRecovered,
        AccountStatus::Inactive,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AccountStatus::Churn => "Churn",
            AccountStatus::RetainedGrowth => "Retained-Growth",
            AccountStatus::RetainedDecline => "Retained-Decline",
            AccountStatus::NewOrRecovered => "New-or-Recovered",
            AccountStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccountStatus {
    type Err = ConfigError;

    /// Case-insensitive; spaces and underscores are read as dashes so
    /// `retained_growth` and `Retained Growth` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        AccountStatus::ALL
            .into_iter()
            .find(|status| status.label().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ConfigError::UnknownStatus(s.to_string()))
    }
}

/// The reconciled view of one account across both periods.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedAccount {
    pub account_id: i64,
    pub city: String,
    pub customer_name: String,
    pub average_monthly: f64,
    pub current_amount: f64,
    /// Salesperson of the first current-period group; drives the display label.
    pub salesperson: Option<String>,
    /// Current-period amount credited to each salesperson, in first-seen
    /// order. Sums to `current_amount`.
    pub current_by_salesperson: Vec<(Option<String>, f64)>,
    pub status: AccountStatus,
    pub coordinates: Option<Coordinates>,
}

impl UnifiedAccount {
    pub fn salesperson_label(&self) -> &str {
        self.salesperson.as_deref().unwrap_or(NO_SALESPERSON_LABEL)
    }
}

/// Export row for the filtered account table. Column names are part of the
/// export contract.
#[derive(Debug, Serialize, Clone)]
pub struct AccountExportRow {
    pub id: i64,
    pub city: String,
    pub customer_name: String,
    pub salesperson: String,
    pub average_monthly: f64,
    pub current_amount: f64,
    pub status: AccountStatus,
}

#[derive(Debug, Tabled, Clone)]
pub struct AccountPreviewRow {
    #[tabled(rename = "Id")]
    pub id: i64,
    #[tabled(rename = "City")]
    pub city: String,
    #[tabled(rename = "Customer")]
    pub customer_name: String,
    #[tabled(rename = "Salesperson")]
    pub salesperson: String,
    #[tabled(rename = "AvgMonthly")]
    pub average_monthly: String,
    #[tabled(rename = "Current")]
    pub current_amount: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopChurnedRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Id")]
    #[tabled(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Customer")]
    #[tabled(rename = "Customer")]
    pub customer_name: String,
    #[serde(rename = "City")]
    #[tabled(rename = "City")]
    pub city: String,
    #[serde(rename = "AvgMonthly")]
    #[tabled(rename = "AvgMonthly")]
    pub average_monthly: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SalespersonRankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Salesperson")]
    #[tabled(rename = "Salesperson")]
    pub salesperson: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "Accounts")]
    #[tabled(rename = "Accounts")]
    pub accounts: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ComparisonRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Id")]
    #[tabled(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Customer")]
    #[tabled(rename = "Customer")]
    pub customer_name: String,
    #[serde(rename = "Before")]
    #[tabled(rename = "Before")]
    pub before: String,
    #[serde(rename = "After")]
    #[tabled(rename = "After")]
    pub after: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CityRollupRow {
    #[serde(rename = "City")]
    #[tabled(rename = "City")]
    pub city: String,
    #[serde(rename = "Lat")]
    #[tabled(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    #[tabled(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current_amount: String,
    #[serde(rename = "AvgMonthly")]
    #[tabled(rename = "AvgMonthly")]
    pub average_monthly: String,
    #[serde(rename = "Trend")]
    #[tabled(rename = "Trend")]
    pub trend: String,
    #[serde(rename = "BubbleSize")]
    #[tabled(rename = "BubbleSize")]
    pub bubble_size: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StatusBreakdown {
    pub status: AccountStatus,
    pub accounts: usize,
    pub current_amount: f64,
    pub average_monthly: f64,
}

#[derive(Debug, Tabled, Clone)]
pub struct StatusBreakdownRow {
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Accounts")]
    pub accounts: usize,
    #[tabled(rename = "Current")]
    pub current_amount: String,
    #[tabled(rename = "AvgMonthly")]
    pub average_monthly: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct Kpis {
    pub total_current_revenue: f64,
    pub new_business_revenue: f64,
    pub churn_potential: f64,
    pub active_customer_count: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct Projection {
    pub recovery_fraction: f64,
    pub recovered_revenue: f64,
    pub projected_total: f64,
}

#[derive(Debug, Serialize)]
pub struct FilterEcho {
    pub city: String,
    pub statuses: Vec<AccountStatus>,
    pub recovery_pct: u8,
}

#[derive(Debug, Serialize)]
pub struct DataQualityCounts {
    pub duplicate_groupings: usize,
    pub descriptive_mismatches: usize,
    pub unknown_cities: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: String,
    pub filters: FilterEcho,
    pub total_accounts: usize,
    pub accounts_in_view: usize,
    pub kpis: Kpis,
    pub projection: Projection,
    pub status_breakdown: Vec<StatusBreakdown>,
    pub unmapped_accounts: usize,
    pub data_quality: DataQualityCounts,
}

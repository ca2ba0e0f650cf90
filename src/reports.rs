// Metrics and rankings over a (possibly filtered) account view, plus the
// conversions into the display rows written by `output`.
use crate::pipeline::DataQualityReport;
use crate::types::{
    AccountExportRow, AccountPreviewRow, AccountStatus, CityRollupRow, ComparisonRow, Coordinates,
    FilterEcho, Kpis, Projection, SalespersonRankingRow, StatusBreakdown, StatusBreakdownRow,
    SummaryStats, TopChurnedRow, UnifiedAccount, NO_SALESPERSON_LABEL,
};
use crate::util::{cmp_desc, format_currency, format_number};
use crate::view::ViewFilter;
use chrono::{SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub fn compute_kpis(view: &[&UnifiedAccount]) -> Kpis {
    let mut kpis = Kpis {
        total_current_revenue: 0.0,
        new_business_revenue: 0.0,
        churn_potential: 0.0,
        active_customer_count: 0,
    };
    for a in view {
        kpis.total_current_revenue += a.current_amount;
        if a.current_amount > 0.0 {
            kpis.active_customer_count += 1;
        }
        match a.status {
            AccountStatus::NewOrRecovered => kpis.new_business_revenue += a.current_amount,
            AccountStatus::Churn => kpis.churn_potential += a.average_monthly,
            _ => {}
        }
    }
    kpis
}

/// Linear what-if: current revenue plus the given share of churned
/// historical revenue. The fraction is clamped to `[0, 1]`.
pub fn project_recovery(kpis: &Kpis, recovery_fraction: f64) -> Projection {
    let fraction = if recovery_fraction.is_nan() {
        0.0
    } else {
        recovery_fraction.clamp(0.0, 1.0)
    };
    let recovered_revenue = kpis.churn_potential * fraction;
    Projection {
        recovery_fraction: fraction,
        recovered_revenue,
        projected_total: kpis.total_current_revenue + recovered_revenue,
    }
}

/// Churned accounts by historical monthly average, largest first.
pub fn top_churned<'a>(view: &[&'a UnifiedAccount], n: usize) -> Vec<&'a UnifiedAccount> {
    let mut lost: Vec<&UnifiedAccount> = view
        .iter()
        .copied()
        .filter(|a| a.status == AccountStatus::Churn)
        .collect();
    lost.sort_by(|a, b| cmp_desc(a.average_monthly, b.average_monthly));
    lost.truncate(n);
    lost
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalespersonTotal {
    /// `None` collects current-period revenue with no salesperson recorded.
    pub salesperson: Option<String>,
    pub revenue: f64,
    pub accounts: usize,
}

impl SalespersonTotal {
    pub fn label(&self) -> &str {
        self.salesperson.as_deref().unwrap_or(NO_SALESPERSON_LABEL)
    }
}

/// Current-period revenue per salesperson, highest first. Each account
/// credits every salesperson with their own share of its current amount.
/// Ties break on the name.
pub fn salesperson_ranking(view: &[&UnifiedAccount]) -> Vec<SalespersonTotal> {
    let mut map: HashMap<Option<&str>, SalespersonTotal> = HashMap::new();
    for a in view {
        for (salesperson, amount) in &a.current_by_salesperson {
            if *amount <= 0.0 {
                continue;
            }
            let key = salesperson.as_deref();
            let e = map.entry(key).or_insert_with(|| SalespersonTotal {
                salesperson: salesperson.clone(),
                revenue: 0.0,
                accounts: 0,
            });
            e.revenue += amount;
            e.accounts += 1;
        }
    }
    let mut ranking: Vec<SalespersonTotal> = map.into_values().collect();
    ranking.sort_by(|a, b| {
        cmp_desc(a.revenue, b.revenue).then_with(|| a.salesperson.cmp(&b.salesperson))
    });
    ranking
}

/// Paired before/after amounts for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonEntry {
    pub account_id: i64,
    pub customer_name: String,
    pub before: f64,
    pub after: f64,
}

/// Accounts with activity in either period, ranked by combined volume.
pub fn top_comparison(view: &[&UnifiedAccount], n: usize) -> Vec<ComparisonEntry> {
    let mut active: Vec<&UnifiedAccount> = view
        .iter()
        .copied()
        .filter(|a| a.average_monthly > 0.0 || a.current_amount > 0.0)
        .collect();
    active.sort_by(|a, b| {
        cmp_desc(
            a.average_monthly + a.current_amount,
            b.average_monthly + b.current_amount,
        )
    });
    active
        .into_iter()
        .take(n)
        .map(|a| ComparisonEntry {
            account_id: a.account_id,
            customer_name: a.customer_name.clone(),
            before: a.average_monthly,
            after: a.current_amount,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityTrend {
    Growth,
    Decline,
}

impl fmt::Display for CityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CityTrend::Growth => f.write_str("Growth"),
            CityTrend::Decline => f.write_str("Decline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityRollupEntry {
    pub city: String,
    pub coordinates: Coordinates,
    pub current_amount: f64,
    pub average_monthly: f64,
    pub trend: CityTrend,
    /// `sqrt(current + average)`; only compresses marker sizes on the map.
    pub bubble_size: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityRollup {
    pub entries: Vec<CityRollupEntry>,
    pub unmapped_accounts: usize,
}

/// Per-city totals for the map, sorted by city. Accounts without
/// coordinates are only counted.
pub fn city_rollup(view: &[&UnifiedAccount]) -> CityRollup {
    #[derive(Default)]
    struct Acc {
        current: f64,
        average: f64,
        coordinates: Option<Coordinates>,
    }

    let mut map: BTreeMap<&str, Acc> = BTreeMap::new();
    let mut unmapped_accounts = 0usize;
    for a in view {
        let Some(coordinates) = a.coordinates else {
            unmapped_accounts += 1;
            continue;
        };
        let e = map.entry(a.city.as_str()).or_default();
        e.current += a.current_amount;
        e.average += a.average_monthly;
        e.coordinates.get_or_insert(coordinates);
    }
    if unmapped_accounts > 0 {
        tracing::info!(unmapped_accounts, "accounts left off the city rollup");
    }

    let entries = map
        .into_iter()
        .filter_map(|(city, acc)| {
            let coordinates = acc.coordinates?;
            Some(CityRollupEntry {
                city: city.to_string(),
                coordinates,
                current_amount: acc.current,
                average_monthly: acc.average,
                trend: if acc.current > acc.average {
                    CityTrend::Growth
                } else {
                    CityTrend::Decline
                },
                bubble_size: (acc.current + acc.average).sqrt(),
            })
        })
        .collect();
    CityRollup {
        entries,
        unmapped_accounts,
    }
}

/// Count and totals for every status, zero rows included.
pub fn status_breakdown(view: &[&UnifiedAccount]) -> Vec<StatusBreakdown> {
    AccountStatus::ALL
        .into_iter()
        .map(|status| {
            let mut row = StatusBreakdown {
                status,
                accounts: 0,
                current_amount: 0.0,
                average_monthly: 0.0,
            };
            for a in view.iter().filter(|a| a.status == status) {
                row.accounts += 1;
                row.current_amount += a.current_amount;
                row.average_monthly += a.average_monthly;
            }
            row
        })
        .collect()
}

/// Export rows for the view, ordered by status then id.
pub fn account_export_rows(view: &[&UnifiedAccount]) -> Vec<AccountExportRow> {
    let mut sorted: Vec<&UnifiedAccount> = view.to_vec();
    sorted.sort_by_key(|a| (a.status, a.account_id));
    sorted
        .into_iter()
        .map(|a| AccountExportRow {
            id: a.account_id,
            city: a.city.clone(),
            customer_name: a.customer_name.clone(),
            salesperson: a.salesperson_label().to_string(),
            average_monthly: a.average_monthly,
            current_amount: a.current_amount,
            status: a.status,
        })
        .collect()
}

pub fn account_preview_rows(rows: &[AccountExportRow]) -> Vec<AccountPreviewRow> {
    rows.iter()
        .map(|r| AccountPreviewRow {
            id: r.id,
            city: r.city.clone(),
            customer_name: r.customer_name.clone(),
            salesperson: r.salesperson.clone(),
            average_monthly: format_currency(r.average_monthly),
            current_amount: format_currency(r.current_amount),
            status: r.status.to_string(),
        })
        .collect()
}

pub fn top_churned_rows(lost: &[&UnifiedAccount]) -> Vec<TopChurnedRow> {
    lost.iter()
        .enumerate()
        .map(|(idx, a)| TopChurnedRow {
            rank: idx + 1,
            id: a.account_id,
            customer_name: a.customer_name.clone(),
            city: a.city.clone(),
            average_monthly: format_number(a.average_monthly, 2),
        })
        .collect()
}

pub fn salesperson_rows(ranking: &[SalespersonTotal]) -> Vec<SalespersonRankingRow> {
    let total: f64 = ranking.iter().map(|r| r.revenue).sum();
    ranking
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            let share = if total > 0.0 {
                r.revenue / total * 100.0
            } else {
                0.0
            };
            SalespersonRankingRow {
                rank: idx + 1,
                salesperson: r.label().to_string(),
                revenue: format_number(r.revenue, 2),
                accounts: r.accounts,
                share_pct: format_number(share, 2),
            }
        })
        .collect()
}

pub fn comparison_rows(entries: &[ComparisonEntry]) -> Vec<ComparisonRow> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, e)| ComparisonRow {
            rank: idx + 1,
            id: e.account_id,
            customer_name: e.customer_name.clone(),
            before: format_number(e.before, 2),
            after: format_number(e.after, 2),
        })
        .collect()
}

pub fn city_rows(rollup: &CityRollup) -> Vec<CityRollupRow> {
    rollup
        .entries
        .iter()
        .map(|e| CityRollupRow {
            city: e.city.clone(),
            lat: e.coordinates.lat,
            lon: e.coordinates.lon,
            current_amount: format_number(e.current_amount, 2),
            average_monthly: format_number(e.average_monthly, 2),
            trend: e.trend.to_string(),
            bubble_size: format_number(e.bubble_size, 2),
        })
        .collect()
}

pub fn status_rows(breakdown: &[StatusBreakdown]) -> Vec<StatusBreakdownRow> {
    breakdown
        .iter()
        .map(|b| StatusBreakdownRow {
            status: b.status.to_string(),
            accounts: b.accounts,
            current_amount: format_currency(b.current_amount),
            average_monthly: format_currency(b.average_monthly),
        })
        .collect()
}

pub fn generate_summary(
    total_accounts: usize,
    view: &[&UnifiedAccount],
    filter: &ViewFilter,
    recovery_pct: u8,
    quality: &DataQualityReport,
) -> SummaryStats {
    let kpis = compute_kpis(view);
    let projection = project_recovery(&kpis, f64::from(recovery_pct) / 100.0);
    SummaryStats {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        filters: FilterEcho {
            city: filter.city.to_string(),
            statuses: filter.statuses.iter().copied().collect(),
            recovery_pct,
        },
        total_accounts,
        accounts_in_view: view.len(),
        kpis,
        projection,
        status_breakdown: status_breakdown(view),
        unmapped_accounts: view.iter().filter(|a| a.coordinates.is_none()).count(),
        data_quality: quality.counts(),
    }
}

// Reconciliation pipeline: aggregate both ledgers, outer-join them on the
// account id and classify every resulting account.
//
// The whole pass is a pure function of the two entry slices. Anything odd in
// the data is recorded in a `DataQualityReport` instead of being fixed up.
use crate::geocode;
use crate::types::{
    AccountStatus, CurrentAccountSummary, DataQualityCounts, HistoricalAccountSummary,
    RawCurrentEntry, RawHistoricalEntry, UnifiedAccount,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Historical,
    Current,
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ledger::Historical => f.write_str("historical"),
            Ledger::Current => f.write_str("current"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptiveField {
    City,
    CustomerName,
}

impl fmt::Display for DescriptiveField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptiveField::City => f.write_str("city"),
            DescriptiveField::CustomerName => f.write_str("customer_name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataQualityIssue {
    /// One account id spread over several (city, customer[, salesperson])
    /// groups inside a single ledger. The merge folds them together.
    DuplicateGrouping {
        ledger: Ledger,
        account_id: i64,
        groups: usize,
    },
    /// Same id, different descriptive value between periods. The current
    /// value was kept.
    DescriptiveMismatch {
        account_id: i64,
        field: DescriptiveField,
        historical: String,
        current: String,
    },
    UnknownCity { account_id: i64, city: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataQualityReport {
    pub issues: Vec<DataQualityIssue>,
}

impl DataQualityReport {
    pub fn counts(&self) -> DataQualityCounts {
        let mut counts = DataQualityCounts {
            duplicate_groupings: 0,
            descriptive_mismatches: 0,
            unknown_cities: 0,
        };
        for issue in &self.issues {
            match issue {
                DataQualityIssue::DuplicateGrouping { .. } => counts.duplicate_groupings += 1,
                DataQualityIssue::DescriptiveMismatch { .. } => counts.descriptive_mismatches += 1,
                DataQualityIssue::UnknownCity { .. } => counts.unknown_cities += 1,
            }
        }
        counts
    }

    fn flag(&mut self, issue: DataQualityIssue) {
        match &issue {
            DataQualityIssue::DuplicateGrouping { ledger, account_id, groups } => tracing::warn!(
                %ledger,
                account_id,
                groups,
                "account id appears under several groupings"
            ),
            DataQualityIssue::DescriptiveMismatch { account_id, field, historical, current } => {
                tracing::warn!(
                    account_id,
                    %field,
                    historical = historical.as_str(),
                    current = current.as_str(),
                    "descriptive field changed between periods; keeping current value"
                )
            }
            DataQualityIssue::UnknownCity { account_id, city } => tracing::warn!(
                account_id,
                city = city.as_str(),
                "city has no coordinates; excluded from the map"
            ),
        }
        self.issues.push(issue);
    }
}

/// Output of a full pipeline pass. `accounts` is sorted by account id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub accounts: Vec<UnifiedAccount>,
    pub quality: DataQualityReport,
}

/// Pure status rule. Equal amounts count as a decline.
pub fn classify(average_monthly: f64, current_amount: f64) -> AccountStatus {
    match (average_monthly > 0.0, current_amount > 0.0) {
        (true, false) => AccountStatus::Churn,
        (true, true) if current_amount > average_monthly => AccountStatus::RetainedGrowth,
        (true, true) => AccountStatus::RetainedDecline,
        (false, true) => AccountStatus::NewOrRecovered,
        (false, false) => AccountStatus::Inactive,
    }
}

/// One summary per (account_id, city, customer_name), in first-seen order.
pub fn aggregate_historical(entries: &[RawHistoricalEntry]) -> Vec<HistoricalAccountSummary> {
    let mut index: HashMap<(i64, &str, &str), usize> = HashMap::new();
    let mut out: Vec<HistoricalAccountSummary> = Vec::new();
    for e in entries {
        let key = (e.account_id, e.city.as_str(), e.customer_name.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            out.push(HistoricalAccountSummary {
                account_id: e.account_id,
                city: e.city.clone(),
                customer_name: e.customer_name.clone(),
                month_totals: [0.0; 3],
                total_quarter: 0.0,
                average_monthly: 0.0,
            });
            out.len() - 1
        });
        let acc = &mut out[slot].month_totals;
        acc[0] += e.month1_amount;
        acc[1] += e.month2_amount;
        acc[2] += e.month3_amount;
    }
    for summary in &mut out {
        summary.total_quarter = summary.month_totals.iter().sum();
        summary.average_monthly = summary.total_quarter / 3.0;
    }
    out
}

/// One summary per (account_id, city, customer_name, salesperson), in
/// first-seen order.
pub fn aggregate_current(entries: &[RawCurrentEntry]) -> Vec<CurrentAccountSummary> {
    let mut index: HashMap<(i64, &str, &str, Option<&str>), usize> = HashMap::new();
    let mut out: Vec<CurrentAccountSummary> = Vec::new();
    for e in entries {
        let key = (
            e.account_id,
            e.city.as_str(),
            e.customer_name.as_str(),
            e.salesperson.as_deref(),
        );
        let slot = *index.entry(key).or_insert_with(|| {
            out.push(CurrentAccountSummary {
                account_id: e.account_id,
                city: e.city.clone(),
                customer_name: e.customer_name.clone(),
                salesperson: e.salesperson.clone(),
                current_amount: 0.0,
            });
            out.len() - 1
        });
        out[slot].current_amount += e.current_amount;
    }
    out
}

/// First non-blank value across the groups of one ledger.
fn first_filled<'a>(mut values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    values.find(|s| !s.is_empty())
}

/// Full outer join on account id. For accounts in both ledgers the current
/// city/customer win unless blank; missing numeric sides are zero and a
/// missing current side leaves the salesperson absent.
pub fn merge(
    historical: &[HistoricalAccountSummary],
    current: &[CurrentAccountSummary],
) -> Reconciliation {
    #[derive(Default)]
    struct Slot<'a> {
        historical: Vec<&'a HistoricalAccountSummary>,
        current: Vec<&'a CurrentAccountSummary>,
    }

    let mut slots: BTreeMap<i64, Slot> = BTreeMap::new();
    for h in historical {
        slots.entry(h.account_id).or_default().historical.push(h);
    }
    for c in current {
        slots.entry(c.account_id).or_default().current.push(c);
    }

    let mut quality = DataQualityReport::default();
    let mut accounts = Vec::with_capacity(slots.len());
    for (account_id, slot) in slots {
        for (ledger, groups) in [
            (Ledger::Historical, slot.historical.len()),
            (Ledger::Current, slot.current.len()),
        ] {
            if groups > 1 {
                quality.flag(DataQualityIssue::DuplicateGrouping { ledger, account_id, groups });
            }
        }

        let average_monthly: f64 = slot.historical.iter().map(|h| h.average_monthly).sum();
        let current_amount: f64 = slot.current.iter().map(|c| c.current_amount).sum();
        let mut current_by_salesperson: Vec<(Option<String>, f64)> = Vec::new();
        for c in &slot.current {
            match current_by_salesperson
                .iter_mut()
                .find(|(salesperson, _)| *salesperson == c.salesperson)
            {
                Some((_, amount)) => *amount += c.current_amount,
                None => current_by_salesperson.push((c.salesperson.clone(), c.current_amount)),
            }
        }

        let mut pick = |field: DescriptiveField, old: Option<&str>, new: Option<&str>| -> String {
            if let (Some(old), Some(new)) = (old, new) {
                if old != new {
                    quality.flag(DataQualityIssue::DescriptiveMismatch {
                        account_id,
                        field,
                        historical: old.to_string(),
                        current: new.to_string(),
                    });
                }
            }
            new.or(old).unwrap_or_default().to_string()
        };
        let city = pick(
            DescriptiveField::City,
            first_filled(slot.historical.iter().map(|h| h.city.as_str())),
            first_filled(slot.current.iter().map(|c| c.city.as_str())),
        );
        let customer_name = pick(
            DescriptiveField::CustomerName,
            first_filled(slot.historical.iter().map(|h| h.customer_name.as_str())),
            first_filled(slot.current.iter().map(|c| c.customer_name.as_str())),
        );

        let coordinates = geocode::lookup(&city);
        if coordinates.is_none() {
            quality.flag(DataQualityIssue::UnknownCity {
                account_id,
                city: city.clone(),
            });
        }

        accounts.push(UnifiedAccount {
            account_id,
            city,
            customer_name,
            average_monthly,
            current_amount,
            salesperson: slot.current.first().and_then(|c| c.salesperson.clone()),
            current_by_salesperson,
            status: classify(average_monthly, current_amount),
            coordinates,
        });
    }

    Reconciliation { accounts, quality }
}

/// Aggregate, merge and classify in one pass.
pub fn reconcile(historical: &[RawHistoricalEntry], current: &[RawCurrentEntry]) -> Reconciliation {
    let historical = aggregate_historical(historical);
    let current = aggregate_current(current);
    let result = merge(&historical, &current);
    tracing::info!(
        historical_accounts = historical.len(),
        current_accounts = current.len(),
        unified_accounts = result.accounts.len(),
        quality_issues = result.quality.issues.len(),
        "ledgers reconciled"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_ledgers, EmbeddedLedgers};
    use std::collections::HashSet;

    fn hist(id: i64, city: &str, customer: &str, amounts: [f64; 3]) -> RawHistoricalEntry {
        RawHistoricalEntry {
            account_id: id,
            city: city.to_string(),
            customer_name: customer.to_string(),
            month1_amount: amounts[0],
            month2_amount: amounts[1],
            month3_amount: amounts[2],
        }
    }

    fn cur(id: i64, city: &str, customer: &str, amount: f64, salesperson: &str) -> RawCurrentEntry {
        RawCurrentEntry {
            account_id: id,
            city: city.to_string(),
            customer_name: customer.to_string(),
            current_amount: amount,
            salesperson: Some(salesperson.to_string()),
        }
    }

    #[test]
    fn classify_covers_every_quadrant() {
        assert_eq!(classify(0.0, 0.0), AccountStatus::Inactive);
        assert_eq!(classify(0.0, 50.0), AccountStatus::NewOrRecovered);
        assert_eq!(classify(50.0, 0.0), AccountStatus::Churn);
        assert_eq!(classify(50.0, 80.0), AccountStatus::RetainedGrowth);
        assert_eq!(classify(50.0, 20.0), AccountStatus::RetainedDecline);
    }

    #[test]
    fn equal_amounts_classify_as_decline() {
        assert_eq!(classify(100.0, 100.0), AccountStatus::RetainedDecline);
    }

    #[test]
    fn historical_months_are_summed_and_averaged() {
        let summaries = aggregate_historical(&[
            hist(7, "RECIFE", "A", [100.0, 0.0, 300.0]),
            hist(7, "RECIFE", "A", [0.0, 200.0, 0.0]),
        ]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].month_totals, [100.0, 200.0, 300.0]);
        assert_eq!(summaries[0].total_quarter, 600.0);
        assert_eq!(summaries[0].average_monthly, 200.0);
    }

    #[test]
    fn distinct_descriptive_fields_stay_distinct_groups() {
        let summaries = aggregate_historical(&[
            hist(7, "RECIFE", "A", [3.0, 0.0, 0.0]),
            hist(7, "OLINDA", "A", [6.0, 0.0, 0.0]),
        ]);
        assert_eq!(summaries.len(), 2);

        let current = aggregate_current(&[
            cur(9, "RECIFE", "B", 10.0, "HYGOR"),
            cur(9, "RECIFE", "B", 5.0, "HYGOR"),
            cur(9, "RECIFE", "B", 1.0, "VALDIR"),
        ]);
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].current_amount, 15.0);
        assert_eq!(current[1].salesperson.as_deref(), Some("VALDIR"));
    }

    #[test]
    fn end_to_end_single_account() {
        let result = reconcile(
            &[hist(1, "X", "A", [100.0, 100.0, 100.0])],
            &[cur(1, "X", "A", 50.0, "S")],
        );
        assert_eq!(result.accounts.len(), 1);
        let account = &result.accounts[0];
        assert_eq!(account.average_monthly, 100.0);
        assert_eq!(account.current_amount, 50.0);
        assert_eq!(account.status, AccountStatus::RetainedDecline);
        assert_eq!(account.salesperson.as_deref(), Some("S"));
        assert_eq!(account.coordinates, None);
        assert_eq!(
            result.quality.issues,
            vec![DataQualityIssue::UnknownCity { account_id: 1, city: "X".to_string() }]
        );
    }

    #[test]
    fn one_sided_accounts_default_missing_values() {
        let result = reconcile(
            &[hist(1, "RECIFE", "OLD", [30.0, 0.0, 0.0])],
            &[cur(2, "OLINDA", "NEW", 40.0, "RENATO")],
        );
        let old = &result.accounts[0];
        assert_eq!(old.current_amount, 0.0);
        assert_eq!(old.salesperson, None);
        assert_eq!(old.salesperson_label(), "Sem Venda");
        assert_eq!(old.status, AccountStatus::Churn);

        let new = &result.accounts[1];
        assert_eq!(new.average_monthly, 0.0);
        assert_eq!(new.status, AccountStatus::NewOrRecovered);
        assert!(new.coordinates.is_some());
        assert!(result.quality.issues.is_empty());
    }

    #[test]
    fn current_descriptive_fields_win_and_are_flagged() {
        let result = reconcile(
            &[hist(15958, "AFOGADOS DA INGAZEIRA", "PEDRO AUGUSTO ALBUQUERQUE", [2596.0, 0.0, 0.0])],
            &[cur(15958, "AFOGADOS DA INGAZEIRA", "PEDRO AUGUSTO", 3550.0, "VALDIR")],
        );
        let account = &result.accounts[0];
        assert_eq!(account.customer_name, "PEDRO AUGUSTO");
        assert_eq!(account.city, "AFOGADOS DA INGAZEIRA");
        assert_eq!(
            result.quality.issues,
            vec![DataQualityIssue::DescriptiveMismatch {
                account_id: 15958,
                field: DescriptiveField::CustomerName,
                historical: "PEDRO AUGUSTO ALBUQUERQUE".to_string(),
                current: "PEDRO AUGUSTO".to_string(),
            }]
        );
    }

    #[test]
    fn blank_current_city_falls_back_to_historical() {
        let result = reconcile(
            &[hist(3, "RECIFE", "A", [3.0, 3.0, 3.0])],
            &[cur(3, "", "A", 1.0, "S")],
        );
        assert_eq!(result.accounts[0].city, "RECIFE");
        assert!(result.quality.issues.is_empty());
    }

    #[test]
    fn duplicate_groupings_fold_into_one_account() {
        let result = reconcile(
            &[
                hist(5, "RECIFE", "A", [30.0, 0.0, 0.0]),
                hist(5, "OLINDA", "A", [0.0, 0.0, 60.0]),
            ],
            &[],
        );
        assert_eq!(result.accounts.len(), 1);
        assert_eq!(result.accounts[0].average_monthly, 30.0);
        assert_eq!(result.accounts[0].city, "RECIFE");
        assert_eq!(result.quality.counts().duplicate_groupings, 1);
    }

    #[test]
    fn later_current_group_supplies_missing_city() {
        let result = reconcile(
            &[hist(4, "RECIFE", "A", [3.0, 0.0, 0.0])],
            &[cur(4, "", "A", 1.0, "HYGOR"), cur(4, "OLINDA", "A", 2.0, "HYGOR")],
        );
        let account = &result.accounts[0];
        assert_eq!(account.city, "OLINDA");
        assert_eq!(account.current_amount, 3.0);
        assert_eq!(result.quality.counts().descriptive_mismatches, 1);
        assert_eq!(result.quality.counts().duplicate_groupings, 1);
    }

    #[test]
    fn split_salespeople_keep_their_own_amounts() {
        let result = reconcile(
            &[],
            &[
                cur(9, "RECIFE", "B", 1.0, "HYGOR"),
                cur(9, "RECIFE", "B", 100.0, "VALDIR"),
                cur(9, "RECIFE", "B", 4.0, "HYGOR"),
            ],
        );
        let account = &result.accounts[0];
        assert_eq!(account.current_amount, 105.0);
        assert_eq!(account.salesperson.as_deref(), Some("HYGOR"));
        assert_eq!(
            account.current_by_salesperson,
            vec![(Some("HYGOR".to_string()), 5.0), (Some("VALDIR".to_string()), 100.0)]
        );
    }

    #[test]
    fn embedded_snapshot_reconciles_every_account_once() {
        let ledgers = load_ledgers(&EmbeddedLedgers).expect("embedded snapshot loads");
        let result = reconcile(&ledgers.historical.entries, &ledgers.current.entries);

        let ids: HashSet<i64> = ledgers
            .historical
            .entries
            .iter()
            .map(|e| e.account_id)
            .chain(ledgers.current.entries.iter().map(|e| e.account_id))
            .collect();
        assert_eq!(result.accounts.len(), ids.len());
        assert_eq!(result.accounts.len(), 210);
        assert!(result.accounts.windows(2).all(|w| w[0].account_id < w[1].account_id));

        let count = |status| result.accounts.iter().filter(|a| a.status == status).count();
        assert_eq!(count(AccountStatus::Churn), 34);
        assert_eq!(count(AccountStatus::RetainedGrowth), 22);
        assert_eq!(count(AccountStatus::RetainedDecline), 13);
        assert_eq!(count(AccountStatus::NewOrRecovered), 141);
        assert_eq!(count(AccountStatus::Inactive), 0);
        for account in &result.accounts {
            assert_eq!(account.status, classify(account.average_monthly, account.current_amount));
            assert!(account.average_monthly >= 0.0 && account.current_amount >= 0.0);
        }
        assert_eq!(result.quality.counts().unknown_cities, 0);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let ledgers = load_ledgers(&EmbeddedLedgers).expect("embedded snapshot loads");
        let first = reconcile(&ledgers.historical.entries, &ledgers.current.entries);
        let second = reconcile(&ledgers.historical.entries, &ledgers.current.entries);
        assert_eq!(first, second);
    }
}

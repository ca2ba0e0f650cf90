use crate::types::{AccountStatus, UnifiedAccount};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CityFilter {
    #[default]
    All,
    Exact(String),
}

impl FromStr for CityFilter {
    type Err = Infallible;

    /// `ALL` (or the dashboard's `TODAS`) in any case selects every city.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("ALL") || s.eq_ignore_ascii_case("TODAS") {
            Ok(CityFilter::All)
        } else {
            Ok(CityFilter::Exact(s.to_string()))
        }
    }
}

impl fmt::Display for CityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CityFilter::All => f.write_str("ALL"),
            CityFilter::Exact(city) => f.write_str(city),
        }
    }
}

/// Selection applied on top of the reconciled accounts. Filtering never
/// touches the underlying collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFilter {
    pub city: CityFilter,
    /// An empty set means no status restriction.
    pub statuses: BTreeSet<AccountStatus>,
}

impl Default for ViewFilter {
    fn default() -> Self {
        Self {
            city: CityFilter::All,
            statuses: AccountStatus::ALL.into_iter().collect(),
        }
    }
}

impl ViewFilter {
    pub fn new(city: CityFilter, statuses: impl IntoIterator<Item = AccountStatus>) -> Self {
        Self {
            city,
            statuses: statuses.into_iter().collect(),
        }
    }

    pub fn matches(&self, account: &UnifiedAccount) -> bool {
        let city_ok = match &self.city {
            CityFilter::All => true,
            CityFilter::Exact(city) => account.city == *city,
        };
        city_ok && (self.statuses.is_empty() || self.statuses.contains(&account.status))
    }

    pub fn apply<'a>(&self, accounts: &'a [UnifiedAccount]) -> Vec<&'a UnifiedAccount> {
        accounts.iter().filter(|a| self.matches(a)).collect()
    }
}

/// Distinct cities of the collection, sorted, for the city selector.
pub fn city_options(accounts: &[UnifiedAccount]) -> Vec<String> {
    accounts
        .iter()
        .map(|a| a.city.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

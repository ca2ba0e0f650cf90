use crate::error::ConfigError;
use crate::loader::{EmbeddedLedgers, FileLedgers, LedgerSource};
use crate::types::AccountStatus;
use crate::view::{CityFilter, ViewFilter};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "churn_report",
    about = "Reconcile quarterly and current-month sales ledgers into a churn/retention report",
    version
)]
pub struct Cli {
    /// Historical (three month) ledger, CSV or .json
    #[arg(long, env = "CHURN_REPORT_HISTORICAL")]
    pub historical: Option<PathBuf>,
    /// Current-period ledger, CSV or .json
    #[arg(long, env = "CHURN_REPORT_CURRENT")]
    pub current: Option<PathBuf>,
    /// Restrict the view to one city, or ALL
    #[arg(long, default_value = "ALL")]
    pub city: CityFilter,
    /// Statuses to keep in the view (repeatable); defaults to all five
    #[arg(long = "status", value_name = "STATUS")]
    pub statuses: Vec<AccountStatus>,
    /// Share of churned revenue assumed recovered in the projection, in percent
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub recovery: u8,
    /// Directory the report files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
    #[arg(long, default_value_t = 10)]
    pub top_churned: usize,
    #[arg(long, default_value_t = 20)]
    pub top_comparison: usize,
    /// Load and generate once, then exit, instead of showing the menu
    #[arg(long)]
    pub batch: bool,
    #[arg(long, env = "CHURN_REPORT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub enum LedgerChoice {
    Embedded(EmbeddedLedgers),
    Files(FileLedgers),
}

impl LedgerChoice {
    pub fn source(&self) -> &dyn LedgerSource {
        match self {
            LedgerChoice::Embedded(source) => source,
            LedgerChoice::Files(source) => source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledgers: LedgerChoice,
    pub filter: ViewFilter,
    pub recovery_pct: u8,
    pub out_dir: PathBuf,
    pub top_churned: usize,
    pub top_comparison: usize,
    pub batch: bool,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let ledgers = match (cli.historical, cli.current) {
            (Some(historical), Some(current)) => {
                LedgerChoice::Files(FileLedgers { historical, current })
            }
            (None, None) => LedgerChoice::Embedded(EmbeddedLedgers),
            (Some(_), None) => return Err(ConfigError::HalfLedgerPair { given: "--historical" }),
            (None, Some(_)) => return Err(ConfigError::HalfLedgerPair { given: "--current" }),
        };

        let filter = if cli.statuses.is_empty() {
            ViewFilter {
                city: cli.city,
                ..ViewFilter::default()
            }
        } else {
            ViewFilter::new(cli.city, cli.statuses)
        };

        Ok(Self {
            ledgers,
            filter,
            recovery_pct: cli.recovery,
            out_dir: cli.out_dir,
            top_churned: cli.top_churned,
            top_comparison: cli.top_comparison,
            batch: cli.batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AppConfig, ConfigError> {
        let cli = Cli::try_parse_from(std::iter::once("churn_report").chain(args.iter().copied()))
            .expect("arguments parse");
        AppConfig::from_cli(cli)
    }

    #[test]
    fn defaults_use_embedded_snapshot_and_full_view() {
        let config = parse(&[]).expect("valid config");
        assert!(matches!(config.ledgers, LedgerChoice::Embedded(_)));
        assert_eq!(config.filter, ViewFilter::default());
        assert_eq!(config.recovery_pct, 20);
        assert_eq!(config.top_churned, 10);
        assert_eq!(config.top_comparison, 20);
        assert!(!config.batch);
    }

    #[test]
    fn filters_and_paths_are_parsed() {
        let config = parse(&[
            "--historical",
            "h.csv",
            "--current",
            "c.json",
            "--city",
            "RECIFE",
            "--status",
            "churn",
            "--status",
            "New-or-Recovered",
            "--recovery",
            "100",
            "--batch",
        ])
        .expect("valid config");
        assert!(matches!(config.ledgers, LedgerChoice::Files(_)));
        assert_eq!(config.filter.city, CityFilter::Exact("RECIFE".into()));
        assert_eq!(
            config.filter.statuses.into_iter().collect::<Vec<_>>(),
            vec![AccountStatus::Churn, AccountStatus::NewOrRecovered]
        );
        assert_eq!(config.recovery_pct, 100);
        assert!(config.batch);
    }

    #[test]
    fn half_ledger_pair_is_rejected() {
        let err = parse(&["--historical", "h.csv"]).unwrap_err();
        assert!(matches!(err, ConfigError::HalfLedgerPair { given: "--historical" }));
    }

    #[test]
    fn bad_status_and_recovery_fail_to_parse() {
        assert!(Cli::try_parse_from(["churn_report", "--status", "lost"]).is_err());
        assert!(Cli::try_parse_from(["churn_report", "--recovery", "101"]).is_err());
    }

    #[test]
    fn status_labels_parse_loosely() {
        assert_eq!("retained growth".parse::<AccountStatus>().ok(), Some(AccountStatus::RetainedGrowth));
        assert_eq!("RETAINED_DECLINE".parse::<AccountStatus>().ok(), Some(AccountStatus::RetainedDecline));
        assert!(matches!("lost".parse::<AccountStatus>(), Err(ConfigError::UnknownStatus(_))));
    }
}

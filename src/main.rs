// Entry point and high-level CLI flow.
//
// - Option [1] loads both ledgers and reconciles them, printing diagnostics.
// - Option [2] writes the account export, four reports and a JSON summary
//   for the configured view.
// - After generating reports, the user can go back to the menu or exit.
// `--batch` runs [1] then [2] once without prompting.
mod config;
mod error;
mod geocode;
mod loader;
mod output;
mod pipeline;
mod reports;
mod telemetry;
mod types;
mod util;
mod view;

use clap::Parser;
use config::{AppConfig, Cli};
use pipeline::Reconciliation;
use std::io::{self, Write};
use std::process::ExitCode;
use types::UnifiedAccount;
use util::{format_currency, format_int};
use view::{city_options, CityFilter};

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load both ledgers and reconcile them.
///
/// A missing or malformed ledger is reported as a configuration warning and
/// leaves the session without data.
fn handle_load(config: &AppConfig) -> Option<Reconciliation> {
    let source = config.ledgers.source();
    tracing::info!(source = %source.describe(), "loading ledgers");
    let ledgers = match loader::load_ledgers(source) {
        Ok(ledgers) => ledgers,
        Err(e) => {
            tracing::error!(error = %e, "ledgers unavailable");
            println!("Warning: no data to show ({}).", e);
            println!("Check the ledger configuration (--historical/--current). No dashboard rendered.\n");
            return None;
        }
    };

    println!(
        "Processing ledgers... ({} historical rows, {} current rows loaded)",
        format_int(ledgers.historical.report.loaded_rows),
        format_int(ledgers.current.report.loaded_rows)
    );
    let skipped = ledgers.historical.report.parse_errors + ledgers.current.report.parse_errors;
    if skipped > 0 {
        println!("Note: {} rows skipped due to parse/validation errors.", format_int(skipped));
    }

    let reconciliation =
        pipeline::reconcile(&ledgers.historical.entries, &ledgers.current.entries);
    println!("{} accounts reconciled.", format_int(reconciliation.accounts.len()));
    let counts = reconciliation.quality.counts();
    if !reconciliation.quality.issues.is_empty() {
        println!(
            "Info: data-quality flags: {} duplicate groupings, {} descriptive mismatches, {} unknown cities.",
            counts.duplicate_groupings, counts.descriptive_mismatches, counts.unknown_cities
        );
    }
    println!();
    Some(reconciliation)
}

/// Handle option [2]: generate all reports and the JSON summary for the
/// configured view. Each file is written independently.
fn handle_generate_reports(config: &AppConfig, data: &Reconciliation) {
    let view: Vec<&UnifiedAccount> = config.filter.apply(&data.accounts);
    if let CityFilter::Exact(city) = &config.filter.city {
        if !city_options(&data.accounts).contains(city) {
            tracing::warn!(city = city.as_str(), "city filter matches no account");
        }
    }
    let out = |name: &str| config.out_dir.join(name);
    let write_err = |e: error::OutputError| {
        tracing::error!(error = %e, "report not written");
        eprintln!("Write error: {}", e);
    };

    println!("Generating reports...");
    println!(
        "(View: city {}, {} of {} accounts)\n",
        config.filter.city,
        format_int(view.len()),
        format_int(data.accounts.len())
    );

    let kpis = reports::compute_kpis(&view);
    println!("Current revenue:       {}", format_currency(kpis.total_current_revenue));
    println!("New business:          {}", format_currency(kpis.new_business_revenue));
    println!("Churn potential:       {}", format_currency(kpis.churn_potential));
    println!("Active customers:      {}\n", format_int(kpis.active_customer_count));
    output::preview_table_rows(&reports::status_rows(&reports::status_breakdown(&view)), 5);

    let accounts = reports::account_export_rows(&view);
    let file0 = out("accounts.csv");
    if let Err(e) = output::write_csv(&file0, &accounts) {
        write_err(e);
    }
    println!("Account List");
    output::preview_table_rows(&reports::account_preview_rows(&accounts), 5);
    println!("(Full table exported to {})\n", file0.display());

    let lost = reports::top_churned(&view, config.top_churned);
    let r1 = reports::top_churned_rows(&lost);
    let file1 = out("report1_top_churned.csv");
    if let Err(e) = output::write_csv(&file1, &r1) {
        write_err(e);
    }
    println!("Report 1: Largest Lost Customers");
    println!("(Top {} churned accounts by historical monthly average)\n", config.top_churned);
    if r1.is_empty() {
        println!("Zero losses!\n");
    } else {
        output::preview_table_rows(&r1, 3);
    }
    println!("(Full table exported to {})\n", file1.display());

    let r2 = reports::salesperson_rows(&reports::salesperson_ranking(&view));
    let file2 = out("report2_salesperson_ranking.csv");
    if let Err(e) = output::write_csv(&file2, &r2) {
        write_err(e);
    }
    println!("Report 2: Salesperson Ranking (current period)\n");
    output::preview_table_rows(&r2, 3);
    println!("(Full table exported to {})\n", file2.display());

    let r3 = reports::comparison_rows(&reports::top_comparison(&view, config.top_comparison));
    let file3 = out("report3_top_comparison.csv");
    if let Err(e) = output::write_csv(&file3, &r3) {
        write_err(e);
    }
    println!("Report 3: Before vs. After, Same Customer");
    println!("(Top {} by historical average + current amount)\n", config.top_comparison);
    output::preview_table_rows(&r3, 3);
    println!("(Full table exported to {})\n", file3.display());

    let rollup = reports::city_rollup(&view);
    let r4 = reports::city_rows(&rollup);
    let file4 = out("report4_city_rollup.csv");
    if let Err(e) = output::write_csv(&file4, &r4) {
        write_err(e);
    }
    println!("Report 4: Sales Geography");
    if rollup.unmapped_accounts > 0 {
        println!(
            "({} accounts without coordinates left off the map)",
            format_int(rollup.unmapped_accounts)
        );
    }
    println!();
    output::preview_table_rows(&r4, 3);
    println!("(Full table exported to {})\n", file4.display());

    let summary = reports::generate_summary(
        data.accounts.len(),
        &view,
        &config.filter,
        config.recovery_pct,
        &data.quality,
    );
    if let Err(e) = output::write_json(&out("summary.json"), &summary) {
        write_err(e);
    }
    println!("Recovery Simulator ({}% of churned revenue):", config.recovery_pct);
    println!(
        "Potential extra: + {}, projection: {}\n",
        format_currency(summary.projection.recovered_revenue),
        format_currency(summary.projection.projected_total)
    );
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    if let Err(e) = telemetry::init(&cli.log_level) {
        eprintln!("Logging disabled: {}", e);
    }
    let config = match AppConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    if config.batch {
        let Some(data) = handle_load(&config) else {
            return ExitCode::FAILURE;
        };
        handle_generate_reports(&config, &data);
        return ExitCode::SUCCESS;
    }

    let mut data: Option<Reconciliation> = None;
    loop {
        println!("Churn Report");
        println!("[1] Load the ledgers");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            break;
        };
        match choice.as_str() {
            "1" => {
                data = handle_load(&config);
            }
            "2" => {
                println!();
                let Some(loaded) = data.as_ref() else {
                    println!("Error: No data loaded. Please load the ledgers first (option 1).\n");
                    continue;
                };
                handle_generate_reports(&config, loaded);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
    ExitCode::SUCCESS
}

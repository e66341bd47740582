// Entry point and high-level CLI flow.
//
// - Option [1] loads and normalizes the inspection export, printing
//   diagnostics.
// - Option [2] builds the filtered view and writes every report plus a
//   JSON summary, previewing each on the console.
// - Option [3] lists similar sector names per province and lets the user
//   accept a unified name for each group.
// With --batch the file is loaded and the reports written without a menu.
use aedes_report::cli::Cli;
use aedes_report::error::Result;
use aedes_report::output;
use aedes_report::processor::DataProcessor;
use aedes_report::render::RenderView;
use aedes_report::reports;
use aedes_report::schema::ContainerStatus;
use aedes_report::sectors::{self, ProvinceMapping};
use aedes_report::util;
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info};

/// Everything one run of the program works on.
struct Session {
    cli: Cli,
    processor: Option<DataProcessor>,
    /// Accepted sector unification, applied to every report view.
    sector_mapping: ProvinceMapping,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    read_line("Enter choice: ")
}

fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the selection menu after generating
/// reports. Returns `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

impl Session {
    fn new(cli: Cli) -> Self {
        Self {
            cli,
            processor: None,
            sector_mapping: ProvinceMapping::new(),
        }
    }

    /// Option [1]: load and normalize the export.
    fn handle_load(&mut self) -> Result<()> {
        let (processor, load_report) =
            DataProcessor::load(&self.cli.input, self.cli.processor_config())?;
        let report = processor.report();
        println!(
            "Processing dataset... ({} rows loaded, encoding {})",
            util::format_int(load_report.loaded_rows),
            load_report.encoding.name()
        );
        if load_report.parse_errors > 0 {
            println!(
                "Note: {} rows skipped due to malformed fields.",
                util::format_int(load_report.parse_errors)
            );
        }
        if report.dropped_count() > 0 {
            println!(
                "Info: removed {} empty columns.",
                util::format_int(report.dropped_count())
            );
        }
        if report.categorical_applied {
            println!(
                "Info: {} columns dictionary-encoded, about {} KB saved.",
                report.categorical_candidates.len(),
                util::format_int(report.categorical_savings / 1024)
            );
        }
        for warning in &report.warnings {
            println!("Warning: {warning}");
        }
        if let Some((from, to)) = processor.get_date_range() {
            println!("Inspections from {from} to {to}.");
        }
        println!();

        self.sector_mapping = if self.cli.unify_sectors {
            sectors::mapping_from_groups(&processor.find_similar_sectors(), |_, group| {
                Some(group.key.clone())
            })
        } else {
            ProvinceMapping::new()
        };
        if !self.sector_mapping.is_empty() {
            info!(provinces = self.sector_mapping.len(), "sector unification enabled");
        }
        self.processor = Some(processor);
        Ok(())
    }

    /// Option [2]: write every report and the JSON summary.
    fn handle_generate_reports(&self) -> Result<()> {
        let Some(processor) = &self.processor else {
            println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
            return Ok(());
        };
        let activity = self.cli.activity_name();
        let mut filters = self.cli.filter_set(processor.get_date_range());
        if !self.sector_mapping.is_empty() {
            filters = filters.with_sector_mapping_by_province(self.sector_mapping.clone());
        }
        let view = processor.view(activity, &filters);
        let registry = processor.registry();
        let dir = &self.cli.output_dir;
        std::fs::create_dir_all(dir).map_err(|source| aedes_report::ProcessorError::Write {
            path: dir.clone(),
            source,
        })?;

        println!(
            "Generating reports for {} records{}...",
            util::format_int(view.rows()),
            activity.map(|a| format!(" ({a})")).unwrap_or_default()
        );
        println!("Outputs saved to {}\n", dir.display());

        let coverage = reports::coverage_percentages(&view, registry);
        output::write_report(&dir.join("report1_coverage.csv"), &coverage)?;
        output::preview_table(1, "Coverage by Facility", Some("Against registered housing totals"), &coverage, 3);

        let containers = reports::container_statistics(&view);
        output::write_report(&dir.join("report2_containers.csv"), &containers)?;
        let legend = ContainerStatus::ALL
            .iter()
            .map(|s| format!("{} {}", s.suffix(), s.label()))
            .collect::<Vec<_>>()
            .join(", ");
        output::preview_table(2, "Container Statistics", Some(&legend), &containers, 10);

        let larvicide = reports::larvicide_consumption(&view, registry);
        output::write_report(&dir.join("report3_larvicide.csv"), &larvicide.rows)?;
        output::preview_table(3, "Larvicide Consumption", None, &larvicide.rows, 3);
        println!("Total larvicide: {} g\n", util::format_number(larvicide.total, 2));

        let febrile = reports::febrile_cases(&view, registry);
        output::write_report(&dir.join("report4_febrile.csv"), &febrile.rows)?;
        output::preview_table(4, "Febrile Cases", None, &febrile.rows, 3);
        println!("Total febrile cases: {}\n", util::format_number(febrile.total, 0));

        let trends = reports::monthly_trends(&view);
        output::write_report(&dir.join("report5_monthly_trends.csv"), &trends)?;
        output::preview_table(5, "Monthly Trends", None, &trends, 12);

        let effectiveness = reports::cerco_effectiveness(&view, registry);
        output::write_report(&dir.join("report6_cerco_effectiveness.csv"), &effectiveness)?;
        output::preview_table(6, "Cerco Effectiveness", None, &effectiveness, 3);

        let aedic = reports::monthly_aedic_by_establishment(&view, registry);
        output::write_report(&dir.join("report7_monthly_aedic.csv"), &aedic)?;
        output::preview_table(7, "Monthly Aedic Index by Facility", None, &aedic, 3);

        let by_sector = reports::sector_summary(&view);
        output::write_report(&dir.join("report8_sectors.csv"), &by_sector)?;
        output::preview_table(8, "Activity by Sector", None, &by_sector, 5);

        let departments = reports::geographic_coverage(&view);
        output::write_report(&dir.join("report9_departments.csv"), &departments)?;
        output::preview_table(9, "Coverage by Department", None, &departments, 5);

        let density = reports::intervention_density(&view, registry);
        output::write_report(&dir.join("report10_intervention_density.csv"), &density)?;
        output::preview_table(10, "Intervention Density", None, &density, 3);

        let attention = reports::attention_distribution(&view);
        output::write_report(&dir.join("report11_attention.csv"), &attention)?;
        output::preview_table(11, "Attention Outcomes", None, &attention, 6);

        let cerco_months = reports::cerco_monthly_trends(&view);
        output::write_report(&dir.join("report12_cerco_monthly.csv"), &cerco_months)?;
        output::preview_table(12, "Cerco Indicators by Month", None, &cerco_months, 12);

        let render = processor.safe_render(&view);
        let records_file = dir.join("filtered_records.csv");
        match &render.view {
            RenderView::Rows(rows) => output::write_table_csv(&records_file, rows)?,
            RenderView::Structure(summary) => output::write_csv(&records_file, summary)?,
        }
        println!("Filtered records:");
        output::preview_render(&render, 5);

        let recovered = reports::recovered_records(&view);
        if !recovered.is_empty() {
            let render = processor.safe_render(&recovered);
            if let RenderView::Rows(rows) = &render.view {
                output::write_table_csv(&dir.join("recovered_records.csv"), rows)?;
            }
            println!("Recovered houses:");
            output::preview_render(&render, 5);
        }

        let summary = reports::generate_summary(&view, activity);
        output::write_json(&dir.join("summary.json"), &summary)?;
        println!("Summary Stats (summary.json):");
        println!(
            "{{\"total_records\": {}, \"effectiveness\": {}}}\n",
            util::format_int(summary.total_records),
            util::format_number(summary.overview.effectiveness, 2)
        );
        Ok(())
    }

    /// Option [3]: review similar sector names and accept unified names.
    fn handle_review_sectors(&mut self) {
        let Some(processor) = &self.processor else {
            println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
            return;
        };
        let groups = processor.find_similar_sectors();
        if groups.is_empty() {
            println!("No similar sector names found.\n");
            return;
        }
        println!(
            "Found similar sector names in {} provinces.",
            util::format_int(groups.len())
        );
        println!("Enter a unified name, press Enter to keep the suggestion, or type - to skip.\n");
        let mapping = sectors::mapping_from_groups(&groups, |province, group| {
            println!("[{province}] {}", group.variants.join(" | "));
            let answer = read_line(&format!("Unified name [{}]: ", group.key));
            match answer.as_str() {
                "-" => None,
                "" => Some(group.key.clone()),
                name => Some(name.to_string()),
            }
        });
        let unified: usize = mapping.values().map(|m| m.len()).sum();
        println!("{} sector names will be unified in reports.\n", util::format_int(unified));
        self.sector_mapping = mapping;
    }
}

fn run_batch(session: &mut Session) -> ExitCode {
    let result = session
        .handle_load()
        .and_then(|()| session.handle_generate_reports());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "batch run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_menu(session: &mut Session) {
    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Review similar sectors\n");
        match read_choice().as_str() {
            "1" => {
                if let Err(e) = session.handle_load() {
                    eprintln!("Failed to load file: {e}\n");
                }
            }
            "2" => {
                println!();
                if let Err(e) = session.handle_generate_reports() {
                    eprintln!("Write error: {e}\n");
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => session.handle_review_sectors(),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = aedes_report::logging::init_logging(&cli.log_config()) {
        eprintln!("Failed to open log file: {e}");
        return ExitCode::FAILURE;
    }
    let batch = cli.batch;
    let mut session = Session::new(cli);
    if batch {
        return run_batch(&mut session);
    }
    run_menu(&mut session);
    ExitCode::SUCCESS
}

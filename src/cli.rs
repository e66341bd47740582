//! Command-line arguments.

use crate::config::ProcessorConfig;
use crate::filters::{ActivityType, DateRange, FilterScalar, FilterSet};
use crate::logging::{LogConfig, LogFormat};
use crate::schema::{DEPARTMENT, DISTRICT, FACILITY_NAME, PROVINCE, SECTOR, YEAR, COD_RENIPRESS};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "aedes_report",
    version,
    about = "Clean, filter and summarise vector-control inspection exports",
    long_about = "Loads an inspection export (CSV), normalizes its columns and writes \
                  coverage, container, larvicide, febrile, trend and cerco reports.\n\n\
                  Without --batch an interactive menu is shown."
)]
pub struct Cli {
    /// Inspection export to load.
    #[arg(value_name = "CSV", default_value = "inspecciones.csv")]
    pub input: PathBuf,

    /// Directory for report files.
    #[arg(long = "output-dir", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Restrict reports to one activity (vigilancia, control_larvario, cerco).
    #[arg(long)]
    pub activity: Option<ActivityType>,

    #[arg(long)]
    pub year: Option<i64>,

    #[arg(long)]
    pub department: Option<String>,

    #[arg(long)]
    pub province: Option<String>,

    #[arg(long)]
    pub district: Option<String>,

    #[arg(long)]
    pub sector: Option<String>,

    /// Facility code; repeat for several.
    #[arg(long)]
    pub renipress: Vec<i64>,

    /// Facility name as recorded in the data.
    #[arg(long)]
    pub facility: Option<String>,

    /// First inspection date to include (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last inspection date to include (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Unify similar sector names, using each group's shortest spelling.
    #[arg(long = "unify-sectors")]
    pub unify_sectors: bool,

    /// Similarity at which sector names are grouped (0-1).
    #[arg(long = "similarity-threshold", default_value_t = 0.8)]
    pub similarity_threshold: f64,

    /// Row ceiling for displayed and exported record views.
    #[arg(long = "max-rows", default_value_t = 50_000)]
    pub max_rows: usize,

    /// Memory ceiling (MB) for displayed and exported record views.
    #[arg(long = "max-memory-mb", default_value_t = 50.0)]
    pub max_memory_mb: f64,

    /// Keep low-cardinality text columns unencoded.
    #[arg(long = "no-categorical")]
    pub no_categorical: bool,

    /// Load, write every report and exit without the menu.
    #[arg(long)]
    pub batch: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig::default()
            .with_max_rows(self.max_rows)
            .with_max_memory_mb(self.max_memory_mb)
            .with_categorical_compression(!self.no_categorical)
            .with_similarity_threshold(self.similarity_threshold)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_verbosity(self.verbose)
            .with_format(self.log_format.into())
            .with_log_file(self.log_file.clone())
    }

    pub fn activity_name(&self) -> Option<&'static str> {
        self.activity.map(ActivityType::as_str)
    }

    /// Column filters from the flags. An open-ended date range is closed
    /// with the dataset's own bounds.
    pub fn filter_set(&self, dataset_range: Option<(NaiveDate, NaiveDate)>) -> FilterSet {
        let mut filters = FilterSet::new();
        if let Some(year) = self.year {
            filters.set(YEAR, year);
        }
        for (column, value) in [
            (DEPARTMENT, &self.department),
            (PROVINCE, &self.province),
            (DISTRICT, &self.district),
            (SECTOR, &self.sector),
            (FACILITY_NAME, &self.facility),
        ] {
            if let Some(value) = value {
                filters.set(column, value.as_str());
            }
        }
        if !self.renipress.is_empty() {
            let codes: Vec<FilterScalar> = self.renipress.iter().map(|c| (*c).into()).collect();
            filters.set(COD_RENIPRESS, codes);
        }
        if self.from.is_some() || self.to.is_some() {
            let start = self.from.or(dataset_range.map(|r| r.0));
            let end = self.to.or(dataset_range.map(|r| r.1));
            if let (Some(start), Some(end)) = (start, end) {
                filters.date_range = Some(DateRange::new(start, end));
            }
        }
        filters
    }
}

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dose_core::*;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "drugvision")]
#[command(about = "Medication schedule and adherence tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage medication plans
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },

    /// Show the dose schedule for a plan
    Schedule {
        /// Plan id or unique id prefix
        plan: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show doses due today for all active plans
    Today,

    /// Mark a dose as taken (or skipped)
    Log {
        /// Plan id or unique id prefix
        plan: String,

        /// Time of day of the dose (morning, afternoon, evening, night)
        #[arg(long = "time")]
        time_of_day: TimeOfDay,

        /// Date of the dose (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Record the dose as skipped instead of taken
        #[arg(long)]
        skipped: bool,

        #[arg(long)]
        note: Option<String>,
    },

    /// Show adherence for a plan
    Summary {
        /// Plan id or unique id prefix
        plan: String,

        /// Include a per-day breakdown
        #[arg(long)]
        daily: bool,

        #[arg(long)]
        json: bool,
    },

    /// List the supported dosing frequencies
    Frequencies,

    /// Roll up the adherence log to CSV
    Rollup {
        /// Remove processed logs after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Add a new medication plan
    Add(AddPlan),

    /// List all plans
    List,

    /// Change a plan's status (active, completed, cancelled)
    Status {
        plan: String,
        status: MedicationStatus,
    },

    /// Set the last day of a plan, or make it open-ended again
    End {
        plan: String,

        #[arg(required_unless_present = "clear")]
        date: Option<NaiveDate>,

        /// Remove the end date
        #[arg(long, conflicts_with = "date")]
        clear: bool,
    },
}

#[derive(Args)]
struct AddPlan {
    /// Medication name
    #[arg(long)]
    name: String,

    #[arg(long)]
    dosage: String,

    /// Comma-separated names of the drugs the medication contains
    #[arg(long, value_delimiter = ',')]
    drugs: Vec<String>,

    /// once a day, twice a day, everyday, alternate days, once a week, as needed
    #[arg(long)]
    frequency: Frequency,

    /// Comma-separated times of day (defaults to the configured times)
    #[arg(long, value_delimiter = ',')]
    times: Vec<TimeOfDay>,

    /// First day of the plan (defaults to today)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the plan (open-ended if omitted)
    #[arg(long)]
    end: Option<NaiveDate>,

    #[arg(long)]
    patient: Option<String>,

    #[arg(long)]
    prescribed_by: Option<String>,

    #[arg(long)]
    notes: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// File layout under the data directory
struct DataPaths {
    plans: PathBuf,
    log_dir: PathBuf,
    log: PathBuf,
    archive: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        let log_dir = data_dir.join("log");
        Self {
            plans: data_dir.join("plans.json"),
            log: log_dir.join("adherence.jsonl"),
            log_dir,
            archive: data_dir.join("adherence.csv"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    dose_core::logging::init_with_level(dose_core::logging::level_for_verbosity(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(&data_dir);
    let today = cli.today.unwrap_or_else(|| Utc::now().date_naive());

    match cli.command {
        Commands::Plan { command } => match command {
            PlanCommand::Add(args) => cmd_plan_add(&paths, &config, args, today),
            PlanCommand::List => cmd_plan_list(&paths),
            PlanCommand::Status { plan, status } => cmd_plan_status(&paths, &plan, status),
            PlanCommand::End { plan, date, clear } => {
                cmd_plan_end(&paths, &plan, if clear { None } else { date })
            }
        },
        Commands::Schedule { plan, format } => cmd_schedule(&paths, &plan, format, today),
        Commands::Today => cmd_today(&paths, today),
        Commands::Log {
            plan,
            time_of_day,
            date,
            skipped,
            note,
        } => cmd_log(
            &paths,
            &plan,
            DoseEvent::new(date.unwrap_or(today), time_of_day),
            !skipped,
            note,
        ),
        Commands::Summary { plan, daily, json } => {
            cmd_summary(&paths, &config, &plan, daily, json, today)
        }
        Commands::Frequencies => cmd_frequencies(),
        Commands::Rollup { cleanup } => cmd_rollup(&paths, cleanup),
    }
}

fn cmd_plan_add(paths: &DataPaths, config: &Config, args: AddPlan, today: NaiveDate) -> Result<()> {
    let times = if args.times.is_empty() && args.frequency != Frequency::AsNeeded {
        config.schedule.default_times.clone()
    } else {
        args.times
    };

    let mut plan = MedicationPlan::new(
        args.name,
        args.dosage,
        args.frequency,
        times,
        args.start.unwrap_or(today),
    )
    .with_drugs(args.drugs);
    plan.end_date = args.end;
    plan.patient = args.patient;
    plan.prescribed_by = args.prescribed_by;
    plan.notes = args.notes;

    plan.validate()?;

    let id = PlanStore::update(&paths.plans, |store| Ok(store.add(plan)))?;

    println!("✓ Added plan {}", id);
    Ok(())
}

fn cmd_plan_list(paths: &DataPaths) -> Result<()> {
    let store = PlanStore::load(&paths.plans)?;
    let plans = store.list();

    if plans.is_empty() {
        println!("No plans yet.");
        return Ok(());
    }

    for plan in plans {
        let end = plan
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "ongoing".into());
        println!(
            "{}  {} {}  {} [{}]  {} → {}  {}",
            short_id(plan),
            plan.medication,
            plan.dosage,
            plan.frequency,
            format_times(&plan.times_of_day),
            plan.start_date,
            end,
            plan.status
        );
        if !plan.drugs.is_empty() {
            println!("          drugs: {}", plan.drugs.join(", "));
        }
    }

    Ok(())
}

fn cmd_plan_status(paths: &DataPaths, plan: &str, status: MedicationStatus) -> Result<()> {
    let id = PlanStore::update(&paths.plans, |store| {
        let id = store.resolve(plan)?;
        store.set_status(&id, status)?;
        Ok(id)
    })?;

    println!("✓ Plan {} marked {}", id, status);
    Ok(())
}

fn cmd_plan_end(paths: &DataPaths, plan: &str, date: Option<NaiveDate>) -> Result<()> {
    let id = PlanStore::update(&paths.plans, |store| {
        let id = store.resolve(plan)?;
        store.set_end_date(&id, date)?;
        Ok(id)
    })?;

    match date {
        Some(date) => println!("✓ Plan {} ends {}", id, date),
        None => println!("✓ Plan {} is now open-ended", id),
    }
    Ok(())
}

fn cmd_schedule(paths: &DataPaths, plan: &str, format: OutputFormat, today: NaiveDate) -> Result<()> {
    let store = PlanStore::load(&paths.plans)?;
    let plan = find_plan(&store, plan)?;
    let schedule = generate_schedule(plan, today);

    match format {
        OutputFormat::Text => {
            let (start, end) = schedule.range();
            println!(
                "Dose schedule for {} ({}), {} → {}",
                plan.medication, plan.frequency, start, end
            );
            let mut count = 0;
            for event in schedule {
                println!("  {}  {}", event.date, event.time_of_day);
                count += 1;
            }
            if count == 0 {
                println!("  No scheduled doses.");
            }
        }
        OutputFormat::Json => {
            let events: Vec<_> = schedule.collect();
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            for event in schedule {
                writer.serialize(event)?;
            }
            writer.flush()?;
        }
    }

    Ok(())
}

fn cmd_today(paths: &DataPaths, today: NaiveDate) -> Result<()> {
    let store = PlanStore::load(&paths.plans)?;

    println!("Today's medications ({})", today);

    let mut any = false;
    for plan in store.active() {
        let doses = doses_on(plan, today);
        if doses.is_empty() {
            continue;
        }
        any = true;

        let records = load_records(&paths.log, &paths.archive, plan.id)?;

        println!("  {} {}  ({})", plan.medication, plan.dosage, short_id(plan));
        for dose in doses {
            let mark = records
                .iter()
                .find(|r| r.dose() == dose)
                .and_then(|r| r.taken);
            let status = match mark {
                Some(true) => "✓ taken",
                Some(false) => "✗ skipped",
                None => "· pending",
            };
            println!("    {:<10} {}", dose.time_of_day, status);
        }
    }

    if !any {
        println!("  No doses due today.");
    }

    Ok(())
}

fn cmd_log(
    paths: &DataPaths,
    plan: &str,
    dose: DoseEvent,
    taken: bool,
    note: Option<String>,
) -> Result<()> {
    let store = PlanStore::load(&paths.plans)?;
    let plan = find_plan(&store, plan)?;

    if !doses_on(plan, dose.date).contains(&dose) {
        tracing::warn!(
            "Logging unscheduled dose {} {} for plan {}",
            dose.date,
            dose.time_of_day,
            plan.id
        );
        eprintln!(
            "Note: {} {} is not on the schedule for {}; it won't count toward adherence.",
            dose.date, dose.time_of_day, plan.medication
        );
    }

    let mut record = AdherenceRecord::new(plan.id, dose, Some(taken));
    record.note = note;

    let mut sink = JsonlSink::new(&paths.log);
    sink.append(&record)?;

    println!(
        "✓ Marked {} {} {} as {}",
        plan.medication,
        dose.date,
        dose.time_of_day,
        if taken { "taken" } else { "skipped" }
    );
    Ok(())
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    #[serde(flatten)]
    summary: &'a AdherenceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    daily: Option<&'a [DailyAdherence]>,
}

fn cmd_summary(
    paths: &DataPaths,
    config: &Config,
    plan: &str,
    daily: bool,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let store = PlanStore::load(&paths.plans)?;
    let plan = find_plan(&store, plan)?;
    let records = load_records(&paths.log, &paths.archive, plan.id)?;

    let schedule = generate_schedule(plan, today);
    let summary = summarize(plan.id, schedule.clone(), &records);
    let days = if daily {
        Some(daily_breakdown(plan.id, schedule.clone(), &records))
    } else {
        None
    };

    if json {
        let report = SummaryReport {
            summary: &summary,
            daily: days.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (start, end) = schedule.range();
    println!("Adherence for {} ({} → {})", plan.medication, start, end);
    println!("  Doses scheduled: {}", summary.total_doses);
    println!("  Doses taken:     {}", summary.taken_count);
    println!("  Adherence:       {:.2}%", summary.adherence_percentage);

    if summary.total_doses > 0 && summary.adherence_percentage < config.adherence.low_threshold {
        println!(
            "  ⚠ Below the {:.0}% adherence target",
            config.adherence.low_threshold
        );
    }

    if let Some(days) = days {
        println!();
        for day in days {
            println!(
                "  {}  {}/{}  {:.2}%",
                day.date, day.taken, day.scheduled, day.adherence_percentage
            );
        }
    }

    Ok(())
}

fn cmd_frequencies() -> Result<()> {
    for option in frequency_options() {
        println!("{:<16} {}", option.value, option.label);
    }
    Ok(())
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    if !paths.log.exists() {
        println!("No adherence log found - nothing to roll up.");
        return Ok(());
    }

    let count = dose_core::archive::log_to_csv_and_archive(&paths.log, &paths.archive)?;

    println!("✓ Rolled up {} adherence records to CSV", count);
    println!("  CSV: {}", paths.archive.display());

    if cleanup {
        let cleaned = dose_core::archive::cleanup_processed_logs(&paths.log_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed logs", cleaned);
        }
    }

    Ok(())
}

fn find_plan<'a>(store: &'a PlanStore, plan: &str) -> Result<&'a MedicationPlan> {
    let id = store.resolve(plan)?;
    store
        .get(&id)
        .ok_or_else(|| Error::PlanNotFound(id.to_string()))
}

fn short_id(plan: &MedicationPlan) -> String {
    plan.id.to_string()[..8].to_string()
}

fn format_times(times: &[TimeOfDay]) -> String {
    times
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

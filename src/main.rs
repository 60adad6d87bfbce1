// therapy-plan-pdf: Render clinic therapy plans to PDF

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::warn;
use uuid::Uuid;

use therapy_plan_pdf::config::{load_logo_or_skip, ClinicProfile};
use therapy_plan_pdf::merge::{self, WorkingRecord};
use therapy_plan_pdf::render::document::{drop_table, standard_blocks};
use therapy_plan_pdf::store::{PersistenceError, RecordStore, SqliteStore};
use therapy_plan_pdf::{DocumentBuilder, Error, PlanFile, Result, SessionDefaults};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Render clinic therapy plans to PDF")]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, default_value = "app.db")]
    db: PathBuf,

    /// Clinic profile (JSON)
    #[arg(long, global = true)]
    clinic: Option<PathBuf>,

    /// Logo image (file path or URL), overrides the clinic profile
    #[arg(long, global = true)]
    logo: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a plan file to PDF
    Render {
        /// Plan file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output filename (defaults to <Prefix>_Therapieplan_<Name>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Therapy duration in months; inherited items follow
        #[arg(short, long)]
        duration: Option<u32>,
    },
    /// Store a plan file
    Save {
        /// Plan file (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Render a stored record
    Export {
        /// Patient name
        #[arg(short, long)]
        name: String,

        /// Output filename (defaults to <Prefix>_Therapieplan_<Name>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored patients
    List,
    /// Delete a stored record
    Delete {
        /// Patient name
        #[arg(short, long)]
        name: String,
    },
    /// Show the supplement catalog
    Catalog {
        /// Only this category number
        #[arg(short, long)]
        category: Option<u32>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let profile = match &cli.clinic {
        Some(path) => ClinicProfile::load(path)?,
        None => ClinicProfile::default(),
    };
    let logo_source = cli.logo.clone().or_else(|| profile.logo.clone());

    match cli.command {
        Command::Render {
            input,
            output,
            duration,
        } => {
            // Only the catalog is needed; leave --db untouched
            let store = SqliteStore::open_in_memory()?;
            let mut plan = load_plan(&input)?;
            fill_item_names(&store, &mut plan)?;
            let mut record = merge::from_plan(plan, None);
            if let Some(months) = duration {
                merge::set_global_default(&mut record, months);
            }
            render_record(&record, &profile, logo_source.as_deref(), output)
        }
        Command::Save { input } => {
            let mut store = SqliteStore::open(&cli.db)?;
            let mut plan = load_plan(&input)?;
            fill_item_names(&store, &mut plan)?;
            let revision = store
                .load_record(&plan.patient.name)?
                .map(|stored| stored.revision);
            let mut record = merge::from_plan(plan, revision);
            let saved = merge::save(&mut record, &mut store)?;

            println!("✓ Saved: {}", record.patient().name);
            println!("  Items: {}", record.items().len());
            println!("  Revision: {}", saved);
            Ok(())
        }
        Command::Export { name, output } => {
            let store = SqliteStore::open(&cli.db)?;
            let stored = store
                .load_record(&name)?
                .ok_or_else(|| PersistenceError::NotFound(name.clone()))?;
            let record = merge::reconcile_on_load(Some(stored), &name, &SessionDefaults::default());
            render_record(&record, &profile, logo_source.as_deref(), output)
        }
        Command::List => {
            let store = SqliteStore::open(&cli.db)?;
            let names = store.list_names()?;
            if names.is_empty() {
                println!("No stored records");
            }
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Delete { name } => {
            let mut store = SqliteStore::open(&cli.db)?;
            if !store.delete_record(&name)? {
                return Err(PersistenceError::NotFound(name).into());
            }
            println!("✓ Deleted: {}", name);
            Ok(())
        }
        Command::Catalog { category } => {
            let store = SqliteStore::open(&cli.db)?;
            let mut current = None;
            for entry in store
                .list_catalog()?
                .into_iter()
                .filter(|e| category.map_or(true, |c| e.category == c))
            {
                if current != Some(entry.category) {
                    println!("{} {}", entry.category, entry.category_name);
                    current = Some(entry.category);
                }
                match &entry.delivery_form {
                    Some(form) => println!("  {}  {} ({})", entry.id, entry.name, form),
                    None => println!("  {}  {}", entry.id, entry.name),
                }
            }
            Ok(())
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn generate_short_id() -> String {
    let uuid = Uuid::new_v4();
    let hex = format!("{:x}", uuid);
    hex[..8].to_uppercase()
}

fn load_plan(path: &Path) -> Result<PlanFile> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Input(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content).map_err(|e| Error::Input(format!("Invalid plan file: {}", e)))
}

/// Items may name only their catalog id; take the rest from the catalog.
fn fill_item_names(store: &SqliteStore, plan: &mut PlanFile) -> Result<()> {
    for item in plan.items.iter_mut() {
        if !item.name.trim().is_empty() && !item.delivery_form.is_empty() {
            continue;
        }
        let entry = store
            .catalog_entry(&item.catalog_id)?
            .ok_or_else(|| Error::UnknownItem(item.catalog_id.clone()))?;
        if item.name.trim().is_empty() {
            item.name = entry.name;
        }
        if item.delivery_form.is_empty() {
            item.delivery_form = entry.delivery_form.unwrap_or_default();
        }
    }
    Ok(())
}

fn render_record(
    record: &WorkingRecord,
    profile: &ClinicProfile,
    logo_source: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let document_id = generate_short_id();
    let builder = DocumentBuilder::new(profile.clone(), &document_id)
        .with_logo(load_logo_or_skip(logo_source));

    let patient = record.patient();
    let items = record.line_items();
    let mut blocks = standard_blocks(
        patient,
        &items,
        record.sections(),
        builder.geometry().content_width(),
    )?;

    let bytes = loop {
        match builder.build(patient, &blocks) {
            Err(Error::EmptyTable(title)) => {
                let before = blocks.len();
                blocks = drop_table(blocks, &title);
                if blocks.len() == before {
                    return Err(Error::EmptyTable(title));
                }
                warn!("Table \"{}\" has no active items, leaving it out", title);
            }
            result => break result?,
        }
    };

    let output_file = output
        .unwrap_or_else(|| PathBuf::from(profile.output_file_name("Therapieplan", &patient.name)));
    std::fs::write(&output_file, bytes)?;

    println!("✓ Generated: {}", output_file.display());
    println!("  Patient: {}", patient.name);
    println!(
        "  Active items: {}",
        items.iter().filter(|item| item.is_active()).count()
    );
    println!("  Document ID: {}", document_id);
    Ok(())
}

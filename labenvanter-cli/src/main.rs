use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use labenvanter_core::query::parse_date;
use labenvanter_core::store::{load_theme, save_theme};
use labenvanter_core::{
    calibration_status, ensure_data_dir, filter_and_sort, filter_notes, get_default_state_path,
    import_export, ActiveFlag, AuthGate, Authorization, CalibrationStatus,
    CertificateAnalysisResult, CertificateAnalyzer, CertificateStatus, Device, DeviceDraft,
    DeviceField, DeviceFilter, InventoryRepository, MemoryStore, Resolution, SortDirection,
    SortState, SqliteStore, StateStore,
};
use rpassword::prompt_password;
use std::io::Write as _;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Lab Envanter - laboratory equipment inventory manager
#[derive(Parser)]
#[command(name = "labenvanter")]
#[command(about = "Laboratory equipment inventory manager", long_about = None)]
struct Cli {
    /// Use an in-memory state store (changes are not persisted)
    #[arg(long)]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List devices with optional filters and sorting
    List {
        /// Only devices in this unit
        #[arg(long)]
        unit: Option<String>,

        /// Free-text search across all fields
        #[arg(long)]
        search: Option<String>,

        /// Only devices with this status
        #[arg(long)]
        status: Option<String>,

        /// Only devices with this active flag (Evet/Hayır)
        #[arg(long)]
        active: Option<String>,

        /// Calibration date lower bound (YYYY-MM-DD, inclusive)
        #[arg(long)]
        cal_from: Option<String>,

        /// Calibration date upper bound (YYYY-MM-DD, inclusive)
        #[arg(long)]
        cal_to: Option<String>,

        /// Sort by this column label (e.g. "Durum")
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending instead of ascending
        #[arg(long)]
        desc: bool,
    },

    /// Show one device with its notes and change history
    Show {
        /// Device ID
        id: i64,

        /// Only notes containing this text
        #[arg(long)]
        note_search: Option<String>,
    },

    /// Add a new device
    Add {
        #[arg(long)]
        equipment: String,

        #[arg(long, default_value = "")]
        unit_code: String,

        #[arg(long, default_value = "")]
        unit: String,

        #[arg(long, default_value = "")]
        model: String,

        #[arg(long)]
        serial_no: String,

        /// Calibration date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        calibration_date: Option<String>,

        #[arg(long, default_value_t = 12)]
        period_months: u32,

        #[arg(long, default_value = "")]
        last_calibration: String,

        #[arg(long, default_value = "Çalışıyor")]
        status: String,
    },

    /// Edit one field of a device (requires the admin password)
    Edit {
        /// Device ID
        id: i64,

        /// Column label of the field to change (e.g. "Durum")
        #[arg(long)]
        field: String,

        /// New value
        #[arg(long)]
        value: String,
    },

    /// Archive a device (requires the admin password)
    Archive {
        /// Device ID
        id: i64,
    },

    /// Restore a device from the archive
    Restore {
        /// Device ID
        id: i64,
    },

    /// List archived devices
    Archived,

    /// Manage device notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Import devices from a CSV or JSON file
    Import {
        /// Input file (.csv or .json)
        file: PathBuf,
    },

    /// Export devices to a CSV or JSON file
    Export {
        /// Output file (.csv or .json)
        output: PathBuf,

        /// Export the archive instead of the active list (CSV only)
        #[arg(long)]
        archive: bool,

        /// Only devices in this unit
        #[arg(long)]
        unit: Option<String>,

        /// Free-text search across all fields
        #[arg(long)]
        search: Option<String>,

        /// Only devices with this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Analyze a calibration certificate PDF with AI
    Analyze {
        /// Certificate PDF
        file: PathBuf,
    },

    /// Change or recover the admin password
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },

    /// Show or toggle the display theme preference
    Theme {
        /// Switch between light and dark
        #[arg(long)]
        toggle: bool,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note to a device
    Add {
        /// Device ID
        id: i64,

        /// Note text
        text: String,
    },

    /// Delete a note from a device
    Delete {
        /// Device ID
        id: i64,

        /// Note ID
        note_id: i64,
    },

    /// List a device's notes, newest first
    List {
        /// Device ID
        id: i64,

        /// Only notes containing this text
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
enum PasswordCommands {
    /// Change the admin password (prompts for the current one)
    Change,

    /// Reset the password to the default via the recovery question
    Recover,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();

    if cli.dev {
        run(cli.command, MemoryStore::new()).await
    } else {
        ensure_data_dir()?;
        let store = SqliteStore::open(get_default_state_path())?;
        run(cli.command, store).await
    }
}

async fn run<S: StateStore + Clone>(command: Commands, store: S) -> Result<()> {
    let mut repo = InventoryRepository::load(store.clone())?;
    let mut gate = AuthGate::load(store.clone())?;

    match command {
        Commands::List {
            unit,
            search,
            status,
            active,
            cal_from,
            cal_to,
            sort,
            desc,
        } => {
            let filter = build_filter(unit, search, status, active, cal_from, cal_to)?;
            let sort = sort
                .map(|label| {
                    let field = parse_field(&label)?;
                    Ok::<_, anyhow::Error>(SortState {
                        field,
                        direction: if desc {
                            SortDirection::Descending
                        } else {
                            SortDirection::Ascending
                        },
                    })
                })
                .transpose()?;

            let view = filter_and_sort(repo.devices(), &filter, sort);
            print_device_table(&view);
        }

        Commands::Show { id, note_search } => {
            let device = repo
                .device(id)
                .ok_or_else(|| anyhow!("No device with ID {}", id))?;
            for field in DeviceField::ALL {
                println!("{:<26} {}", field.label(), field.value(device));
            }
            println!("{:<26} {}", "ID", device.id);

            println!("\nNotlar:");
            let notes = filter_notes(repo.notes_for(id), note_search.as_deref().unwrap_or(""));
            if notes.is_empty() {
                println!("  (none)");
            }
            for note in notes.iter().rev() {
                println!("  [{}] {}  {}", note.id, date_prefix(&note.created_at), note.text);
            }

            println!("\nDeğişim Geçmişi:");
            let log = repo.change_log_for(id);
            if log.is_empty() {
                println!("  (none)");
            }
            for entry in log {
                println!(
                    "  {}: {} {} -> {}",
                    date_prefix(&entry.timestamp),
                    entry.field,
                    entry.previous,
                    entry.new
                );
            }
        }

        Commands::Add {
            equipment,
            unit_code,
            unit,
            model,
            serial_no,
            calibration_date,
            period_months,
            last_calibration,
            status,
        } => {
            let draft = DeviceDraft {
                equipment,
                unit_code,
                unit,
                model,
                serial_no,
                calibration_date: calibration_date
                    .unwrap_or_else(|| Utc::now().date_naive().format("%Y-%m-%d").to_string()),
                calibration_period_months: period_months,
                last_calibration,
                status,
            };
            let id = repo.add_device(draft)?;
            println!("Device added with ID {}", id);
        }

        Commands::Edit { id, field, value } => {
            let field = parse_field(&field)?;
            let mut updated = repo
                .device(id)
                .ok_or_else(|| anyhow!("No device with ID {}", id))?
                .clone();
            if !field.set_value(&mut updated, &value) {
                bail!("'{}' is not a valid value for {}", value, field.label());
            }

            let updated = require_admin(&mut gate, updated)?;
            repo.update_device(updated)?;
            println!("Device {} updated", id);
        }

        Commands::Archive { id } => {
            let id = require_admin(&mut gate, id)?;
            if repo.archive_device(id)? {
                println!("Device {} archived", id);
            } else {
                println!("No device with ID {}", id);
            }
        }

        Commands::Restore { id } => {
            if repo.restore_device(id)? {
                println!("Device {} restored", id);
            } else {
                println!("No archived device with ID {}", id);
            }
        }

        Commands::Archived => {
            if repo.archived().is_empty() {
                println!("The archive is empty.");
            }
            for entry in repo.archived() {
                println!(
                    "{:>14}  {:<24} {:<16} archived {}",
                    entry.device.id,
                    entry.device.equipment,
                    entry.device.unit,
                    date_prefix(&entry.archived_at)
                );
            }
        }

        Commands::Note { command } => match command {
            NoteCommands::Add { id, text } => {
                if text.trim().is_empty() {
                    bail!("Note text must not be empty");
                }
                let note_id = repo.add_note(id, text.trim())?;
                println!("Note {} added to device {}", note_id, id);
            }
            NoteCommands::Delete { id, note_id } => {
                if repo.delete_note(id, note_id)? {
                    println!("Note {} deleted", note_id);
                } else {
                    println!("No note {} on device {}", note_id, id);
                }
            }
            NoteCommands::List { id, search } => {
                let notes = filter_notes(repo.notes_for(id), search.as_deref().unwrap_or(""));
                if notes.is_empty() {
                    println!("No notes found.");
                }
                for note in notes.iter().rev() {
                    println!("[{}] {}  {}", note.id, date_prefix(&note.created_at), note.text);
                }
            }
        },

        Commands::Import { file } => {
            let rows = match file.extension().and_then(|e| e.to_str()) {
                Some("json") => import_export::import_from_json(&file)?,
                _ => import_export::import_from_csv(&file)?,
            };
            let drafts: Vec<DeviceDraft> = rows.iter().map(DeviceDraft::from_row).collect();
            let ids = repo.bulk_import(drafts)?;
            println!("{} devices imported", ids.len());
        }

        Commands::Export {
            output,
            archive,
            unit,
            search,
            status,
        } => {
            if archive {
                import_export::export_archive_to_csv(repo.archived(), &output)?;
                println!("{} archived devices exported", repo.archived().len());
            } else {
                let filter = build_filter(unit, search, status, None, None, None)?;
                let view = filter_and_sort(repo.devices(), &filter, None);
                match output.extension().and_then(|e| e.to_str()) {
                    Some("json") => import_export::export_to_json(&view, &output)?,
                    _ => import_export::export_to_csv(&view, &output)?,
                }
                println!("{} devices exported", view.len());
            }
        }

        Commands::Analyze { file } => {
            let analyzer = CertificateAnalyzer::from_env()?;
            let text = pdf_extract::extract_text(&file)
                .map_err(|e| anyhow!("PDF text extraction failed: {}", e))?;
            let result = analyzer.analyze(&text).await?;
            print_analysis(&result);
        }

        Commands::Password { command } => match command {
            PasswordCommands::Change => {
                let current = prompt_password("Current password: ")?;
                let new_secret = prompt_password("New password: ")?;
                if gate.change_secret(&current, &new_secret)? {
                    println!("Password changed.");
                } else {
                    println!("The current password is wrong.");
                }
            }
            PasswordCommands::Recover => {
                print!("Recovery question - favourite place: ");
                std::io::stdout().flush()?;
                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                if gate.recover(answer.trim())? {
                    println!("Password reset to the default.");
                } else {
                    println!("The recovery answer is wrong.");
                }
            }
        },

        Commands::Theme { toggle } => {
            let mut theme = load_theme(&store)?;
            if toggle {
                theme = theme.toggled();
                save_theme(&store, theme)?;
            }
            println!("{}", theme.as_str());
        }
    }

    Ok(())
}

fn build_filter(
    unit: Option<String>,
    search: Option<String>,
    status: Option<String>,
    active: Option<String>,
    cal_from: Option<String>,
    cal_to: Option<String>,
) -> Result<DeviceFilter> {
    let active = active
        .map(|raw| ActiveFlag::parse(&raw).ok_or_else(|| anyhow!("--active must be Evet or Hayır")))
        .transpose()?;
    let calibration_from = cal_from
        .map(|raw| parse_date(&raw).ok_or_else(|| anyhow!("--cal-from must be YYYY-MM-DD")))
        .transpose()?;
    let calibration_to = cal_to
        .map(|raw| parse_date(&raw).ok_or_else(|| anyhow!("--cal-to must be YYYY-MM-DD")))
        .transpose()?;

    Ok(DeviceFilter {
        unit,
        search,
        status,
        active,
        calibration_from,
        calibration_to,
    })
}

fn parse_field(label: &str) -> Result<DeviceField> {
    DeviceField::parse_label(label).ok_or_else(|| {
        let labels: Vec<&str> = DeviceField::ALL.iter().map(|f| f.label()).collect();
        anyhow!("Unknown column '{}'. Columns: {}", label, labels.join(", "))
    })
}

/// Run the interactive side of the authorization gate: pass the action
/// through if the session is authorized, otherwise prompt until the right
/// password is entered.
fn require_admin<S: StateStore, A>(gate: &mut AuthGate<S>, action: A) -> Result<A> {
    let mut challenge = match gate.authorize(action) {
        Authorization::Granted(action) => return Ok(action),
        Authorization::ChallengeRequired(challenge) => challenge,
    };
    loop {
        let credential = prompt_password("Admin password: ")?;
        match gate.resolve(challenge, &credential) {
            Resolution::Approved(action) => return Ok(action),
            Resolution::Denied(denied) => {
                eprintln!("Wrong password, try again.");
                challenge = denied;
            }
        }
    }
}

/// Calendar-day part of a stored timestamp, for compact listings.
fn date_prefix(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

fn print_device_table(devices: &[&Device]) {
    if devices.is_empty() {
        println!("No devices match.");
        return;
    }

    let today = Utc::now().date_naive();
    println!(
        "{:>14}  {:<24} {:<16} {:<18} {:<12} {:<20}",
        "ID", "Ekipman", "Birim", "Seri No", "Kal. Tarihi", "Durum"
    );
    for device in devices {
        let marker = match calibration_status(&device.calibration_date, today) {
            CalibrationStatus::Overdue => " !",
            CalibrationStatus::DueSoon => " ~",
            CalibrationStatus::Normal => "",
        };
        println!(
            "{:>14}  {:<24} {:<16} {:<18} {:<12} {:<20}{}",
            device.id,
            device.equipment,
            device.unit,
            device.serial_no,
            device.calibration_date,
            device.status,
            marker
        );
    }
}

fn print_analysis(result: &CertificateAnalysisResult) {
    let status = match result.calibration_results.status {
        CertificateStatus::Pass => "PASS",
        CertificateStatus::Fail => "FAIL",
        CertificateStatus::Indeterminate => "INDETERMINATE",
    };

    println!("Summary: {}", result.summary);
    println!();
    println!("Device");
    println!("  Serial no:      {}", result.device_info.serial_number);
    println!("  Model:          {}", result.device_info.model);
    println!("  Equipment type: {}", result.device_info.equipment_type);
    println!();
    println!("Calibration: {}", status);
    for measurement in &result.calibration_results.key_measurements {
        println!("  - {}", measurement);
    }
    println!("Reasoning: {}", result.calibration_results.reasoning);
}

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clefs::domain::{BorrowerInput, BuildingInput, KeyInput, RoomInput};
use clefs::reports::{self, documents, html};
use clefs::services::{DeleteTarget, availability, guards, loan_service};
use clefs::{AppState, Store, backup, config, import, seed};

#[derive(Parser)]
#[command(name = "clefs", version, about = "Gestion d'un inventaire de clés")]
struct Cli {
    /// Database file (default: CLEFS_DB_PATH, then clefs.db beside the binary)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Where generated documents are written
    #[arg(long, global = true)]
    documents: Option<PathBuf>,

    /// Print listings as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Buildings
    #[command(subcommand)]
    Building(BuildingCmd),
    /// Rooms
    #[command(subcommand)]
    Room(RoomCmd),
    /// Keys and their room associations
    #[command(subcommand)]
    Key(KeyCmd),
    /// Borrowers
    #[command(subcommand)]
    Borrower(BorrowerCmd),
    /// Lend and return keys
    #[command(subcommand)]
    Loan(LoanCmd),
    /// Stock figures of every key
    Availability {
        /// Only keys that can be lent right now
        #[arg(long)]
        only_available: bool,
    },
    /// Copy the database into backups/ (or to --output)
    Backup {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the database with a backup
    Restore { path: PathBuf },
    /// Delete every row, after taking a backup
    Reset {
        #[arg(long)]
        yes: bool,
        /// Must be RESET
        #[arg(long)]
        confirm: Option<String>,
    },
    /// List backups, newest first
    Backups,
    /// Remove a backup file (absolute path inside backups/)
    DeleteBackup { path: PathBuf },
    /// Fill the database with demo data
    Seed,
    /// Merge a database from an older version
    ImportLegacy { path: PathBuf },
    /// Generate an HTML document under the documents directory
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
        /// Loan id (loan-receipt) or borrower id (borrower-receipt)
        #[arg(long)]
        id: Option<i32>,
    },
}

#[derive(Subcommand)]
enum BuildingCmd {
    List,
    Add { name: String },
    Edit { id: i32, name: String },
    Rm { id: i32 },
}

#[derive(Args)]
struct RoomArgs {
    name: String,
    #[arg(long = "type")]
    room_type: Option<String>,
    #[arg(long)]
    building: i32,
}

#[derive(Subcommand)]
enum RoomCmd {
    List {
        #[arg(long)]
        building: Option<i32>,
    },
    Add(RoomArgs),
    Edit {
        id: i32,
        #[command(flatten)]
        room: RoomArgs,
    },
    Rm { id: i32 },
    /// Keys opening a room
    Keys { id: i32 },
}

#[derive(Args)]
struct KeyArgs {
    number: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, default_value_t = 1)]
    total: i32,
    #[arg(long, default_value_t = 0)]
    reserve: i32,
    #[arg(long)]
    storage: Option<String>,
    /// Room id, repeatable
    #[arg(long = "room")]
    rooms: Vec<i32>,
}

impl KeyArgs {
    fn into_input(self) -> (KeyInput, Vec<i32>) {
        (
            KeyInput {
                number: self.number,
                description: self.description,
                quantity_total: self.total,
                quantity_reserve: self.reserve,
                storage_location: self.storage,
            },
            self.rooms,
        )
    }
}

#[derive(Subcommand)]
enum KeyCmd {
    List,
    Show { id: i32 },
    Add(KeyArgs),
    Edit {
        id: i32,
        #[command(flatten)]
        key: KeyArgs,
    },
    Rm { id: i32 },
}

#[derive(Subcommand)]
enum BorrowerCmd {
    List,
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    Edit {
        id: i32,
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    Rm { id: i32 },
}

#[derive(Subcommand)]
enum LoanCmd {
    /// Active loans
    List {
        #[arg(long)]
        key: Option<i32>,
        #[arg(long)]
        borrower: Option<i32>,
    },
    /// Lend one or more keys to a borrower (all or nothing)
    Lend {
        #[arg(long)]
        borrower: i32,
        #[arg(required = true)]
        keys: Vec<i32>,
    },
    Return { id: i32 },
    Show { id: i32 },
    /// Every loan, returned ones included
    History,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    KeyPlan,
    Loans,
    Borrowers,
    Stock,
    LoanReceipt,
    BorrowerReceipt,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn now() -> String {
    chrono::Local::now()
        .format(loan_service::DATE_FORMAT)
        .to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clefs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = config::Config::from_env();
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }
    if let Some(dir) = cli.documents.clone() {
        config.documents_dir = dir;
    }

    let mut store = Store::open_at(&config.db_path)
        .await
        .with_context(|| format!("ouverture de {}", config.db_path.display()))?;

    let result = run(cli, &config, &mut store).await;
    store.close().await?;
    result
}

async fn run(cli: Cli, config: &config::Config, store: &mut Store) -> anyhow::Result<()> {
    let json = cli.json;

    match cli.command {
        Command::Building(cmd) => building(cmd, &state(store)?, json).await,
        Command::Room(cmd) => room(cmd, &state(store)?, json).await,
        Command::Key(cmd) => key(cmd, &state(store)?, json).await,
        Command::Borrower(cmd) => borrower(cmd, &state(store)?, json).await,
        Command::Loan(cmd) => loan(cmd, &state(store)?, json).await,
        Command::Availability { only_available } => {
            let mut keys = availability::keys_with_availability(store.conn()?).await?;
            if only_available {
                keys.retain(|k| k.is_borrowable());
            }
            if json {
                return print_json(&keys);
            }
            for k in keys {
                println!(
                    "{:<8} total {:>2}  réserve {:>2}  sorties {:>2}  disponibles {:>2}  {}",
                    k.key.number,
                    k.key.quantity_total,
                    k.key.quantity_reserve,
                    k.loaned_count,
                    k.available_count,
                    k.borrower_names.join(", ")
                );
            }
            Ok(())
        }
        Command::Backup { output } => {
            let dest = match output {
                Some(path) => path,
                None => {
                    backup::create_backup_directory(store.path())?;
                    backup::default_backup_path(store.path())
                }
            };
            backup::backup_database(store.path(), &dest)?;
            println!("Sauvegarde créée : {}", dest.display());
            Ok(())
        }
        Command::Restore { path } => {
            let safety = backup::restore_database(store, &path).await?;
            println!("Base restaurée depuis {}", path.display());
            if let Some(safety) = safety {
                println!("Ancienne base conservée : {}", safety.display());
            }
            Ok(())
        }
        Command::Reset { yes, confirm } => {
            if !yes || confirm.as_deref() != Some("RESET") {
                bail!(
                    "réinitialisation refusée : passez --yes et --confirm RESET pour supprimer toutes les données"
                );
            }
            let saved = backup::reset_database(store).await?;
            println!("Base réinitialisée. Sauvegarde : {}", saved.display());
            Ok(())
        }
        Command::Backups => {
            let backups = backup::list_backups(store.path())?;
            if json {
                return print_json(&backups);
            }
            if backups.is_empty() {
                println!("Aucune sauvegarde");
            }
            for b in backups {
                println!(
                    "{}  {:>10}  {}",
                    b.modified.format("%d/%m/%Y %H:%M:%S"),
                    b.size_str,
                    b.path.display()
                );
            }
            Ok(())
        }
        Command::DeleteBackup { path } => {
            backup::delete_backup(&path)?;
            println!("Sauvegarde supprimée : {}", path.display());
            Ok(())
        }
        Command::Seed => {
            seed::seed_demo_data(store.conn()?).await?;
            println!("Données de démonstration créées");
            Ok(())
        }
        Command::ImportLegacy { path } => {
            let summary = import::import_legacy_database(store, &path).await?;
            if json {
                return print_json(&summary);
            }
            println!("Importation réussie (sauvegarde : {})", summary.backup_path.display());
            for (label, count) in [
                ("bâtiments", summary.buildings),
                ("salles", summary.rooms),
                ("clés", summary.keys),
                ("associations clé-salle", summary.associations),
                ("emprunteurs", summary.borrowers),
                ("emprunts", summary.loans),
            ] {
                println!("  - {} {} ({} lus)", count.inserted, label, count.read);
            }
            Ok(())
        }
        Command::Report { kind, id } => report(kind, id, config, &state(store)?).await,
    }
}

fn state(store: &Store) -> anyhow::Result<AppState> {
    Ok(AppState::new(store.conn()?.clone()))
}

async fn building(cmd: BuildingCmd, state: &AppState, json: bool) -> anyhow::Result<()> {
    let repo = &state.building_repo;
    match cmd {
        BuildingCmd::List => {
            let buildings = repo.find_all().await?;
            if json {
                return print_json(&buildings);
            }
            for b in buildings {
                println!("{:>4}  {}", b.id, b.name);
            }
        }
        BuildingCmd::Add { name } => {
            let b = repo.create(BuildingInput { name }).await?;
            println!("Bâtiment #{} créé", b.id);
        }
        BuildingCmd::Edit { id, name } => {
            repo.update(id, BuildingInput { name }).await?;
            println!("Bâtiment #{id} modifié");
        }
        BuildingCmd::Rm { id } => {
            guards::delete_checked(state, DeleteTarget::Building(id)).await?;
            println!("Bâtiment #{id} supprimé");
        }
    }
    Ok(())
}

async fn room(cmd: RoomCmd, state: &AppState, json: bool) -> anyhow::Result<()> {
    let repo = &state.room_repo;
    match cmd {
        RoomCmd::List { building } => {
            let rooms = match building {
                Some(id) => repo.find_by_building(id).await?,
                None => repo.find_all().await?,
            };
            if json {
                return print_json(&rooms);
            }
            for r in rooms {
                println!(
                    "{:>4}  {:<24} {:<20} bâtiment #{}",
                    r.id,
                    r.name,
                    r.r#type.as_deref().unwrap_or("-"),
                    r.building_id
                );
            }
        }
        RoomCmd::Add(args) => {
            let r = repo
                .create(RoomInput {
                    name: args.name,
                    room_type: args.room_type,
                    building_id: args.building,
                })
                .await?;
            println!("Salle #{} créée", r.id);
        }
        RoomCmd::Edit { id, room } => {
            repo.update(
                id,
                RoomInput {
                    name: room.name,
                    room_type: room.room_type,
                    building_id: room.building,
                },
            )
            .await?;
            println!("Salle #{id} modifiée");
        }
        RoomCmd::Rm { id } => {
            guards::delete_checked(state, DeleteTarget::Room(id)).await?;
            println!("Salle #{id} supprimée");
        }
        RoomCmd::Keys { id } => {
            let keys = repo.keys_for_room(id).await?;
            if json {
                return print_json(&keys);
            }
            for k in keys {
                println!("{:>4}  {}", k.id, k.number);
            }
        }
    }
    Ok(())
}

async fn key(cmd: KeyCmd, state: &AppState, json: bool) -> anyhow::Result<()> {
    let repo = &state.key_repo;
    match cmd {
        KeyCmd::List => {
            let keys = repo.find_all().await?;
            if json {
                return print_json(&keys);
            }
            for k in keys {
                println!(
                    "{:>4}  {:<8} {:<32} {}/{}",
                    k.id,
                    k.number,
                    k.description.as_deref().unwrap_or(""),
                    k.quantity_total,
                    k.quantity_reserve
                );
            }
        }
        KeyCmd::Show { id } => {
            let k = repo
                .find_by_id(id)
                .await?
                .with_context(|| format!("clé {id} introuvable"))?;
            let rooms = repo.rooms_for_key(id).await?;
            let available = availability::available_count(state.db(), id).await?;
            if json {
                return print_json(&serde_json::json!({
                    "key": k,
                    "rooms": rooms,
                    "available_count": available,
                }));
            }
            println!("Clé {} : {}", k.number, k.description.as_deref().unwrap_or(""));
            println!(
                "  total {}, réserve {}, disponibles {}",
                k.quantity_total, k.quantity_reserve, available
            );
            if let Some(location) = &k.storage_location {
                println!("  rangement : {location}");
            }
            for r in rooms {
                println!("  ouvre : {} (#{})", r.name, r.id);
            }
        }
        KeyCmd::Add(args) => {
            let (input, rooms) = args.into_input();
            let k = repo.create(input, rooms).await?;
            println!("Clé #{} créée", k.id);
        }
        KeyCmd::Edit { id, key } => {
            let (input, rooms) = key.into_input();
            repo.update(id, input, rooms).await?;
            println!("Clé #{id} modifiée");
        }
        KeyCmd::Rm { id } => {
            guards::delete_checked(state, DeleteTarget::Key(id)).await?;
            println!("Clé #{id} supprimée");
        }
    }
    Ok(())
}

async fn borrower(cmd: BorrowerCmd, state: &AppState, json: bool) -> anyhow::Result<()> {
    let repo = &state.borrower_repo;
    match cmd {
        BorrowerCmd::List => {
            let borrowers = repo.find_all().await?;
            if json {
                return print_json(&borrowers);
            }
            for b in borrowers {
                println!("{:>4}  {:<24} {}", b.id, b.name, b.email.as_deref().unwrap_or(""));
            }
        }
        BorrowerCmd::Add { name, email } => {
            let b = repo.create(BorrowerInput { name, email }).await?;
            println!("Emprunteur #{} créé", b.id);
        }
        BorrowerCmd::Edit { id, name, email } => {
            repo.update(id, BorrowerInput { name, email }).await?;
            println!("Emprunteur #{id} modifié");
        }
        BorrowerCmd::Rm { id } => {
            guards::delete_checked(state, DeleteTarget::Borrower(id)).await?;
            println!("Emprunteur #{id} supprimé");
        }
    }
    Ok(())
}

async fn loan(cmd: LoanCmd, state: &AppState, json: bool) -> anyhow::Result<()> {
    let db = state.db();
    match cmd {
        LoanCmd::List { key, borrower } => {
            let loans = match (key, borrower) {
                (Some(key_id), _) => loan_service::active_loans_for_key(db, key_id).await?,
                (None, Some(borrower_id)) => {
                    loan_service::active_loans_for_borrower(db, borrower_id).await?
                }
                (None, None) => loan_service::list_active_loans(db).await?,
            };
            if json {
                return print_json(&loans);
            }
            for l in loans {
                println!(
                    "{:>4}  {:<8} {:<24} {}",
                    l.id, l.key_number, l.borrower_name, l.loan_date
                );
            }
        }
        LoanCmd::Lend { borrower, keys } => {
            if state.borrower_repo.find_by_id(borrower).await?.is_none() {
                bail!("emprunteur {borrower} introuvable");
            }
            let created = if let [key_id] = keys[..] {
                if !availability::is_borrowable(db, key_id).await? {
                    bail!("la clé {key_id} n'est pas disponible");
                }
                vec![loan_service::create_loan(db, key_id, borrower).await?]
            } else {
                loan_service::create_multiple_loans(db, &keys, borrower).await?
            };
            for l in created {
                println!("Emprunt #{} : clé {}", l.id, l.key_id);
            }
        }
        LoanCmd::Return { id } => {
            loan_service::return_loan(db, id).await?;
            println!("Emprunt #{id} retourné");
        }
        LoanCmd::Show { id } => {
            let l = loan_service::get_loan(db, id).await?;
            if json {
                return print_json(&l);
            }
            println!("Emprunt #{} : clé {} -> {}", l.id, l.key_number, l.borrower_name);
            println!("  emprunté le {}", l.loan_date);
            match &l.return_date {
                Some(date) => println!("  retourné le {date}"),
                None => println!("  en cours"),
            }
        }
        LoanCmd::History => {
            let loans = loan_service::list_all_loans(db).await?;
            if json {
                return print_json(&loans);
            }
            for l in loans {
                println!(
                    "{:>4}  {:<8} {:<24} {}  {}",
                    l.id,
                    l.key_number,
                    l.borrower_name,
                    l.loan_date,
                    l.return_date.as_deref().unwrap_or("en cours")
                );
            }
        }
    }
    Ok(())
}

async fn report(
    kind: ReportKind,
    id: Option<i32>,
    config: &config::Config,
    state: &AppState,
) -> anyhow::Result<()> {
    let db = state.db();
    let generated_at = now();

    let (prefix, id, page) = match kind {
        ReportKind::KeyPlan => {
            let plan = reports::key_plan(db).await?;
            ("plan_cles", None, html::render_key_plan(&plan, &generated_at))
        }
        ReportKind::Loans => {
            let loans = loan_service::list_active_loans(db).await?;
            ("rapport_emprunts", None, html::render_loans_report(&loans, &generated_at))
        }
        ReportKind::Borrowers => {
            let groups = reports::loans_by_borrower(db).await?;
            (
                "rapport_emprunteurs",
                None,
                html::render_borrower_report(&groups, &generated_at),
            )
        }
        ReportKind::Stock => {
            let keys = reports::stock_report(db).await?;
            ("etat_stock", None, html::render_stock_report(&keys, &generated_at))
        }
        ReportKind::LoanReceipt => {
            let loan_id = id.context("--id <emprunt> est requis")?;
            let loan = loan_service::get_loan(db, loan_id).await?;
            ("bon_emprunt", Some(loan_id), html::render_loan_receipt(&loan))
        }
        ReportKind::BorrowerReceipt => {
            let borrower_id = id.context("--id <emprunteur> est requis")?;
            let borrower = state
                .borrower_repo
                .find_by_id(borrower_id)
                .await?
                .with_context(|| format!("emprunteur {borrower_id} introuvable"))?;
            let loans = loan_service::active_loans_for_borrower(db, borrower_id).await?;
            (
                "bon_emprunteur",
                Some(borrower_id),
                html::render_borrower_receipt(&borrower, &loans, &generated_at),
            )
        }
    };

    let filename = documents::generate_filename(prefix, id, "html");
    let path = documents::save_document(&config.documents_dir, &filename, &page)?;
    println!("{}", path.display());
    Ok(())
}

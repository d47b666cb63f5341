use anyhow::Context;
use clap::{Parser, Subcommand};
use kunjungan::{Config, Month, Operator, Period, StateStore, export_visits};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kunjungan")]
#[command(version, about = "Monitoring kunjungan toko Alfamidi")]
struct Cli {
    /// State file (defaults to the config value, then data_kunjungan.json)
    #[arg(long, global = true, value_name = "PATH")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the operator and the outlet list with current selection
    Show,
    /// Set the operator fields; omitted fields keep their stored value
    Operator {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        nik: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Add an outlet to the catalog
    AddOutlet { name: String },
    /// Select exactly these outlets (none clears the selection)
    Select { names: Vec<String> },
    /// Tick one outlet
    Check { name: String },
    /// Untick one outlet
    Uncheck { name: String },
    /// Write the selected outlets into a copy of the monthly template
    Export {
        #[arg(long, short = 't', value_name = "FILE")]
        template: PathBuf,
        /// Month name (Januari..Desember) or number, default: current month
        #[arg(long, short = 'm')]
        month: Option<Month>,
        /// Year, default: current year
        #[arg(long, short = 'y', value_parser = clap::value_parser!(u16).range(2020..=2100))]
        year: Option<u16>,
        #[arg(long, short = 'o', value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let state_path = cli.state.unwrap_or_else(|| config.state_file());
    let mut store = StateStore::open(&state_path)?;

    match cli.command {
        Command::Show => show(&store),
        Command::Operator { name, nik, role } => {
            let current = store.state().operator.clone();
            store.set_operator(Operator {
                name: name.unwrap_or(current.name),
                id_number: nik.unwrap_or(current.id_number),
                role: role.unwrap_or(current.role),
            })?;
            show(&store);
        }
        Command::AddOutlet { name } => {
            if store.add_outlet(&name)? {
                println!("Toko '{name}' ditambahkan!");
            } else {
                println!("Toko '{name}' tidak ditambahkan (kosong atau sudah ada).");
            }
        }
        Command::Select { names } => {
            store.select(&names)?;
            show(&store);
        }
        Command::Check { name } => {
            if !store.check(&name)? {
                log::warn!("Outlet `{name}` is not in the list");
            }
            show(&store);
        }
        Command::Uncheck { name } => {
            if !store.uncheck(&name)? {
                log::warn!("Outlet `{name}` was not selected");
            }
            show(&store);
        }
        Command::Export {
            template,
            month,
            year,
            out_dir,
        } => {
            let now = Period::current();
            let period = Period::new(
                month.unwrap_or(now.month),
                i64::from(year.unwrap_or(now.year)),
            )?;
            let upload = fs::read(&template)
                .with_context(|| format!("Failed to read template {}", template.display()))?;

            let export = export_visits(&upload, store.state(), &period)?;

            let out_dir = out_dir.unwrap_or_else(|| config.output_dir());
            fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create directory {}", out_dir.display()))?;
            let out_path = out_dir.join(&export.file_name);
            fs::write(&out_path, &export.bytes)
                .with_context(|| format!("Failed to write {}", out_path.display()))?;

            let header = if export.summary.header_written {
                "Header ditulis di baris 4."
            } else {
                "Header sudah ada, dilewati."
            };
            println!(
                "Berhasil! {header} {} toko ditambahkan. Tabel penuh garis.",
                export.summary.rows_written
            );
            println!("{}", out_path.display());
        }
    }
    Ok(())
}

fn show(store: &StateStore) {
    let state = store.state();
    let op = &state.operator;
    println!("Nama Petugas : {}", op.name);
    println!("NIK          : {}", op.id_number);
    println!("Jabatan      : {}", op.role);
    println!();
    for outlet in &state.outlets {
        let mark = if state.is_selected(outlet) { 'x' } else { ' ' };
        println!("[{mark}] {outlet}");
    }
    println!();
    println!("{} dari {} toko dipilih", state.selected.len(), state.outlets.len());
}

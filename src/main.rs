use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use gym_access::{
    Kiosk, KioskConfig, Member, MessageDisplay, Outcome, Payment, RecordStore, Severity, SoundCue,
    SqliteStore, SystemClock,
};

const USAGE: &str = "usage: gym-access [--config <file.json>] <import <file.json> | check <dni> | preview <dni> | entries>";

/// Seed file for `import`
#[derive(Debug, Deserialize)]
struct ImportFile {
    #[serde(default)]
    usuarios: Vec<Member>,
    #[serde(default)]
    pagos: Vec<Payment>,
}

/// Prints kiosk messages to the terminal
struct ConsoleDisplay;

impl MessageDisplay for ConsoleDisplay {
    fn show(&mut self, text: &str, severity: Severity) {
        let marker = match severity {
            Severity::Success => "✅",
            Severity::Warning => "⚠️ ",
            Severity::Error => "❌",
        };
        println!("{} {}", marker, text);
    }
}

/// Describes the beep pattern instead of playing it
struct ConsoleSound;

impl SoundCue for ConsoleSound {
    fn play(&mut self, severity: Severity) {
        let tones = severity.tones();
        println!("🔊 {} ({} tono/s)", severity.as_str(), tones.len());
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            bail!("{}", USAGE);
        }
        config_path = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }

    let config = KioskConfig::load_or_default(config_path.as_deref())?;

    match (args.first().map(String::as_str), args.get(1)) {
        (Some("import"), Some(file)) => run_import(&config, Path::new(file)),
        (Some("check"), Some(dni)) => run_check(&config, dni),
        (Some("preview"), Some(dni)) => run_preview(&config, dni),
        (Some("entries"), None) => run_entries(&config),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn open_store(config: &KioskConfig) -> Result<RecordStore<SqliteStore>> {
    Ok(RecordStore::new(SqliteStore::open(&config.database_path)?))
}

fn run_import(config: &KioskConfig, file: &Path) -> Result<()> {
    println!("📂 Loading {}...", file.display());
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {:?}", file))?;
    let seed: ImportFile = serde_json::from_str(&content).context("Failed to parse import JSON")?;

    let mut store = open_store(config)?;
    store.save_members(&seed.usuarios)?;
    store.save_payments(&seed.pagos)?;

    println!("✓ Imported {} members", seed.usuarios.len());
    println!("✓ Imported {} payments", seed.pagos.len());
    println!("✓ Store: {}", config.database_path.display());

    Ok(())
}

fn run_check(config: &KioskConfig, dni: &str) -> Result<()> {
    let mut kiosk = Kiosk::new(open_store(config)?, config.policy.clone(), SystemClock)
        .with_display(ConsoleDisplay)
        .with_sound(ConsoleSound);

    println!("⏳ Verificando...");
    let result = kiosk.submit(dni)?;
    println!("[{}]", result.badge);

    if let Some(entry) = &result.entry {
        println!("📝 Ingreso #{} registrado ({})", entry.id, entry.fecha);
    }

    if !result.outcome.is_allowed() {
        std::process::exit(match result.outcome {
            Outcome::ValidationError(_) => 2,
            _ => 1,
        });
    }

    Ok(())
}

fn run_preview(config: &KioskConfig, dni: &str) -> Result<()> {
    let kiosk = Kiosk::new(open_store(config)?, config.policy.clone(), SystemClock);

    match kiosk.preview(dni)? {
        Some(preview) => println!("👀 {}: {}", preview.member_name, preview),
        None => println!("sin vista previa"),
    }

    Ok(())
}

fn run_entries(config: &KioskConfig) -> Result<()> {
    let store = open_store(config)?;
    let entries = store.load_entries()?;

    println!("📊 {} ingresos", entries.len());
    for entry in entries {
        println!("  #{:<6} socio {:<8} {}", entry.id, entry.usuario_id, entry.fecha);
    }

    Ok(())
}

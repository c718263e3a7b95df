use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::info;
use vche_demo::config::{DemoConfig, SchemeKind};
use vche_demo::session::Session;

#[derive(Parser)]
#[command(name = "vche-demo", about = "Verifiable homomorphic inner product, client and server in one process")]
struct Cli {
    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verification scheme: replicated, polynomial or outsourced
    #[arg(long)]
    scheme: Option<SchemeKind>,

    /// Physical slots per plaintext (power of two)
    #[arg(long)]
    slots: Option<usize>,

    /// Plaintext modulus (prime)
    #[arg(long)]
    modulus: Option<u64>,

    /// Replicas per logical slot (1 for the outsourced scheme)
    #[arg(long)]
    replications: Option<usize>,

    /// Use the closed-form PRF with compressed verification plaintexts
    #[arg(long)]
    closed_form: bool,

    /// Length of the input vectors
    #[arg(long)]
    length: Option<usize>,

    /// Seed for keys and inputs
    #[arg(long)]
    seed: Option<u64>,

    /// Make the server corrupt one coefficient of its result
    #[arg(long)]
    tamper: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };
    if let Some(scheme) = cli.scheme {
        config.scheme = scheme;
    }
    if let Some(slots) = cli.slots {
        config.slots = slots;
    }
    if let Some(modulus) = cli.modulus {
        config.modulus = modulus;
    }
    if let Some(replications) = cli.replications {
        config.replications = replications;
    }
    if let Some(length) = cli.length {
        config.length = length;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.closed_form |= cli.closed_form;
    info!("config: {config:?}");

    let outcome = Session::run(&config, cli.tamper)?;
    println!("{outcome}");
    if !outcome.accepted() {
        process::exit(1);
    }
    Ok(())
}

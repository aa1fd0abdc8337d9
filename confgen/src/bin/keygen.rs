//! Development identity key generator
//!
//! Prints `--num` Ed25519 key pairs, one per line, in the labelled form
//! `pub:<hex> sec:<hex>` that replica-confgen reads from its identity key
//! generator.

use anyhow::{ensure, Result};
use clap::Parser;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::io::{self, Write};

#[derive(Parser)]
#[command(name = "replica-keygen", version, about = "Generate replica identity key pairs")]
struct Args {
    /// Number of key pairs to print
    #[arg(long, default_value_t = 1)]
    num: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    ensure!(args.num > 0, "--num must be at least 1");

    let mut csprng = OsRng;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for _ in 0..args.num {
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();

        writeln!(
            out,
            "pub:{} sec:{}",
            hex::encode(verifying_key.to_bytes()),
            hex::encode(signing_key.to_bytes())
        )?;
    }

    eprintln!("Generated {} identity key pairs", args.num);
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use zkp_credential_membership::artifacts::{
    CircuitArtifacts, PROVING_KEY_FILE, VERIFICATION_KEY_FILE,
};
use zkp_credential_membership::circuit::generate_parameters;
use zkp_credential_membership::{field, TREE_DEPTH};

/// One-time circuit-specific trusted setup.
///
/// Generates the Groth16 proving and verification keys for the membership
/// circuit and writes them where the prover and verifier load them from.
/// Anyone holding the randomness used here could forge proofs, so production
/// keys belong to a proper multi-party ceremony; this tool covers
/// development and testing.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "./circuits")]
    circuits_path: PathBuf,

    #[arg(long, default_value = "credential_membership")]
    circuit_name: String,

    /// Overwrite existing artifacts.
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    field::init().context("Poseidon parameter initialization failed")?;

    let dir = args.circuits_path.join(&args.circuit_name);
    if dir.join(PROVING_KEY_FILE).exists() && !args.force {
        return Err(anyhow::anyhow!(
            "artifacts already exist in {} (use --force to regenerate; doing so invalidates every proof made with the old keys)",
            dir.display()
        ));
    }

    println!(
        "Generating Groth16 parameters for the depth-{TREE_DEPTH} membership circuit (this may take a while)..."
    );
    let mut rng = rand::thread_rng();
    let proving_key = generate_parameters(&mut rng).context("parameter generation failed")?;

    let artifacts = CircuitArtifacts::from_parts(&args.circuit_name, proving_key);
    artifacts
        .write_artifacts(&dir)
        .context("failed to write circuit artifacts")?;

    println!("Wrote {}", dir.join(PROVING_KEY_FILE).display());
    println!("Wrote {}", dir.join(VERIFICATION_KEY_FILE).display());
    println!("Circuit '{}' is ready.", args.circuit_name);

    Ok(())
}

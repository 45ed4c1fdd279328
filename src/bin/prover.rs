use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use zkp_credential_membership::artifacts::CircuitArtifacts;
use zkp_credential_membership::codec;
use zkp_credential_membership::config::Config;
use zkp_credential_membership::prover::{nullifier, ZkProver};
use zkp_credential_membership::sets::SetManager;

/// Build a credential set from a file and prove membership of one credential.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One credential per line.
    #[arg(short = 'f', long)]
    credentials_file: PathBuf,

    /// The credential to prove membership of.
    #[arg(short, long)]
    credential: String,

    /// Name recorded on the created set.
    #[arg(long, default_value = "cli")]
    set_name: String,

    #[arg(short, long, default_value = "proof.json")]
    output: PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

const MAX_CREDENTIALS_FILE_SIZE: u64 = 10 * 1024 * 1024;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    println!("Loading credentials from: {}", args.credentials_file.display());

    let metadata = fs::metadata(&args.credentials_file)
        .context("Failed to read credentials file metadata")?;
    if metadata.len() > MAX_CREDENTIALS_FILE_SIZE {
        return Err(anyhow::anyhow!(
            "Credentials file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_CREDENTIALS_FILE_SIZE
        ));
    }

    let content =
        fs::read_to_string(&args.credentials_file).context("Failed to read credentials file")?;
    let credentials: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .collect();

    if credentials.is_empty() {
        return Err(anyhow::anyhow!(
            "No credentials found in '{}'",
            args.credentials_file.display()
        ));
    }
    println!("Loaded {} credentials", credentials.len());

    let manager = SetManager::new(config.sets.max_credentials_per_set);
    let set = manager
        .create(&args.set_name, credentials, None, None)
        .context("Failed to create credential set")?;
    println!("Credential set: {}", set.id);
    println!("Merkle root: {}", set.merkle_root);

    println!("Generating Merkle witness...");
    let witness = manager
        .generate_witness(set.id, &args.credential)
        .context("Failed to generate witness")?;

    println!("Loading circuit artifacts...");
    let artifacts =
        Arc::new(CircuitArtifacts::init(&config).context("Failed to load circuit artifacts")?);

    println!("Generating ZK proof (this may take a while)...");
    let prover = ZkProver::new(artifacts, &config)?;
    let proof = prover
        .generate(set.id, &witness, &args.credential)
        .context("Failed to generate proof")?;

    let json = codec::serialize(&proof).context("Failed to serialize proof")?;
    let pretty: serde_json::Value = serde_json::from_str(&json)?;
    fs::write(&args.output, serde_json::to_string_pretty(&pretty)?)
        .context("Failed to write proof file")?;

    let tag = nullifier(&args.credential, None);

    println!("Proof successfully generated and saved!");
    println!("  Proof file: {}", args.output.display());
    println!("  Proof id:   {}", proof.metadata.proof_id);
    println!("  Expires:    {}", proof.metadata.expires_at);
    println!("  Nullifier:  {}", tag.value);
    println!("  (nullifier secret, keep private: {})", hex::encode(&tag.secret));
    println!();
    println!(
        "Register the trusted root with the verifier:\n  {} {}",
        set.id, set.merkle_root
    );

    Ok(())
}

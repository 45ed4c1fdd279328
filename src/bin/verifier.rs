use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use zkp_credential_membership::artifacts::CircuitArtifacts;
use zkp_credential_membership::codec::{self, ProofEnvelope};
use zkp_credential_membership::config::Config;
use zkp_credential_membership::registry::{TrustedRootEntry, TrustedRootRegistry};
use zkp_credential_membership::verifier::ProofVerifier;

/// Verify a membership proof against a list of trusted roots.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Proof JSON in the canonical wire form.
    #[arg(short, long)]
    proof_file: PathBuf,

    /// Trusted roots, one `<credential-set-uuid> <hex64-root>` pair per line.
    #[arg(short, long)]
    trusted_roots: PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the seen-proof replay ledger.
    #[arg(long)]
    allow_replay: bool,
}

/// Proof files above this size indicate corruption, not a real proof.
const MAX_PROOF_FILE_SIZE: u64 = 1024 * 1024;

fn load_registry(path: &Path) -> Result<TrustedRootRegistry> {
    let registry = TrustedRootRegistry::new();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trusted roots file: {}", path.display()))?;

    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(set_id), Some(root), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(anyhow::anyhow!(
                "line {}: expected '<set-uuid> <root>'",
                line_number + 1
            ));
        };
        let set_id: Uuid = set_id
            .parse()
            .with_context(|| format!("line {}: bad set id", line_number + 1))?;
        registry
            .add(TrustedRootEntry::new(set_id, root))
            .with_context(|| format!("line {}: bad root", line_number + 1))?;
    }

    Ok(registry)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    println!("Loading proof from: {}", args.proof_file.display());
    let metadata = fs::metadata(&args.proof_file).context("Failed to read proof file metadata")?;
    if metadata.len() > MAX_PROOF_FILE_SIZE {
        return Err(anyhow::anyhow!(
            "Proof file too large: {} bytes (max {} bytes). This may indicate a corrupted or invalid proof file.",
            metadata.len(),
            MAX_PROOF_FILE_SIZE
        ));
    }

    let proof_content = fs::read_to_string(&args.proof_file).context("Failed to read proof file")?;

    println!("Validating proof structure...");
    let value: serde_json::Value =
        serde_json::from_str(&proof_content).context("Proof file is not JSON")?;
    if !codec::validate(&value) {
        return Err(anyhow::anyhow!("Proof file is not in the canonical wire form"));
    }
    let envelope: ProofEnvelope =
        serde_json::from_str(&proof_content).context("Failed to parse proof")?;

    println!("Proof details:");
    println!("  Proof id:       {}", envelope.metadata.proof_id);
    println!("  Credential set: {}", envelope.metadata.credential_set_id);
    println!("  Merkle root:    {}", envelope.metadata.merkle_root);
    println!("  Expires at:     {}", envelope.metadata.expires_at);

    // Replay ledger keyed by proof id, next to the proof file.
    let ledger_file = args.proof_file.with_extension("seen.txt");
    if !args.allow_replay && ledger_file.exists() {
        let seen = fs::read_to_string(&ledger_file)
            .with_context(|| format!("Failed to read ledger: {}", ledger_file.display()))?;
        let proof_id = envelope.metadata.proof_id.to_string();
        if seen.lines().any(|line| line.trim() == proof_id) {
            return Err(anyhow::anyhow!(
                "Proof replay detected: proof id {} has already been accepted. See {}.",
                proof_id,
                ledger_file.display()
            ));
        }
    }

    println!("Loading trusted roots from: {}", args.trusted_roots.display());
    let registry = Arc::new(load_registry(&args.trusted_roots)?);
    println!("  {} trusted root(s)", registry.count());

    println!("Loading circuit artifacts...");
    let artifacts =
        Arc::new(CircuitArtifacts::init(&config).context("Failed to load circuit artifacts")?);

    println!("Verifying proof...");
    let verifier = ProofVerifier::new(artifacts, registry);
    let report = verifier.verify_envelope(&envelope);

    if report.valid {
        println!("\n✓ Proof verification PASSED");
        println!("The prover holds a credential in set {}.", envelope.metadata.credential_set_id);
        for warning in &report.warnings {
            println!("  warning: {warning:?}");
        }

        if !args.allow_replay {
            let mut seen = if ledger_file.exists() {
                fs::read_to_string(&ledger_file)?
            } else {
                String::new()
            };
            seen.push_str(&envelope.metadata.proof_id.to_string());
            seen.push('\n');
            fs::write(&ledger_file, seen)
                .with_context(|| format!("Failed to record proof id to {}", ledger_file.display()))?;
            println!("Proof id recorded to: {}", ledger_file.display());
        }
        Ok(())
    } else {
        println!("\n✗ Proof verification FAILED");
        for code in &report.errors {
            println!("  error: {code}");
        }
        Err(anyhow::anyhow!("Proof verification failed"))
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pgmodel::{
    codegen, connect_pool, lint_schema, load_seed, pull_models, seed_database, Config, Schema,
    SeedMode,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect the database and generate Rust model source
    Pull {
        /// Database URL; defaults to the DATABASE_URL environment variable
        #[arg(long, env = "DATABASE_URL")]
        url: Option<String>,
        /// Path to write the generated models, `-` for stdout
        #[arg(long, default_value = "src/models.rs")]
        out: String,
        /// Also write the introspected schema as a TOML models manifest
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Keep a timestamped copy of the generated models under this directory
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Create missing modeled tables and insert seed rows
    Seed {
        /// Models manifest describing the tables
        #[arg(long, default_value = "models.toml")]
        models: PathBuf,
        /// Seed file: a `.toml` manifest or `const name = [...]` declarations
        #[arg(long)]
        seed: PathBuf,
        /// Database URL; defaults to the DATABASE_URL environment variable
        #[arg(long, env = "DATABASE_URL")]
        url: Option<String>,
        /// Print the statements instead of executing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Lint a models manifest for common errors
    Lint {
        #[arg(long, default_value = "models.toml")]
        models: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Loads `.env` before clap reads DATABASE_URL.
    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Pull {
            url,
            out,
            manifest,
            history,
        } => {
            let url = config
                .database_url_or(url)
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL not specified"))?;
            let types = config.type_map().with_context(|| {
                format!("reading type map {}", config.type_map_path.display())
            })?;
            let pool = connect_pool(&url).await?;
            let (schema, source) = pull_models(&pool, &types).await?;

            if out == "-" {
                println!("{}", source);
            } else {
                if let Some(parent) = PathBuf::from(&out).parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("creating {}", parent.display()))?;
                    }
                }
                fs::write(&out, &source).with_context(|| format!("writing {}", out))?;
                println!("Wrote models to {}", out);
            }
            if let Some(path) = manifest {
                fs::write(&path, schema.to_toml()?)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote models manifest to {}", path.display());
            }
            if let Some(dir) = history {
                let snapshot = codegen::write_model_snapshot(&dir, &source)
                    .with_context(|| format!("writing snapshot under {}", dir.display()))?;
                println!("Saved snapshot to {}", snapshot.display());
            }
        }
        Commands::Seed {
            models,
            seed,
            url,
            dry_run,
        } => {
            let schema = Schema::load(&models)
                .with_context(|| format!("loading models {}", models.display()))?;
            let data =
                load_seed(&seed).with_context(|| format!("loading seed {}", seed.display()))?;
            let url = config
                .database_url_or(url)
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL not specified"))?;
            let pool = connect_pool(&url).await?;
            let mode = if dry_run {
                SeedMode::DryRun
            } else {
                SeedMode::Execute
            };
            let report = seed_database(&pool, &schema, &data, mode).await?;

            for (table, operation) in &report.operations {
                println!("{:<24} {}", table, operation);
            }
            for table in &report.skipped {
                println!("{:<24} skipped (not modeled)", table);
            }
            if dry_run {
                for stmt in &report.statements {
                    println!("{};", stmt);
                }
            }
        }
        Commands::Lint { models } => {
            let schema = Schema::load(&models)
                .with_context(|| format!("loading models {}", models.display()))?;
            let errors = lint_schema(&schema);
            if errors.is_empty() {
                println!("Schema lint passed");
            } else {
                for e in &errors {
                    eprintln!("{}", e);
                }
                anyhow::bail!("Schema lint failed");
            }
        }
    }

    Ok(())
}

//! Point d'entrée CLI pour building-heights

use anyhow::{Context, Result};
use building_heights::PipelineConfig;
use clap::Parser;
use height_raster::BBox;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Enrichir des emprises de bâtiments avec une série temporelle de hauteurs
#[derive(Parser)]
#[command(name = "building-heights")]
#[command(author, version)]
#[command(about = "Enrichir des emprises de bâtiments avec une série temporelle de hauteurs")]
#[command(long_about = "Pipeline par tuiles: découpage de la région, jointure des observations raster de présence/hauteur sur les emprises, fusion des tables et découpage par un polygone de référence.")]
struct Cli {
    /// Config preset name (thane) or path to a JSON config
    #[arg(long, default_value = "thane", global = true)]
    config: String,

    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let config = PipelineConfig::resolve(&cli.config)
        .with_context(|| format!("Failed to load config '{}'", cli.config))?;
    debug!(config = %cli.config, grid = %config.grid_id(), "Configuration loaded");
    cli::log_join_radius(&config);

    match cli.command {
        Commands::Tiles { output } => cli::cmd_tiles(&config, &output)?,
        Commands::Enrich {
            minx,
            miny,
            maxx,
            maxy,
            output_dir,
        } => {
            let tile = BBox::new(minx, miny, maxx, maxy).context("Invalid tile bounds")?;
            cli::cmd_enrich(&config, tile, output_dir)?;
        }
        Commands::Run {
            tiles,
            jobs,
            report,
            output_dir,
        } => cli::cmd_run(
            &config,
            tiles.as_deref(),
            jobs,
            report.as_deref(),
            output_dir,
        )?,
        Commands::Combine { input_dir, output } => cli::cmd_combine(&config, input_dir, output)?,
        Commands::Clip {
            input,
            boundary,
            output,
        } => cli::cmd_clip(&config, input, boundary, output)?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

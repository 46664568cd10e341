use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmds;

#[derive(Parser)]
#[command(name = "retrofit-gen")]
#[command(about = "Retrofit implementation synthesis from annotated type models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Generate implementation units for every annotated type */
    Codegen {
        /* Input YAML files containing type models */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Include directories for imported model files */
        #[arg(short = 'i', long = "include-dir", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,

        /* Output directory for generated units */
        #[arg(
            short = 'o',
            long = "output",
            value_name = "DIR",
            default_value = "generated"
        )]
        output_dir: PathBuf,

        /* Processor configuration file */
        #[arg(short = 'c', long = "config", value_name = "CONFIG")]
        config: Option<PathBuf>,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* Show the walked method table and property descriptors of annotated types */
    Analyze {
        /* Input YAML files containing type models */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Include directories for imported model files */
        #[arg(short = 'i', long = "include-dir", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,

        /* Processor configuration file */
        #[arg(short = 'c', long = "config", value_name = "CONFIG")]
        config: Option<PathBuf>,

        /* Only analyze this type (qualified name) */
        #[arg(long = "type", value_name = "NAME")]
        type_name: Option<String>,

        /* Print descriptors as JSON */
        #[arg(long = "json")]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Codegen {
            files,
            include_dirs,
            output_dir,
            config,
            verbose,
        } => {
            init_tracing(verbose);
            cmds::codegen::run(files, include_dirs, output_dir, config, verbose)?;
        }

        Commands::Analyze {
            files,
            include_dirs,
            config,
            type_name,
            json,
        } => {
            init_tracing(false);
            cmds::analyze::run(files, include_dirs, config, type_name, json)?;
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use tuist_bootstrap::command::tools::DocsRequest;
use tuist_bootstrap::command::{CacheWarmOptions, FetchOptions};
use tuist_bootstrap::config::{MASTER_KEY_ENV, project_path};
use tuist_bootstrap::{
    Bootstrap, BootstrapConfig, BootstrapError, GenerateRequest, ProvisioningProfile, error,
    plugins, show,
};

// ============================================================================
// ERROR HANDLING STRATEGY
// ============================================================================
//
// Library calls return `BootstrapError`; this binary wraps them in `anyhow`
// for context. A failed subprocess ends the program with that subprocess's
// exit status when it fits in a u8, anything else exits with 1.
// ============================================================================

#[derive(Parser)]
#[command(name = "bootstrap")]
#[command(version, about = "Install, fetch and generate Tuist projects with code signing staged")]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Which part of the workspace to act on
#[derive(Args, Debug)]
struct Selection {
    /// Project under Projects/<NAME>
    #[arg(long, short = 'n', conflicts_with_all = ["path", "targets"])]
    name: Option<String>,

    /// Path to the project manifest directory
    #[arg(long, short = 'p', conflicts_with = "targets")]
    path: Option<PathBuf>,

    /// Targets to focus on
    #[arg(long = "target", short = 't')]
    targets: Vec<String>,
}

impl Selection {
    fn project_path(&self) -> Option<PathBuf> {
        self.name
            .as_deref()
            .map(project_path)
            .or_else(|| self.path.clone())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Stage code signing, fetch, warm the cache and generate the project
    Generate {
        #[command(flatten)]
        selection: Selection,

        /// Warm the binary cache and generate against it
        #[arg(long)]
        cache_enabled: bool,

        /// The cache is already warm; skip warming
        #[arg(long, requires = "cache_enabled")]
        cache_hit: bool,

        /// Cache profile (defaults to the configured profile)
        #[arg(long)]
        profile: Option<String>,

        /// Build configuration used to name staged profiles
        #[arg(long)]
        configuration: Option<String>,

        /// Master key for encrypted signing assets (defaults to `MASTER_KEY` env var)
        #[arg(long)]
        master_key: Option<String>,

        /// Profile mapping, repeatable
        #[arg(long = "provisioning-profile", value_name = "TARGET=PROFILE")]
        profiles: Vec<ProvisioningProfile>,

        /// Extra environment for the generator, repeatable
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        #[arg(long)]
        update: bool,

        #[arg(long)]
        verbose: bool,

        /// Open the generated project
        #[arg(long)]
        open: bool,

        /// Directory to fetch dependencies in
        #[arg(long)]
        workspace: Option<PathBuf>,
    },

    /// Fetch external dependencies
    Fetch {
        #[arg(long)]
        update: bool,

        #[arg(long)]
        verbose: bool,

        #[arg(long)]
        workspace: Option<PathBuf>,
    },

    /// Build cacheable targets into the binary cache
    CacheWarm {
        #[command(flatten)]
        selection: Selection,

        #[arg(long)]
        profile: Option<String>,

        #[arg(long)]
        verbose: bool,
    },

    /// Print the generator version
    Version,

    /// Export the project dependency graph
    Graph {
        #[arg(long)]
        manifest_path: Option<PathBuf>,
    },

    /// Format target source directories in place
    Format {
        #[arg(long)]
        configuration_file: PathBuf,

        #[arg(required = true, value_name = "DIR")]
        dirs: Vec<PathBuf>,
    },

    /// Compile documentation for a target
    Docs {
        #[arg(long)]
        symbol_graph_dir: PathBuf,

        #[arg(long)]
        output_dir: PathBuf,

        #[arg(long)]
        catalog: Option<PathBuf>,

        target: String,
    },

    /// Zip built executables for distribution
    Archive {
        product: String,

        archive_name: String,

        #[arg(long)]
        output_dir: PathBuf,

        #[arg(required = true, value_name = "EXECUTABLE")]
        executables: Vec<PathBuf>,
    },

    /// Generate typed accessors for a target's resources
    Sourcegen {
        #[arg(long)]
        config_file: PathBuf,

        #[arg(long)]
        target: String,

        #[arg(long)]
        output_dir: PathBuf,
    },

    /// Show the effective configuration and tool status
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<BootstrapError>()
        .and_then(BootstrapError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

async fn run(cli: Cli) -> Result<()> {
    let config = BootstrapConfig::load(cli.config.as_deref()).await?;
    let root = std::env::current_dir().context("Cannot determine the current directory")?;
    let bootstrap = Bootstrap::new(config, root);

    match cli.command {
        Command::Generate {
            selection,
            cache_enabled,
            cache_hit,
            profile,
            configuration,
            master_key,
            profiles,
            env,
            update,
            verbose,
            open,
            workspace,
        } => {
            let request = GenerateRequest {
                project_path: selection.project_path(),
                targets: selection.targets,
                workspace,
                cache_enabled,
                cache_hit,
                cache_profile: profile,
                configuration,
                master_key: master_key.or_else(|| std::env::var(MASTER_KEY_ENV).ok()),
                profiles,
                env,
                update,
                verbose,
                open,
            };
            bootstrap.generate(&request).await?;
        }
        Command::Fetch {
            update,
            verbose,
            workspace,
        } => {
            let options = FetchOptions {
                update,
                verbose,
                extra_args: Vec::new(),
            };
            bootstrap
                .fetch(&options, Vec::new(), workspace.as_deref())
                .await?;
        }
        Command::CacheWarm {
            selection,
            profile,
            verbose,
        } => {
            let options = CacheWarmOptions {
                project_path: selection.project_path(),
                targets: selection.targets,
                cache_profile: profile.unwrap_or_else(|| bootstrap.config().cache_profile.clone()),
                verbose,
                extra_args: Vec::new(),
            };
            bootstrap.cache_warm(&options, Vec::new()).await?;
        }
        Command::Version => {
            println!("{}", bootstrap.version().await?);
        }
        Command::Graph { manifest_path } => {
            bootstrap.graph(manifest_path.as_ref()).await?;
        }
        Command::Format {
            configuration_file,
            dirs,
        } => {
            plugins::format_targets(bootstrap.runner(), &configuration_file, &dirs).await?;
        }
        Command::Docs {
            symbol_graph_dir,
            output_dir,
            catalog,
            target,
        } => {
            let request = DocsRequest {
                target: &target,
                catalog: catalog.as_deref(),
                symbol_graph_dir: &symbol_graph_dir,
                output_dir: &output_dir,
            };
            plugins::build_docs(bootstrap.runner(), &request).await?;
        }
        Command::Archive {
            product,
            archive_name,
            output_dir,
            executables,
        } => {
            plugins::archive(
                bootstrap.runner(),
                &product,
                &archive_name,
                &output_dir,
                &executables,
            )
            .await?;
        }
        Command::Sourcegen {
            config_file,
            target,
            output_dir,
        } => {
            plugins::generate_target_sources(bootstrap.runner(), &config_file, &target, &output_dir)
                .await?;
        }
        Command::Show => {
            show::show_config(bootstrap.config(), bootstrap.root(), cli.config.as_deref());
        }
    }

    Ok(())
}

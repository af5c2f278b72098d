//! envstack CLI entrypoint.
//!
//! This is the main entrypoint for the envstack command-line tool.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use envstack::cfn::StackDeployer;
use envstack::cli::{Cli, Commands, OutputFormatter};
use envstack::config::{find_config_file, AppConfig, ConfigParser, ConfigValidator};
use envstack::error::Result;
use envstack::planner::{DeploymentPlan, DiffEngine, StackDiff};
use envstack::synthesizer::{select_environment, SynthesizedStack, Synthesizer};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let env_name = select_environment(cli.context_value("env"));

    match &cli.command {
        Commands::Init { path, force } => cmd_init(path, *force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), *warnings),
        Commands::List => cmd_list(cli.config.as_ref(), &env_name, &formatter),
        Commands::Synth { stack, out_dir } => {
            cmd_synth(cli.config.as_ref(), &env_name, stack.as_deref(), out_dir.as_ref())
        }
        Commands::Diff { stack } => {
            cmd_diff(cli.config.as_ref(), &env_name, stack.as_deref(), &formatter).await
        }
        Commands::Deploy { stack, yes } => {
            cmd_deploy(cli.config.as_ref(), &env_name, stack.as_deref(), *yes, &formatter).await
        }
        Commands::Destroy { stack, yes } => {
            cmd_destroy(cli.config.as_ref(), &env_name, stack.as_deref(), *yes).await
        }
    }
}

/// Initialize a new project.
fn cmd_init(path: &PathBuf, force: bool) -> Result<()> {
    info!("Initializing new envstack project in: {}", path.display());

    let config_path = path.join("envstack.json");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    // Write config template
    let config_template = include_str!("../templates/envstack.json");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    // Write .env.example
    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.contains(".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# envstack\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your AWS credentials");
    eprintln!("  2. Edit envstack.json with your environments");
    eprintln!("  3. Run 'envstack validate' to check your configuration");
    eprintln!("  4. Run 'envstack diff' to preview changes");
    eprintln!("  5. Run 'envstack deploy' to deploy your stacks");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool) -> Result<()> {
    let (config, _) = load_config(config_path)?;

    // load_config already validated; re-run to surface warnings.
    let validator = ConfigValidator::new();
    let result = validator.validate(&config)?;

    eprintln!("Configuration is valid!");
    if show_warnings && !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  - {warning}");
        }
    }

    // Show summary
    eprintln!("\nConfiguration summary:");
    eprintln!("  Project: {}", config.project);
    eprintln!("  Environments: {}", config.environment_names().join(", "));
    for (name, env) in &config.context {
        eprintln!(
            "  {name}: region {}, {} subnets, NAT {}, {} bucket(s)",
            env.region,
            env.vpc.subnet_count(),
            if env.vpc.enable_nat_gateway { "on" } else { "off" },
            env.s3.len(),
        );
    }

    Ok(())
}

/// List the stacks of the selected environment.
fn cmd_list(
    config_path: Option<&PathBuf>,
    env_name: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let stacks = Synthesizer::new(&config).synthesize(env_name)?;

    eprintln!("{}", formatter.format_stack_list(&stacks));
    Ok(())
}

/// Synthesize stack templates.
fn cmd_synth(
    config_path: Option<&PathBuf>,
    env_name: &str,
    stack_filter: Option<&str>,
    out_dir: Option<&PathBuf>,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let stacks = Synthesizer::new(&config).synthesize_filtered(env_name, stack_filter)?;

    if let Some(dir) = out_dir {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        for stack in &stacks {
            let file = dir.join(format!("{}.template.json", stack.stack_name));
            std::fs::write(&file, stack.template.to_json_pretty()?)?;
            eprintln!("Wrote: {}", file.display());
        }
    } else {
        for stack in &stacks {
            println!("{}", stack.template.to_json_pretty()?);
        }
    }

    Ok(())
}

/// Diff synthesized templates against the deployed stacks.
async fn cmd_diff(
    config_path: Option<&PathBuf>,
    env_name: &str,
    stack_filter: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let stacks = Synthesizer::new(&config).synthesize_filtered(env_name, stack_filter)?;

    let mut deployer = StackDeployer::new();
    let diffs = compute_diffs(&mut deployer, &stacks).await?;

    eprintln!("{}", formatter.format_diffs(&diffs));
    Ok(())
}

/// Deploy the selected environment's stacks.
async fn cmd_deploy(
    config_path: Option<&PathBuf>,
    env_name: &str,
    stack_filter: Option<&str>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let stacks = Synthesizer::new(&config).synthesize_filtered(env_name, stack_filter)?;

    let mut deployer = StackDeployer::new();
    let diffs = compute_diffs(&mut deployer, &stacks).await?;

    let pairs: Vec<(SynthesizedStack, StackDiff)> = stacks.into_iter().zip(diffs).collect();
    let plan = DeploymentPlan::from_diffs(env_name, pairs);

    if plan.is_empty() {
        eprintln!("No changes to deploy.");
        return Ok(());
    }

    // Show plan
    eprintln!("{}", formatter.format_plan(&plan));

    // Confirm
    if !auto_approve {
        eprint!("Do you want to deploy these stacks? [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Deploy cancelled.");
            return Ok(());
        }
    }

    // Execute plan
    let results = deployer.execute(&plan).await?;

    eprintln!("\n{}", formatter.format_results(&results));
    Ok(())
}

/// Destroy the selected environment's stacks.
async fn cmd_destroy(
    config_path: Option<&PathBuf>,
    env_name: &str,
    stack_filter: Option<&str>,
    auto_approve: bool,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let stacks = Synthesizer::new(&config).synthesize_filtered(env_name, stack_filter)?;

    eprintln!("The following stacks will be destroyed:");
    for stack in &stacks {
        eprintln!("  - {} ({})", stack.stack_name, stack.region);
    }
    eprintln!("\nBuckets are retained by policy and survive stack deletion.");

    // Confirm
    if !auto_approve {
        eprint!("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "destroy" {
            eprintln!("Destruction cancelled.");
            return Ok(());
        }
    }

    let mut deployer = StackDeployer::new();
    for stack in &stacks {
        eprintln!("Destroying {}...", stack.stack_name);
        deployer.destroy_stack(&stack.stack_name, &stack.region).await?;
    }

    eprintln!("\nAll stacks destroyed.");
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads and validates the configuration.
fn load_config(config_path: Option<&PathBuf>) -> Result<(AppConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| std::path::Path::new(".")),
    );
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;

    // Validate
    let validator = ConfigValidator::new();
    validator.validate(&config)?;

    Ok((config, config_file))
}

/// Computes the diff of each stack against its deployed baseline.
async fn compute_diffs(
    deployer: &mut StackDeployer,
    stacks: &[SynthesizedStack],
) -> Result<Vec<StackDiff>> {
    let engine = DiffEngine::new();
    let mut diffs = Vec::with_capacity(stacks.len());

    for stack in stacks {
        let client = deployer.client_for(&stack.region).await.clone();
        let deployed = client.get_template(&stack.stack_name).await?;
        diffs.push(engine.compute_diff(&stack.stack_name, &stack.template, deployed.as_ref()));
    }

    Ok(diffs)
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use taxfill::template::Template;
use taxfill::{FieldBindings, FieldMap, FillOptions, Payload};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taxfill", version, about = "Fill spreadsheet return templates")]
struct Cli {
    /// Log resolution steps (same as RUST_LOG=taxfill=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a template from a `{meta, transactions}` payload and a mapping.
    Fill(FillArgs),
    /// Print sheet names and the top-left corner of every sheet.
    Inspect(InspectArgs),
    /// Validate a mapping file.
    Lint(LintArgs),
    /// Apply an `{instructions: [...]}` payload to a template.
    Instructions(InstructionsArgs),
    /// Print the JSON schema of the mapping format.
    Schema,
}

#[derive(Parser, Debug)]
struct FillArgs {
    #[arg(long)]
    template: PathBuf,
    #[arg(long)]
    payload: PathBuf,
    #[arg(long)]
    mapping: PathBuf,
    #[arg(long)]
    out: PathBuf,
    /// Print the audit log as JSON instead of text.
    #[arg(long)]
    json: bool,
    /// Report targets inside merged ranges instead of writing to the master cell.
    #[arg(long)]
    no_follow_merges: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    #[arg(long)]
    template: PathBuf,
    #[arg(long, default_value_t = 15)]
    rows: u32,
    #[arg(long, default_value_t = 5)]
    cols: u32,
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct LintArgs {
    #[arg(long)]
    mapping: PathBuf,
}

#[derive(Parser, Debug)]
struct InstructionsArgs {
    #[arg(long)]
    template: PathBuf,
    #[arg(long)]
    payload: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Fill(args) => cmd_fill(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Lint(args) => cmd_lint(args),
        Command::Instructions(args) => cmd_instructions(args),
        Command::Schema => {
            println!("{}", taxfill::spec::schema_json());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "taxfill=debug" } else { "taxfill=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_mapping(path: &Path) -> Result<FieldBindings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading mapping {}", path.display()))?;
    let map = FieldMap::from_yaml_str(&text)
        .with_context(|| format!("parsing mapping {}", path.display()))?;
    FieldBindings::new(map).with_context(|| format!("binding mapping {}", path.display()))
}

fn load_payload(path: &Path) -> Result<Payload> {
    let file = fs::File::open(path).with_context(|| format!("opening payload {}", path.display()))?;
    Payload::from_json_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing payload {}", path.display()))
}

fn print_log(log: &taxfill::AuditLog, json: bool) -> Result<()> {
    if json {
        println!("{}", log.to_json_pretty()?);
    } else {
        println!("{log}");
    }
    Ok(())
}

fn cmd_fill(args: FillArgs) -> Result<()> {
    let bindings = load_mapping(&args.mapping)?;
    let payload = match load_payload(&args.payload)? {
        Payload::Return(ret) => ret,
        Payload::Instructions { .. } => bail!(
            "{} is an instruction payload; use `taxfill instructions`",
            args.payload.display()
        ),
    };
    let mut template = Template::open(&args.template)?;
    let options = FillOptions {
        follow_merges: !args.no_follow_merges,
    };
    tracing::info!(
        template = %args.template.display(),
        mapping = %bindings.manifest().template.id,
        "filling"
    );
    let log = template.fill(&payload, &bindings, &options);
    template.save_as(&args.out)?;
    print_log(&log, args.json)
}

fn cmd_instructions(args: InstructionsArgs) -> Result<()> {
    let instructions = match load_payload(&args.payload)? {
        Payload::Instructions { instructions } => instructions,
        Payload::Return(_) => bail!(
            "{} has no `instructions`; use `taxfill fill` with a mapping",
            args.payload.display()
        ),
    };
    let mut template = Template::open(&args.template)?;
    let log = template.apply_instructions(&instructions, &FillOptions::default());
    template.save_as(&args.out)?;
    print_log(&log, args.json)
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let mut template = Template::open(&args.template)?;
    let preview = template
        .inspect(args.rows, args.cols)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("inspecting {}", args.template.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print!("{preview}");
    }
    Ok(())
}

fn cmd_lint(args: LintArgs) -> Result<()> {
    let text = fs::read_to_string(&args.mapping)
        .with_context(|| format!("reading mapping {}", args.mapping.display()))?;
    let map = FieldMap::from_yaml_str(&text)
        .with_context(|| format!("parsing mapping {}", args.mapping.display()))?;
    match map.validate() {
        Ok(()) => {
            println!(
                "{}: ok ({} field(s), template `{}`)",
                args.mapping.display(),
                map.fields.len(),
                map.template.id
            );
            Ok(())
        }
        Err(err) => {
            for issue in err.issues() {
                eprintln!("{}: {issue}", args.mapping.display());
            }
            bail!("{} issue(s) in {}", err.issues().len(), args.mapping.display())
        }
    }
}

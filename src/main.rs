use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand};
use odata_filter::CompileOptions;
use odata_filter::cli::{self, CheckOptions, CheckResult, CliError};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "ofilter")]
#[command(about = "Compile OData $filter expressions and run them against JSON content")]
#[command(version)]
struct Cli {
    /// Log compilation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filter and print the input items it matches
    Check {
        /// The $filter expression
        filter: String,

        /// JSON input: an object or an array of objects (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Schema file describing types, fields and aspects
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only compile, don't evaluate
        #[arg(long)]
        compile_only: bool,

        /// Deepest expression nesting accepted
        #[arg(long, default_value_t = odata_filter::filter::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Print the compiled expression tree
    Explain {
        /// The $filter expression
        filter: String,

        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            filter,
            input,
            schema,
            pretty,
            compile_only,
            max_depth,
        } => run_check(filter, input, schema, pretty, compile_only, max_depth),
        Commands::Explain { filter, schema } => run_explain(&filter, schema),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(
    filter: String,
    input: Option<String>,
    schema: Option<PathBuf>,
    pretty: bool,
    compile_only: bool,
    max_depth: usize,
) -> Result<(), CliError> {
    let schema = cli::load_schema(schema.as_deref())?;

    let input = match input {
        Some(s) => Some(s),
        None if !compile_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CheckOptions {
        filter,
        input,
        compile_only,
        compile: CompileOptions { max_depth },
    };

    match cli::execute_check(&options, &schema)? {
        CheckResult::Compiled => println!("Filter is valid"),
        CheckResult::Matches(items) => {
            let output = serde_json::Value::Array(items);
            let json = if pretty {
                serde_json::to_string_pretty(&output)?
            } else {
                serde_json::to_string(&output)?
            };
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_explain(filter: &str, schema: Option<PathBuf>) -> Result<(), CliError> {
    let schema = cli::load_schema(schema.as_deref())?;
    let expr = cli::explain(filter, &schema)?;
    println!("{}", expr);
    println!("type: {}", expr.data_type());
    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use reforge_cli::commands;

/// Reverse-engineering experiment pipeline CLI.
///
/// The binary is intentionally thin: it parses args, dispatches to command
/// helpers, and lets `reforge-core` + `commands` own the real work for
/// testability and reuse.
#[derive(Parser, Debug)]
#[command(
    name = "reforge",
    version,
    about = "Provenance-preserving build, oracle, and join pipeline",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Snapshot a source directory and build the full optimization/variant
    /// matrix, emitting the build receipt.
    SubmitBuild {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Directory holding the C sources to snapshot.
        #[arg(long)]
        source_dir: String,

        /// Test-case name. Defaults to the source directory name.
        #[arg(long)]
        name: Option<String>,

        /// Category tag recorded with the case (arrays, loops, goto, ...).
        #[arg(long, default_value = "uncategorized")]
        test_category: String,

        /// Optimization levels to build (defaults to O0 O1 O2 O3).
        #[arg(long)]
        optimizations: Option<Vec<String>>,

        /// Optional compile-policy file (YAML or JSON).
        #[arg(long)]
        profile: Option<String>,

        /// Per-phase subprocess timeout in seconds.
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Replace an existing case directory instead of refusing.
        #[arg(long, default_value_t = false)]
        replace: bool,

        /// Emit the full receipt as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run the DWARF oracle over a case's debug binary.
    RunDwarfOracle {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Test-case name (directory under the root).
        #[arg(long)]
        name: String,

        /// Optimization level (O0..O3).
        #[arg(long)]
        opt: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run the tree-sitter oracle over a case's preprocessed TUs.
    RunTsOracle {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Test-case name (directory under the root).
        #[arg(long)]
        name: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Align DWARF functions to tree-sitter functions via line directives.
    RunJoinDwarfTs {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Test-case name (directory under the root).
        #[arg(long)]
        name: String,

        /// Optimization level (O0..O3).
        #[arg(long)]
        opt: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Reshape a raw decompiler JSONL export for a stripped binary.
    ReshapeDecompile {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Test-case name (directory under the root).
        #[arg(long)]
        name: String,

        /// Optimization level (O0..O3).
        #[arg(long)]
        opt: String,

        /// Path to the raw decompiler JSONL export.
        #[arg(long)]
        raw_jsonl: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Join oracle ground truth to reshaped decompiler output.
    RunJoinDecompile {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Test-case name (directory under the root).
        #[arg(long)]
        name: String,

        /// Optimization level (O0..O3).
        #[arg(long)]
        opt: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List binaries registered in the project database.
    ListBinaries {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional case name to filter by.
        #[arg(long)]
        case: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show a case's build receipt.
    ShowReceipt {
        /// Artifact root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Test-case name (directory under the root).
        #[arg(long)]
        name: String,

        /// Emit the full receipt as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::SubmitBuild {
            root,
            source_dir,
            name,
            test_category,
            optimizations,
            profile,
            timeout,
            replace,
            json,
        } => commands::submit_build_command(
            &root,
            &source_dir,
            name,
            &test_category,
            optimizations,
            profile,
            timeout,
            replace,
            json,
        )?,
        Command::RunDwarfOracle { root, name, opt, json } => {
            commands::run_dwarf_oracle_command(&root, &name, &opt, json)?
        }
        Command::RunTsOracle { root, name, json } => {
            commands::run_ts_oracle_command(&root, &name, json)?
        }
        Command::RunJoinDwarfTs { root, name, opt, json } => {
            commands::run_join_dwarf_ts_command(&root, &name, &opt, json)?
        }
        Command::ReshapeDecompile { root, name, opt, raw_jsonl, json } => {
            commands::reshape_decompile_command(&root, &name, &opt, &raw_jsonl, json)?
        }
        Command::RunJoinDecompile { root, name, opt, json } => {
            commands::run_join_decompile_command(&root, &name, &opt, json)?
        }
        Command::ListBinaries { root, case, json } => {
            commands::list_binaries_command(&root, case.as_deref(), json)?
        }
        Command::ShowReceipt { root, name, json } => {
            commands::show_receipt_command(&root, &name, json)?
        }
    }

    Ok(())
}

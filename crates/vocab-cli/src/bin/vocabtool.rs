use clap::{Parser, Subcommand};

use vocab_cli::commands::{config_ops, learn_ops, store_ops};

#[derive(Parser)]
#[command(name = "vocabtool", about = "Personal vocabulary dictionary tool")]
struct Cli {
    /// Write a JSON trace log to this directory (requires the `trace` feature)
    #[arg(long, global = true)]
    trace_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show header attributes and entry counts
    Info {
        /// Dictionary (.dict) file
        file: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print every entry as one JSON object per line
    Dump {
        /// Dictionary (.dict) file
        file: String,
    },
    /// Look up a word, optionally after previous words
    Lookup {
        /// Dictionary (.dict) file
        file: String,
        /// Word to look up
        word: String,
        /// Previous words, oldest first
        #[arg(long, num_args = 1..)]
        context: Vec<String>,
    },
    /// Build a contacts dictionary from a names file
    ImportNames {
        /// Output dictionary (.dict) file
        file: String,
        /// One display name per line; `account:` lines are kept whole
        names_file: String,
        #[arg(long, default_value = "en_US")]
        locale: String,
        /// Dictionary name stored in the header (default: file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Learn typed text into a user history dictionary
    Learn {
        /// Dictionary (.dict) file, created if missing
        file: String,
        /// Text to learn; one sentence per line
        #[arg(required_unless_present = "text_file")]
        text: Option<String>,
        /// Read the text from a file instead
        #[arg(long, conflicts_with = "text")]
        text_file: Option<String>,
        #[arg(long, default_value = "en_US")]
        locale: String,
        /// Dictionary name stored in the header (default: file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Some(dir) = &cli.trace_dir {
        vocab_engine::init_tracing(std::path::Path::new(dir));
    }

    match cli.command {
        Command::Info { file, json } => store_ops::info(&file, json),
        Command::Dump { file } => store_ops::dump(&file),
        Command::Lookup {
            file,
            word,
            context,
        } => store_ops::lookup(&file, &word, &context),
        Command::ImportNames {
            file,
            names_file,
            locale,
            name,
        } => learn_ops::import_names(&file, &names_file, &locale, name.as_deref()),
        Command::Learn {
            file,
            text,
            text_file,
            locale,
            name,
        } => match (text, text_file) {
            (_, Some(text_file)) => {
                learn_ops::learn_file(&file, &text_file, &locale, name.as_deref())
            }
            (Some(text), None) => learn_ops::learn(&file, &text, &locale, name.as_deref()),
            (None, None) => unreachable!("clap requires text or --text-file"),
        },
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}

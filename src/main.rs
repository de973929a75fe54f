use anyhow::anyhow;
use clap::{Parser, Subcommand};
use grypt::commands::{self, GenerateKeyOptions};
use grypt::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "GRYPT_LOG";

#[derive(Parser)]
#[command(name = "grypt")]
#[command(version)]
#[command(about = "Keep secrets in a git repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the key for a keyring
    GenerateKey {
        /// Keyring to store the key in
        #[arg(long)]
        keyring: Option<String>,

        /// Encryption scheme (see 'grypt schemes')
        #[arg(long)]
        scheme: Option<String>,

        /// Use a random key instead of deriving it from a passphrase
        #[arg(long)]
        random_key: bool,

        /// Passphrase to derive the key from (prompted for when absent)
        #[arg(long, env = "GRYPT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },

    /// Keep files secret: seal them on commit
    KeepSecret {
        #[arg(long)]
        keyring: Option<String>,

        /// Files to keep secret
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Unlock the repository (open secrets on checkout)
    Unlock {
        #[arg(long)]
        keyring: Option<String>,

        /// Key file to import into the keyring first
        #[arg(short, long)]
        key_file: Option<PathBuf>,
    },

    /// Lock the repository (stop opening secrets)
    Lock,

    /// Export a keyring's key to a file
    ExportKey {
        #[arg(long)]
        keyring: Option<String>,

        /// Output file path
        output: PathBuf,
    },

    /// Clean filter (used internally by git)
    Clean {
        #[arg(long)]
        keyring: Option<String>,
    },

    /// Smudge filter (used internally by git)
    Smudge {
        #[arg(long)]
        keyring: Option<String>,
    },

    /// Diff textconv (used internally by git)
    Textconv {
        #[arg(long)]
        keyring: Option<String>,

        file: PathBuf,
    },

    /// Print the headers of a sealed file
    Headers { file: PathBuf },

    /// List the available encryption schemes
    Schemes,
}

fn main() {
    if let Err(e) = init_logging() {
        eprintln!("Warning: {e:#}");
    }

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; stdout carries filter output
fn init_logging() -> anyhow::Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(directives)
            .map_err(|err| anyhow!("invalid {LOG_ENV} value: {err}"))?,
        Err(_) => EnvFilter::new("warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow!("failed to install logger: {err}"))
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::GenerateKey {
            keyring,
            scheme,
            random_key,
            password,
            force,
        } => commands::generate_key(GenerateKeyOptions {
            keyring: keyring.as_deref(),
            scheme: scheme.as_deref(),
            random: random_key,
            password: password.as_deref(),
            force,
        }),
        Commands::KeepSecret { keyring, files } => {
            commands::keep_secret(keyring.as_deref(), &files)
        }
        Commands::Unlock { keyring, key_file } => {
            commands::unlock(keyring.as_deref(), key_file.as_deref())
        }
        Commands::Lock => commands::lock(),
        Commands::ExportKey { keyring, output } => {
            commands::export_key(keyring.as_deref(), &output)
        }
        Commands::Clean { keyring } => commands::clean(keyring.as_deref()),
        Commands::Smudge { keyring } => commands::smudge(keyring.as_deref()),
        Commands::Textconv { keyring, file } => commands::textconv(&file, keyring.as_deref()),
        Commands::Headers { file } => commands::headers(&file),
        Commands::Schemes => commands::schemes(),
    }
}

use clap::{ArgAction, Parser, Subcommand};
use nrf_credstore::config::{Config, ConfigLoader};
use nrf_credstore::{logging, AtClient, CredStore, CredStoreError, CredType, FunctionalMode, TypeFilter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Credential types that can be written from a file.
const WRITABLE_TYPES: [CredType; 4] = [
    CredType::RootCaCert,
    CredType::ClientCert,
    CredType::ClientKey,
    CredType::Psk,
];

#[derive(Parser, Debug)]
#[command(
    name = "nrfcredstore",
    version,
    about = "Manage certificates stored in a cellular modem."
)]
struct Args {
    /// Serial device used to communicate with the modem.
    dev: String,

    /// Serial baudrate [default: from config, 115200]
    #[arg(long)]
    baudrate: Option<u32>,

    /// Serial communication timeout in seconds [default: from config, 3]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Configuration file to use instead of the standard locations.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all keys stored in the modem
    List {
        /// Only list keys in secure tag
        #[arg(long)]
        tag: Option<u32>,
        /// Only list keys with given type (requires --tag)
        #[arg(long = "type", default_value = "ANY", value_parser = parse_type_filter)]
        filter: TypeFilter,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write key/cert to a secure tag
    Write {
        /// Secure tag to write key to
        tag: u32,
        /// Key type to write: ROOT_CA_CERT, CLIENT_CERT, CLIENT_KEY or PSK
        #[arg(value_parser = parse_writable_type)]
        cred_type: CredType,
        /// PEM file to read from
        file: PathBuf,
    },
    /// Delete value from a secure tag
    Delete {
        /// Secure tag to delete key
        tag: u32,
        /// Key type to delete
        #[arg(value_parser = parse_cred_type)]
        cred_type: CredType,
    },
    /// Delete all keys outside the reserved secure tags
    #[command(name = "deleteall")]
    DeleteAll,
    /// Generate private key
    Generate {
        /// Secure tag to store generated key
        tag: u32,
        /// File to store CSR in DER format
        file: PathBuf,
        /// CSR subject attributes, e.g. "O=Nordic Semiconductor,L=Trondheim,C=no,CN=mydevice"
        #[arg(long, default_value = "")]
        attributes: String,
    },
}

fn parse_type_filter(s: &str) -> Result<TypeFilter, String> {
    s.parse()
}

fn parse_cred_type(s: &str) -> Result<CredType, String> {
    s.parse()
}

fn parse_writable_type(s: &str) -> Result<CredType, String> {
    let cred_type: CredType = s.parse()?;
    if WRITABLE_TYPES.contains(&cred_type) {
        Ok(cred_type)
    } else {
        Err(format!("{cred_type} cannot be written from a file"))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let config = match loaded {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.logging, args.verbose);

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", operator_message(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

fn operator_message(err: &CredStoreError) -> String {
    match err {
        CredStoreError::NoAtClient => {
            "The device does not respond to AT commands. Please flash at_client sample.".to_string()
        }
        CredStoreError::Timeout { .. } => {
            "The device did not respond in time. Please try again.".to_string()
        }
        CredStoreError::Transport(e) => format!("Serial error: {e}"),
        CredStoreError::AtCommand { .. } => err.to_string(),
        other => format!("Error: {other}"),
    }
}

fn run(args: &Args, config: &Config) -> nrf_credstore::Result<()> {
    let device = config.serial.resolve_port(&args.dev);
    let baud_rate = args.baudrate.unwrap_or(config.serial.default_baud);
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.serial.default_timeout());

    let mut client = AtClient::new().with_write_chunk_size(config.serial.write_chunk_size);
    client.connect(&device, baud_rate, timeout)?;
    client.verify()?;
    client.enable_error_codes()?;

    let Some(command) = &args.command else {
        return Ok(());
    };

    let mut store = CredStore::new(&mut client);
    store.set_functional_mode(FunctionalMode::Offline)?;

    match command {
        Command::List { tag, filter, json } => {
            let creds = store.list(*tag, *filter)?;
            if *json {
                let out = serde_json::to_string_pretty(&creds)
                    .map_err(|e| CredStoreError::Io(e.into()))?;
                println!("{out}");
            } else {
                println!("{:<12} {:<18} {:<64}", "Secure tag", "Key type", "SHA");
                for c in &creds {
                    println!("{:<12} {:<18} {:<64}", c.tag, c.cred_type.name(), c.sha);
                }
            }
        }
        Command::Write {
            tag,
            cred_type,
            file,
        } => {
            store.write_from(*tag, *cred_type, File::open(file)?)?;
        }
        Command::Delete { tag, cred_type } => {
            if store.delete(*tag, *cred_type)? {
                println!("{cred_type} in secure tag {tag} deleted");
            }
        }
        Command::DeleteAll => {
            store.delete_all()?;
            println!("All credentials deleted.");
        }
        Command::Generate {
            tag,
            file,
            attributes,
        } => {
            generate_csr(&mut store, *tag, file, attributes)?;
            println!("New private key generated in secure tag {tag}");
            println!("Wrote CSR in DER format to {}", file.display());
        }
    }

    Ok(())
}

/// Generate a key and save its CSR. The file is only created once the modem
/// has returned a CSR.
fn generate_csr(store: &mut CredStore<'_>, tag: u32, file: &Path, attributes: &str) -> nrf_credstore::Result<()> {
    let mut csr = Vec::new();
    store.generate_key(tag, &mut csr, attributes)?;
    std::fs::write(file, &csr)?;
    Ok(())
}

//! jrnl: end-to-end encrypted journal client
//!
//! Commands:
//!   login               - exchange username/password for an API token
//!   logout              - revoke the token and forget it locally
//!   journals            - list journals, verifying and decrypting each
//!   entries <uid>       - print the verified entry log of a journal
//!   fingerprint [user]  - show the fingerprint of an account public key
//!   config show         - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jrnl_client::{
    ApiClient, ApiError, Authenticator, EntryManager, HttpTransport, Journal, JournalManager,
    KeyRing, UserInfo, UserInfoManager,
};
use jrnl_core::config::expand_tilde;
use jrnl_core::types::{CollectionInfo, SyncEntry};
use jrnl_core::JrnlConfig;
use jrnl_crypto::{pretty_fingerprint, AsymmetricKeyPair};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "jrnl",
    version,
    about = "End-to-end encrypted journal client",
    long_about = "jrnl: log in to a journal server, list and verify encrypted journals, and read their entry logs",
    after_help = "The account password is read from JRNL_PASSWORD when set, otherwise prompted for."
)]
struct Cli {
    /// Path to jrnl.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "JRNL_CONFIG",
        default_value = "~/.config/jrnl/config.toml"
    )]
    config: PathBuf,

    /// Account username (overrides account.username)
    #[arg(long, short = 'u', env = "JRNL_USERNAME", global = true)]
    username: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides log.level
    #[arg(long, env = "JRNL_LOG", global = true)]
    log: Option<String>,

    /// Log format; overrides log.format
    #[arg(long, env = "JRNL_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Obtain an API token and store it in account.token_file
    Login {
        /// Generate and upload an account key pair if the account has none
        #[arg(long)]
        create_keys: bool,
    },

    /// Revoke the stored API token
    Logout,

    /// List journals with their decrypted names
    Journals,

    /// Print the entry log of one journal
    Entries {
        /// Journal uid
        journal: String,
        /// Only entries after this entry uid
        #[arg(long)]
        last: Option<String>,
        /// Maximum number of entries to fetch
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the public key fingerprint of an account
    Fingerprint {
        /// Account to look up (default: the logged-in account)
        user: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = JrnlConfig::load(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or_else(|| {
        if config.log.format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    });
    init_logging(&level, &format);
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        from_file = config_path.exists(),
        "configuration loaded"
    );

    match &cli.command {
        Commands::Login { create_keys } => cmd_login(&cli, &config, *create_keys),
        Commands::Logout => cmd_logout(&config),
        Commands::Journals => cmd_journals(&cli, &config),
        Commands::Entries {
            journal,
            last,
            limit,
        } => cmd_entries(&cli, &config, journal, last.as_deref(), *limit),
        Commands::Fingerprint { user } => cmd_fingerprint(&cli, &config, user.as_deref()),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // logs go to stderr so command output stays pipeable
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Session helpers ────────────────────────────────────────────────────────────

fn build_client(config: &JrnlConfig, token: Option<SecretString>) -> Result<ApiClient> {
    let url = config.server.base_url()?;
    let transport = HttpTransport::from_config(&config.server).context("building HTTP client")?;
    let client = ApiClient::new(&url, Arc::new(transport));
    Ok(match token {
        Some(token) => client.with_token(token),
        None => client,
    })
}

fn username(cli: &Cli, config: &JrnlConfig) -> Result<String> {
    cli.username
        .clone()
        .or_else(|| config.account.username.clone())
        .context("no username; use --username or set account.username in config")
}

/// Read from the environment or a prompt only; there is no `--password` flag.
const PASSWORD_ENV: &str = "JRNL_PASSWORD";

fn password() -> Result<SecretString> {
    match std::env::var(PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => Ok(SecretString::from(p)),
        _ => {
            let p = rpassword::prompt_password("Password: ").context("reading password")?;
            Ok(SecretString::from(p))
        }
    }
}

fn token_path(config: &JrnlConfig) -> PathBuf {
    expand_tilde(&config.account.token_file)
}

fn read_token(config: &JrnlConfig) -> Result<SecretString> {
    let path = token_path(config);
    let token = std::fs::read_to_string(&path)
        .with_context(|| format!("not logged in (no token at {}); run `jrnl login`", path.display()))?;
    Ok(SecretString::from(token.trim().to_string()))
}

fn write_token(path: &Path, token: &SecretString) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("opening token file: {}", path.display()))?;

    // mode() only applies on creation; tighten a token file left by an older run
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("restricting permissions on {}", path.display()))?;
    }

    file.write_all(token.expose_secret().as_bytes())
        .with_context(|| format!("writing token: {}", path.display()))?;
    Ok(())
}

/// Authenticated client plus the account's unlocked key ring.
struct Session {
    client: ApiClient,
    ring: KeyRing,
}

fn open_session(cli: &Cli, config: &JrnlConfig) -> Result<Session> {
    let client = build_client(config, Some(read_token(config)?))?;
    let username = username(cli, config)?;
    let mut ring = KeyRing::from_password(&username, &password()?)
        .context("deriving root key")?;

    match UserInfoManager::new(&client).get(&username)? {
        Some(info) => ring
            .unlock(&info)
            .context("unlocking account key pair (wrong password?)")?,
        None => {
            tracing::info!(username, "account has no key pair; shared journals unavailable");
        }
    }
    Ok(Session { client, ring })
}

// ── `jrnl login` / `jrnl logout` ─────────────────────────────────────────────

fn cmd_login(cli: &Cli, config: &JrnlConfig, create_keys: bool) -> Result<()> {
    let username = username(cli, config)?;
    let password = password()?;

    let mut client = build_client(config, None)?;
    let token = match Authenticator::new(&client).get_auth_token(&username, &password) {
        Ok(token) => token,
        Err(ApiError::Unauthorized { .. }) => anyhow::bail!("login failed: wrong username or password"),
        Err(e) => return Err(e).context("requesting auth token"),
    };
    let path = token_path(config);
    write_token(&path, &token)?;
    println!("Logged in as {username}; token stored in {}", path.display());

    client.set_token(Some(token));
    let users = UserInfoManager::new(&client);
    let info = match users.get(&username)? {
        Some(info) => info,
        None if create_keys => {
            let mut ring = KeyRing::from_password(&username, &password)
                .context("deriving root key")?;
            let key_pair = AsymmetricKeyPair::generate_with_size(config.crypto.rsa_key_bits)
                .context("generating account key pair")?;
            let crypto = ring.user_info_crypto(i64::from(config.crypto.protocol_version))?;
            let info = UserInfo::generate_with_key_pair(crypto, username.as_str(), &key_pair)?;
            users.create(&info).context("uploading user info")?;
            println!("Created account key pair");
            info
        }
        None => {
            println!("Account has no key pair yet (use --create-keys to generate one)");
            return Ok(());
        }
    };
    println!("Fingerprint:\n{}", pretty_fingerprint(info.public_key()));
    Ok(())
}

fn cmd_logout(config: &JrnlConfig) -> Result<()> {
    let path = token_path(config);
    let client = build_client(config, Some(read_token(config)?))?;
    match Authenticator::new(&client).invalidate_auth_token() {
        Ok(()) => {}
        // the token is already dead server-side
        Err(ApiError::Unauthorized { .. }) => {}
        Err(e) => return Err(e).context("revoking token"),
    }
    std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
    println!("Logged out");
    Ok(())
}

// ── `jrnl journals` ───────────────────────────────────────────────────────────

fn cmd_journals(cli: &Cli, config: &JrnlConfig) -> Result<()> {
    let mut session = open_session(cli, config)?;
    let journals = JournalManager::new(&session.client)
        .list()
        .context("listing journals")?;

    if journals.is_empty() {
        println!("No journals");
        return Ok(());
    }

    println!("{:<64}  {:<12}  {:<4}  NAME", "UID", "TYPE", "FLAG");
    for journal in &journals {
        match describe_journal(&mut session.ring, journal) {
            Ok(info) => {
                let flag = match (journal.key().is_some(), journal.is_read_only()) {
                    (true, true) => "s,ro",
                    (true, false) => "s",
                    (false, _) => "",
                };
                println!(
                    "{:<64}  {:<12}  {:<4}  {}",
                    journal.uid(),
                    info.collection_type.to_string(),
                    flag,
                    info.display_name
                );
            }
            Err(e) => {
                tracing::warn!(uid = %journal.uid(), error = %e, "skipping journal");
                println!("{:<64}  <unreadable: {e}>", journal.uid());
            }
        }
    }
    Ok(())
}

fn describe_journal(ring: &mut KeyRing, journal: &Journal) -> Result<CollectionInfo> {
    let crypto = ring.journal_crypto(journal)?;
    journal.verify(crypto)?;
    Ok(CollectionInfo::from_json(&journal.content(crypto)?)?)
}

// ── `jrnl entries` ────────────────────────────────────────────────────────────

fn cmd_entries(
    cli: &Cli,
    config: &JrnlConfig,
    journal_uid: &str,
    last: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let mut session = open_session(cli, config)?;
    let journal = JournalManager::new(&session.client)
        .list()?
        .into_iter()
        .find(|j| j.uid() == journal_uid)
        .with_context(|| format!("journal not found: {journal_uid}"))?;

    let crypto = session.ring.journal_crypto(&journal)?;
    journal.verify(crypto).context("journal failed its integrity check")?;

    let entries = EntryManager::new(&session.client, journal.uid())?
        .list(crypto, last, limit)
        .context("fetching entries")?;

    for entry in &entries {
        let content = entry.content(crypto)?;
        match SyncEntry::from_json(&content) {
            Ok(item) => println!(
                "{}  {:<6}  {}",
                entry.uid(),
                format!("{:?}", item.action).to_uppercase(),
                first_line(&item.content)
            ),
            Err(_) => println!("{}  <{} bytes>", entry.uid(), content.len()),
        }
    }
    println!("{} entries", entries.len());
    Ok(())
}

/// First non-empty line, cut to a terminal-friendly width.
fn first_line(text: &str) -> String {
    const WIDTH: usize = 60;
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if line.chars().count() > WIDTH {
        let cut: String = line.chars().take(WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

// ── `jrnl fingerprint` ────────────────────────────────────────────────────────

fn cmd_fingerprint(cli: &Cli, config: &JrnlConfig, user: Option<&str>) -> Result<()> {
    let owner = match user {
        Some(user) => user.to_string(),
        None => username(cli, config)?,
    };
    let client = build_client(config, Some(read_token(config)?))?;
    let info = UserInfoManager::new(&client)
        .get(&owner)?
        .with_context(|| format!("{owner} has no public key"))?;
    println!("{owner}\n{}", pretty_fingerprint(info.public_key()));
    Ok(())
}

// ── `jrnl config show` ────────────────────────────────────────────────────────

fn cmd_config_show(config: &JrnlConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

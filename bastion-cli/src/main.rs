//! bastion CLI — operational shell for the secret store
//!
//! Usage:
//!   bastion init [--vault-file F] [--audit-file F] [--password PW]
//!   bastion unseal [--vault-file F] [--audit-file F] [--password PW]
//!   bastion seal [--vault-file F] [--audit-file F]
//!   bastion status [--vault-file F]
//!   bastion put PATH VALUE --identity ID
//!   bastion get PATH --identity ID [--version N]
//!   bastion delete PATH --identity ID
//!   bastion list [PREFIX] --identity ID
//!   bastion add-policy --identity ID --pattern PAT --capabilities read,write
//!   bastion remove-policy --identity ID --pattern PAT
//!   bastion audit-log [--last N]

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use bastion_vault::{Capability, Vault};

const DEFAULT_VAULT_FILE: &str = "vault.json";
const DEFAULT_AUDIT_FILE: &str = "audit.log";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    tracing::debug!(command = %args[1], "dispatching");

    let result = match args[1].as_str() {
        "init" => cmd_init(&args[2..]),
        "unseal" => cmd_unseal(&args[2..]),
        "seal" => cmd_seal(&args[2..]),
        "status" => cmd_status(&args[2..]),
        "put" => cmd_put(&args[2..]),
        "get" => cmd_get(&args[2..]),
        "delete" => cmd_delete(&args[2..]),
        "list" => cmd_list(&args[2..]),
        "add-policy" => cmd_add_policy(&args[2..]),
        "remove-policy" => cmd_remove_policy(&args[2..]),
        "audit-log" => cmd_audit_log(&args[2..]),
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" => {
            println!("bastion {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        cmd => {
            eprintln!("Error: unknown command '{}'", cmd);
            print_usage();
            Err("unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"bastion — local envelope-encrypted secret store

USAGE:
    bastion <COMMAND> [OPTIONS]

COMMANDS:
    init              Create a new vault (leaves it sealed)
    unseal            Derive the root key and open a session
    seal              Close the session and scrub the key
    status            Report whether the vault exists and is unsealed
    put PATH VALUE    Store a secret (new path) or a new version
    get PATH          Retrieve a secret value
    delete PATH       Remove a secret and all its versions
    list [PREFIX]     List secret paths under a prefix
    add-policy        Grant capabilities over a path pattern
    remove-policy     Revoke a previously added rule
    audit-log         Print audit entries

COMMON OPTIONS:
    --vault-file F    Store location (default: vault.json)
    --audit-file F    Audit log location (default: audit.log)
    --identity ID     Caller identity (secret and policy commands)
    --password PW     Master password (prompted without echo if omitted)

EXAMPLES:
    bastion init
    bastion unseal
    bastion add-policy --identity admin --pattern '**' --capabilities read,write
    bastion put production/db/password 's3cretValue!' --identity admin
    bastion get production/db/password --identity admin
    bastion audit-log --last 20

OPTIONS:
    -h, --help       Print help
    -V, --version    Print version
"#
    );
}

type CliError = Box<dyn std::error::Error>;

// ---------------------------------------------------------------------------
// Shared option parsing
// ---------------------------------------------------------------------------

/// Options shared by every command, plus the command's positional arguments.
struct Opts {
    vault_file: PathBuf,
    audit_file: PathBuf,
    audit_file_given: bool,
    identity: Option<String>,
    password: Option<String>,
    pattern: Option<String>,
    capabilities: Option<String>,
    version: Option<u32>,
    last: Option<usize>,
    positionals: Vec<String>,
}

fn parse_opts(args: &[String]) -> Result<Opts, CliError> {
    let mut opts = Opts {
        vault_file: PathBuf::from(DEFAULT_VAULT_FILE),
        audit_file: PathBuf::from(DEFAULT_AUDIT_FILE),
        audit_file_given: false,
        identity: None,
        password: None,
        pattern: None,
        capabilities: None,
        version: None,
        last: None,
        positionals: Vec::new(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--vault-file" => {
                i += 1;
                opts.vault_file = PathBuf::from(args.get(i).ok_or("missing value for --vault-file")?);
            }
            "--audit-file" => {
                i += 1;
                opts.audit_file = PathBuf::from(args.get(i).ok_or("missing value for --audit-file")?);
                opts.audit_file_given = true;
            }
            "--identity" => {
                i += 1;
                opts.identity = Some(args.get(i).ok_or("missing value for --identity")?.clone());
            }
            "--password" => {
                i += 1;
                opts.password = Some(args.get(i).ok_or("missing value for --password")?.clone());
            }
            "--pattern" => {
                i += 1;
                opts.pattern = Some(args.get(i).ok_or("missing value for --pattern")?.clone());
            }
            "--capabilities" => {
                i += 1;
                opts.capabilities =
                    Some(args.get(i).ok_or("missing value for --capabilities")?.clone());
            }
            "--version" => {
                i += 1;
                let raw = args.get(i).ok_or("missing value for --version")?;
                opts.version = Some(raw.parse().map_err(|_| format!("invalid version: {}", raw))?);
            }
            "--last" => {
                i += 1;
                let raw = args.get(i).ok_or("missing value for --last")?;
                opts.last = Some(raw.parse().map_err(|_| format!("invalid count: {}", raw))?);
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option: {}", flag).into());
            }
            positional => {
                opts.positionals.push(positional.to_string());
            }
        }
        i += 1;
    }

    Ok(opts)
}

impl Opts {
    fn vault(&self) -> Vault {
        Vault::with_files(&self.vault_file, &self.audit_file)
    }

    fn require_identity(&self) -> Result<&str, CliError> {
        self.identity
            .as_deref()
            .ok_or_else(|| "--identity is required".into())
    }

    fn positional(&self, index: usize, name: &str) -> Result<&str, CliError> {
        self.positionals
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| format!("missing argument: {}", name).into())
    }

    fn reject_extra_positionals(&self, max: usize) -> Result<(), CliError> {
        if self.positionals.len() > max {
            return Err(format!("unexpected argument: {}", self.positionals[max]).into());
        }
        Ok(())
    }

    /// `--password` when given, a no-echo terminal read otherwise.
    fn read_password(&self) -> Result<String, CliError> {
        match &self.password {
            Some(pw) => Ok(pw.clone()),
            None => Ok(rpassword::prompt_password("Master password: ")?),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_init(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(0)?;
    let password = opts.read_password()?;

    opts.vault().init(&password)?;
    println!("Vault initialized at {}", opts.vault_file.display());
    println!("Run 'bastion unseal' to open it.");
    Ok(())
}

fn cmd_unseal(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(0)?;
    let password = opts.read_password()?;

    opts.vault().unseal(&password)?;
    println!("Vault unsealed.");
    Ok(())
}

fn cmd_seal(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(0)?;

    opts.vault().seal()?;
    println!("Vault sealed.");
    Ok(())
}

fn cmd_status(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(0)?;
    // status touches no audit log and takes no audit flag
    if opts.audit_file_given {
        return Err("unknown option: --audit-file".into());
    }

    let status = opts.vault().status()?;
    println!("Vault:  {}", if status.exists { "present" } else { "absent" });
    println!("State:  {}", if status.unsealed { "unsealed" } else { "sealed" });
    Ok(())
}

fn cmd_put(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(2)?;
    let path = opts.positional(0, "PATH")?;
    let value = opts.positional(1, "VALUE")?;
    let identity = opts.require_identity()?;

    let version = opts.vault().put(path, value, identity)?;
    if version == 1 {
        println!("Stored {} (version 1)", path);
    } else {
        println!("Updated {} (version {})", path, version);
    }
    Ok(())
}

fn cmd_get(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(1)?;
    let path = opts.positional(0, "PATH")?;
    let identity = opts.require_identity()?;

    let secret = opts.vault().get(path, identity, opts.version)?;
    println!("Path:    {}", secret.path);
    println!("Version: {}", secret.version);
    println!("Value:   {}", secret.value);
    Ok(())
}

fn cmd_delete(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(1)?;
    let path = opts.positional(0, "PATH")?;
    let identity = opts.require_identity()?;

    opts.vault().delete(path, identity)?;
    println!("Deleted {}", path);
    Ok(())
}

fn cmd_list(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(1)?;
    let prefix = opts.positionals.first().map(String::as_str);
    let identity = opts.require_identity()?;

    let paths = opts.vault().list(identity, prefix)?;
    if paths.is_empty() {
        println!("(no secrets)");
    } else {
        for path in paths {
            println!("{}", path);
        }
    }
    Ok(())
}

fn cmd_add_policy(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(0)?;
    let identity = opts.require_identity()?;
    let pattern = opts.pattern.as_deref().ok_or("--pattern is required")?;
    let raw_caps = opts
        .capabilities
        .as_deref()
        .ok_or("--capabilities is required")?;

    let mut capabilities = Vec::new();
    for name in raw_caps.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        capabilities.push(Capability::from_str(name)?);
    }

    opts.vault().add_policy(identity, pattern, &capabilities)?;
    let names: Vec<&str> = capabilities.iter().map(Capability::as_str).collect();
    println!(
        "Policy added: '{}' may {} on '{}'",
        identity,
        names.join(", "),
        pattern
    );
    Ok(())
}

fn cmd_remove_policy(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(0)?;
    let identity = opts.require_identity()?;
    let pattern = opts.pattern.as_deref().ok_or("--pattern is required")?;

    opts.vault().remove_policy(identity, pattern)?;
    println!("Policy removed: '{}' on '{}'", identity, pattern);
    Ok(())
}

fn cmd_audit_log(args: &[String]) -> Result<(), CliError> {
    let opts = parse_opts(args)?;
    opts.reject_extra_positionals(0)?;

    for line in opts.vault().audit_log(opts.last)? {
        println!("{}", line);
    }
    Ok(())
}

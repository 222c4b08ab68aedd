use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Args, Parser, Subcommand, ValueEnum};
use goodbotbot::config::Config;
use goodbotbot::workflow::definition;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const DIST_DIR: &str = "target/lambda";
const PARAMETERS_FILE: &str = "infra/parameters.json";
const TEMPLATE_FILE: &str = "infra/template.yaml";
const LAMBDA_BINARY: &str = "goodbotbot";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Build, configure and deploy the GoodBotBot Lambda",
    long_about = "Packages the Lambda binary, renders the reply workflow definition,\n\
                  collects bot credentials and deploys the SAM stack."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the Lambda binary and zip it as `bootstrap`
    Package {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Render the Step Functions definition referenced by the template
    StateMachine,
    /// Prompt for credentials and bot parameters and write infra/parameters.json
    Configure(ConfigureArgs),
    /// Package, render and deploy the stack with the SAM CLI
    Deploy {
        /// CloudFormation stack name
        #[arg(long, default_value = "goodbotbot")]
        stack_name: String,
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
    },
}

#[derive(Args)]
struct ConfigureArgs {
    /// Twitter app (consumer) key
    #[arg(long, env = "BOT_APP_KEY")]
    app_key: Option<String>,
    /// Twitter app (consumer) secret
    #[arg(long, env = "BOT_APP_SECRET", hide_env_values = true)]
    app_secret: Option<String>,
    /// Access token of the controlled account
    #[arg(long, env = "BOT_ACCESS_TOKEN")]
    access_token: Option<String>,
    /// Access token secret of the controlled account
    #[arg(long, env = "BOT_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,
    /// Screen name of the account to reply to
    #[arg(long, env = "BOT_TARGET")]
    target: Option<String>,
    /// Client name the target's tweets must be posted with
    #[arg(long, env = "BOT_SOURCE")]
    source: Option<String>,
    /// Maximum tweet age in minutes
    #[arg(long, env = "BOT_MAXAGE")]
    max_age: Option<String>,
    /// Fail instead of prompting for missing values
    #[arg(long)]
    no_input: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

/// One prompted option: SAM parameter name, environment variable checked by
/// the Lambda, prompt text and default.
struct Parameter {
    name: &'static str,
    env: &'static str,
    prompt: &'static str,
    default: Option<&'static str>,
    secret: bool,
}

const PARAMETERS: [Parameter; 7] = [
    Parameter { name: "AppKey", env: "BOT_APP_KEY", prompt: "Twitter app key", default: None, secret: false },
    Parameter { name: "AppSecret", env: "BOT_APP_SECRET", prompt: "Twitter app secret", default: None, secret: true },
    Parameter { name: "AccessToken", env: "BOT_ACCESS_TOKEN", prompt: "Access token", default: None, secret: false },
    Parameter { name: "TokenSecret", env: "BOT_TOKEN_SECRET", prompt: "Access token secret", default: None, secret: true },
    Parameter { name: "Target", env: "BOT_TARGET", prompt: "Target screen name", default: Some("xkcdComic"), secret: false },
    Parameter { name: "Source", env: "BOT_SOURCE", prompt: "Target tweet source", default: Some("xkcd bot"), secret: false },
    Parameter { name: "MaxAge", env: "BOT_MAXAGE", prompt: "Maximum tweet age (minutes)", default: Some("360"), secret: false },
];

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_sam(args: &[String]) {
    eprintln!("+ sam {}", args.join(" "));
    let status = Command::new("sam")
        .args(args)
        .status()
        .expect("failed to execute sam; is the AWS SAM CLI installed?");
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo xtask package`"
        );
    }
}

// ── package ────────────────────────────────────────────────────────

fn package_lambda(target: &str, profile: BuildProfile) {
    ensure_rust_target_installed(target);

    step("Build lambda binary");
    let mut cargo_args = vec!["build", "-p", "goodbotbot", "--target", target, "--bin", LAMBDA_BINARY];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(LAMBDA_BINARY);
    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    let zip_path = dist_dir.join("goodbotbot.zip");
    package_lambda_zip(&binary_path, &zip_path);

    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    if !binary_path.exists() {
        panic!("expected lambda binary at '{}'", binary_path.display());
    }

    let binary = fs::read(binary_path).expect("failed to read lambda binary");
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── state machine ──────────────────────────────────────────────────

fn write_state_machine() {
    step("Render state machine definition");
    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    let path = dist_dir.join("state-machine.json");
    let rendered = definition::render().expect("state machine definition should serialize");
    fs::write(&path, rendered).expect("failed to write state machine definition");

    eprintln!("- {}", path.display());
}

// ── configure ──────────────────────────────────────────────────────

/// Prompt line; a secret default is shown masked.
fn prompt_label(question: &str, default: Option<&str>, secret: bool) -> String {
    match default {
        Some(_) if secret => format!("{question} [********]: "),
        Some(value) => format!("{question} [{value}]: "),
        None => format!("{question}: "),
    }
}

fn prompt(question: &str, default: Option<&str>, secret: bool) -> String {
    let stdin = io::stdin();
    loop {
        eprint!("{}", prompt_label(question, default, secret));
        io::stderr().flush().expect("failed to flush stderr");

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .expect("failed to read from stdin");
        if read == 0 {
            eprintln!("\nstdin closed before all values were entered");
            exit(1);
        }

        let answer = line.trim();
        match (answer.is_empty(), default) {
            (false, _) => return answer.to_string(),
            (true, Some(value)) => return value.to_string(),
            (true, None) => eprintln!("a value is required"),
        }
    }
}

/// Previously written values, used as prompt defaults.
fn existing_parameters() -> BTreeMap<String, String> {
    fs::read_to_string(PARAMETERS_FILE)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

fn configure(args: ConfigureArgs) {
    let provided = [
        args.app_key,
        args.app_secret,
        args.access_token,
        args.token_secret,
        args.target,
        args.source,
        args.max_age,
    ];
    let existing = existing_parameters();

    let mut values = BTreeMap::new();
    for (parameter, provided) in PARAMETERS.iter().zip(provided) {
        let default = existing
            .get(parameter.name)
            .map(String::as_str)
            .or(parameter.default);

        let value = match (provided, default) {
            (Some(value), _) => value,
            (None, Some(default)) if args.no_input => default.to_string(),
            (None, None) if args.no_input => {
                eprintln!("missing {} (set {})", parameter.prompt, parameter.env);
                exit(1);
            }
            (None, default) => prompt(parameter.prompt, default, parameter.secret),
        };
        values.insert(parameter.name.to_string(), value);
    }

    // Same rules the Lambda applies at invocation time.
    let by_env: BTreeMap<&str, &String> = PARAMETERS
        .iter()
        .filter_map(|parameter| values.get(parameter.name).map(|value| (parameter.env, value)))
        .collect();
    if let Err(error) = Config::from_lookup(|name| by_env.get(name).map(|value| value.to_string())) {
        eprintln!("{error}");
        exit(1);
    }

    let json = serde_json::to_string_pretty(&values).expect("parameters should serialize");
    fs::write(PARAMETERS_FILE, json).expect("failed to write parameters file");
    eprintln!("\nWrote {PARAMETERS_FILE}");
}

/// `ParameterKey=..,ParameterValue=".."` entries. Values are always quoted
/// since SAM stops an unquoted value at the first space.
fn parameter_overrides(values: &BTreeMap<String, String>) -> Vec<String> {
    values
        .iter()
        .map(|(name, value)| {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            format!("ParameterKey={name},ParameterValue=\"{escaped}\"")
        })
        .collect()
}

// ── deploy ─────────────────────────────────────────────────────────

fn deploy(stack_name: &str, target: &str) {
    let values = existing_parameters();
    if values.is_empty() {
        eprintln!("{PARAMETERS_FILE} is missing; run `cargo xtask configure` first");
        exit(1);
    }

    package_lambda(target, BuildProfile::Release);
    write_state_machine();

    step("Deploy stack");
    let mut args = vec![
        "deploy".to_string(),
        "--template-file".to_string(),
        TEMPLATE_FILE.to_string(),
        "--stack-name".to_string(),
        stack_name.to_string(),
        "--capabilities".to_string(),
        "CAPABILITY_IAM".to_string(),
        "--resolve-s3".to_string(),
        "--parameter-overrides".to_string(),
    ];
    args.extend(parameter_overrides(&values));
    run_sam(&args);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Package { target, profile } => package_lambda(&target, profile),
        Commands::StateMachine => write_state_machine(),
        Commands::Configure(args) => configure(args),
        Commands::Deploy { stack_name, target } => deploy(&stack_name, &target),
    }
}

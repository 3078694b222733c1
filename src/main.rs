//! S2 assistant entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config (CLI `--test` forces the test environment)
//!   4. Resolve effective log level (CLI `-v` flags > env > config), init logger once
//!   5. Build the model registry
//!   6. Compose the system prompt and stream the answer to stdout

use std::sync::Arc;

use s2_assistant::config::{self, Environment};
use s2_assistant::error::AppError;
use s2_assistant::llm::{ModelId, ModelRegistry, StreamPart};
use s2_assistant::logger;
use s2_assistant::prompts::{self, ArtifactKind, RequestHints};

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args(std::env::args().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    let mut config = config::load(args.config_path.as_deref())?;
    if args.force_test {
        config.environment = Environment::Test;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        app = %config.app_name,
        environment = %config.environment,
        provider = %config.llm.provider,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    if args.print_system_prompt {
        println!("{}", prompts::system_prompt(args.model.as_str(), &args.hints));
        return Ok(());
    }

    let registry = Arc::new(ModelRegistry::from_config(&config)?);

    let mut prompt = args.prompt.join(" ");
    let (model, system) = match args.update {
        Some(kind) => {
            let current = read_stdin().await?;
            let system = prompts::update_document_prompt(Some(&current), kind);
            (ModelId::Artifact, system)
        }
        None => {
            if prompt.is_empty() {
                prompt = read_stdin().await?;
            }
            (args.model, prompts::system_prompt(args.model.as_str(), &args.hints))
        }
    };

    if prompt.trim().is_empty() {
        return Err(AppError::Cli("no prompt given (pass words or pipe stdin)".into()));
    }

    let handle = registry.get(model);
    debug!(
        model = %model,
        backend = handle.kind(),
        backend_model = handle.model_id(),
        system_len = system.len(),
        "dispatching request"
    );

    let mut stream = handle.stream(&prompt, Some(&system)).await?;
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    while let Some(part) = stream.next().await {
        match part? {
            StreamPart::TextDelta(t) => {
                stdout.write_all(t.as_bytes()).await?;
                stdout.flush().await?;
            }
            StreamPart::ReasoningDelta(r) => {
                stderr.write_all(r.as_bytes()).await?;
                stderr.flush().await?;
            }
            StreamPart::Finish { usage } => {
                if let Some(u) = usage {
                    info!(
                        input_tokens = u.input_tokens,
                        output_tokens = u.output_tokens,
                        cached_input_tokens = u.cached_input_tokens,
                        "completion finished"
                    );
                }
            }
        }
    }
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}

async fn read_stdin() -> Result<String, AppError> {
    let mut buf = String::new();
    tokio::io::stdin().read_to_string(&mut buf).await?;
    Ok(buf)
}

fn print_help() {
    println!("Usage: s2-assistant [OPTIONS] [PROMPT]...");
    println!();
    println!("Options:");
    println!("  -h, --help                 Print help");
    println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
    println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
    println!("      --test                 Use the offline test model set");
    println!("  -m, --model <NAME>         Logical model (default: chat-model)");
    println!("      --lat <LAT>            Request latitude hint");
    println!("      --lon <LON>            Request longitude hint");
    println!("      --city <CITY>          Request city hint");
    println!("      --country <COUNTRY>    Request country hint");
    println!("      --system-prompt        Print the composed system prompt and exit");
    println!("      --update <KIND>        Rewrite a document (text|code|sheet) read from stdin");
    println!();
    println!("Logical models: {}", ModelId::ALL.map(|id| id.as_str()).join(", "));
}

#[derive(Debug)]
struct CliArgs {
    help: bool,
    log_level: Option<&'static str>,
    config_path: Option<String>,
    force_test: bool,
    model: ModelId,
    hints: RequestHints,
    print_system_prompt: bool,
    update: Option<ArtifactKind>,
    prompt: Vec<String>,
}

fn parse_cli_args<I>(args: I) -> Result<CliArgs, AppError>
where
    I: IntoIterator<Item = String>,
{
    let mut verbosity = 0u8;
    let mut out = CliArgs {
        help: false,
        log_level: None,
        config_path: None,
        force_test: false,
        model: ModelId::Chat,
        hints: RequestHints::default(),
        print_system_prompt: false,
        update: None,
        prompt: Vec::new(),
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| AppError::Cli(format!("{flag} requires a value")))
        };

        match arg.as_str() {
            "--" => {
                out.prompt.extend(iter.by_ref());
                break;
            }
            "-h" | "--help" => out.help = true,
            "-f" | "--config" => out.config_path = Some(value(&arg)?),
            "--test" => out.force_test = true,
            "-m" | "--model" => {
                out.model = value(&arg)?
                    .parse::<ModelId>()
                    .map_err(|e| AppError::Cli(e.to_string()))?;
            }
            "--lat" => out.hints.latitude = Some(value(&arg)?),
            "--lon" => out.hints.longitude = Some(value(&arg)?),
            "--city" => out.hints.city = Some(value(&arg)?),
            "--country" => out.hints.country = Some(value(&arg)?),
            "--system-prompt" => out.print_system_prompt = true,
            "--update" => {
                let kind = value(&arg)?;
                let kind = kind
                    .parse::<ArtifactKind>()
                    .map_err(|e| AppError::Cli(e.to_string()))?;
                out.update = Some(kind);
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            a if a.starts_with('-') && a.len() > 1 => {
                return Err(AppError::Cli(format!("unknown option: {a}")));
            }
            _ => out.prompt.push(arg),
        }
    }

    out.log_level = logger::level_for_verbosity(verbosity);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, AppError> {
        parse_cli_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults() {
        let a = parse(&[]).unwrap();
        assert_eq!(a.model, ModelId::Chat);
        assert!(!a.force_test);
        assert!(a.log_level.is_none());
        assert!(a.prompt.is_empty());
        assert_eq!(a.hints, RequestHints::default());
    }

    #[test]
    fn hints_and_prompt_words() {
        let a = parse(&["--city", "Berlin", "--lat", "52.52", "what", "is", "S2?"]).unwrap();
        assert_eq!(a.hints.city.as_deref(), Some("Berlin"));
        assert_eq!(a.hints.latitude.as_deref(), Some("52.52"));
        assert!(a.hints.country.is_none());
        assert_eq!(a.prompt.join(" "), "what is S2?");
    }

    #[test]
    fn verbosity_flags() {
        assert_eq!(parse(&["-vvv"]).unwrap().log_level, Some("debug"));
        assert_eq!(parse(&["-v", "--verbose"]).unwrap().log_level, Some("info"));
    }

    #[test]
    fn missing_value_is_error() {
        let err = parse(&["-m"]).unwrap_err();
        assert!(err.to_string().contains("-m requires a value"));
    }

    #[test]
    fn model_validated_at_parse_time() {
        assert_eq!(parse(&["-m", "title-model"]).unwrap().model, ModelId::Title);
        let err = parse(&["--system-prompt", "-m", "bogus-model"]).unwrap_err();
        assert!(matches!(err, AppError::Cli(ref m) if m.contains("bogus-model")));
    }

    #[test]
    fn unknown_option_is_error() {
        assert!(matches!(parse(&["--frobnicate"]), Err(AppError::Cli(_))));
    }

    #[test]
    fn double_dash_ends_options() {
        let a = parse(&["--test", "--", "-v", "literal"]).unwrap();
        assert!(a.force_test);
        assert!(a.log_level.is_none());
        assert_eq!(a.prompt, vec!["-v".to_string(), "literal".to_string()]);
    }

    #[test]
    fn update_kind_parsed() {
        assert_eq!(parse(&["--update", "sheet"]).unwrap().update, Some(ArtifactKind::Sheet));
        assert!(parse(&["--update", "video"]).is_err());
    }
}

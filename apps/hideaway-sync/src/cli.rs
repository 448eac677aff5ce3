use hideaway_config::ConfigLocation;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config: ConfigLocation,
    pub output_dir: Option<PathBuf>,
    pub debug_journal: bool,
}

#[derive(Debug)]
enum ParseOutcome {
    Args(CliArgs),
    Help,
}

fn usage() {
    eprintln!(
        "usage:
  hideaway-sync [--config <path>] [--output-dir <path>] [--debug-journal]

environment:
  HIDEAWAY_CONFIG   config file used when --config is not given
  BASEROW_TOKEN     Baserow database token (name set by baserow.token_env)
"
    );
}

fn parse_args_impl(mut args: impl Iterator<Item = String>) -> Result<ParseOutcome, String> {
    let mut config_path: Option<PathBuf> = None;
    let mut output_dir: Option<PathBuf> = None;
    let mut debug_journal = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--output-dir" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--output-dir requires a value".to_string())?;
                output_dir = Some(PathBuf::from(value));
            }
            "--debug-journal" => {
                debug_journal = true;
            }
            "-h" | "--help" | "help" => {
                return Ok(ParseOutcome::Help);
            }
            other => {
                return Err(format!("unknown argument `{other}`"));
            }
        }
    }

    Ok(ParseOutcome::Args(CliArgs {
        config: hideaway_config::resolve_config_location(config_path),
        output_dir,
        debug_journal,
    }))
}

pub fn parse_args() -> CliArgs {
    match parse_args_impl(std::env::args().skip(1)) {
        Ok(ParseOutcome::Args(args)) => args,
        Ok(ParseOutcome::Help) => {
            usage();
            std::process::exit(0);
        }
        Err(error) => {
            eprintln!("error: {error}");
            usage();
            std::process::exit(2);
        }
    }
}

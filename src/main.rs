use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rota_core::constants::{DEFAULT_ID_COLUMN, ROUND1_COLUMN_NAME, ROUND2_COLUMN_NAME};
use rota_core::{CoreConfig, RotaService, SecondRound};

/// Distributes patients over doctors twice.
///
/// The first round is as even as possible. In the second round every patient is moved to a
/// doctor other than their first one.
#[derive(Parser, Debug)]
#[command(name = "rota")]
#[command(about = "Assign every patient a first and a second doctor")]
struct Cli {
    /// Delimited patient table; the identifier column must hold unique values
    patients: PathBuf,
    /// Text file with one doctor name per line
    doctors: PathBuf,
    /// Output table: the patient table with two doctor columns appended
    output: PathBuf,
    /// Seed for the random generator (a random seed is drawn and logged when omitted)
    #[arg(long, short, env = "ROTA_SEED")]
    seed: Option<u64>,
    /// 1-based column holding the patient identifier
    #[arg(long, env = "ROTA_ID_COLUMN", default_value_t = DEFAULT_ID_COLUMN)]
    id_column: usize,
    /// Treat the first row of the patient table as a header
    #[arg(long = "header", env = "ROTA_HAS_HEADER")]
    has_header: bool,
    /// Field delimiter of the patient table
    #[arg(long, env = "ROTA_DELIMITER", default_value_t = ',')]
    delimiter: char,
    /// Quote character of the patient table
    #[arg(long, env = "ROTA_QUOTE", default_value_t = '"')]
    quote: char,
    /// Keep the second round as evenly spread as the first
    #[arg(long, env = "ROTA_BALANCED_SECOND_ROUND")]
    balanced_second_round: bool,
    /// Header of the round 1 column (used with --header)
    #[arg(long, default_value = ROUND1_COLUMN_NAME)]
    round1_column: String,
    /// Header of the round 2 column (used with --header)
    #[arg(long, default_value = ROUND2_COLUMN_NAME)]
    round2_column: String,
    /// Print per-doctor counts as JSON on stdout
    #[arg(long)]
    summary: bool,
}

impl Cli {
    fn core_config(&self) -> rota_core::RotaResult<CoreConfig> {
        let second_round = if self.balanced_second_round {
            SecondRound::Balanced
        } else {
            SecondRound::Independent
        };
        CoreConfig::new(
            self.id_column,
            self.has_header,
            self.delimiter,
            self.quote,
            &self.round1_column,
            &self.round2_column,
            second_round,
        )
    }
}

/// Entry point for the `rota` binary.
///
/// # Environment Variables
/// - `RUST_LOG`: log filter (default: `rota=info`); logs go to stderr
/// - `ROTA_SEED`, `ROTA_ID_COLUMN`, `ROTA_HAS_HEADER`, `ROTA_DELIMITER`, `ROTA_QUOTE`,
///   `ROTA_BALANCED_SECOND_ROUND`: defaults for the matching flags
///
/// A `.env` file in the working directory is loaded first.
///
/// # Exit status
/// 0 on success, otherwise the code of the failing [`rota_core::ErrorKind`].
fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(err) = init_tracing() {
        eprintln!("failed to initialise logging: {err}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let cfg = match cli.core_config() {
        Ok(cfg) => cfg,
        Err(err) => return report_failure(&err),
    };

    let seed = cli.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
    if cli.seed.is_some() {
        tracing::info!("Seed provided ({})", seed);
    } else {
        tracing::info!("Using random seed {} (pass --seed {} to reproduce)", seed, seed);
    }
    let mut rng = StdRng::seed_from_u64(seed);

    let service = RotaService::new(Arc::new(cfg));
    let outcome = match service.run(&cli.patients, &cli.doctors, &cli.output, &mut rng) {
        Ok(outcome) => outcome,
        Err(err) => return report_failure(&err),
    };

    if cli.summary {
        match serde_json::to_string_pretty(&outcome.report()) {
            Ok(payload) => println!("{payload}"),
            Err(err) => {
                eprintln!("failed to serialise summary: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rota=info".parse()?)
                .add_directive("rota_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn report_failure(err: &rota_core::RotaError) -> ExitCode {
    let kind = err.kind();
    tracing::debug!("Rota failed ({}): {:?}", kind, err);
    eprintln!("error[{kind}]: {err}");
    ExitCode::from(kind.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    /// Parses `args` with every `env` fallback removed, so `ROTA_*` in the environment is ignored.
    fn parse(args: &[&str]) -> Cli {
        let matches = Cli::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(args.iter().copied())
            .unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_build_default_config() {
        let cli = parse(&["rota", "p.csv", "d.txt", "out.csv"]);
        assert_eq!(cli.core_config().unwrap(), CoreConfig::default());
        assert!(cli.seed.is_none());
    }

    #[test]
    fn flags_reach_the_config() {
        let cli = parse(&[
            "rota",
            "p.tsv",
            "d.txt",
            "out.tsv",
            "--seed",
            "17",
            "--id-column",
            "2",
            "--header",
            "--delimiter",
            "\t",
            "--balanced-second-round",
        ]);

        let cfg = cli.core_config().unwrap();
        assert_eq!(cli.seed, Some(17));
        assert_eq!(cfg.id_column(), 2);
        assert!(cfg.has_header());
        assert_eq!(cfg.delimiter(), b'\t');
        assert_eq!(cfg.second_round(), SecondRound::Balanced);
    }

    #[test]
    fn flags_still_read_their_env_var() {
        let env_arg = Cli::command()
            .get_arguments()
            .find(|arg| arg.get_id() == "seed")
            .and_then(|arg| arg.get_env().map(|name| name.to_os_string()));
        assert_eq!(env_arg, Some("ROTA_SEED".into()));
    }

    #[test]
    fn zero_id_column_is_a_config_error() {
        let cli = parse(&["rota", "p", "d", "o", "--id-column", "0"]);
        let err = cli.core_config().unwrap_err();
        assert_eq!(err.kind(), rota_core::ErrorKind::InvalidConfig);
    }
}

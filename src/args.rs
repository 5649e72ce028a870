//! These structs provide the CLI interface for the balance-sheet CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// balance-sheet: charts of your net worth from a Google Sheet.
///
/// The program downloads a balance sheet kept in a Google Sheet (one row per period, one column
/// per account, plus a date column and a total column), cleans it up, computes the change and
/// percent change of the total along with a trailing mean of the change, and writes SVG charts
/// and CSV files into $BALANCE_SHEET_HOME/plots.
///
/// You will need to set up a Google OAuth client for this. Start with 'balance-sheet init'.
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// This is the first command you should run. You need to get a few things ready beforehand.
    ///
    /// - Decide what directory you want to store data in and pass this as --balance-sheet-home.
    ///   By default, it will be $HOME/balance-sheet.
    ///
    /// - Get the URL of your balance sheet Google Sheet and pass it as --sheet-url.
    ///
    /// - Create an OAuth client (Desktop app) in the Google Cloud Console, with
    ///   http://localhost as a redirect URI, and download its JSON file. Pass this as
    ///   --client-secret.
    ///
    /// Column names and other settings can be changed afterwards in config.json.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Download the balance sheet and write charts and CSV files.
    Report(ReportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and charts are kept. Defaults to ~/balance-sheet
    #[arg(long, env = "BALANCE_SHEET_HOME", default_value_t = default_home())]
    balance_sheet_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, balance_sheet_home: PathBuf) -> Self {
        Self {
            log_level,
            balance_sheet_home: balance_sheet_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn balance_sheet_home(&self) -> &DisplayPath {
        &self.balance_sheet_home
    }
}

/// (Not shown): Args for the `balance-sheet init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL to your Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be moved to the
    /// secrets directory inside the home directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `balance-sheet auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication without opening a browser.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `balance-sheet report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// Open the net worth chart in the default application when done.
    #[arg(long)]
    open: bool,

    /// Do not write the CSV exports.
    #[arg(long)]
    no_csv: bool,
}

impl ReportArgs {
    pub fn new(open: bool, no_csv: bool) -> Self {
        Self { open, no_csv }
    }

    pub fn open(&self) -> bool {
        self.open
    }

    pub fn csv(&self) -> bool {
        !self.no_csv
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("balance-sheet"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --balance-sheet-home or BALANCE_SHEET_HOME instead of relying \
                on the default home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("balance-sheet")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report() {
        let args = Args::try_parse_from([
            "balance-sheet",
            "--balance-sheet-home",
            "/tmp/bs",
            "--log-level",
            "debug",
            "report",
            "--no-csv",
        ])
        .unwrap();
        assert_eq!(Path::new("/tmp/bs"), args.common().balance_sheet_home().path());
        assert_eq!(LevelFilter::DEBUG, args.common().log_level());
        match args.command() {
            Command::Report(report) => {
                assert!(!report.open());
                assert!(!report.csv());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_init() {
        let args = Args::try_parse_from([
            "balance-sheet",
            "init",
            "--sheet-url",
            "https://docs.google.com/spreadsheets/d/abc",
            "--client-secret",
            "secret.json",
        ])
        .unwrap();
        match args.command() {
            Command::Init(init) => {
                assert_eq!("https://docs.google.com/spreadsheets/d/abc", init.sheet_url());
                assert_eq!(Path::new("secret.json"), init.client_secret());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_init_requires_sheet_url() {
        assert!(Args::try_parse_from(["balance-sheet", "init", "--client-secret", "x"]).is_err());
    }
}

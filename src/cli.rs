use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "vellum",
    about = "Terminal front end for the Vellum markdown note-taking application",
    version
)]
pub struct Cli {
    /// Alternate config file (default: ~/.config/vellum/shell.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Theme override: mocha/dark or latte/light
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Log file (default: vellum-shell.log in the system data directory)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_theme_override() {
        let cli = Cli::parse_from(["vellum", "--theme", "latte"]);
        assert_eq!(cli.theme.as_deref(), Some("latte"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

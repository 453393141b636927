//! Command-line interface definitions for Fresh News.
//!
//! The search itself (phrase, dates, image width) is always collected
//! interactively. Flags only cover where things live: the optional YAML
//! config, the output directory and the assistant API key.

use clap::Parser;

/// Command-line arguments for the Fresh News application.
///
/// # Examples
///
/// ```sh
/// # Defaults: write to ./output, no assistant unless OPENAI_API_KEY is set
/// fresh_news
///
/// # Custom config and output directory
/// fresh_news -c fresh_news.yaml -o ./reports
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory receiving the report files and the run log
    #[arg(short, long, default_value = "output")]
    pub output_dir: String,

    /// API key for the OpenAI-compatible assistant endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["fresh_news"]);
        assert_eq!(cli.output_dir, "output");
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["fresh_news", "-c", "/tmp/fresh.yaml", "-o", "/tmp/reports"]);

        assert_eq!(cli.config.as_deref(), Some("/tmp/fresh.yaml"));
        assert_eq!(cli.output_dir, "/tmp/reports");
    }

    #[test]
    fn test_cli_api_key_flag() {
        let cli = Cli::parse_from(["fresh_news", "--openai-api-key", "sk-test"]);
        assert_eq!(cli.openai_api_key.as_deref(), Some("sk-test"));
    }
}

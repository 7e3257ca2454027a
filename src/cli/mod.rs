mod patterns;

pub use patterns::TestPattern;

use clap::{Parser, Subcommand};

/// Rapidriter - frame pipeline for the 96x38 flip-dot display
#[derive(Parser)]
#[command(name = "rapidriter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the playback worker (default)
    Worker,

    /// Run the OSC ingestion service
    Osc,

    /// Send a single test pattern to the display and exit
    TestPattern {
        /// Pattern to draw
        #[arg(short, long, value_enum, default_value = "checkerboard")]
        pattern: TestPattern,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["rapidriter"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_pattern_argument() {
        let cli = Cli::try_parse_from(["rapidriter", "test-pattern", "--pattern", "border"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::TestPattern {
                pattern: TestPattern::Border
            })
        ));

        assert!(Cli::try_parse_from(["rapidriter", "test-pattern", "-p", "spiral"]).is_err());
    }
}

// CLI configuration
use clap::{Parser, Subcommand};

use crate::cli::output::OutputFormat;

/// oggscope - Ogg container and Theora header inspector
#[derive(Parser, Debug)]
#[command(name = "oggscope")]
#[command(about = "Inspect Ogg pages, logical bitstreams and Theora headers", long_about = None)]
#[command(version)]
#[command(author = "xwsjjctz <xwsjjctz@icloud.com>")]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every page with its header fields and fragments
    Pages {
        /// Ogg file path(s) or glob pattern(s)
        #[arg(value_name = "FILE")]
        files: Vec<String>,
    },

    /// List logical bitstreams
    Streams {
        /// Ogg file path(s) or glob pattern(s)
        #[arg(value_name = "FILE")]
        files: Vec<String>,

        /// List the packets of each bitstream
        #[arg(short, long)]
        packets: bool,

        /// Include packet bytes as base64 (implies --packets)
        #[arg(long)]
        payload: bool,
    },

    /// Decode Theora headers
    Headers {
        /// Ogg file path(s) or glob pattern(s)
        #[arg(value_name = "FILE")]
        files: Vec<String>,

        /// Only the bitstream with this serial number
        #[arg(short, long)]
        serial: Option<u32>,

        /// Print every quantization range and Huffman code
        #[arg(long)]
        full_setup: bool,
    },

    /// Detect Ogg files and the Theora bitstreams they carry
    Detect {
        /// Ogg file path(s) or glob pattern(s)
        #[arg(value_name = "FILE")]
        files: Vec<String>,
    },
}

impl Commands {
    /// File arguments shared by every subcommand
    pub fn files(&self) -> &[String] {
        match self {
            Commands::Pages { files }
            | Commands::Streams { files, .. }
            | Commands::Headers { files, .. }
            | Commands::Detect { files } => files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_streams() {
        let config =
            Config::try_parse_from(["oggscope", "streams", "--payload", "a.ogv", "-f", "json"]).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        match &config.command {
            Commands::Streams { packets, payload, .. } => {
                assert!(!packets);
                assert!(payload);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(config.command.files(), ["a.ogv".to_string()]);
    }

    #[test]
    fn test_parse_headers_serial() {
        let config =
            Config::try_parse_from(["oggscope", "-q", "headers", "--serial", "42", "*.ogv"]).unwrap();
        assert!(config.quiet);
        assert!(matches!(config.command, Commands::Headers { serial: Some(42), .. }));
    }

    #[test]
    fn test_format_names() {
        let config = Config::try_parse_from(["oggscope", "pages", "--format", "key-value"]).unwrap();
        assert_eq!(config.format, OutputFormat::KeyValue);
        assert!(Config::try_parse_from(["oggscope", "pages", "--format", "xml"]).is_err());
    }
}

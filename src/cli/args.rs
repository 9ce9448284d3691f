//! CLI argument definitions using Clap

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::domain::trace::AnnotationKind;

/// Sauntercast - record, replay and publish audio + GPS walk traces
#[derive(Parser, Debug)]
#[command(name = "sauntercast")]
#[command(version = "0.1.0")]
#[command(about = "Record, replay and publish synchronized audio + GPS walk traces")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a new saunter (interactive: pause, resume, annotate, stop)
    Record {
        /// Record audio only, without a location stream
        #[arg(long)]
        no_location: bool,

        /// Asset encoder (wav or flac)
        #[arg(long, value_name = "ENCODER")]
        encoder: Option<String>,
    },
    /// List locally stored saunters
    List,
    /// Play a saunter with the location marker tracking audio position
    Play {
        /// Trace id
        id: Uuid,
    },
    /// Add an annotation to a finished saunter
    Annotate {
        /// Trace id
        id: Uuid,
        /// Position in playback seconds
        #[arg(long, value_name = "SECONDS")]
        at: f64,
        /// Annotation text
        #[arg(long)]
        text: Option<String>,
        /// Annotation kind
        #[arg(long, value_enum, default_value_t = KindArg::Comment)]
        kind: KindArg,
    },
    /// Transcribe a saunter's audio and attach the result
    Transcribe {
        /// Trace id
        id: Uuid,
    },
    /// Publish a saunter to the configured static host
    Publish {
        /// Trace id
        id: Uuid,
        /// Hide the saunter from the public index listing
        #[arg(long)]
        private: bool,
        /// Encrypt the published payload with a password
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
        /// Inline the audio bytes into the published payload
        #[arg(long)]
        include_audio: bool,
    },
    /// Fetch a published saunter
    Fetch {
        /// Trace id
        id: Uuid,
        /// Password for an encrypted saunter
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
        /// Store the fetched saunter locally
        #[arg(long)]
        save: bool,
    },
    /// List public entries of the published index
    Published,
    /// Remove a published saunter from the remote host
    Unpublish {
        /// Trace id
        id: Uuid,
    },
    /// Delete a locally stored saunter
    Delete {
        /// Trace id
        id: Uuid,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Annotation kind argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Comment,
    MapPin,
    Star,
    Flag,
    Alert,
}

impl From<KindArg> for AnnotationKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Comment => AnnotationKind::Comment,
            KindArg::MapPin => AnnotationKind::MapPin,
            KindArg::Star => AnnotationKind::Star,
            KindArg::Flag => AnnotationKind::Flag,
            KindArg::Alert => AnnotationKind::Alert,
        }
    }
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api_key",
    "encoder",
    "data_dir",
    "publish.repo",
    "publish.branch",
    "location.gpsd_host",
    "location.gpsd_port",
    "location.min_movement_m",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_record_flags() {
        let cli = Cli::parse_from(["sauntercast", "record", "--no-location", "--encoder", "flac"]);
        match cli.command {
            Commands::Record {
                no_location,
                encoder,
            } => {
                assert!(no_location);
                assert_eq!(encoder, Some("flac".to_string()));
            }
            _ => panic!("Expected Record command"),
        }
    }

    #[test]
    fn cli_parses_publish_options() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::parse_from([
            "sauntercast",
            "publish",
            &id,
            "--private",
            "--password",
            "pw",
            "--include-audio",
        ]);
        match cli.command {
            Commands::Publish {
                private,
                password,
                include_audio,
                ..
            } => {
                assert!(private);
                assert_eq!(password, Some("pw".to_string()));
                assert!(include_audio);
            }
            _ => panic!("Expected Publish command"),
        }
    }

    #[test]
    fn cli_parses_annotate_kind() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::parse_from([
            "sauntercast",
            "annotate",
            &id,
            "--at",
            "12.5",
            "--text",
            "the fountain",
            "--kind",
            "map-pin",
        ]);
        match cli.command {
            Commands::Annotate { at, kind, text, .. } => {
                assert_eq!(at, 12.5);
                assert_eq!(kind, KindArg::MapPin);
                assert_eq!(text, Some("the fountain".to_string()));
            }
            _ => panic!("Expected Annotate command"),
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["sauntercast", "config", "set", "publish.repo", "a/b"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "publish.repo");
            assert_eq!(value, "a/b");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn kind_arg_converts() {
        assert_eq!(AnnotationKind::from(KindArg::Star), AnnotationKind::Star);
        assert_eq!(AnnotationKind::from(KindArg::MapPin), AnnotationKind::MapPin);
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("encoder"));
        assert!(is_valid_config_key("publish.repo"));
        assert!(!is_valid_config_key("invalid_key"));
    }

    #[test]
    fn verify_cli() {
        // Verify the CLI definition is valid
        Cli::command().debug_assert();
    }
}

//! Main app runner: config merging, adapter wiring and command dispatch

use std::env;
use std::process::ExitCode;

use uuid::Uuid;

use crate::application::ports::{ConfigStore, TraceStore};
use crate::application::{PublishError, PublishOptions, PublishPipeline};
use crate::domain::config::AppConfig;
use crate::domain::trace::{location_at, Annotation, AnnotationKind};
use crate::infrastructure::audio::AssetEncoder;
use crate::infrastructure::{
    FsTraceStore, GeminiTranscriber, GithubRemoteStore, PasswordCipher, XdgConfigStore,
};

use super::args::{Cli, Commands};
use super::config_cmd::handle_config_command;
use super::play::run_play;
use super::presenter::Presenter;
use super::record::{run_record, RecordOptions};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Run the parsed CLI command
pub async fn run(cli: Cli) -> ExitCode {
    let mut presenter = Presenter::new();
    let config = load_merged_config().await;

    let store = match &config.data_dir {
        Some(dir) => FsTraceStore::with_dir(dir),
        None => FsTraceStore::new(),
    };

    let result = match cli.command {
        Commands::Record {
            no_location,
            encoder,
        } => {
            let encoder = AssetEncoder::from_name(
                encoder.as_deref().unwrap_or_else(|| config.encoder_or_default()),
            );
            let options = RecordOptions {
                no_location,
                encoder,
                min_movement_m: config.min_movement_or_default(),
                gpsd_host: config.gpsd_host_or_default().to_string(),
                gpsd_port: config.gpsd_port_or_default(),
            };
            run_record(options, &store, &mut presenter).await
        }

        Commands::List => list_traces(&store, &presenter).await,

        Commands::Play { id } => run_play(id, &store, &mut presenter).await,

        Commands::Annotate { id, at, text, kind } => {
            annotate_trace(&store, &presenter, id, at, text, kind.into()).await
        }

        Commands::Transcribe { id } => transcribe_trace(&config, &store, &mut presenter, id).await,

        Commands::Publish {
            id,
            private,
            password,
            include_audio,
        } => {
            publish_trace(
                &config,
                &store,
                &mut presenter,
                id,
                PublishOptions {
                    is_public: !private,
                    password,
                    include_audio,
                },
            )
            .await
        }

        Commands::Fetch { id, password, save } => {
            fetch_trace(&config, &store, &presenter, id, password, save).await
        }

        Commands::Published => list_published(&config, &presenter).await,

        Commands::Unpublish { id } => unpublish_trace(&config, &presenter, id).await,

        Commands::Delete { id } => {
            let result = store.delete(id).await.map_err(|e| e.to_string());
            if result.is_ok() {
                presenter.success(&format!("deleted saunter {id}"));
            }
            result
        }

        Commands::Config { action } => {
            let config_store = XdgConfigStore::new();
            handle_config_command(action, &config_store, &presenter)
                .await
                .map_err(|e| e.to_string())
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(message) => {
            presenter.error(&message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Load and merge configuration: defaults < file < environment
pub async fn load_merged_config() -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|_| AppConfig::empty());

    let env_config = AppConfig {
        api_key: env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    AppConfig::defaults().merge(file_config).merge(env_config)
}

async fn list_traces(store: &FsTraceStore, presenter: &Presenter) -> Result<(), String> {
    let traces = store.list().await.map_err(|e| e.to_string())?;
    if traces.is_empty() {
        presenter.info("no saunters recorded yet");
        return Ok(());
    }
    for trace in &traces {
        presenter.trace_row(trace);
    }
    Ok(())
}

async fn annotate_trace(
    store: &FsTraceStore,
    presenter: &Presenter,
    id: Uuid,
    at_sec: f64,
    text: Option<String>,
    kind: AnnotationKind,
) -> Result<(), String> {
    let mut trace = store.get(id).await.map_err(|e| e.to_string())?;
    let timestamp_ms = (at_sec.max(0.0) * 1000.0).floor() as u64;
    let location = location_at(&trace, timestamp_ms).copied();
    trace.push_annotation(Annotation::new(kind, timestamp_ms, text, location));
    store.put(&trace).await.map_err(|e| e.to_string())?;
    presenter.success(&format!(
        "annotated {} at {}",
        id,
        Presenter::format_clock(timestamp_ms / 1000)
    ));
    Ok(())
}

async fn transcribe_trace(
    config: &AppConfig,
    store: &FsTraceStore,
    presenter: &mut Presenter,
    id: Uuid,
) -> Result<(), String> {
    use crate::application::ports::Transcriber;

    let api_key = config.api_key.clone().ok_or_else(|| {
        "Missing API key. Set GEMINI_API_KEY or run 'sauntercast config set api_key <key>'"
            .to_string()
    })?;

    let mut trace = store.get(id).await.map_err(|e| e.to_string())?;
    let audio = store.load_audio(&trace).await.map_err(|e| e.to_string())?;

    // Constructed here, dropped here: the transcriber lives only as long
    // as the command that needs it
    let transcriber = GeminiTranscriber::new(api_key);

    presenter.start_spinner("transcribing");
    let transcription = match transcriber.transcribe(&audio).await {
        Ok(transcription) => transcription,
        Err(e) => {
            presenter.spinner_fail("transcription failed");
            return Err(e.to_string());
        }
    };
    presenter.spinner_success(&format!("{} segments", transcription.chunks.len()));

    trace.transcription = Some(transcription);
    store.put(&trace).await.map_err(|e| e.to_string())?;
    presenter.success(&format!("transcription attached to {id}"));
    Ok(())
}

fn remote_store(config: &AppConfig) -> Result<GithubRemoteStore, String> {
    let repo = config
        .publish_repo()
        .ok_or_else(|| "No publish target. Run 'sauntercast config set publish.repo <owner/repo>'".to_string())?;
    let token = env::var("GITHUB_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "Missing GITHUB_TOKEN environment variable".to_string())?;
    Ok(GithubRemoteStore::new(
        repo,
        config.publish_branch_or_default(),
        token,
    ))
}

async fn publish_trace(
    config: &AppConfig,
    store: &FsTraceStore,
    presenter: &mut Presenter,
    id: Uuid,
    options: PublishOptions,
) -> Result<(), String> {
    let mut trace = store.get(id).await.map_err(|e| e.to_string())?;
    if options.include_audio {
        trace.audio = Some(store.load_audio(&trace).await.map_err(|e| e.to_string())?);
    }

    let pipeline = PublishPipeline::new(remote_store(config)?, PasswordCipher::new());

    presenter.start_spinner("publishing");
    let mut attempt = pipeline.publish(&trace, options.clone()).await;
    if matches!(attempt, Err(PublishError::ConcurrentIndexUpdate)) {
        // The index moved under us; re-read and re-apply once
        attempt = pipeline.publish(&trace, options).await;
    }

    match attempt {
        Ok(receipt) => {
            presenter.spinner_success("published");
            if receipt.encrypted {
                presenter.info("payload is password protected");
            }
            presenter.output(&receipt.url);
            Ok(())
        }
        Err(e) => {
            presenter.spinner_fail("publish failed");
            Err(e.to_string())
        }
    }
}

async fn fetch_trace(
    config: &AppConfig,
    store: &FsTraceStore,
    presenter: &Presenter,
    id: Uuid,
    password: Option<String>,
    save: bool,
) -> Result<(), String> {
    let pipeline = PublishPipeline::new(remote_store(config)?, PasswordCipher::new());
    let trace = pipeline
        .fetch(id, password.as_deref())
        .await
        .map_err(|e| e.to_string())?;

    presenter.trace_row(&trace);
    if save {
        store.put(&trace).await.map_err(|e| e.to_string())?;
        presenter.success(&format!("saved saunter {id}"));
    }
    Ok(())
}

async fn list_published(config: &AppConfig, presenter: &Presenter) -> Result<(), String> {
    let pipeline = PublishPipeline::new(remote_store(config)?, PasswordCipher::new());
    let entries = pipeline.list_published().await.map_err(|e| e.to_string())?;
    if entries.is_empty() {
        presenter.info("nothing published yet");
        return Ok(());
    }
    for entry in &entries {
        presenter.published_row(entry);
    }
    Ok(())
}

async fn unpublish_trace(
    config: &AppConfig,
    presenter: &Presenter,
    id: Uuid,
) -> Result<(), String> {
    let pipeline = PublishPipeline::new(remote_store(config)?, PasswordCipher::new());
    pipeline.unpublish(id).await.map_err(|e| e.to_string())?;
    presenter.success(&format!("unpublished saunter {id}"));
    Ok(())
}

#[cfg(feature = "tui")]
mod tui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use borane_studio::config::{self, Config, api_key_override, load_config, load_config_from};
use borane_studio::credential::mask_key;
use borane_studio::{
    Completion, CredentialHolder, CredentialStore, FileCredentialStore, GeminiConnector,
    MediaDir, MemoryCredentialStore, Studio, StudioError, extension_for, keep_copy,
};
use borane_transcript::{ImageSource, Message, Part};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BORANE_LOG";

#[derive(Parser)]
#[command(name = "bor")]
#[command(about = "Image and video generation with Gemini", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep the API key in memory only
    #[arg(long, global = true)]
    no_persist: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[cfg(feature = "tui")]
    /// Start the interactive studio (default)
    Studio,

    /// Generate an image and save it
    Image {
        /// What to draw
        prompt: String,

        /// Reference image (up to 3)
        #[arg(short, long)]
        attach: Vec<PathBuf>,

        /// Directory to save images into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Generate a video and save it
    Video {
        /// What to film
        prompt: String,

        /// Length in seconds (5 to 8)
        #[arg(short, long, default_value_t = 5)]
        duration: u32,

        #[arg(long, default_value = "720p", value_parser = ["720p", "1080p"])]
        resolution: String,

        #[arg(long, default_value = "16:9", value_parser = ["16:9", "9:16"])]
        aspect_ratio: String,

        /// Starting frame
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Where to save the video
        #[arg(short, long, default_value = "video.mp4")]
        out: PathBuf,
    },

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store a new key
    Set { key: String },
    /// Forget the stored key
    Clear,
    /// Print the key in use, masked
    Show,
}

fn init_logging(to_file: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    // The terminal belongs to the UI, so logs go to a file or nowhere
    let dir = config::data_dir();
    let file = std::fs::create_dir_all(&dir)
        .and_then(|()| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("bor.log"))
        });
    if let Ok(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
}

fn credential_store(no_persist: bool) -> Box<dyn CredentialStore> {
    if no_persist {
        return Box::new(MemoryCredentialStore::new());
    }
    match FileCredentialStore::default_location() {
        Some(store) => Box::new(store),
        None => {
            tracing::warn!("no config directory, API key will not be saved");
            Box::new(MemoryCredentialStore::new())
        }
    }
}

fn open_studio(config: &Config, no_persist: bool) -> (Studio<GeminiConnector>, MediaDir) {
    let credential =
        CredentialHolder::load(credential_store(no_persist)).with_override(api_key_override());
    let media = MediaDir::new(config.media_dir());
    let studio = Studio::new(
        GeminiConnector::from_config(config),
        credential,
        Arc::new(media.clone()),
        config.poll_timing(),
    );
    (studio, media)
}

fn refused(studio: &Studio<GeminiConnector>) -> anyhow::Error {
    if studio.needs_credential() {
        StudioError::MissingCredential.into()
    } else {
        StudioError::EmptyPrompt.into()
    }
}

fn model_message<'a>(
    studio: &'a Studio<GeminiConnector>,
    completion: Completion,
    video: bool,
) -> anyhow::Result<&'a Message> {
    let transcript = if video {
        studio.video().transcript()
    } else {
        studio.image().transcript()
    };
    match completion {
        Completion::Appended(id) => transcript
            .get(id)
            .context("generated message missing from transcript"),
        Completion::Failed(message) => bail!(message),
        Completion::Stale => bail!("result arrived after the session was reset"),
    }
}

fn save_images(message: &Message, out: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out)?;
    let mut saved = 0;
    for part in &message.parts {
        match part {
            Part::Text(text) => eprintln!("{}", text),
            Part::Image(image) => match &image.source {
                ImageSource::Inline { data } => {
                    saved += 1;
                    let bytes = STANDARD.decode(data).context("invalid image data")?;
                    let path = out.join(format!(
                        "image-{}-{}.{}",
                        message.id.0,
                        saved,
                        extension_for(&image.mime_type)
                    ));
                    std::fs::write(&path, bytes)?;
                    println!("{}", path.display());
                }
                ImageSource::Reference { uri } => println!("{}", uri),
            },
            Part::Video(_) => {}
        }
    }
    Ok(())
}

async fn run_image(
    studio: &mut Studio<GeminiConnector>,
    prompt: &str,
    attach: &[PathBuf],
    out: &Path,
) -> anyhow::Result<()> {
    let outcome = studio.image_mut().attach(attach);
    if let Some(notice) = outcome.notice {
        eprintln!("{}", notice);
    }

    let Some(completion) = studio.generate_image(prompt).await else {
        return Err(refused(studio));
    };
    let message = model_message(studio, completion, false)?;
    save_images(message, out)
}

async fn run_video(
    studio: &mut Studio<GeminiConnector>,
    prompt: &str,
    settings: (u32, String, String),
    image: Option<&Path>,
    out: &Path,
) -> anyhow::Result<()> {
    let (duration, resolution, aspect_ratio) = settings;
    {
        let video = studio.video_mut();
        let s = video.settings_mut();
        s.duration_seconds = duration;
        s.resolution = resolution;
        s.aspect_ratio = aspect_ratio;
        if let Some(image) = image {
            if let Some(notice) = video.attach(&[image]).notice {
                eprintln!("{}", notice);
            }
        }
    }

    let max_attempts = studio.timing().max_attempts;
    let Some(completion) = studio
        .generate_video(prompt, |state| {
            if let Some(line) = state.status_line(max_attempts) {
                eprintln!("{}", line);
            }
        })
        .await
    else {
        return Err(refused(studio));
    };

    let message = model_message(studio, completion, true)?;
    for part in &message.parts {
        if let Part::Video(video) = part {
            keep_copy(&video.handle, out)?;
            println!("{}", out.display());
        }
    }
    Ok(())
}

fn run_key(action: KeyAction, studio: &mut Studio<GeminiConnector>) {
    match action {
        KeyAction::Set { key } => {
            studio.set_credential(&key);
            println!("API key saved");
        }
        KeyAction::Clear => {
            studio.clear_credential();
            println!("API key cleared");
        }
        KeyAction::Show => match studio.credential() {
            Some(key) => println!("{}", mask_key(key)),
            None => println!("No API key set"),
        },
    }
}

async fn dispatch(
    command: Option<Command>,
    mut studio: Studio<GeminiConnector>,
) -> anyhow::Result<()> {
    match command {
        #[cfg(feature = "tui")]
        None | Some(Command::Studio) => {
            tui::run(studio).await?;
            Ok(())
        }
        #[cfg(not(feature = "tui"))]
        None => bail!("no command given, see --help"),
        Some(Command::Image {
            prompt,
            attach,
            out,
        }) => run_image(&mut studio, &prompt, &attach, &out).await,
        Some(Command::Video {
            prompt,
            duration,
            resolution,
            aspect_ratio,
            image,
            out,
        }) => {
            run_video(
                &mut studio,
                &prompt,
                (duration, resolution, aspect_ratio),
                image.as_deref(),
                &out,
            )
            .await
        }
        Some(Command::Key { action }) => {
            run_key(action, &mut studio);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "tui")]
    let interactive = matches!(cli.command, None | Some(Command::Studio));
    #[cfg(not(feature = "tui"))]
    let interactive = false;
    init_logging(interactive);

    let config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => load_config(),
    };
    let (studio, media) = open_studio(&config, cli.no_persist);

    // Every handle is released once the studio is gone
    let result = dispatch(cli.command, studio).await;
    media.cleanup();
    result
}

//! # yt2mp3 - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Caricamento della configurazione (file, variabili d'ambiente, flag)
//! - Avvio dello scheduler ed esecuzione del sottocomando richiesto
//!
//! ## Sottocomandi:
//! - `info <url>`: Anteprima dei metadati
//! - `convert <url>...`: Converte uno o più video e attende la fine
//! - `get <filename>`: Copia un MP3 completato in locale
//! - `outputs`: Elenca gli MP3 disponibili
//! - `tools`: Verifica yt-dlp e ffmpeg
//!
//! ## Esempio di utilizzo:
//! ```bash
//! yt2mp3 --out-dir ~/Music convert https://www.youtube.com/watch?v=dQw4w9WgXcQ --album "Singles"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yt2mp3::file_manager::FileManager;
use yt2mp3::json_output::{JsonMessage, ToolStatus};
use yt2mp3::platform::{is_command_available, FFMPEG, YTDLP};
use yt2mp3::progress::{ConversionStats, ProgressManager};
use yt2mp3::resolver::YtDlpResolver;
use yt2mp3::{Config, ConverterService, Pipeline, Scheduler, TaskRequest, TaskStore, Tools};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "yt2mp3")]
#[command(about = "Convert online videos into tagged MP3 files with cover art")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON lines on stdout instead of human readable output
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: ~/.config/yt2mp3/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for finished MP3 files
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Directory for downloaded media and covers
    #[arg(long, global = true)]
    tmp_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the metadata a conversion would use
    Info {
        url: String,
    },

    /// Convert one or more videos and wait for the results
    Convert {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output name without extension (single url only)
        #[arg(long)]
        slug: Option<String>,

        /// Title tag (overrides the video title)
        #[arg(long)]
        title: Option<String>,

        /// Artist tag (overrides the channel)
        #[arg(long)]
        artist: Option<String>,

        /// Album tag
        #[arg(long)]
        album: Option<String>,

        /// Cover image URL (overrides the video thumbnail)
        #[arg(long)]
        thumbnail: Option<String>,

        /// Remove downloaded media and covers once each task is done
        #[arg(long)]
        cleanup: bool,
    },

    /// Copy a finished MP3 out of the output directory
    Get {
        filename: String,

        /// Serve as an attachment
        #[arg(long)]
        download: bool,

        /// Destination directory
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },

    /// List finished MP3 files
    Outputs,

    /// Check that yt-dlp and ffmpeg are available
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args).await?;
    let json = args.json;

    let outcome = match args.command {
        Command::Info { url } => info_command(&config, &url, json).await,
        Command::Convert {
            urls,
            slug,
            title,
            artist,
            album,
            thumbnail,
            cleanup,
        } => {
            if slug.is_some() && urls.len() > 1 {
                Err(anyhow::anyhow!("--slug can only be used with a single url"))
            } else {
                let template = TaskRequest {
                    url: String::new(),
                    slug: slug.unwrap_or_default(),
                    thumbnail: thumbnail.unwrap_or_default(),
                    title: title.unwrap_or_default(),
                    artist: artist.unwrap_or_default(),
                    album: album.unwrap_or_default(),
                };
                let config = Config {
                    cleanup_temp: config.cleanup_temp || cleanup,
                    ..config
                };
                convert_command(&config, urls, template, json).await
            }
        }
        Command::Get { filename, download, dest } => get_command(&config, &filename, download, &dest, json).await,
        Command::Outputs => outputs_command(&config, json),
        Command::Tools => tools_command(&config, json).await,
    };

    if let Err(ref e) = outcome {
        if json {
            JsonMessage::error(e.to_string(), e.chain().nth(1).map(|s| s.to_string())).emit();
        }
    }
    outcome
}

async fn load_config(args: &Args) -> Result<Config> {
    let path = args.config.clone().or_else(Config::default_path);

    let mut config = match &path {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env();

    if let Some(dir) = &args.out_dir {
        config.out_dir = dir.clone();
    }
    if let Some(dir) = &args.tmp_dir {
        config.tmp_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn info_command(config: &Config, url: &str, json: bool) -> Result<()> {
    let tools = Tools::from_config(config);
    let service = ConverterService::new(
        Arc::new(TaskStore::new(config.history_capacity)),
        Arc::new(YtDlpResolver::new(tools.ytdlp)),
        config.out_dir.clone(),
    );

    let spinner = (!json).then(|| ProgressManager::spinner("🔎 Resolving..."));
    let preview = service.resolve(url).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let preview = preview?;

    if json {
        JsonMessage::Preview { preview }.emit();
    } else {
        println!("Title:     {}", preview.title);
        println!("Artist:    {}", preview.artist);
        println!("Album:     {}", preview.album);
        println!("Slug:      {}", preview.slug);
        println!("Thumbnail: {}", preview.thumbnail);
    }
    Ok(())
}

async fn convert_command(config: &Config, urls: Vec<String>, template: TaskRequest, json: bool) -> Result<()> {
    let tools = Tools::from_config(config);
    tools.check_dependencies().await?;

    let pipeline = Arc::new(Pipeline::with_tools(config, &tools));
    let store = Arc::new(TaskStore::new(config.history_capacity));
    let service = ConverterService::new(Arc::clone(&store), pipeline.resolver(), config.out_dir.clone());

    let mut handles = Vec::with_capacity(urls.len());
    for url in urls {
        let handle = service.submit(TaskRequest { url, ..template.clone() })?;
        let task = handle.snapshot();
        if json {
            JsonMessage::submitted(&task).emit();
        } else {
            info!("Submitted task {}: {}", task.id, task.url);
        }
        handles.push(handle);
    }

    let start_time = std::time::Instant::now();
    let scheduler = Scheduler::start(store, pipeline);
    let progress = if json {
        ProgressManager::hidden(handles.len() as u64)
    } else {
        ProgressManager::new(handles.len() as u64)
    };

    // handles outlive history eviction, so poll them rather than the history
    let mut stats = ConversionStats::new();
    let mut reported = HashSet::new();
    while reported.len() < handles.len() {
        for task in handles.iter().map(|h| h.snapshot()) {
            if task.is_pending || !reported.insert(task.id) {
                continue;
            }
            stats.record(&task);

            if json {
                JsonMessage::task_complete(&task).emit();
            } else if let Some(error) = &task.error {
                progress.update(&format!("❌ {}: {}", task.url, error));
            } else {
                progress.update(&format!("✅ {}", task.output_file_name().unwrap_or_default()));
            }
        }
        if reported.len() < handles.len() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    scheduler.stop().await;
    progress.finish(&stats.format_summary());

    if json {
        JsonMessage::complete(&stats, start_time.elapsed().as_secs_f64()).emit();
    } else {
        for task in handles.iter().map(|h| h.snapshot()) {
            match (&task.result, &task.error) {
                (Some(path), _) => println!("✅ {}", path.display()),
                (None, Some(error)) => println!("❌ {} ({})", task.url, error),
                (None, None) => {}
            }
        }
    }

    if stats.has_failures() {
        return Err(anyhow::anyhow!("{} of {} tasks failed", stats.failed, stats.tasks));
    }
    Ok(())
}

async fn get_command(config: &Config, filename: &str, download: bool, dest: &Path, json: bool) -> Result<()> {
    let tools = Tools::from_config(config);
    let service = ConverterService::new(
        Arc::new(TaskStore::new(config.history_capacity)),
        Arc::new(YtDlpResolver::new(tools.ytdlp)),
        config.out_dir.clone(),
    );

    let mut output = service.fetch_output(filename, download).await?;
    FileManager::ensure_dir(dest).await?;
    let target = dest.join(&output.name);

    let same_file = match (target.canonicalize(), output.path.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same_file {
        warn!("{} is already in the destination directory", output.name);
    } else {
        let mut file = tokio::fs::File::create(&target)
            .await
            .with_context(|| format!("Failed to create {}", target.display()))?;
        tokio::io::copy(&mut output.file, &mut file).await?;
    }

    if json {
        JsonMessage::Saved {
            name: output.name,
            path: target,
            size: output.len,
            content_type: output.content_type.to_string(),
            content_disposition: output.content_disposition,
        }
        .emit();
    } else {
        println!(
            "💾 {} ({}, {}) -> {}",
            output.name,
            output.content_type,
            FileManager::format_size(output.len),
            target.display()
        );
        if let Some(disposition) = output.content_disposition {
            println!("Content-Disposition: {}", disposition);
        }
    }
    Ok(())
}

fn outputs_command(config: &Config, json: bool) -> Result<()> {
    let files = FileManager::list_outputs(&config.out_dir)?;

    if json {
        JsonMessage::Outputs { files }.emit();
        return Ok(());
    }

    if files.is_empty() {
        println!("No MP3 files in {}", config.out_dir.display());
    }
    for file in files {
        println!("{:>10}  {}", FileManager::format_size(file.size), file.name);
    }
    Ok(())
}

async fn tools_command(config: &Config, json: bool) -> Result<()> {
    let tools = Tools::from_config(config);
    let candidates = [(YTDLP, tools.ytdlp), (FFMPEG, tools.ffmpeg)];

    let checks = futures::future::join_all(candidates.iter().map(|(_, path)| is_command_available(path))).await;
    let statuses: Vec<ToolStatus> = candidates
        .into_iter()
        .zip(checks)
        .map(|((name, path), available)| ToolStatus {
            name: name.to_string(),
            path,
            available,
        })
        .collect();

    let missing = statuses.iter().filter(|s| !s.available).count();
    if json {
        JsonMessage::Tools { tools: statuses }.emit();
    } else {
        for status in &statuses {
            let mark = if status.available { "✅" } else { "❌" };
            println!("{} {} ({})", mark, status.name, status.path.display());
        }
    }

    if missing > 0 {
        return Err(anyhow::anyhow!("{} required tool(s) missing", missing));
    }
    Ok(())
}

use advent_gen::{
    logger::{self, LogLevel, LoggerConfig},
    Action, AppConfig, GenerationResult, ImageSize, Notification, NotificationKind, Session,
};
use clap::Parser;
use colored::*;
use image::GenericImageView;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "advent-gen", version)]
/// Turn a short phrase into a festive image with OpenAI.
struct Cli {
    /// Phrase to illustrate. Omit it to start an interactive session.
    phrase: Option<String>,

    #[arg(long, help = "Save the image and prompt after generating")]
    save: bool,

    #[arg(long, env = "ADVENT_SAVE_DIR")]
    /// Folder images are saved to. Env: ADVENT_SAVE_DIR
    save_dir: Option<PathBuf>,

    #[arg(long, env = "ADVENT_IMAGE_SIZE")]
    /// 1024x1024, 1792x1024 or 1024x1792. Env: ADVENT_IMAGE_SIZE
    image_size: Option<ImageSize>,

    #[arg(long, help = "Enable debug logging", env = "ADVENT_DEBUG")]
    debug: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    json_logs: bool,

    #[arg(long, help = "Also append logs to this file")]
    log_file: Option<String>,
}

impl Cli {
    fn logger_config(&self) -> LoggerConfig {
        let mut config = if self.json_logs {
            LoggerConfig::production()
        } else if self.debug {
            LoggerConfig::development()
        } else {
            LoggerConfig::default().with_level(LogLevel::Warn)
        };
        if self.debug {
            config = config.with_level(LogLevel::Debug);
        }
        if let Some(path) = &self.log_file {
            config = config.with_file_output(path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    logger::init_with_config(cli.logger_config())?;
    if dotenv_loaded {
        log::debug!(".env file loaded");
    } else {
        log::debug!("No .env file found, using process environment");
    }

    let mut config = AppConfig::from_env()?;
    if let Some(dir) = &cli.save_dir {
        config.save.folder = dir.clone();
    }
    if let Some(size) = cli.image_size {
        config.openai.image_size = size;
    }

    if !config.openai.has_api_key() {
        log::warn!("OPENAI_API_KEY is not set; generation will be refused");
    }
    log::info!("Saving to {}", config.save.folder.display());

    let session = Arc::new(Session::from_config(&config)?);

    let ok = match cli.phrase.as_deref() {
        Some(phrase) => run_once(&session, phrase, cli.save).await,
        None => run_interactive(&session).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_once(session: &Session, phrase: &str, save: bool) -> bool {
    let Some(result) = generate(session, phrase).await else {
        return false;
    };
    display(session, &result).await;

    if save {
        let notification = session.save_and_notify().await;
        show(&notification);
        return !notification.is_error();
    }
    true
}

async fn run_interactive(session: &Session) -> Result<bool, Box<dyn std::error::Error>> {
    println!(
        "{} Type a phrase to generate, {} to save, {} to exit.",
        "🎄".green(),
        ":save".bold(),
        ":quit".bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let marker = if session.can_save() { "*" } else { "" };
        print!("{}{} ", "advent".green().bold(), format!("{}>", marker).green());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(true);
        };

        match line.trim() {
            "" => continue,
            ":quit" | ":q" | ":exit" => return Ok(true),
            ":help" => {
                println!(":save   save the last image and prompt to {}", session.save_location());
                println!(":state  show what can be done right now");
                println!(":quit   exit");
            }
            ":state" => {
                println!(
                    "state: {:?}, generate: {}, save: {}",
                    session.state(),
                    session.can_generate(),
                    session.can_save()
                );
            }
            ":save" => show(&session.save_and_notify().await),
            phrase => {
                if let Some(result) = generate(session, phrase).await {
                    display(session, &result).await;
                }
            }
        }
    }
}

async fn generate(session: &Session, phrase: &str) -> Option<GenerationResult> {
    println!("{}", "Working...".bright_black());
    let outcome = session
        .generate_with_progress(phrase, |prompt| {
            println!("{}\n{}\n", "Prompt:".bold(), prompt.italic());
        })
        .await;

    match outcome {
        Ok(result) => Some(result),
        Err(e) => {
            log::error!("Generation failed: {}", e);
            show(&Notification::from_error(Action::Generate, &e));
            None
        }
    }
}

async fn display(session: &Session, result: &GenerationResult) {
    println!("{} {}", "Image:".bold(), result.image);

    match session.current_image().await {
        Ok(bytes) => match image::load_from_memory(&bytes) {
            Ok(decoded) => {
                let (width, height) = decoded.dimensions();
                let format = image::guess_format(&bytes)
                    .map(|f| format!("{:?}", f))
                    .unwrap_or_else(|_| "unknown".into());
                println!("{} {}x{} {} ({} bytes)", "✔".green(), width, height, format, bytes.len());
            }
            Err(e) => log::warn!("Could not decode the image for display: {}", e),
        },
        Err(e) => show(&Notification::from_error(Action::Display, &e)),
    }
}

fn show(notification: &Notification) {
    match notification.kind {
        NotificationKind::Success => {
            println!("{} {}", notification.title.green().bold(), notification.message)
        }
        NotificationKind::Error => {
            eprintln!("{} {}", notification.title.red().bold(), notification.message)
        }
    }
}

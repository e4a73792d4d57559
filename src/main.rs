use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use dzload::{cli, config, error, management::BatchFile, types::Quality, warning};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store the session secret (arl cookie)
    Login(LoginOptions),

    /// Download an album, artist, playlist, profile or track URL
    Download(DownloadOptions),

    /// Download every URL listed in the batch file
    Batch(BatchOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct LoginOptions {
    arl: String,
}

#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Quality of the downloaded files
    #[clap(long, short, value_enum, default_value_t = Quality::Mp3_320)]
    quality: Quality,

    /// Root directory of the download tree
    #[clap(long, short, default_value = "DOWNLOADS")]
    path: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct DownloadOptions {
    url: String,

    #[clap(flatten)]
    output: OutputOptions,
}

#[derive(Parser, Debug, Clone)]
pub struct BatchOptions {
    /// Newline-delimited URL list, consumed from the top (defaults to DZ_BATCH_FILE)
    #[clap(long, short)]
    file: Option<PathBuf>,

    #[clap(flatten)]
    output: OutputOptions,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let (ctx, job) = match cli.command {
        Command::Login(opt) => return cli::login(opt.arl).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            return generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        }
        Command::Download(opt) => {
            let ctx = cli::connect(opt.output.path, opt.output.quality).await;
            (ctx, Job::Url(opt.url))
        }
        Command::Batch(opt) => {
            let ctx = cli::connect(opt.output.path, opt.output.quality).await;
            let file = opt.file.unwrap_or_else(config::batch_file);
            (ctx, Job::File(BatchFile::new(file)))
        }
    };

    let run = async {
        match job {
            Job::Url(url) => cli::download(&ctx, &url, false).await,
            Job::File(file) => cli::batch(&ctx, file).await,
        }
    };

    // The download future is dropped before the interrupt is handled, so no
    // pipeline still holds the tracker.
    let outcome = tokio::select! {
        outcome = run => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };

    ctx.tracker.clear_progress();
    match outcome {
        Some(Ok(())) => {}
        Some(Err(e)) => error!("{}", e),
        None => {
            if let Err(e) = ctx.tracker.close_ledgers().await {
                log::error!("cannot close ledgers: {e}");
            }
            warning!("Interrupted");
            std::process::exit(1);
        }
    }
}

enum Job {
    Url(String),
    File(BatchFile),
}

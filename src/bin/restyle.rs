//! CLI for Restyle - image-to-image generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use restyle::image::providers::{GeminiModel, GeminiProvider, API_KEY_ENV_VARS};
use restyle::{
    AspectRatio, GeneratedImage, GeneratedResult, ImageProvider, ImageSize, PendingGeneration,
    SessionController,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "restyle")]
#[command(about = "Transform images with a text prompt via Gemini image models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform one image and save the result
    Generate(GenerateArgs),

    /// Interactive session with an in-memory gallery
    Session(SessionArgs),

    /// List available models
    Models,
}

#[derive(Args)]
struct ProviderArgs {
    /// Model to use
    #[arg(short, long, value_enum, default_value = "nano-banana-pro")]
    model: ModelArg,

    /// Output resolution tier
    #[arg(long, value_enum, default_value = "1K")]
    size: SizeArg,

    /// Aspect ratio of the output
    #[arg(long, value_enum, default_value = "1:1")]
    aspect_ratio: AspectRatioArg,
}

impl ProviderArgs {
    fn build(&self) -> anyhow::Result<GeminiProvider> {
        Ok(GeminiProvider::builder()
            .model(self.model.into())
            .image_size(self.size.into())
            .build()?)
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the transformation
    prompt: String,

    /// Source image
    #[arg(short, long)]
    input: PathBuf,

    /// Directory to save the result into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Args)]
struct SessionArgs {
    /// Directory that `save` writes into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    NanoBanana,
    NanoBananaPro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::NanoBanana => GeminiModel::NanoBanana,
            ModelArg::NanoBananaPro => GeminiModel::NanoBananaPro,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SizeArg {
    #[value(name = "1K")]
    OneK,
    #[value(name = "2K")]
    TwoK,
    #[value(name = "4K")]
    FourK,
}

impl From<SizeArg> for ImageSize {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::OneK => ImageSize::OneK,
            SizeArg::TwoK => ImageSize::TwoK,
            SizeArg::FourK => ImageSize::FourK,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "3:4")]
    StandardPortrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "16:9")]
    Landscape,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            generate(args, cli.json).await?;
        }
        Commands::Session(args) => {
            run_session(args).await?;
        }
        Commands::Models => {
            list_models(cli.json)?;
        }
    }

    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = args.provider.build()?;
    let model = provider.model();
    let mut session =
        SessionController::new(provider).with_aspect_ratio(args.provider.aspect_ratio.into());

    if !session.select_file(&args.input).await? {
        anyhow::bail!("{} is not an image", args.input.display());
    }
    session.set_prompt(&args.prompt);

    let result = session.generate().await?;

    std::fs::create_dir_all(&args.output)?;
    let path = result.save_to(&args.output)?;

    if json_output {
        let output = serde_json::json!({
            "success": true,
            "id": result.id,
            "output": path.display().to_string(),
            "prompt": result.prompt,
            "timestamp": result.timestamp,
            "model": model.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Generated image: {} via {}",
            path.display(),
            model.display_name()
        );
    }

    Ok(())
}

/// A generation admitted by the session whose provider call is running.
struct InFlight {
    pending: PendingGeneration,
    task: JoinHandle<restyle::Result<GeneratedImage>>,
}

enum Flow {
    Continue,
    Quit,
}

async fn run_session(args: SessionArgs) -> anyhow::Result<()> {
    let provider = Arc::new(args.provider.build()?);
    let mut session = SessionController::new(Arc::clone(&provider))
        .with_aspect_ratio(args.provider.aspect_ratio.into());
    let mut in_flight: Option<InFlight> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{} session. Type `help` for commands.", provider.model().display_name());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let flow = handle_command(&mut session, &provider, &mut in_flight, &args.output, line.trim()).await;
                if let Flow::Quit = flow {
                    break;
                }
            }
            joined = async {
                match in_flight.as_mut() {
                    Some(f) => (&mut f.task).await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                if let Some(f) = in_flight.take() {
                    report_outcome(&mut session, f.pending, joined?);
                }
            }
        }
    }

    if let Some(f) = in_flight.take() {
        println!("Waiting for the running generation to finish...");
        let outcome = f.task.await?;
        report_outcome(&mut session, f.pending, outcome);
    }

    Ok(())
}

async fn handle_command(
    session: &mut SessionController<Arc<GeminiProvider>>,
    provider: &Arc<GeminiProvider>,
    in_flight: &mut Option<InFlight>,
    output: &Path,
    line: &str,
) -> Flow {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        "image" => match session.select_file(rest).await {
            Ok(true) => {
                if let Some(image) = &session.state().source_image {
                    println!("Selected {} ({} bytes)", image.mime_type(), image.size());
                }
            }
            Ok(false) => println!("Ignored {rest}: not an image"),
            Err(e) => println!("Error: {}", e.user_message()),
        },
        "prompt" => {
            session.set_prompt(rest);
            println!("Prompt set");
        }
        "generate" => match session.begin_generation() {
            Ok(pending) => {
                let provider = Arc::clone(provider);
                let request = pending.request().clone();
                let task = tokio::spawn(async move { provider.generate(&request).await });
                *in_flight = Some(InFlight { pending, task });
                println!("Generating...");
            }
            Err(e) => println!("Error: {}", e.user_message()),
        },
        "gallery" => print_gallery(session.results()),
        "save" => match session.result(rest) {
            Some(result) => match std::fs::create_dir_all(output)
                .map_err(restyle::RestyleError::from)
                .and_then(|_| result.save_to(output))
            {
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => println!("Error: {}", e.user_message()),
            },
            None => println!("No result with id {rest}"),
        },
        "copy" => match session.result(rest) {
            Some(result) => println!("{}", result.prompt),
            None => println!("No result with id {rest}"),
        },
        "status" => {
            let state = session.state();
            match &state.source_image {
                Some(image) => println!("Image:      {} ({} bytes)", image.mime_type(), image.size()),
                None => println!("Image:      (none)"),
            }
            println!("Prompt:     {}", state.prompt);
            println!("Generating: {}", state.is_generating);
            if let Some(error) = &state.error {
                println!("Error:      {error}");
            }
            println!("Results:    {}", state.results.len());
        }
        "help" => print_help(),
        "quit" | "exit" => return Flow::Quit,
        other => println!("Unknown command `{other}`. Type `help` for commands."),
    }

    Flow::Continue
}

fn report_outcome(
    session: &mut SessionController<Arc<GeminiProvider>>,
    pending: PendingGeneration,
    outcome: restyle::Result<GeneratedImage>,
) {
    match session.finish_generation(pending, outcome) {
        Ok(result) => println!("Generated {} ({} in gallery)", result.id, session.results().len()),
        Err(_) => {
            let message = session
                .state()
                .error
                .clone()
                .unwrap_or_else(|| restyle::FALLBACK_ERROR_MESSAGE.to_string());
            println!("Error: {message}");
        }
    }
}

fn print_gallery(results: &[GeneratedResult]) {
    if results.is_empty() {
        println!("Gallery is empty");
        return;
    }
    println!("{} creations:", results.len());
    for result in results {
        let time = result.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S");
        println!("  {}  {}  {}", result.id, time, result.prompt);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  image <path>   select the source image");
    println!("  prompt <text>  set the prompt");
    println!("  generate       transform the source image");
    println!("  gallery        list results, newest first");
    println!("  save <id>      write a result to the output directory");
    println!("  copy <id>      print the prompt of a result");
    println!("  status         show the session state");
    println!("  quit           leave (waits for a running generation)");
}

fn list_models(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ModelInfo {
        id: &'static str,
        name: &'static str,
        default: bool,
    }

    let models: Vec<ModelInfo> = GeminiModel::ALL
        .iter()
        .map(|m| ModelInfo {
            id: m.as_str(),
            name: m.display_name(),
            default: *m == GeminiModel::default(),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&models)?);
    } else {
        println!("Available models:\n");
        for m in &models {
            let marker = if m.default { "*" } else { " " };
            println!("  {} {} ({})", marker, m.name, m.id);
        }
        println!("\nAPI key: {}", API_KEY_ENV_VARS.join(" or "));
    }

    Ok(())
}

use anyhow::{Context, Result};
use base64::Engine;
use clap::{Args, FromArgMatches, Parser, Subcommand};
use cream_room::config::{EnvSource, Settings};
use cream_room::llm::HttpChatGateway;
use cream_room::pipeline::{extract_items, regenerate_room, ImageUpload};
use cream_room::server::{self, AppState, ServerOptions};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cream-room",
    about = "Cream-style room makeover and furnishing list generator",
    version
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve(ServeArgs),
    /// Redecorate one photo and print (or save) the generated image
    Regenerate {
        /// Room photo to redecorate
        photo: PathBuf,
        /// Write the generated image here instead of printing its reference
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Extract a furnishing list from an image URL, data URI, or local file
    Extract {
        /// Image URL, `data:` URI, or path to a local image file
        image: String,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "CREAM_ROOM_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Maximum accepted upload size in MiB
    #[arg(long, default_value_t = 20)]
    max_upload_mb: usize,
}

impl ServeArgs {
    /// Serve options when no subcommand was given, resolved by clap so env defaults still apply.
    fn resolve_default() -> Result<Self, clap::Error> {
        let matches =
            Self::augment_args(clap::Command::new("serve")).try_get_matches_from(["serve"])?;
        Self::from_arg_matches(&matches)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::resolve(&EnvSource::from_current_dir());

    let command = match cli.command {
        Some(command) => command,
        None => Command::Serve(ServeArgs::resolve_default()?),
    };

    match command {
        Command::Serve(args) => {
            let state = AppState::from_settings(settings)?;
            let options = ServerOptions {
                max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
            };
            server::serve(args.listen, server::build_router(state, &options)).await
        }
        Command::Regenerate { photo, out } => {
            let gateway = HttpChatGateway::new(settings.gateway?)?;
            let bytes = tokio::fs::read(&photo)
                .await
                .with_context(|| format!("Failed to read {}", photo.display()))?;
            let upload = ImageUpload::new(bytes, guess_image_mime(&photo));
            let image_ref = regenerate_room(&gateway, &settings.models.generate, &upload).await?;
            match out {
                Some(path) => {
                    save_image(&image_ref, &path).await?;
                    eprintln!("  + Saved generated room to {}", path.display());
                }
                None => println!("{}", image_ref),
            }
            Ok(())
        }
        Command::Extract { image } => {
            let gateway = HttpChatGateway::new(settings.gateway?)?;
            let image_ref = resolve_image_arg(&image).await?;
            let extracted = extract_items(&gateway, &settings.models.extract, &image_ref).await?;
            if extracted.repaired {
                eprintln!("  (list needed one repair round-trip)");
            }
            println!("{}", serde_json::to_string_pretty(&extracted.items)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn guess_image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// URLs and data URIs pass through; anything else is read as a local file.
async fn resolve_image_arg(image: &str) -> Result<String> {
    if image.starts_with("http://") || image.starts_with("https://") || image.starts_with("data:")
    {
        return Ok(image.to_string());
    }
    let path = Path::new(image);
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImageUpload::new(bytes, guess_image_mime(path)).to_data_url())
}

async fn save_image(image_ref: &str, path: &Path) -> Result<()> {
    let bytes = if let Some(rest) = image_ref.strip_prefix("data:") {
        let (_, payload) = rest
            .split_once(";base64,")
            .context("Generated data URI is not base64-encoded")?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .context("Generated data URI has an invalid base64 payload")?
    } else {
        let response = reqwest::get(image_ref)
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to download {}", image_ref))?;
        response.bytes().await?.to_vec()
    };
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_serve_matches_serve_subcommand() {
        // Only test in this binary that touches the variable.
        std::env::set_var("CREAM_ROOM_LISTEN", "0.0.0.0:8080");

        let implicit = ServeArgs::resolve_default().unwrap();
        let explicit = match Cli::parse_from(["cream-room", "serve"]).command {
            Some(Command::Serve(args)) => args,
            other => panic!("expected serve, got {:?}", other),
        };
        std::env::remove_var("CREAM_ROOM_LISTEN");

        assert_eq!(implicit.listen, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(implicit.listen, explicit.listen);
        assert_eq!(implicit.max_upload_mb, 20);
    }

    #[test]
    fn test_guess_image_mime() {
        assert_eq!(guess_image_mime(Path::new("room.JPG")), Some("image/jpeg"));
        assert_eq!(guess_image_mime(Path::new("room.webp")), Some("image/webp"));
        assert_eq!(guess_image_mime(Path::new("room")), None);
    }
}

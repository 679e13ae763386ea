use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zopmark::{
    Artifact, Compositor, JsonFileBackend, PersistStatus, Position, Settings, WatermarkConfig,
    WatermarkConfigStore,
};

#[derive(Parser, Debug)]
#[command(name = "zopmark", version)]
struct Cli {
    /// Settings JSON file.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Override the config store directory.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Override the storage key inside the store directory.
    #[arg(long, global = true)]
    storage_key: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored watermark configs.
    List,
    /// Print one config as JSON.
    Show(ShowArgs),
    /// Store a text watermark and make it active.
    AddText(AddTextArgs),
    /// Store an image watermark and make it active.
    AddImage(AddImageArgs),
    /// Delete a stored config.
    Remove(IdArgs),
    /// Change the active config.
    Select(SelectArgs),
    /// Watermark an image or video file.
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ShowArgs {
    /// Show the active config.
    #[arg(long)]
    active: bool,
    /// Show the config with this id.
    #[arg(long)]
    id: Option<String>,
}

#[derive(Args, Debug)]
struct IdArgs {
    /// Config id.
    #[arg(long)]
    id: String,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SelectArgs {
    /// Activate the config with this id.
    #[arg(long)]
    id: Option<String>,
    /// Clear the active selection.
    #[arg(long)]
    none: bool,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Config id. Saving an existing id replaces it.
    #[arg(long)]
    id: String,

    /// Display name.
    #[arg(long)]
    name: Option<String>,

    /// Blend opacity in [0, 1].
    #[arg(long, default_value_t = zopmark::DEFAULT_OPACITY)]
    opacity: f32,

    /// Box side as a fraction of the shorter host dimension.
    #[arg(long, default_value_t = zopmark::DEFAULT_SCALE)]
    scale: f32,

    /// Horizontal safe-zone position in [0, 1] (default: flush bottom-right).
    #[arg(long, requires = "y")]
    x: Option<f32>,

    /// Vertical safe-zone position in [0, 1].
    #[arg(long, requires = "x")]
    y: Option<f32>,
}

#[derive(Args, Debug)]
struct AddTextArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Watermark text.
    #[arg(long)]
    text: String,

    /// Fill color as `RRGGBB` or `RRGGBBAA` hex.
    #[arg(long, default_value = "ffffffff")]
    color: String,

    /// Preferred font family.
    #[arg(long)]
    font_family: Option<String>,
}

#[derive(Args, Debug)]
struct AddImageArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Overlay image file (PNG, WebP, ...).
    #[arg(long)]
    image: PathBuf,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Input image or video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// MIME type of the input (guessed from the extension when omitted).
    #[arg(long)]
    mime: Option<String>,

    /// Use this config instead of the active one.
    #[arg(long)]
    id: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ZOPMARK_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    match cli.cmd {
        Command::List => cmd_list(&settings),
        Command::Show(args) => cmd_show(&settings, args),
        Command::AddText(args) => cmd_add_text(&settings, args),
        Command::AddImage(args) => cmd_add_image(&settings, args),
        Command::Remove(args) => cmd_remove(&settings, args),
        Command::Select(args) => cmd_select(&settings, args),
        Command::Apply(args) => cmd_apply(&settings, args),
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::from_path(path)?,
        None => Settings::default(),
    };
    if let Some(dir) = &cli.store_dir {
        settings.store_dir = dir.clone();
    }
    if let Some(key) = &cli.storage_key {
        settings.storage_key = key.clone();
    }
    Ok(settings)
}

fn open_store(settings: &Settings) -> anyhow::Result<WatermarkConfigStore<JsonFileBackend>> {
    Ok(settings.open_store()?)
}

fn check_persisted(status: PersistStatus) -> anyhow::Result<()> {
    match status {
        PersistStatus::Persisted => Ok(()),
        PersistStatus::Failed(e) => Err(e).context("change applied but not persisted"),
    }
}

fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let active = store.active_id();
    for c in store.list() {
        let marker = if active.as_deref() == Some(c.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}\t{:?}\t{}\topacity={} scale={}",
            c.id,
            c.kind(),
            c.display_name(),
            c.opacity,
            c.scale
        );
    }
    Ok(())
}

fn cmd_show(settings: &Settings, args: ShowArgs) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let config = match args.id {
        Some(id) => store
            .get(&id)
            .ok_or_else(|| zopmark::WatermarkError::config_not_found(id.as_str()))?,
        None => match store.get_active() {
            Some(c) => c,
            None => {
                eprintln!("no active watermark");
                return Ok(());
            }
        },
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn apply_common(config: WatermarkConfig, common: &CommonArgs) -> WatermarkConfig {
    let mut config = config
        .with_opacity(common.opacity)
        .with_scale(common.scale);
    if let Some(name) = &common.name {
        config = config.with_name(name.as_str());
    }
    if let (Some(x), Some(y)) = (common.x, common.y) {
        config = config.with_position(Position::SafeZone { x, y });
    }
    config
}

fn cmd_add_text(settings: &Settings, args: AddTextArgs) -> anyhow::Result<()> {
    let color = parse_hex_color(&args.color)?;
    let mut config = apply_common(
        WatermarkConfig::text(args.common.id.as_str(), args.text),
        &args.common,
    );
    if let zopmark::Overlay::Text(t) = &mut config.overlay {
        t.color = color;
        t.font_family = args.font_family;
    }

    let store = open_store(settings)?;
    check_persisted(store.save(config)?)?;
    eprintln!("saved '{}' (active)", args.common.id);
    Ok(())
}

fn cmd_add_image(settings: &Settings, args: AddImageArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("read overlay image '{}'", args.image.display()))?;
    image::guess_format(&bytes)
        .with_context(|| format!("'{}' is not a supported image", args.image.display()))?;
    let config = apply_common(
        WatermarkConfig::image(args.common.id.as_str(), bytes),
        &args.common,
    );

    let store = open_store(settings)?;
    check_persisted(store.save(config)?)?;
    eprintln!("saved '{}' (active)", args.common.id);
    Ok(())
}

fn cmd_remove(settings: &Settings, args: IdArgs) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    check_persisted(store.delete(&args.id)?)?;
    eprintln!("removed '{}'", args.id);
    Ok(())
}

fn cmd_select(settings: &Settings, args: SelectArgs) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let id = if args.none { None } else { args.id.as_deref() };
    check_persisted(store.select(id)?)?;
    match id {
        Some(id) => eprintln!("active: '{id}'"),
        None => eprintln!("active: none"),
    }
    Ok(())
}

fn cmd_apply(settings: &Settings, args: ApplyArgs) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let config = match &args.id {
        Some(id) => Some(
            store
                .get(id)
                .ok_or_else(|| zopmark::WatermarkError::config_not_found(id.as_str()))?,
        ),
        None => store.get_active(),
    };

    let mime = match args.mime.clone() {
        Some(m) => m,
        None => guess_mime(&args.in_path)?,
    };
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read input '{}'", args.in_path.display()))?;
    let artifact = Artifact::from_mime(bytes, &mime)?;

    let compositor = Compositor::new(settings.compositor.clone())?;
    let (out, fallback) = compositor.composite_or_original(&artifact, config.as_ref())?;
    if let Some(e) = fallback {
        eprintln!("warning: watermark not applied ({e}); writing original");
    }
    if out.mime() != artifact.mime() {
        eprintln!("note: output re-encoded as {}", out.mime());
    }

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, out.bytes())
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn guess_mime(path: &Path) -> anyhow::Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let video = match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    };
    if let Some(m) = video {
        return Ok(m.to_string());
    }
    let format = image::ImageFormat::from_extension(&ext).with_context(|| {
        format!(
            "cannot guess MIME type of '{}'; pass --mime",
            path.display()
        )
    })?;
    Ok(format.to_mime_type().to_string())
}

fn parse_hex_color(s: &str) -> anyhow::Result<[u8; 4]> {
    let hex = s.trim_start_matches('#');
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        anyhow::bail!("color must be RRGGBB or RRGGBBAA hex, got '{s}'");
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .with_context(|| format!("invalid hex color '{s}'"))
    };
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok([channel(0)?, channel(2)?, channel(4)?, a])
}

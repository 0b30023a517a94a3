use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use mockweave::{FlatProjectionMesh, MockupScene, MockupSession, RasterImage};

#[derive(Parser, Debug)]
#[command(name = "mockweave", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a scene (optionally with a swapped-in pattern) to a PNG.
    Composite(CompositeArgs),
}

#[derive(Parser, Debug)]
struct CompositeArgs {
    /// Scene manifest JSON (layer paths resolve relative to it).
    #[arg(long)]
    scene: PathBuf,

    /// Pattern image to swap onto the product before compositing.
    #[arg(long)]
    pattern: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Composite(args) => cmd_composite(args).await,
    }
}

fn read_scene_json(path: &Path) -> anyhow::Result<MockupScene> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("open scene '{}'", path.display()))?;
    let scene = MockupScene::from_json(&json)?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(scene.resolved_against(root))
}

async fn cmd_composite(args: CompositeArgs) -> anyhow::Result<()> {
    let scene = read_scene_json(&args.scene)?;

    // Neutral white texture: the multiply pass leaves the background
    // unchanged until a real pattern is swapped in.
    let mesh = FlatProjectionMesh::new(Some(RasterImage::solid(1, 1, [255, 255, 255, 255])?));
    let session = MockupSession::open(&scene, mesh).await?;

    if let Some(pattern_path) = &args.pattern {
        let bytes = std::fs::read(pattern_path)
            .with_context(|| format!("read pattern '{}'", pattern_path.display()))?;
        session.swap_pattern(bytes).await?;
    }

    let composite = session
        .current_composite()
        .context("no composite was published")?;
    let png = composite.encode_png()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

mod scenario;

use std::path::{Path, PathBuf};

use anyhow::Context;
use asct_common::CellPos;
use asct_content::stock_registry;
use asct_kernel::{GameMap, SimConfig};
use asct_persist::MapStore;
use asct_render::{DebugTextRenderer, RenderView, Renderer, TilePainter};
use asct_tools::MapInspector;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "asct-cli", about = "Drive the ASCT tile simulation from the terminal")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON simulation config; missing fields take their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ViewArgs {
    /// Layer to draw (defaults to the map's current layer)
    #[arg(long)]
    layer: Option<usize>,
    /// Window width in cells
    #[arg(long, default_value = "32")]
    width: u32,
    /// Window height in cells
    #[arg(long, default_value = "16")]
    height: u32,
    /// Also write the window as a PPM image
    #[arg(long)]
    ppm: Option<PathBuf>,
}

impl ViewArgs {
    fn view(&self) -> RenderView {
        RenderView {
            layer: self.layer,
            ..RenderView::sized(self.width, self.height)
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, effective config and the tile catalog
    Info,
    /// Build a scenario and step it
    Run {
        #[arg(value_enum, default_value = "strip")]
        scenario: Scenario,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "10")]
        ticks: u64,
        /// Seed override
        #[arg(short, long)]
        seed: Option<u64>,
        /// Draw the map after every tick instead of only at the end
        #[arg(long)]
        trace: bool,
        /// Save the final map into this store
        #[arg(long)]
        store: Option<PathBuf>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Load a stored map, optionally step it further, and show it
    Load {
        store: PathBuf,
        /// Snapshot index (defaults to the latest)
        #[arg(short, long)]
        index: Option<u32>,
        /// Extra ticks to simulate after loading
        #[arg(short, long, default_value = "0")]
        ticks: u64,
        /// Save the result back as a new snapshot
        #[arg(long)]
        save: bool,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Check a store's hash chain and snapshot files
    Verify { store: PathBuf },
    /// Show one cell of a stored map
    Inspect {
        store: PathBuf,
        layer: usize,
        x: u32,
        y: u32,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening config {}", path.display()))?;
    let config: SimConfig = serde_json::from_reader(file)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn show(map: &GameMap, view: &ViewArgs) -> anyhow::Result<()> {
    print!("{}", DebugTextRenderer::new().render(map, &view.view()));
    println!("{}", MapInspector::summary(map));
    if let Some(path) = &view.ppm {
        let image = TilePainter.render(map, &view.view());
        std::fs::write(path, image.to_ppm())
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "wrote image"
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("asct-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "config: layer_side={} layer_count={} seed={}",
                config.layer_side, config.layer_count, config.seed
            );
            let registry = stock_registry()?;
            for category in registry.categories() {
                println!("[{}]", category.name());
                for tile in category.tiles() {
                    println!("  {:<16} {}  {}", tile.name(), tile.short_name(), tile.base_color().hex());
                }
            }
        }
        Commands::Run {
            scenario,
            ticks,
            seed,
            trace,
            store,
            view,
        } => {
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let registry = stock_registry()?;
            let mut map = scenario.build(&config, &registry)?;
            println!("Scenario {scenario:?}: seed={}, ticks={ticks}", config.seed);
            for _ in 0..ticks {
                map.step();
                if trace {
                    print!("{}", DebugTextRenderer::new().render(&map, &view.view()));
                }
            }
            show(&map, &view)?;
            if let Some(path) = store {
                let mut store = MapStore::open(&path)?;
                let index = store.save_snapshot(&map)?;
                println!("Saved snapshot {index} to {}", path.display());
            }
        }
        Commands::Load {
            store,
            index,
            ticks,
            save,
            view,
        } => {
            let mut handle = MapStore::open(&store)?;
            let mut map = match index {
                Some(i) => handle.load(i)?,
                None => handle.load_latest()?,
            };
            for _ in 0..ticks {
                map.step();
            }
            show(&map, &view)?;
            if save {
                let index = handle.save_snapshot(&map)?;
                println!("Saved snapshot {index}");
            }
        }
        Commands::Verify { store } => {
            let handle = MapStore::open(&store)?;
            handle.verify_integrity()?;
            println!(
                "Store {}: {} snapshot(s), integrity OK",
                store.display(),
                handle.meta().snapshot_count
            );
        }
        Commands::Inspect { store, layer, x, y } => {
            let map = MapStore::open(&store)?.load_latest()?;
            let pos = CellPos::new(x, y);
            map.tile_at(layer, pos)?;
            match MapInspector::inspect_cell(&map, layer, pos) {
                Some(info) => println!("{info}"),
                None => println!("layer {layer} at {pos}: empty"),
            }
        }
    }

    Ok(())
}

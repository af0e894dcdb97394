use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetdex::assets::AssetServices;
use assetdex::config::IndexConfig;
use assetdex::fs::types::{canonicalize_path, file_name};
use assetdex::grid::GridProjection;
use assetdex::remote::{CatalogQuery, StaticCatalog};
use assetdex::ui::{Pane, PaneSpec, RootSpec, TreePanel};
use assetdex::{logging, Coordinator};

#[derive(Parser, Debug)]
#[command(name = "assetdex")]
#[command(about = "Browse a project's asset tree, icon grid and package catalog", long_about = None)]
#[command(version)]
struct Args {
    /// Config file (defaults to <config dir>/assetdex/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the filtered tree under a root
    Tree {
        root: PathBuf,
        /// Only show entries whose name, or a descendant's, contains this
        #[arg(long)]
        filter: Option<String>,
        /// Folder levels to expand below the root
        #[arg(long, default_value_t = 0)]
        depth: usize,
    },
    /// Lay out a folder as an icon grid
    Grid {
        folder: PathBuf,
        /// Available width in pixels
        #[arg(long, default_value_t = 640.0)]
        width: f32,
    },
    /// Show a tree and a grid panel and print live updates until Ctrl-C
    Watch { root: PathBuf },
    /// Query a JSON package catalog
    Catalog {
        json: PathBuf,
        /// Category index to load
        #[arg(long, default_value_t = 0, conflicts_with = "search")]
        category: usize,
        /// Free-text search instead of a category
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = IndexConfig::load_or_default(args.config.as_deref()).context("loading config")?;
    let services = AssetServices::standalone(config.project.clone());

    match args.command {
        Command::Tree {
            root,
            filter,
            depth,
        } => print_tree(&root, filter.as_deref(), depth, services),
        Command::Grid { folder, width } => print_grid(&folder, width, &config, services),
        Command::Watch { root } => watch(&root, config, services).await,
        Command::Catalog {
            json,
            category,
            search,
        } => {
            let catalog = StaticCatalog::from_json_file(&json)
                .with_context(|| format!("loading catalog {}", json.display()))?;
            query_catalog(Arc::new(catalog), category, search, config, services).await
        }
    }
}

fn root_spec(path: &Path) -> RootSpec {
    let path = canonicalize_path(path);
    RootSpec {
        name: file_name(&path),
        path,
    }
}

fn print_tree(root: &Path, filter: Option<&str>, depth: usize, services: AssetServices) -> Result<()> {
    if !root.is_dir() {
        anyhow::bail!("'{}' is not a directory", root.display());
    }

    let mut panel = TreePanel::new(&[root_spec(root)], services);
    if let Some(filter) = filter {
        panel.set_filter(filter);
    }
    for _ in 0..depth {
        let collapsed: Vec<PathBuf> = panel
            .rows()
            .into_iter()
            .filter(|row| row.is_folder && !row.expanded)
            .map(|row| row.path)
            .collect();
        if collapsed.is_empty() {
            break;
        }
        for folder in collapsed {
            panel.expand(&folder);
        }
    }

    for row in panel.rows() {
        let indent = "  ".repeat(row.depth);
        if row.is_folder {
            println!("{}{}/", indent, row.name.blue().bold());
        } else {
            println!("{}{}", indent, row.name);
        }
    }
    Ok(())
}

fn print_grid(folder: &Path, width: f32, config: &IndexConfig, services: AssetServices) -> Result<()> {
    let mut grid = GridProjection::new(config.grid, services);
    grid.set_width(width);
    grid.load_folder(folder);

    let columns = grid.columns();
    println!(
        "{} items, {} columns x {} rows, {:.0}px tall",
        grid.len(),
        columns,
        grid.rows(),
        grid.content_height()
    );
    for row in grid.items().chunks(columns) {
        let cells: Vec<String> = row
            .iter()
            .map(|item| {
                let label = format!("{:<20}", item.name);
                if item.is_folder {
                    label.blue().bold().to_string()
                } else if item.thumbnail.is_some() {
                    label.green().to_string()
                } else {
                    label
                }
            })
            .collect();
        println!("{}", cells.join(" "));
    }
    Ok(())
}

async fn watch(root: &Path, mut config: IndexConfig, services: AssetServices) -> Result<()> {
    if !root.is_dir() {
        anyhow::bail!("'{}' is not a directory", root.display());
    }
    config.watch = true;

    let spec = root_spec(root);
    let catalog: Arc<dyn CatalogQuery> = Arc::new(StaticCatalog::default());
    let mut coordinator = Coordinator::new(
        config,
        services,
        catalog,
        PaneSpec::Tree {
            roots: vec![spec.clone()],
        },
    );
    let grid = coordinator.add_panel(PaneSpec::Grid {
        folder: Some(spec.path.clone()),
    });

    println!(
        "Watching {} ({} panels). Press Ctrl-C to stop.",
        spec.path.display().to_string().cyan(),
        coordinator.panel_count()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            report = coordinator.wait_tick() => {
                if !report.needs_redraw() {
                    continue;
                }
                let items = coordinator
                    .pane(grid)
                    .and_then(Pane::as_grid)
                    .map(|g| g.projection().len())
                    .unwrap_or(0);
                println!(
                    "{} {} tree folders dirtied, {} grid reloads, grid shows {} items",
                    "~".yellow(),
                    report.trees_dirtied,
                    report.grids_reloaded,
                    items
                );
            }
        }
    }

    println!("Stopped.");
    Ok(())
}

async fn query_catalog(
    catalog: Arc<dyn CatalogQuery>,
    category: usize,
    search: Option<String>,
    config: IndexConfig,
    services: AssetServices,
) -> Result<()> {
    let mut coordinator = Coordinator::new(config, services, catalog, PaneSpec::RemoteTree);
    let remote = coordinator.active();
    let grid = coordinator.add_panel(PaneSpec::RemoteGrid);

    match &search {
        Some(query) => {
            coordinator.search(remote, query)?;
        }
        None => {
            coordinator.load_category(remote, category)?;
        }
    }
    coordinator.wait_tick().await;
    println!("{}", coordinator.status());

    if let Some(grid) = coordinator.pane(grid).and_then(Pane::as_grid) {
        for item in grid.projection().items() {
            let record = item.remote.as_ref();
            println!(
                "  {} {} {}",
                item.name.bold(),
                record.map(|r| r.package_type.as_str()).unwrap_or("").dimmed(),
                record.map(|r| r.author_name.as_str()).unwrap_or(""),
            );
        }
    }
    Ok(())
}

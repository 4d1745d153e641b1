use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use kurbo::Rect;
use log::LevelFilter;
use simplelog::WriteLogger;

use pgc::book::BookPage;
use pgc::config::Config;
use pgc::dom::{Dom, MemoryDom, NodeId};
use pgc::engine::{ManipulateAction, SUPPORTED_FORMAT, VectorEngine, vector_engine};
use pgc::error::{AppError, AppResult};
use pgc::export::{export_html, write_canvas_pngs};
use pgc::render::{RenderDriver, RenderOptions, RenderSource};
use pgc::store::{ArtifactStore, load_shared_bytes};

#[derive(Parser, Debug)]
#[command(name = "pgc")]
#[command(about = "Headless paged vector document renderer")]
struct Cli {
    /// Config file, defaults to the platform config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every page through the canvas, text and annotation passes
    Render {
        artifact: PathBuf,
        /// Container width in css px
        #[arg(long, default_value_t = 800.0)]
        width: f64,
        #[arg(long)]
        pixel_per_pt: Option<f64>,
        #[arg(long)]
        background_color: Option<String>,
        #[arg(long, default_value = SUPPORTED_FORMAT)]
        format: String,
        /// HTML output, stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write one PNG per page into this directory
        #[arg(long)]
        png_dir: Option<PathBuf>,
    },
    /// Render the whole document as SVG
    Svg {
        artifact: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apply a patch and print the incremental SVG
    Diff {
        artifact: PathBuf,
        #[arg(long)]
        patch: PathBuf,
        #[arg(long, default_value = "merge", value_parser = parse_action)]
        action: ManipulateAction,
        /// Visible rectangle as x0,y0,x1,y1
        #[arg(long, value_parser = parse_window)]
        window: Option<Rect>,
    },
    /// Look up the source location of an element path such as 0,1,2
    SourceLoc {
        artifact: PathBuf,
        path: String,
    },
    /// Load a themed book artifact from the artifact root and render it as SVG
    Book {
        rel_path: String,
        #[arg(long)]
        theme: Option<String>,
        #[arg(long, default_value_t = 800.0)]
        width: f64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_level.into()) {
        eprintln!("{err}");
        std::process::exit(1);
    }
    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_logging(level: LevelFilter) -> AppResult<()> {
    WriteLogger::init(level, simplelog::Config::default(), std::io::stderr())
        .map_err(|err| AppError::invalid_argument(format!("failed to install logger: {err}")))
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let driver = RenderDriver::new(vector_engine().await?).with_config(config.render.clone());

    match cli.command {
        Command::Render {
            artifact,
            width,
            pixel_per_pt,
            background_color,
            format,
            out,
            png_dir,
        } => {
            let content = read_artifact(&artifact)?;
            let (mut dom, container) = headless_host(width);
            let options = RenderOptions {
                pixel_per_pt,
                background_color,
            };
            let report = driver
                .render(
                    &mut dom,
                    &container,
                    RenderSource::Artifact { content, format },
                    &options,
                )
                .await?;
            log::info!(
                "rendered {} pages, {} links, total {:.1}ms",
                report.page_count,
                report.links_rendered,
                report.timings.total_ms()
            );

            let title = artifact.display().to_string();
            write_output(out.as_deref(), &export_html(&dom, container, &title)?)?;
            if let Some(dir) = png_dir {
                write_canvas_pngs(&dom, container, dir)?;
            }
            Ok(())
        }
        Command::Svg { artifact, out } => {
            let content = read_artifact(&artifact)?;
            let (mut dom, container) = headless_host(800.0);
            let svg =
                driver.render_to_svg(&mut dom, &container, RenderSource::artifact(content))?;
            write_output(out.as_deref(), &svg.markup)
        }
        Command::Diff {
            artifact,
            patch,
            action,
            window,
        } => {
            let mut session = driver.create_session(Some(read_artifact(&artifact)?))?;
            let patch = read_artifact(&patch)?;
            let result = session.render_svg().and_then(|_| {
                driver.manipulate_data(&mut session, Some(action), &patch)?;
                driver.render_svg_diff(&mut session, window)
            });
            let released = session.free();
            let markup = result?;
            released?;
            write_output(None, &markup)
        }
        Command::SourceLoc { artifact, path } => {
            let path = parse_element_path(&path).map_err(AppError::InvalidArgument)?;
            let mut session = driver.create_session(Some(read_artifact(&artifact)?))?;
            let location = session.get_source_loc(&path);
            session.free()?;
            match location? {
                Some(location) => write_output(None, &location),
                None => Err(AppError::invalid_argument(format!(
                    "no source location for element path {path:?}"
                ))),
            }
        }
        Command::Book {
            rel_path,
            theme,
            width,
            out,
        } => {
            let theme = theme.unwrap_or_else(|| config.artifact.default_theme.clone());
            let (dom, container) = headless_host(width);
            let page: BookPage<VectorEngine, MemoryDom> = BookPage::open(
                driver,
                dom,
                &container,
                ArtifactStore::from_config(&config.artifact),
                rel_path.as_str(),
                theme,
            )
            .await?;
            let dom = page.close()?;
            write_output(out.as_deref(), &export_html(&dom, container, &rel_path)?)
        }
    }
}

fn headless_host(width: f64) -> (MemoryDom, NodeId) {
    let mut dom = MemoryDom::new();
    let body = dom.root();
    let container = dom.create_child(&body, "div");
    dom.set_layout_width(container, width);
    (dom, container)
}

fn read_artifact(path: &Path) -> AppResult<Vec<u8>> {
    Ok(load_shared_bytes(path)?.as_ref().clone())
}

fn write_output(out: Option<&Path>, content: &str) -> AppResult<()> {
    match out {
        Some(path) => fs::write(path, content).map_err(|source| {
            AppError::io_with_context(source, format!("failed to write {}", path.display()))
        }),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

fn parse_action(value: &str) -> Result<ManipulateAction, String> {
    ManipulateAction::parse(value).map_err(|err| err.to_string())
}

fn parse_window(value: &str) -> Result<Rect, String> {
    let coords = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid window {value:?}: {err}"))?;
    match coords.as_slice() {
        [x0, y0, x1, y1] => Ok(Rect::new(*x0, *y0, *x1, *y1)),
        _ => Err(format!(
            "invalid window {value:?}: expected x0,y0,x1,y1"
        )),
    }
}

fn parse_element_path(value: &str) -> Result<Vec<u32>, String> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid element path {value:?}: {err}"))
}

use clap::Parser;
use contour_migration::kurbo::Point;
use contour_migration::{ChargeModel, Contour, MappingEngine, MigrationConfig, RasterSink};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "contour-migration",
    about = "Map the boundary nodes of one cell contour onto the next frame's contour"
)]
struct Cli {
    /// Contour at frame t: one "x y" pair per line
    #[arg(short, long)]
    source: PathBuf,

    /// Contour at frame t+1, same format
    #[arg(short, long)]
    target: PathBuf,

    /// Node spacing of the output contour in pixels
    #[arg(long, default_value = "4.0")]
    spacing: f64,

    /// Use line charges along the arcs instead of point charges
    #[arg(long)]
    line_charges: bool,

    /// Stop nodes after this travel distance (sampling mode)
    #[arg(long)]
    sampling_distance: Option<f64>,

    /// Keep node spacing as migration leaves it
    #[arg(long)]
    no_density: bool,

    /// Always migrate source onto target
    #[arg(long, conflicts_with = "backward")]
    forward: bool,

    /// Always migrate target onto source
    #[arg(long)]
    backward: bool,

    /// Physical size of one pixel (distances are multiplied by it)
    #[arg(long, default_value = "1.0")]
    pixel_scale: f64,

    /// Seed for breaking degenerate contacts
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Write a diagnostic PNG of the run
    #[arg(long)]
    render: Option<PathBuf>,

    /// Print per-sector and per-node detail
    #[arg(short, long)]
    verbose: bool,
}

/// Step log on stderr, in the same aligned layout the library uses.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.target().starts_with("contour_migration")
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            log::Level::Info => eprintln!("{}", record.args()),
            log::Level::Warn | log::Level::Error => eprintln!("  Warning     {}", record.args()),
            _ => eprintln!("  \u{00b7}           {}", record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    Ok(())
}

fn read_contour(path: &Path) -> Result<Contour, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let mut points = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty());
        let (Some(x), Some(y)) = (fields.next(), fields.next()) else {
            return Err(format!("{}:{}: expected \"x y\"", path.display(), n + 1).into());
        };
        points.push(Point::new(x.parse()?, y.parse()?));
    }
    Ok(Contour::from_points(&points)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.verbose)?;

    let config = MigrationConfig {
        marker_spacing: cli.spacing,
        charge_model: if cli.line_charges {
            ChargeModel::Line
        } else {
            ChargeModel::Point
        },
        sampling_mode: cli.sampling_distance.is_some(),
        sampling_distance: cli.sampling_distance.unwrap_or(MigrationConfig::default().sampling_distance),
        disable_density_correction: cli.no_density,
        force_forward: cli.forward,
        force_backward: cli.backward,
        pixel_scale: cli.pixel_scale,
        seed: cli.seed,
        ..MigrationConfig::default()
    };

    // Header
    eprintln!();
    eprintln!(
        "  contour-migration \u{00b7} {} \u{2192} {}",
        cli.source.display(),
        cli.target.display()
    );
    eprintln!();

    let mut a = read_contour(&cli.source)?;
    let mut b = read_contour(&cli.target)?;
    let mut engine = MappingEngine::with_sink(config, RasterSink::default())?;
    let result = engine.map_pair(&mut a, &mut b)?;

    for id in result.contour.iter() {
        let node = result.contour.vertex(id);
        println!(
            "{:.4} {:.4} {:.4} {:.6}",
            node.point.x, node.point.y, node.distance, node.landing
        );
    }

    if let Some(png) = &cli.render {
        engine.sink().save_png(png)?;
    }

    // Footer
    eprintln!();
    eprintln!(
        "  \u{2713} {} nodes ({} dropped)",
        result.contour.len(),
        result.report.unsnapped
    );
    eprintln!();

    Ok(())
}

pub mod sim;

use fixedlayout::layout::GridSize;
use getopts::Options;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorArgs {
    /// Layout document to load, and to save edits back to.
    pub layout: Option<PathBuf>,
    pub options: Option<PathBuf>,
    /// Simulator settings (YAML).
    pub sim: Option<PathBuf>,
    pub follow: bool,
    pub grid: Option<GridSize>,
    /// Width of the time window in milliseconds.
    pub span_ms: f64,
}

pub fn monitor_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("l", "layout", "layout document (YAML)", "path");
    opts.optopt("o", "options", "view options (YAML)", "path");
    opts.optopt("s", "sim", "simulator channels and timing (YAML)", "path");
    opts.optflag("f", "follow", "slide the time window with the clock");
    opts.optopt("g", "grid", "grid cell size in pixels (default 64x16)", "WxH");
    opts.optopt("w", "window", "time window in seconds (default 60)", "secs");
    opts.optflag("h", "help", "print this help");
    opts
}

pub fn parse_grid(s: &str) -> Result<GridSize, String> {
    let (x, y) = s
        .split_once('x')
        .ok_or_else(|| format!("grid '{}' is not WxH", s))?;
    let x = x.trim().parse().map_err(|_| format!("bad grid width '{}'", x))?;
    let y = y.trim().parse().map_err(|_| format!("bad grid height '{}'", y))?;
    GridSize::new(x, y).map_err(|e| e.to_string())
}

/// Parses everything after the program name. `Ok(None)` means help was asked
/// for.
pub fn parse_monitor_args(opts: &Options, args: &[String]) -> Result<Option<MonitorArgs>, String> {
    let matches = opts.parse(args).map_err(|f| f.to_string())?;
    if matches.opt_present("h") {
        return Ok(None);
    }

    let grid = match matches.opt_str("g") {
        Some(g) => Some(parse_grid(&g)?),
        None => None,
    };
    let span_ms = match matches.opt_str("w") {
        Some(w) => {
            let secs: f64 = w.parse().map_err(|_| format!("bad window '{}'", w))?;
            if secs.is_nan() || secs <= 0.0 {
                return Err(format!("window must be positive, got {}", secs));
            }
            secs * 1000.0
        }
        None => 60_000.0,
    };

    Ok(Some(MonitorArgs {
        layout: matches.opt_str("l").map(PathBuf::from),
        options: matches.opt_str("o").map(PathBuf::from),
        sim: matches.opt_str("s").map(PathBuf::from),
        follow: matches.opt_present("f"),
        grid,
        span_ms,
    }))
}

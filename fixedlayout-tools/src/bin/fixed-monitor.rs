use fixedlayout::layout::{Configuration, ElementKind, ElementProxy, SharedConfiguration};
use fixedlayout::provider::{TimeConductor, ViewHost};
use fixedlayout::view::DropEvent;
use fixedlayout::{FixedView, ViewOptions};
use fixedlayout_tools::{
    monitor_opts, parse_monitor_args,
    sim::{now_ms, SimBackend, SimSettings},
    MonitorArgs,
};

use std::{
    env,
    io::{stdout, Stdout, Write},
    path::PathBuf,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{future::FutureExt, select, StreamExt};
use futures_timer::Delay;
use log::{info, warn};

use crossterm::{
    cursor::*,
    event::{Event, EventStream, KeyCode},
    style::*,
    terminal::*,
    ExecutableCommand, QueueableCommand,
};

const FRAME: Duration = Duration::from_millis(16);
// Terminal cell size in layout pixels.
const PX_PER_COL: i64 = 8;
const PX_PER_ROW: i64 = 16;

/// Collects frame requests for the render loop and writes edits back to the
/// layout file.
struct MonitorHost {
    frame_requested: AtomicBool,
    configuration: SharedConfiguration,
    layout_path: Option<PathBuf>,
}

impl MonitorHost {
    fn take_frame(&self) -> bool {
        self.frame_requested.swap(false, Ordering::AcqRel)
    }
}

impl ViewHost for MonitorHost {
    fn request_frame(&self) {
        self.frame_requested.store(true, Ordering::Release);
    }

    fn commit(&self, message: &str) {
        info!("{}", message);
        if let Some(path) = &self.layout_path {
            if let Err(e) = self.configuration.read().save(path) {
                warn!("Could not save {}: {}", path.display(), e);
            }
        }
    }
}

fn label(proxy: &ElementProxy) -> String {
    let entry = proxy.element().read();
    match proxy.kind() {
        ElementKind::Telemetry => match &proxy.display {
            Some(d) if d.value.is_empty() => format!("{}: --", d.name),
            Some(d) => format!("{}: {}", d.name, d.value),
            None => entry.id.clone().unwrap_or_default(),
        },
        ElementKind::Box => "#".repeat((proxy.style.width / PX_PER_COL).max(1) as usize),
        ElementKind::Line => "-".repeat((proxy.style.width / PX_PER_COL).max(1) as usize),
        ElementKind::Text => entry.text.clone().unwrap_or_default(),
        ElementKind::Image => format!("[img {}]", entry.url.as_deref().unwrap_or("")),
    }
}

fn alarm_color(proxy: &ElementProxy) -> Option<Color> {
    match proxy.display.as_ref()?.alarm_class.as_deref()? {
        "is-limit-red" => Some(Color::Red),
        "is-limit-yellow" => Some(Color::Yellow),
        _ => Some(Color::Magenta),
    }
}

fn render(out: &mut Stdout, view: &FixedView, backend: &SimBackend) -> std::io::Result<()> {
    let (cols, rows) = size()?;
    out.queue(Clear(ClearType::All))?;

    let bounds = backend.clock.bounds();
    let status = format!(
        "window {:.0}s  follow {}  elements {}   [q]uit [tab] select [arrows] move [f]ollow",
        (bounds.end - bounds.start) / 1000.0,
        if backend.clock.follow() { "on" } else { "off" },
        view.elements().len(),
    );
    out.queue(MoveTo(0, 0))?.queue(Print(status))?;

    for proxy in view.elements() {
        let col = proxy.style.left / PX_PER_COL;
        let row = proxy.style.top / PX_PER_ROW + 2;
        if col < 0 || row < 2 || col >= i64::from(cols) || row >= i64::from(rows) {
            continue;
        }
        let width = (i64::from(cols) - col) as usize;
        let text: String = label(proxy).chars().take(width).collect();

        if view.is_selected(proxy) {
            out.queue(SetAttribute(Attribute::Reverse))?;
        }
        if let Some(color) = alarm_color(proxy) {
            out.queue(SetForegroundColor(color))?;
        }
        out.queue(MoveTo(col as u16, row as u16))?
            .queue(Print(text))?
            .queue(SetAttribute(Attribute::Reset))?
            .queue(SetForegroundColor(Color::White))?;
    }
    out.flush()
}

fn select_next(view: &mut FixedView) {
    let n = view.elements().len();
    if n == 0 {
        return;
    }
    let next = view
        .elements()
        .iter()
        .position(|p| view.is_selected(p))
        .map_or(0, |i| (i + 1) % n);
    view.select(next);
}

fn nudge(view: &mut FixedView, host: &MonitorHost, dx: i64, dy: i64) {
    let Some(entry) = view.selected().map(|p| p.element().clone()) else {
        return;
    };
    {
        let mut e = entry.write();
        e.x = e.x.saturating_add(dx).max(0);
        e.y = e.y.saturating_add(dy).max(0);
        if let Some(x2) = e.x2 {
            e.x2 = Some(x2.saturating_add(dx).max(0));
        }
        if let Some(y2) = e.y2 {
            e.y2 = Some(y2.saturating_add(dy).max(0));
        }
    }
    view.selection_moved();
    host.commit("Moved an element.");
}

async fn run_monitor(
    mut view: FixedView,
    backend: SimBackend,
    host: Arc<MonitorHost>,
) -> std::io::Result<()> {
    let mut reader = EventStream::new();
    let mut stdout = stdout();
    let mut redraw = true;

    'drawing: loop {
        let mut delay = Delay::new(FRAME).fuse();
        let mut event = reader.next().fuse();

        select! {
            _ = delay => {
                backend.clock.tick(now_ms());
                view.pump();
                if host.take_frame() && view.animation_frame() {
                    redraw = true;
                }
                if redraw {
                    render(&mut stdout, &view, &backend)?;
                    redraw = false;
                }
            },
            some_event = event => {
                match some_event {
                    Some(Ok(Event::Key(key))) => {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => break 'drawing,
                            KeyCode::Tab => select_next(&mut view),
                            KeyCode::Left => nudge(&mut view, &host, -1, 0),
                            KeyCode::Right => nudge(&mut view, &host, 1, 0),
                            KeyCode::Up => nudge(&mut view, &host, 0, -1),
                            KeyCode::Down => nudge(&mut view, &host, 0, 1),
                            KeyCode::Char('f') => {
                                let follow = backend.clock.toggle_follow();
                                info!("Follow {}", if follow { "on" } else { "off" });
                                if !follow {
                                    // pin the window where it is; this refetches history
                                    backend.clock.set_bounds(backend.clock.bounds());
                                }
                            }
                            _ => {}
                        }
                        redraw = true;
                    }
                    Some(Ok(Event::Resize(_, _))) => redraw = true,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!("Terminal error: {}", e),
                    None => break 'drawing,
                }
            }
        }
    }

    view.destroy();
    Ok(())
}

fn load_layout(args: &MonitorArgs) -> Result<(Configuration, bool), fixedlayout::ConfigError> {
    let existing = args.layout.as_ref().filter(|p| p.exists());
    let mut config = match existing {
        Some(path) => Configuration::load(path)?,
        None => Configuration::default(),
    };
    if let Some(grid) = args.grid {
        config.layout_grid = grid;
    }
    Ok((config, existing.is_some()))
}

fn main() -> std::io::Result<()> {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let opts = monitor_opts();
    let args = match parse_monitor_args(&opts, &argv[1..]) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print!("{}", opts.usage(&format!("Usage: {} [options]", argv[0])));
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let options = match &args.options {
        Some(path) => ViewOptions::load(path),
        None => Ok(ViewOptions::default()),
    };
    let settings = match &args.sim {
        Some(path) => SimSettings::load(path),
        None => Ok(SimSettings::default()),
    };
    let (options, settings, (config, loaded)) =
        match (options, settings, load_layout(&args)) {
            (Ok(options), Ok(settings), Ok(layout)) => (options, settings, layout),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        };

    let backend = SimBackend::new(args.span_ms, args.follow, &settings);
    let configuration = config.shared();
    let host = Arc::new(MonitorHost {
        frame_requested: AtomicBool::new(true),
        configuration: configuration.clone(),
        layout_path: args.layout.clone(),
    });
    let mut view = FixedView::new(backend.apis(), host.clone(), configuration, options);

    // A fresh layout gets one telemetry element per channel, stacked down
    // the left edge.
    if !loaded {
        let grid = view.grid_size();
        for (i, channel) in backend.channels.iter().enumerate() {
            let y = (2 * i as u32 * grid.y) as f64;
            view.handle_drop(&mut DropEvent::new(channel.object.id.clone(), 0.0, y));
        }
        view.clear_selection();
    }
    view.set_domain_object(&backend.root);

    let mut stdout = stdout();

    //setup terminal
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(SetBackgroundColor(Color::Black))?;
    stdout.execute(SetForegroundColor(Color::White))?;
    stdout.execute(Clear(ClearType::All))?;
    stdout.execute(Hide)?;

    let result = async_std::task::block_on(run_monitor(view, backend, host));

    //clean up terminal on end
    stdout.execute(LeaveAlternateScreen)?;
    stdout.execute(Show)?;
    disable_raw_mode()?;

    result
}

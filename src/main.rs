mod background;
mod bitmap;
mod config;
mod connection;
mod display;
mod error;
mod locator;
mod pixel;
mod state;
mod surface;
mod widget;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::ConnectionExt as _;
use x11rb::protocol::Event;

use background::BackgroundCache;
use bitmap::Rect;
use config::Config;
use connection::XConnection;
use error::Result;
use state::Placement;
use surface::Surface;
use widget::TransparentWidget;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    log::info!("Starting xbackdrop");

    let config = Config::load();

    // Connect to X server
    let xconn = XConnection::new()?;
    log::info!(
        "Connected to X server, screen {}x{}",
        xconn.screen_width,
        xconn.screen_height
    );

    let placement: Rect = Placement::load()
        .map(Rect::from)
        .unwrap_or_else(|| Rect::new(0, 0, config.width, config.height));

    let mut background = BackgroundCache::new(config.fallback_color);
    background.reload(&xconn);
    if background.is_valid() {
        let bmp = background.full_bitmap();
        log::info!(
            "Desktop background {}x{} (generation {})",
            bmp.width(),
            bmp.height(),
            background.generation()
        );
    }

    let surface = xconn.create_surface(placement, &config.title)?;
    let mut widget = TransparentWidget::new(placement, config.tint, config.highlight);

    xconn.conn.map_window(surface.window)?;
    xconn.flush()?;

    log::info!("Window mapped, waiting for events");

    let result = event_loop(&xconn, &surface, &mut background, &mut widget, placement);

    // Cleanup, also after a failed loop
    log::debug!("Cleaning up");

    Placement::from(widget.geometry()).save();
    if let Err(e) = xconn.destroy_surface(&surface) {
        log::warn!("Failed to destroy window: {}", e);
    }

    result?;
    log::info!("Done");
    Ok(())
}

/// Dispatch events until the window is closed.
fn event_loop(
    xconn: &XConnection,
    surface: &Surface,
    background: &mut BackgroundCache,
    widget: &mut TransparentWidget,
    placement: Rect,
) -> Result<()> {
    let mut last_geometry = placement;

    loop {
        let event = xconn.conn.wait_for_event()?;
        let mut events = vec![event];

        // Collect any additional pending events so one repaint covers them
        while let Some(event) = xconn.conn.poll_for_event()? {
            events.push(event);
        }

        let mut needs_paint = false;
        let mut should_exit = false;

        for event in events {
            if background.handle_event(xconn, &event) {
                widget.background_changed();
                needs_paint = true;
                continue;
            }

            match event {
                Event::ConfigureNotify(e) if e.window == surface.window => {
                    needs_paint |= track_geometry(xconn, surface, widget, &mut last_geometry);
                }
                Event::ReparentNotify(e) if e.window == surface.window => {
                    needs_paint |= track_geometry(xconn, surface, widget, &mut last_geometry);
                }
                Event::MapNotify(e) if e.window == surface.window => {
                    widget.shown();
                    needs_paint = true;
                }
                Event::Expose(e) if e.window == surface.window && e.count == 0 => {
                    needs_paint = true;
                }
                Event::EnterNotify(e) if e.event == surface.window => {
                    needs_paint |= widget.enter();
                    log::debug!("Pointer entered, highlighted={}", widget.is_highlighted());
                }
                Event::LeaveNotify(e) if e.event == surface.window => {
                    needs_paint |= widget.leave();
                }
                Event::ClientMessage(e) if xconn.is_close_request(surface, &e) => {
                    log::info!("Close requested");
                    should_exit = true;
                }
                Event::Error(e) => {
                    log::debug!("X11 error: {:?}", e);
                }
                _ => {}
            }
        }

        if should_exit {
            return Ok(());
        }

        if needs_paint {
            let frame = widget.paint(background);
            xconn.present(surface, &frame)?;
        }
    }
}

/// Feed position and size changes of the surface to the widget.
/// Returns true if anything changed.
fn track_geometry(
    xconn: &XConnection,
    surface: &Surface,
    widget: &mut TransparentWidget,
    last: &mut Rect,
) -> bool {
    let geometry = match xconn.root_geometry(surface) {
        Ok(g) => g,
        Err(e) => {
            log::warn!("Failed to query window geometry: {}", e);
            return false;
        }
    };

    let mut changed = false;
    if (geometry.x, geometry.y) != (last.x, last.y) {
        log::debug!("Moved to {},{}", geometry.x, geometry.y);
        widget.moved(geometry.x, geometry.y);
        changed = true;
    }
    if (geometry.width, geometry.height) != (last.width, last.height) {
        log::debug!("Resized to {}x{}", geometry.width, geometry.height);
        widget.resized(geometry.width, geometry.height);
        changed = true;
    }
    *last = geometry;
    changed
}

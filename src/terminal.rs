// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end for the capture screen
//!
//! Runs the screen in the alternate screen buffer. Tasks returned by the
//! screen are spawned on a tokio runtime and their messages come back over a
//! channel that the draw loop drains before every frame.

use crate::app::{
    CaptureScreen, ChannelNavigator, ControlSet, Intent, Message, RfdFilePicker, Route,
    ScreenDependencies, ScreenOptions, ScreenView, Task,
};
use crate::backends::camera::{ProviderOptions, get_provider};
use crate::config::Config;
use crate::constants::timing;
use crate::storage::{FileSessionStorage, HandoffSlot};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, stdout};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Run the interactive capture screen
///
/// Returns the route the screen navigated to, or `None` when the user quit
/// with Ctrl+C.
pub fn run(config: &Config) -> Result<Option<Route>, Box<dyn std::error::Error>> {
    let runtime = Runtime::new()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &runtime, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &Runtime,
    config: &Config,
) -> Result<Option<Route>, Box<dyn std::error::Error>> {
    let _guard = runtime.enter();

    let (route_tx, route_rx) = mpsc::channel();
    let (message_tx, message_rx) = mpsc::channel();

    let storage = FileSessionStorage::for_session(&config.session_name);
    info!(dir = %storage.dir().display(), "Using session storage");

    let deps = ScreenDependencies {
        provider: get_provider(config.backend, ProviderOptions::from_config(config)),
        handoff: HandoffSlot::new(Arc::new(storage)),
        navigator: Arc::new(ChannelNavigator::new(route_tx)),
        picker: Arc::new(RfdFilePicker),
    };
    let mut screen = CaptureScreen::new(deps, ScreenOptions::from_config(config));

    let task = screen.mount();
    spawn(runtime, &message_tx, task);

    let route = loop {
        // Apply finished work
        while let Ok(message) = message_rx.try_recv() {
            let task = screen.update(message);
            spawn(runtime, &message_tx, task);
        }

        if let Ok(route) = route_rx.try_recv() {
            info!(route = route.path(), "Leaving capture screen");
            break Some(route);
        }

        let live = screen.live_frame();
        terminal.draw(|f| {
            f.render_widget(ScreenView::new(&screen, live.as_ref()), f.area());
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C quits without navigating
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                screen.unmount();
                break None;
            }

            let intent = match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Some(Intent::Back),
                code => ControlSet::for_state(screen.state(), screen.device_capability())
                    .intent_for_key(code),
            };
            if let Some(intent) = intent {
                let task = screen.handle_intent(intent);
                spawn(runtime, &message_tx, task);
            }
        }
    };

    // Hand back any stream that arrived while shutting down
    screen.unmount();
    while let Ok(message) = message_rx.try_recv() {
        let _ = screen.update(message);
    }

    Ok(route)
}

fn spawn(runtime: &Runtime, sender: &mpsc::Sender<Message>, task: Task) {
    let Some(future) = task.into_future() else {
        return;
    };
    let sender = sender.clone();
    runtime.spawn(async move {
        let message = future.await;
        if sender.send(message).is_err() {
            debug!("Screen closed before task finished");
        }
    });
}

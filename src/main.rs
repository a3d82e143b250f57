use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use findiff::app::App;
use findiff::config::EnvConfig;
use findiff::logging::init_tracing;
use findiff::providers::backends_from_config;
use findiff::render::{status_line, TranscriptPrinter, DEFAULT_WIDTH};
use findiff::runtime::{HostSignal, RuntimeController};
use tracing::info;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> io::Result<()> {
    init_tracing();

    let config = EnvConfig::from_env().map_err(io::Error::other)?;
    let backends = backends_from_config(&config).map_err(io::Error::other)?;
    let profile = backends.connections.profile();
    info!(provider = %profile.provider_id, endpoint = %profile.endpoint, "starting");

    let session = backends.session.snapshot();
    let app = Arc::new(Mutex::new(App::new(config.app_settings(), session)));
    let controller = RuntimeController::new(
        Arc::clone(&app),
        backends.connections,
        backends.catalog,
        backends.session,
    );

    let lines = spawn_stdin_reader()?;
    let mut printer = TranscriptPrinter::new(DEFAULT_WIDTH);
    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "findiff ({}). Type /help for commands.\n{}",
        profile.provider_id,
        status_line(&lock_unpoisoned(&app), DEFAULT_WIDTH)
    )?;

    loop {
        match lines.try_recv() {
            Ok(line) => {
                let mut host = Arc::clone(&controller);
                let mut app = lock_unpoisoned(&app);
                app.on_input_replace(line);
                app.on_submit(&mut host);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                let mut host = Arc::clone(&controller);
                let mut app = lock_unpoisoned(&app);
                if !app.is_streaming() && controller.is_idle() {
                    app.on_quit(&mut host);
                }
            }
        }

        controller.run_frame(Instant::now());

        if controller.take_render_request() {
            let mut app = lock_unpoisoned(&app);
            let mut out = printer.render(&app.transcript);
            for notice in app.take_notices() {
                out.push_str(&format!("\n* {notice}"));
            }
            for signal in controller.take_signals() {
                out.push_str(match signal {
                    HostSignal::SignInRequested => "\n* Sign in: set FINDIFF_ID_TOKEN and restart.",
                    HostSignal::UpgradeRequested => "\n* Upgrade your plan to keep asking questions.",
                });
            }
            if !out.is_empty() {
                stdout.write_all(out.as_bytes())?;
                stdout.flush()?;
            }
        }

        if controller.stop_requested() {
            break;
        }
        thread::sleep(FRAME_INTERVAL);
    }

    controller.shutdown();
    writeln!(stdout)?;
    Ok(())
}

fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<String>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("findiff-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if sender.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(receiver)
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

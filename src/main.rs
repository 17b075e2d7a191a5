use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use story_backend::StoryBackend;
use story_backend_http::{HttpStoryBackend, StoryApiConfig};
use story_backend_mock::MockStoryBackend;
use storyloom::runtime::{SessionRuntime, StateSink};
use storyloom::session::{Session, SessionState};

const BACKEND_ENV_VAR: &str = "STORYLOOM_BACKEND";
const BASE_URL_ENV_VAR: &str = "STORYLOOM_BASE_URL";

/// Console renderer: prints the newest segment and image status whenever the
/// runtime publishes a snapshot.
struct ConsoleSink {
    printed_segments: Mutex<usize>,
}

impl ConsoleSink {
    fn new() -> Self {
        Self {
            printed_segments: Mutex::new(0),
        }
    }
}

impl StateSink for ConsoleSink {
    fn publish(&self, state: SessionState) {
        let mut printed = match self.printed_segments.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        for text in state.ledger_view.iter().skip(*printed) {
            println!("\n{text}");
        }
        *printed = state.ledger_view.len();

        if let Some(image) = &state.image {
            println!("[illustration for segment {}: {} bytes]", image.for_index, image.data.len());
        }
        if let Some(error) = &state.last_error {
            eprintln!("[error] {error}");
        }
    }
}

fn backend_from_env() -> Result<Arc<dyn StoryBackend>, String> {
    match std::env::var(BACKEND_ENV_VAR).as_deref() {
        Err(_) | Ok("mock") => Ok(Arc::new(MockStoryBackend::new())),
        Ok("http") => {
            let mut config = StoryApiConfig::default();
            if let Ok(base_url) = std::env::var(BASE_URL_ENV_VAR) {
                config = config.with_base_url(base_url);
            }
            let backend = HttpStoryBackend::new(config)
                .map_err(|error| format!("failed to configure HTTP backend: {error}"))?;
            Ok(Arc::new(backend))
        }
        Ok(other) => Err(format!(
            "unknown {BACKEND_ENV_VAR} value '{other}' (expected 'mock' or 'http')"
        )),
    }
}

fn wait_until_settled(session: &Arc<Mutex<Session>>) {
    loop {
        let busy = match session.lock() {
            Ok(guard) => guard.snapshot().busy,
            Err(poisoned) => poisoned.into_inner().snapshot().busy,
        };
        if !busy {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(25));
    }
}

fn main() -> io::Result<()> {
    let backend = backend_from_env().map_err(io::Error::other)?;
    let session = Arc::new(Mutex::new(Session::new()));
    let runtime = SessionRuntime::new(Arc::clone(&session), backend, Arc::new(ConsoleSink::new()));

    runtime.initialize();
    wait_until_settled(&session);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input == "/quit" {
            break;
        }

        runtime.submit_continuation(input);
        wait_until_settled(&session);
    }

    Ok(())
}

//! Host process: wires the pty, the interpreter, and the window-layer
//! interface into a single-threaded event loop.
//!
//! The loop polls the pty master, feeds whatever arrives to the
//! interpreter, flushes queued responses back to the child, drains
//! window effects, and advances the blink tick. Rendering and key
//! decoding live behind the window layer and are not part of the core;
//! the shipped host logs window effects instead of realizing them.

use phosphor::config::Config;
use phosphor::pty::{Pty, PtyError};
use phosphor::terminal::{HostEvent, Term};

use polling::{Event, Events, Poller};
use std::os::fd::BorrowedFd;
use std::time::{Duration, Instant};

const PTY_KEY: usize = 0;
/// Upper bound on bytes consumed per wakeup.
const READ_CHUNK: usize = 4096;
/// Cursor/SGR blink cadence. The tick is read by a renderer, never by
/// the interpreter.
const TICK: Duration = Duration::from_millis(400);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load();
    if let Err(err) = run(&config) {
        log::error!("fatal: {}", err);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), PtyError> {
    let mut term = Term::new(config.columns, config.rows, config.answerback.clone());
    let mut pty = Pty::spawn(config.shell.as_deref())?;
    pty.resize(term.screen().width as u16, term.screen().height as u16)?;

    let poller = Poller::new().map_err(PtyError::Io)?;
    // SAFETY: the fd outlives the poller; both live to the end of run().
    unsafe {
        poller
            .add(pty.raw_fd(), Event::readable(PTY_KEY))
            .map_err(PtyError::Io)?;
    }

    let mut events = Events::new();
    let mut buffer = [0u8; READ_CHUNK];
    let started = Instant::now();
    let mut ticks = 0u64;

    loop {
        events.clear();
        poller
            .wait(&mut events, Some(TICK))
            .map_err(PtyError::Io)?;

        let now_ticks = (started.elapsed().as_millis() / TICK.as_millis()) as u64;
        if now_ticks != ticks {
            ticks = now_ticks;
            log::trace!("blink tick {}", ticks);
        }

        if !events.is_empty() {
            match pty.read(&mut buffer) {
                Ok(0) => {}
                Ok(n) => term.feed(&buffer[..n]),
                Err(PtyError::Hangup) => {
                    log::info!("child shell exited");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
            // Level-triggered sources need re-arming after a wakeup.
            let fd = unsafe { BorrowedFd::borrow_raw(pty.raw_fd()) };
            poller
                .modify(fd, Event::readable(PTY_KEY))
                .map_err(PtyError::Io)?;
        }

        let responses = term.take_responses();
        if !responses.is_empty() {
            pty.write(&responses)?;
        }
        pty.flush()?;

        for event in term.take_events() {
            match event {
                HostEvent::SetTitle(title) => log::info!("window title: {:?}", title),
                HostEvent::SetIconName(name) => log::info!("icon name: {:?}", name),
                HostEvent::Bell => log::info!("bell"),
                HostEvent::Resize { width, height } => {
                    pty.resize(width as u16, height as u16)?;
                }
            }
        }
    }
}

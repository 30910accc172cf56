//! Cursor blink clock.
//!
//! A background thread flips a shared flag every 409.6 ms, the blink period
//! of the chip at its nominal 270 kHz oscillator. The first toggle happens
//! immediately on start. The thread is stopped through a channel, either by
//! [`BlinkClock::stop`] or when the clock is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;

pub const BLINK_INTERVAL: Duration = Duration::from_micros(409_600);

struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct BlinkClock {
    state: Arc<AtomicBool>,
    ticker: Option<Ticker>,
}

impl BlinkClock {
    /// Start a free-running clock at the chip's blink rate.
    pub fn start() -> Self {
        Self::start_with_interval(BLINK_INTERVAL)
    }

    pub fn start_with_interval(interval: Duration) -> Self {
        let state = Arc::new(AtomicBool::new(false));
        let (stop, stop_rx) = mpsc::channel::<()>();
        let flag = Arc::clone(&state);
        let handle = thread::spawn(move || loop {
            flag.fetch_xor(true, Ordering::Relaxed);
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                _ => break,
            }
        });
        debug!("blink clock started ({:?})", interval);
        BlinkClock { state, ticker: Some(Ticker { stop, handle }) }
    }

    /// A clock that only changes when [`toggle`](Self::toggle) is called.
    pub fn manual() -> Self {
        BlinkClock { state: Arc::new(AtomicBool::new(false)), ticker: None }
    }

    pub fn is_on(&self) -> bool {
        self.state.load(Ordering::Relaxed)
    }

    pub fn toggle(&self) {
        self.state.fetch_xor(true, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.stop.send(());
            let _ = ticker.handle.join();
            debug!("blink clock stopped");
        }
    }
}

impl Drop for BlinkClock {
    fn drop(&mut self) {
        self.stop();
    }
}

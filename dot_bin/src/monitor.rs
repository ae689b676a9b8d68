use crossbeam_channel::{select, Receiver};
use dot_nes::{SharedState, CPU_FREQUENCY};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Reports the published machine state every `interval` until `done`
/// disconnects. Only loads from the shared block.
pub fn spawn(
    shared: Arc<SharedState>,
    interval: Duration,
    done: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("monitor".to_owned())
        .spawn(move || {
            let ticker = crossbeam_channel::tick(interval);
            let mut last = shared.cycles();

            loop {
                select! {
                    recv(ticker) -> _ => {
                        let cycles = shared.cycles();
                        let ppu = shared.ppu();
                        let speed = cycles.saturating_sub(last) as f64
                            / interval.as_secs_f64()
                            / CPU_FREQUENCY as f64;
                        last = cycles;

                        log::info!(
                            "frame {} line {:3} dot {:3} cycle {} ({:.2}x) v ${:04X} ctrl ${:02X} mask ${:02X} status ${:02X} bus ${:02X}",
                            ppu.frame,
                            ppu.scanline,
                            ppu.dot,
                            cycles,
                            speed,
                            ppu.vram_addr,
                            ppu.ctrl,
                            ppu.mask,
                            ppu.status,
                            shared.open_bus(),
                        );
                    }
                    recv(done) -> _ => break,
                }
            }
        })
}

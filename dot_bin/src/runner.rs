use crate::{ControlEvent, EmuContext, SharedEmuContext};
use anyhow::anyhow;
use crossbeam_channel::Sender;
use std::thread::JoinHandle;
use std::time::Duration;

const IDLE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// stop after this many frames
    pub frames: Option<u64>,
    /// return the error when the CPU halts instead of waiting for commands
    pub stop_on_halt: bool,
}

/// Starts the emulation thread. `exited` is dropped when the thread
/// returns, so its receiver sees a disconnect.
pub fn spawn(
    emu: SharedEmuContext,
    options: RunOptions,
    exited: Sender<()>,
) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
    let handle = std::thread::Builder::new()
        .name("emu".to_owned())
        .spawn(move || {
            let _exited = exited;
            run(&emu, options)
        })?;
    Ok(handle)
}

fn run(emu: &SharedEmuContext, options: RunOptions) -> anyhow::Result<()> {
    loop {
        let mut emu = emu
            .lock()
            .map_err(|_| anyhow!("emulator context poisoned"))?;
        poll_events(&mut emu);

        if emu.quit || options.frames.map_or(false, |n| emu.frames >= n) {
            return Ok(());
        }

        let EmuContext {
            console,
            frames,
            step,
            ..
        } = &mut *emu;

        if console.is_paused() || console.halted().is_some() {
            if *step {
                *step = false;
                match console.step() {
                    Ok(cycles) => log::info!("{} cycles, {:04X?}", cycles, console.cpu()),
                    Err(err) => log::warn!("{}", err),
                }
            }

            drop(emu);
            std::thread::sleep(IDLE);
            continue;
        }

        let frame = console.bus().ppu().frame();
        match console.run_frame() {
            Ok(_) => {
                if console.bus().ppu().frame() != frame {
                    *frames += 1;
                }
            }
            Err(err) if options.stop_on_halt => return Err(err.into()),
            Err(_) => log::info!("halted, `start` skips the opcode"),
        }
    }
}

fn poll_events(emu: &mut EmuContext) {
    let EmuContext {
        console,
        frames,
        step,
        quit,
        control_events,
    } = emu;

    while let Ok(ev) = control_events.try_recv() {
        match ev {
            ControlEvent::LoadCart(data) => match console.load(&data) {
                Ok(()) => {
                    *frames = 0;
                    log::info!("cartridge loaded, pc ${:04X}", console.cpu().pc);
                }
                Err(err) => log::error!("load failed: {}", err),
            },
            ControlEvent::Reset => console.reset(),
            ControlEvent::Pause => console.pause(),
            ControlEvent::Start => {
                console.resume();
                console.start();
            }
            ControlEvent::Step => {
                console.pause();
                *step = true;
            }
            ControlEvent::Quit => *quit = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dot_nes::{Cartridge, Console};
    use std::sync::{Arc, Mutex};

    fn context() -> (SharedEmuContext, crate::ControlSender) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let emu = Arc::new(Mutex::new(EmuContext {
            console: Console::new(Cartridge::empty()),
            frames: 0,
            step: false,
            quit: false,
            control_events: receiver,
        }));
        (emu, sender)
    }

    #[test]
    fn test_runs_frame_limit() {
        let (emu, _sender) = context();
        let options = RunOptions {
            frames: Some(3),
            stop_on_halt: true,
        };
        let (exited, exit_events) = crossbeam_channel::bounded::<()>(0);
        let handle = spawn(emu.clone(), options, exited).unwrap();
        assert!(exit_events.recv().is_err());
        handle.join().unwrap().unwrap();

        let emu = emu.lock().unwrap();
        assert_eq!(emu.frames, 3);
        assert_eq!(emu.console.bus().ppu().frame(), 3);
    }

    #[test]
    fn test_step_and_quit_events() {
        let (emu, sender) = context();
        sender.send(ControlEvent::Step).unwrap();
        sender.send(ControlEvent::Quit).unwrap();

        let mut ctx = emu.lock().unwrap();
        poll_events(&mut ctx);
        assert!(ctx.console.is_paused());
        assert!(ctx.step);
        assert!(ctx.quit);
    }

    #[test]
    fn test_bad_cart_is_ignored() {
        let (emu, sender) = context();
        sender.send(ControlEvent::LoadCart(b"NES\x1a".to_vec())).unwrap();

        let mut ctx = emu.lock().unwrap();
        poll_events(&mut ctx);
        assert_eq!(ctx.console.cpu().pc, 0xff00);
    }
}

use anyhow::{anyhow, Context};
use clap::Parser;
use crossbeam_channel::{select, Receiver};
use dot_nes::{Cartridge, Console};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod monitor;
mod pgm;
mod runner;

type ControlReceiver = crossbeam_channel::Receiver<ControlEvent>;
type ControlSender = crossbeam_channel::Sender<ControlEvent>;

#[derive(Debug, PartialEq, Eq)]
enum ControlEvent {
    LoadCart(Vec<u8>),
    Reset,
    Pause,
    Start,
    Step,
    Quit,
}

struct EmuContext {
    pub console: Console,
    pub frames: u64,
    pub step: bool,
    pub quit: bool,
    pub control_events: ControlReceiver,
}

type SharedEmuContext = Arc<Mutex<EmuContext>>;

/// Headless NES runner
#[derive(Parser, Debug)]
#[command(name = "dot")]
#[command(about = "Runs an iNES image on the dot_nes core", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Number of frames to run [default: 60, unlimited with --interactive]
    #[arg(short, long)]
    frames: Option<u64>,

    /// Read control commands from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Write the last frame to this path as a PGM image
    #[arg(short, long)]
    dump: Option<PathBuf>,

    /// Milliseconds between monitor reports, 0 disables the monitor
    #[arg(short, long, default_value = "1000")]
    monitor: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let data = std::fs::read(&args.rom)
        .with_context(|| format!("failed to read {}", args.rom.display()))?;
    let cart = Cartridge::load(&data)
        .with_context(|| format!("failed to load {}", args.rom.display()))?;

    let (sender, receiver) = crossbeam_channel::unbounded();
    let console = Console::new(cart);
    let shared = console.shared();
    let emu = Arc::new(Mutex::new(EmuContext {
        console,
        frames: 0,
        step: false,
        quit: false,
        control_events: receiver,
    }));

    let (done, done_events) = crossbeam_channel::bounded::<()>(0);
    let monitor = if args.monitor > 0 {
        let interval = Duration::from_millis(args.monitor);
        Some(monitor::spawn(shared, interval, done_events)?)
    } else {
        None
    };

    let options = runner::RunOptions {
        frames: args.frames.or((!args.interactive).then_some(60)),
        stop_on_halt: !args.interactive,
    };
    let (exited, exit_events) = crossbeam_channel::bounded::<()>(0);
    let emu_thread = runner::spawn(emu.clone(), options, exited)?;

    if args.interactive {
        println!("commands: start, pause, step, reset, load <path>, quit");
        read_commands(&sender, &spawn_stdin()?, &exit_events)?;
    }

    let result = emu_thread
        .join()
        .map_err(|_| anyhow!("emulator thread panicked"))?;
    drop(done);
    if let Some(monitor) = monitor {
        monitor
            .join()
            .map_err(|_| anyhow!("monitor thread panicked"))?;
    }
    result?;

    let emu = emu.lock().map_err(|_| anyhow!("emulator context poisoned"))?;
    let cpu = emu.console.cpu();
    log::info!(
        "{} frames, {} cycles, pc ${:04X} a ${:02X} x ${:02X} y ${:02X} sp ${:02X} p {:?}",
        emu.frames,
        emu.console.bus().cycles(),
        cpu.pc,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.sp,
        cpu.p
    );

    if let Some(path) = &args.dump {
        pgm::write(path, emu.console.framebuffer())?;
        log::info!("frame written to {}", path.display());
    }

    Ok(())
}

/// Stdin lines as a channel; disconnects at end of input. The thread is
/// left blocked on stdin when the session ends first.
fn spawn_stdin() -> std::io::Result<Receiver<std::io::Result<String>>> {
    let (lines, line_events) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("stdin".to_owned())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                if lines.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(line_events)
}

/// Forwards commands until quit, end of input, or the emulator thread
/// finishing on its own (`exited` disconnects).
fn read_commands(
    sender: &ControlSender,
    lines: &Receiver<std::io::Result<String>>,
    exited: &Receiver<()>,
) -> anyhow::Result<()> {
    loop {
        let line = select! {
            recv(exited) -> _ => None,
            recv(lines) -> line => Some(line),
        };
        let line = match line {
            None => return Ok(()),
            // end of input
            Some(Err(_)) => break,
            Some(Ok(line)) => line?,
        };

        let event = match parse_command(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(err) => {
                log::error!("{:#}", err);
                continue;
            }
        };

        let quit = event == ControlEvent::Quit;
        sender.send(event)?;
        if quit {
            return Ok(());
        }
    }

    sender.send(ControlEvent::Quit)?;
    Ok(())
}

fn parse_command(line: &str) -> anyhow::Result<Option<ControlEvent>> {
    let mut words = line.split_whitespace();
    let event = match words.next() {
        None => return Ok(None),
        Some("s" | "start") => ControlEvent::Start,
        Some("p" | "pause") => ControlEvent::Pause,
        Some("n" | "step") => ControlEvent::Step,
        Some("r" | "reset") => ControlEvent::Reset,
        Some("q" | "quit") => ControlEvent::Quit,
        Some("l" | "load") => {
            let path = words.next().context("load needs a path")?;
            let data = std::fs::read(path).with_context(|| format!("failed to read {}", path))?;
            ControlEvent::LoadCart(data)
        }
        Some(other) => return Err(anyhow!("unknown command `{}`", other)),
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("  step ").unwrap(), Some(ControlEvent::Step));
        assert_eq!(parse_command("p").unwrap(), Some(ControlEvent::Pause));
        assert_eq!(parse_command("quit").unwrap(), Some(ControlEvent::Quit));
        assert!(parse_command("load").is_err());
        assert!(parse_command("jump").is_err());
    }

    #[test]
    fn test_commands_forwarded_until_quit() {
        let (sender, events) = crossbeam_channel::unbounded();
        let (lines, line_events) = crossbeam_channel::unbounded();
        let (_exited, exit_events) = crossbeam_channel::bounded::<()>(0);

        for line in ["pause", "bogus", "", "q", "start"] {
            lines.send(Ok(line.to_owned())).unwrap();
        }
        read_commands(&sender, &line_events, &exit_events).unwrap();

        let got: Vec<_> = events.try_iter().collect();
        assert_eq!(got, vec![ControlEvent::Pause, ControlEvent::Quit]);
    }

    #[test]
    fn test_commands_end_with_input() {
        let (sender, events) = crossbeam_channel::unbounded();
        let (lines, line_events) = crossbeam_channel::unbounded();
        let (_exited, exit_events) = crossbeam_channel::bounded::<()>(0);

        lines.send(Ok("n".to_owned())).unwrap();
        drop(lines);
        read_commands(&sender, &line_events, &exit_events).unwrap();

        let got: Vec<_> = events.try_iter().collect();
        assert_eq!(got, vec![ControlEvent::Step, ControlEvent::Quit]);
    }

    #[test]
    fn test_commands_stop_when_emulator_exits() {
        let (sender, events) = crossbeam_channel::unbounded();
        // stdin stays open with nothing typed
        let (_lines, line_events) = crossbeam_channel::unbounded();
        let (exited, exit_events) = crossbeam_channel::bounded::<()>(0);

        drop(exited);
        read_commands(&sender, &line_events, &exit_events).unwrap();
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["dot", "game.nes", "-f", "10", "-d", "out.pgm"]).unwrap();
        assert_eq!(args.frames, Some(10));
        assert_eq!(args.dump, Some(PathBuf::from("out.pgm")));
        assert_eq!(args.monitor, 1000);
        assert!(!args.interactive);
    }
}

use clap::ValueEnum;
use std::io::{self, Write};

/// Audible or visual signal played on the local machine when an alert fires.
pub trait LocalCue {
    fn play(&self) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CueKind {
    #[default]
    Bell,
    None,
}

impl CueKind {
    pub fn build(self) -> Box<dyn LocalCue> {
        match self {
            CueKind::Bell => Box::new(TerminalBell),
            CueKind::None => Box::new(SilentCue),
        }
    }
}

/// Rings the terminal bell on stderr. Most terminals beep or flash.
pub struct TerminalBell;

impl LocalCue for TerminalBell {
    fn play(&self) -> io::Result<()> {
        let mut stderr = io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()
    }
}

pub struct SilentCue;

impl LocalCue for SilentCue {
    fn play(&self) -> io::Result<()> {
        Ok(())
    }
}

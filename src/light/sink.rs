use crossbeam_channel::Sender;
use log::{debug, warn};

use super::Color;

/// Seam to the emission hardware: one discrete color per call. The real
/// driver lives outside this crate; implementations here stand in for it.
pub trait ColorSink: Send {
    fn emit(&mut self, color: Color);
}

/// Logs each emission. Default sink for the command line binary, where no
/// hardware is attached.
pub struct LogSink;

impl ColorSink for LogSink {
    fn emit(&mut self, color: Color) {
        debug!("emit {}", color);
    }
}

/// Forwards emissions over a channel to whatever wants to watch them.
#[allow(dead_code)]
pub struct ChannelSink {
    sender: Sender<Color>,
}

#[allow(dead_code)]
impl ChannelSink {
    pub fn new(sender: Sender<Color>) -> Self {
        Self { sender }
    }
}

impl ColorSink for ChannelSink {
    fn emit(&mut self, color: Color) {
        if self.sender.send(color).is_err() {
            warn!("color receiver dropped, emission lost");
        }
    }
}

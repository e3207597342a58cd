use crate::ui::{BoardFrame, ErrorFrame, LabelFrame, Renderer};
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum BoardEvent<'a> {
    Board(&'a BoardFrame),
    Labels(&'a LabelFrame),
    Error(&'a ErrorFrame),
    Clock { time: &'a str },
}

/// Writes one JSON object per board event, for piping into other displays.
pub struct JsonRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn get_ref(&self) -> &W {
        &self.out
    }

    fn emit(&mut self, event: BoardEvent<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, &event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Renderer for JsonRenderer<W> {
    fn render_full(&mut self, frame: &BoardFrame) -> Result<()> {
        self.emit(BoardEvent::Board(frame))
    }

    fn render_labels(&mut self, labels: &LabelFrame) -> Result<()> {
        self.emit(BoardEvent::Labels(labels))
    }

    fn render_error(&mut self, frame: &ErrorFrame) -> Result<()> {
        self.emit(BoardEvent::Error(frame))
    }

    fn render_clock(&mut self, clock: &str) -> Result<()> {
        self.emit(BoardEvent::Clock { time: clock })
    }
}

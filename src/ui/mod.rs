mod frame;
mod json;
mod terminal;

use anyhow::Result;

pub use frame::{BoardFrame, BoardView, Card, CurrentSlot, ErrorFrame, LabelFrame, ListArea};
pub use json::JsonRenderer;
pub use terminal::TerminalRenderer;

/// Projects board state onto some output surface. Implementations only draw;
/// they never see the cache itself.
pub trait Renderer: Send {
    /// Replaces everything on screen, clearing any error state.
    fn render_full(&mut self, frame: &BoardFrame) -> Result<()>;

    /// Updates the elapsed-time labels already on screen, by position.
    fn render_labels(&mut self, labels: &LabelFrame) -> Result<()>;

    fn render_error(&mut self, frame: &ErrorFrame) -> Result<()>;

    fn render_clock(&mut self, clock: &str) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render_full(&mut self, frame: &BoardFrame) -> Result<()> {
        (**self).render_full(frame)
    }

    fn render_labels(&mut self, labels: &LabelFrame) -> Result<()> {
        (**self).render_labels(labels)
    }

    fn render_error(&mut self, frame: &ErrorFrame) -> Result<()> {
        (**self).render_error(frame)
    }

    fn render_clock(&mut self, clock: &str) -> Result<()> {
        (**self).render_clock(clock)
    }
}

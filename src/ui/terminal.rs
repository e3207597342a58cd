use crate::ui::{BoardFrame, ErrorFrame, LabelFrame, ListArea, Renderer};
use anyhow::Result;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};

const WIDTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Heading,
    Name,
    Code,
    Muted,
    Error,
    Plain,
}

/// Full-screen board drawn with ANSI escapes. Keeps the last frame so label
/// ticks can rewrite the time badges without rebuilding the cards.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    frame: Option<BoardFrame>,
    error: Option<ErrorFrame>,
    clock: String,
    alternate_screen: bool,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout() -> Result<Self> {
        let mut renderer = Self::new(io::stdout());
        execute!(renderer.out, EnterAlternateScreen, Hide)?;
        renderer.alternate_screen = true;
        Ok(renderer)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            frame: None,
            error: None,
            clock: String::new(),
            alternate_screen: false,
        }
    }

    #[cfg(test)]
    fn get_ref(&self) -> &W {
        &self.out
    }

    fn lines(&self) -> Vec<(Tone, String)> {
        let mut lines = vec![
            (Tone::Heading, format!("{:<32}{:>16}", "NOW CALLING", self.clock)),
            (Tone::Muted, "-".repeat(WIDTH)),
        ];

        if let Some(error) = &self.error {
            lines.push((Tone::Error, error.current.clone()));
            lines.push((Tone::Muted, error.detail.clone()));
            lines.push((Tone::Plain, String::new()));
            lines.push((Tone::Heading, "PREVIOUSLY CALLED".to_string()));
            lines.push((Tone::Error, error.list.clone()));
            return lines;
        }

        let Some(frame) = &self.frame else {
            return lines;
        };

        lines.push((Tone::Name, frame.current.name.clone()));
        let elapsed = frame.current.elapsed.as_deref().unwrap_or_default();
        lines.push((
            Tone::Code,
            format!("{:<32}{:>16}", frame.current.code, elapsed),
        ));
        lines.push((Tone::Plain, String::new()));
        lines.push((Tone::Heading, "PREVIOUSLY CALLED".to_string()));

        match &frame.list {
            ListArea::Placeholder { text } => lines.push((Tone::Muted, text.clone())),
            ListArea::Cards { cards } => {
                for card in cards {
                    lines.push((
                        Tone::Plain,
                        format!("{:<26}{:<10}{:>12}", card.name, card.code, card.elapsed),
                    ));
                }
            }
        }

        lines
    }

    fn paint(&mut self) -> Result<()> {
        let lines = self.lines();

        queue!(self.out, MoveTo(0, 0), Clear(ClearType::All))?;
        for (row, (tone, text)) in lines.into_iter().enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            queue!(self.out, MoveTo(0, row))?;
            match tone {
                Tone::Heading => queue!(self.out, SetAttribute(Attribute::Bold))?,
                Tone::Name => queue!(
                    self.out,
                    SetAttribute(Attribute::Bold),
                    SetForegroundColor(Color::Cyan)
                )?,
                Tone::Code => queue!(self.out, SetForegroundColor(Color::Yellow))?,
                Tone::Muted => queue!(self.out, SetForegroundColor(Color::DarkGrey))?,
                Tone::Error => queue!(self.out, SetForegroundColor(Color::Red))?,
                Tone::Plain => {}
            }
            queue!(
                self.out,
                Print(text),
                SetAttribute(Attribute::Reset),
                ResetColor
            )?;
        }

        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render_full(&mut self, frame: &BoardFrame) -> Result<()> {
        self.error = None;
        self.frame = Some(frame.clone());
        self.paint()
    }

    fn render_labels(&mut self, labels: &LabelFrame) -> Result<()> {
        if self.error.is_some() {
            return Ok(());
        }
        let Some(frame) = self.frame.as_mut() else {
            return Ok(());
        };
        frame.apply_labels(labels);
        self.paint()
    }

    fn render_error(&mut self, frame: &ErrorFrame) -> Result<()> {
        self.error = Some(frame.clone());
        self.paint()
    }

    fn render_clock(&mut self, clock: &str) -> Result<()> {
        if self.clock == clock {
            return Ok(());
        }
        self.clock = clock.to_string();
        self.paint()
    }
}

impl<W: Write + Send> Drop for TerminalRenderer<W> {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(self.out, Show, LeaveAlternateScreen);
        }
    }
}

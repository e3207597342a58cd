use crate::board::BoardConfig;
use crate::core::cache::prepare;
use crate::core::settings::Settings;
use crate::source::{CheckoutSource, HttpCheckoutSource};
use crate::ui::{BoardFrame, ListArea};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct StatusOutput {
    endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    board: Option<BoardFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    called: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,
}

pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    let source = HttpCheckoutSource::new(&settings.source, settings.query.clone())?;
    let config = BoardConfig::from_settings(settings);

    let fetched_at = Utc::now();
    let output = match source.fetch().await {
        Ok(records) => {
            let prepared = prepare(records);
            StatusOutput {
                endpoint: source.describe(),
                board: Some(BoardFrame::project(&prepared, &config.view, fetched_at)),
                called: Some(prepared.len()),
                error: None,
                fetched_at,
            }
        }
        Err(e) => StatusOutput {
            endpoint: source.describe(),
            board: None,
            called: None,
            error: Some(e.to_string()),
            fetched_at,
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn print_text_output(output: &StatusOutput) {
    println!("{}", output.endpoint);

    if let Some(error) = &output.error {
        println!("  Error: {}", error);
        return;
    }

    let Some(board) = &output.board else {
        return;
    };

    let elapsed = board
        .current
        .elapsed
        .as_ref()
        .map(|e| format!(" ({})", e))
        .unwrap_or_default();
    println!(
        "  Now calling: {} {}{}",
        board.current.name, board.current.code, elapsed
    );

    match &board.list {
        ListArea::Placeholder { text } => println!("  {}", text),
        ListArea::Cards { cards } => {
            println!("  Previously called:");
            for card in cards {
                println!("    {:<24} {:<8} {}", card.name, card.code, card.elapsed);
            }
        }
    }

    if let Some(called) = output.called {
        println!("  {} called in window", called);
    }
}

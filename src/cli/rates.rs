use super::ui;
use crate::core::config::AppConfig;
use crate::core::present::{
    ConversionOutcome, HEADLINE_DECIMALS, RateView, TABLE_DECIMALS, default_selection, fmt,
};
use crate::core::{RateSnapshot, RateSource, SnapshotStore};
use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, CellAlignment, Table};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shown when the store has no snapshot yet.
pub const NO_DATA_MESSAGE: &str = "No rate data yet. Run `fxview ingest` first.";

/// Amount used by the converter preview of the overview.
const PREVIEW_AMOUNT: f64 = 100.0;

/// Reads the most recent snapshot and derives the view from it.
///
/// `Ok(None)` means the store is empty; the caller stops the cycle there.
pub async fn load_view(store: &dyn SnapshotStore, config: &AppConfig) -> Result<Option<RateView>> {
    let Some(doc) = store.latest().await? else {
        debug!("No snapshot available");
        return Ok(None);
    };

    let snapshot = RateSnapshot::from_document(&doc, &config.base_currency);
    if snapshot.base != config.base_currency {
        warn!(
            snapshot_base = %snapshot.base,
            configured_base = %config.base_currency,
            "Latest snapshot is quoted against a different base"
        );
    }
    debug!(rates = snapshot.rates.len(), base = %snapshot.base, "Loaded snapshot");

    Ok(Some(RateView::build(
        snapshot,
        &config.presenter_settings(),
        Utc::now(),
    )))
}

fn caption(view: &RateView) -> String {
    let text = format!(
        "Last update: {} ({}), base: {}",
        view.updated_at,
        view.age.describe(),
        view.snapshot.base
    );
    if view.age.stale {
        ui::style_text(&text, ui::StyleType::Warning)
    } else {
        ui::style_text(&text, ui::StyleType::Subtle)
    }
}

fn shortlist_table(view: &RateView) -> Table {
    let mut table = ui::new_styled_table();

    let mut header = vec![
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Rate"),
    ];
    if let Some(first) = view.shortlist.first() {
        header.extend(
            first
                .references
                .iter()
                .map(|(reference, _)| ui::header_cell(&format!("1 unit in {reference}"))),
        );
    }
    table.set_header(header);

    for row in &view.shortlist {
        let mut cells = vec![
            Cell::new(&row.from),
            Cell::new(&row.to),
            ui::rate_cell(row.rate, TABLE_DECIMALS),
        ];
        cells.extend(
            row.references
                .iter()
                .map(|(_, value)| ui::rate_cell(*value, TABLE_DECIMALS)),
        );
        table.add_row(cells);
    }

    table
}

fn full_table(view: &RateView) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Base"),
        ui::header_cell("Symbol"),
        ui::header_cell("Rate"),
        ui::header_cell("Captured"),
    ]);

    for row in &view.full {
        table.add_row(vec![
            Cell::new(&row.base),
            Cell::new(&row.symbol),
            ui::rate_cell(Some(row.rate), TABLE_DECIMALS),
            Cell::new(&view.updated_at).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

/// Renders a conversion outcome as a styled line.
pub fn render_outcome(outcome: &ConversionOutcome) -> String {
    let style = if outcome.is_converted() {
        ui::StyleType::Success
    } else {
        ui::StyleType::Error
    };
    ui::style_text(&outcome.headline(), style)
}

/// Renders the complete overview: shortlist, converter preview and all rates.
pub fn render_view(view: &RateView) -> String {
    let mut output = format!("{}\n", caption(view));

    output.push_str(&format!(
        "\n{}\n{}\n",
        ui::style_text("Shortlist", ui::StyleType::Title),
        shortlist_table(view)
    ));

    output.push_str(&format!(
        "\n{}\n",
        ui::style_text("Converter", ui::StyleType::Title)
    ));
    match default_selection(&view.known, &view.snapshot.base) {
        (Some(from), Some(to)) => {
            let outcome = view.convert(PREVIEW_AMOUNT, &from, &to);
            output.push_str(&render_outcome(&outcome));
        }
        _ => output.push_str(&ui::style_text(
            "Not enough currencies to convert between.",
            ui::StyleType::Subtle,
        )),
    }
    output.push_str(&format!(
        "\n{}\n",
        ui::style_text(
            &format!("Known currencies: {}", view.known.join(", ")),
            ui::StyleType::Subtle
        )
    ));

    output.push_str(&format!(
        "\n{}\n{}\n",
        ui::style_text(
            &format!("All rates against {}", view.snapshot.base),
            ui::StyleType::Title
        ),
        full_table(view)
    ));
    output.push_str(&ui::style_text(
        &format!(
            "Pairs without a direct quote are derived through {} (e.g. SAR→YER = YER/SAR). Headline amounts use {} decimals.",
            view.snapshot.base, HEADLINE_DECIMALS
        ),
        ui::StyleType::Subtle,
    ));

    output
}

/// One render cycle: read, normalize, present.
pub async fn render_cycle(store: &dyn SnapshotStore, config: &AppConfig) -> Result<String> {
    Ok(match load_view(store, config).await? {
        Some(view) => render_view(&view),
        None => ui::style_text(NO_DATA_MESSAGE, ui::StyleType::Warning),
    })
}

pub async fn show(store: &dyn SnapshotStore, config: &AppConfig) -> Result<()> {
    println!("{}", render_cycle(store, config).await?);
    Ok(())
}

/// Converts `amount` with the latest snapshot.
pub async fn convert(
    store: &dyn SnapshotStore,
    config: &AppConfig,
    amount: f64,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let Some(view) = load_view(store, config).await? else {
        println!("{}", ui::style_text(NO_DATA_MESSAGE, ui::StyleType::Warning));
        return Ok(());
    };

    let (default_from, default_to) = default_selection(&view.known, &view.snapshot.base);
    let from = from.map(str::to_string).or(default_from);
    let to = to.map(str::to_string).or(default_to);

    let (Some(from), Some(to)) = (from, to) else {
        println!(
            "{}",
            ui::style_text("Not enough currencies to convert between.", ui::StyleType::Error)
        );
        return Ok(());
    };

    let outcome = view.convert(amount, &from, &to);
    println!("{}", caption(&view));
    println!("{}", render_outcome(&outcome));
    if let ConversionOutcome::Converted { from, to, .. } = &outcome {
        let unit = view.convert(1.0, from, to);
        if let ConversionOutcome::Converted { result, .. } = unit {
            println!(
                "{}",
                ui::style_text(
                    &format!("1 {from} = {} {to}", fmt(Some(result), TABLE_DECIMALS)),
                    ui::StyleType::Subtle
                )
            );
        }
    }
    Ok(())
}

fn clear_terminal(term: &console::Term) {
    if let Err(e) = term.clear_screen() {
        debug!(error = %e, "Could not clear the terminal");
    }
}

/// Re-renders the overview every `refresh_seconds` until Ctrl-C.
///
/// With a `source`, the same process also ingests a snapshot every
/// `ingest_every`.
pub async fn watch(
    store: Arc<dyn SnapshotStore>,
    config: &AppConfig,
    source: Option<(Arc<dyn RateSource>, Duration)>,
) -> Result<()> {
    let ingest_task = source.map(|(source, every)| {
        let store = Arc::clone(&store);
        let config = config.clone();
        tokio::spawn(async move {
            super::ingest::run_loop(source.as_ref(), store.as_ref(), &config, every, false).await
        })
    });

    let refresh = Duration::from_secs(config.refresh_seconds.max(1));
    let mut ticker = tokio::time::interval(refresh);
    let term = console::Term::stdout();

    let result = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let rendered = render_cycle(store.as_ref(), config).await;
                clear_terminal(&term);
                match rendered {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        warn!(error = %e, "Render cycle failed");
                        println!("{}", ui::style_text(&format!("Could not read rates: {e}"), ui::StyleType::Error));
                    }
                }
                println!(
                    "{}\n{}",
                    ui::style_text(&ui::separator(), ui::StyleType::Subtle),
                    ui::style_text(
                        &format!("Refreshing every {}s. Press Ctrl-C to exit.", refresh.as_secs()),
                        ui::StyleType::Subtle
                    )
                );
            }
            signal = tokio::signal::ctrl_c() => break signal.map_err(anyhow::Error::from),
        }
    };

    if let Some(task) = ingest_task {
        task.abort();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySnapshotStore;

    #[tokio::test]
    async fn test_render_cycle_without_snapshot() {
        let rendered = render_cycle(&MemorySnapshotStore::new(), &AppConfig::default())
            .await
            .unwrap();
        assert!(rendered.contains(NO_DATA_MESSAGE));
    }

    #[test]
    fn test_clear_terminal_tolerates_any_output() {
        clear_terminal(&console::Term::stdout());
        clear_terminal(&console::Term::buffered_stderr());
    }
}

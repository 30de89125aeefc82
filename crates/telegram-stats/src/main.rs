mod bootstrap;
mod output;

use anyhow::{Context, Result};
use chrono::Utc;
use stats_core::error::StatsError;
use stats_core::settings::Settings;
use stats_core::time_utils::TimezoneHandler;
use stats_data::aggregator::{PersonPair, WindowedAggregator};
use stats_data::analysis::{analyze_export, ChatAnalysis};
use stats_data::classifier::TimestampPolicy;
use stats_data::navigation::{Direction, NavigationState};
use stats_data::reader::resolve_export_path;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("telegram-stats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Granularity: {}, Split: {}, Timezone: {}",
        settings.view,
        settings.granularity,
        settings.split,
        settings.timezone
    );

    let tz = TimezoneHandler::new(&settings.timezone);

    let export = match &settings.export {
        Some(path) => path.clone(),
        None => bootstrap::discover_export_path().ok_or_else(|| {
            StatsError::NoExportFound(std::env::current_dir().unwrap_or_default())
        })?,
    };
    let path = resolve_export_path(&export)?;
    tracing::info!("Reading export {}", path.display());

    let policy = if settings.skip_invalid {
        TimestampPolicy::Skip
    } else {
        TimestampPolicy::Abort
    };
    let analysis = analyze_export(&path, policy)
        .with_context(|| format!("Failed to analyze {}", path.display()))?;

    match settings.view.as_str() {
        "summary" => {
            let summary = analysis.summary();
            if settings.format == "json" {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", output::render_summary(&summary, tz.tz()));
            }
        }

        "histogram" => {
            let state = histogram_state(&analysis, &settings, &tz)?;
            let people = PersonPair::resolve(
                &analysis.chat.messages,
                settings.main_person.as_deref(),
                settings.other_person.as_deref(),
            );
            let histogram = WindowedAggregator::new(tz.tz()).aggregate(
                &analysis.chat.messages,
                &analysis.chat.participants,
                &state,
                people.as_ref(),
            );
            if settings.format == "json" {
                println!("{}", serde_json::to_string_pretty(&histogram)?);
            } else {
                print!("{}", output::render_histogram(&histogram, &state, tz.tz()));
            }
        }

        "record" => {
            let id = settings
                .record_id
                .clone()
                .unwrap_or_else(|| analysis.chat_id.to_string());
            let record = analysis.into_record(id, Utc::now());
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        unknown => {
            eprintln!("Unknown view mode: {}", unknown);
        }
    }

    Ok(())
}

/// Anchor the window at `--end` (or the last message), clamp it into the
/// data range, then apply `--navigate` `--steps` times.
fn histogram_state(
    analysis: &ChatAnalysis,
    settings: &Settings,
    tz: &TimezoneHandler,
) -> Result<NavigationState> {
    let granularity = settings.granularity()?;
    let split_mode = settings.split_mode()?;
    let first = analysis
        .first_message()
        .ok_or(StatsError::NoValidMessages)?;
    let last = analysis
        .last_message()
        .ok_or(StatsError::NoValidMessages)?;

    let mut state = NavigationState::initial(last, granularity, split_mode);
    if let Some(end) = &settings.end {
        state.end = tz.parse_end_date(end)?;
        state = state.with_granularity(granularity, first, last, tz.tz());
    }

    if let Some(direction) = &settings.navigate {
        let direction: Direction = direction.parse()?;
        for _ in 0..settings.steps {
            state = state.step(direction, first, last, tz.tz());
        }
    }

    Ok(state)
}

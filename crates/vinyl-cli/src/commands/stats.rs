use anyhow::Result;
use chrono::{Datelike, Days, Local, NaiveDate};
use vinyl_core::{AsyncCatalog, Period, PeriodStats};

use super::print_json;

pub async fn period(catalog: &AsyncCatalog, period: Period, top: usize, json: bool) -> Result<()> {
    let now = Local::now();
    let stats = catalog
        .run(move |store| store.stats_for(period, &now, top))
        .await?;

    if json {
        return print_json(&stats);
    }
    print_stats(period, &stats);
    Ok(())
}

fn print_stats(period: Period, stats: &PeriodStats) {
    println!("\nListening {:?}\n", period);
    println!("  Plays:         {}", stats.total_plays);
    println!("  Unique tracks: {}", stats.unique_tracks);
    println!("  Artists:       {}", stats.total_artists);
    println!("  Time played:   {}", format_hours(stats.total_play_time_ms));

    if !stats.top_tracks.is_empty() {
        println!("\n  Top tracks:");
        for (rank, top) in stats.top_tracks.iter().enumerate() {
            println!("  {:>3}. {} ({} plays)", rank + 1, top.item.title, top.plays);
        }
    }
    if !stats.top_artists.is_empty() {
        println!("\n  Top artists:");
        for (rank, top) in stats.top_artists.iter().enumerate() {
            println!("  {:>3}. {} ({} plays)", rank + 1, top.item.name, top.plays);
        }
    }
}

fn format_hours(ms: i64) -> String {
    let minutes = ms / 60_000;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

pub async fn daily(
    catalog: &AsyncCatalog,
    from: Option<NaiveDate>,
    days: u32,
    json: bool,
) -> Result<()> {
    let first_day = from.unwrap_or_else(this_monday);
    let totals = catalog
        .run(move |store| store.daily_totals(first_day, days, &Local))
        .await?;

    if json {
        return print_json(&totals);
    }
    for day in &totals {
        println!(
            "{}  {:>4} plays  {}",
            day.date.format("%a %Y-%m-%d"),
            day.play_count,
            format_hours(day.total_play_time_ms)
        );
    }
    Ok(())
}

fn this_monday() -> NaiveDate {
    let today = Local::now().date_naive();
    today
        .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
        .unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(0), "0h 00m");
        assert_eq!(format_hours(3 * 3_600_000 + 5 * 60_000 + 59_999), "3h 05m");
    }

    #[test]
    fn test_this_monday() {
        assert_eq!(this_monday().weekday(), Weekday::Mon);
    }
}

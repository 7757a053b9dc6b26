//! Terminal weather lookup.

use tenki_types::weather::Locale;

use crate::state::AppState;

/// Fetch and print a snapshot for one city.
pub async fn lookup(state: &AppState, city: &str, lang: &str, days: u32) -> anyhow::Result<()> {
    let locale: Locale = lang
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let Some(snapshot) = state.chat_service.weather().fetch(city, locale, days).await else {
        println!(
            "  {} No geocoding match for '{}'",
            console::style("✗").red(),
            city
        );
        return Ok(());
    };

    println!();
    println!(
        "  {} {}, {}",
        console::style("☁").bold(),
        console::style(&snapshot.city).cyan().bold(),
        snapshot.country
    );
    println!(
        "  {}°C (feels like {}°C)  {}  humidity {}%  wind {:.1} m/s",
        snapshot.temp,
        snapshot.feels_like,
        snapshot.description,
        snapshot.humidity,
        snapshot.wind_speed
    );
    println!();
    for point in &snapshot.forecast {
        println!(
            "  {:<12} {:>6}  {:>4}°C  {}",
            console::style(&point.label).green(),
            point.time,
            point.temp,
            point.description
        );
    }
    println!();

    Ok(())
}

//! Text rendering of a settled [`Snapshot`], laid out like the weather card.

use cityweather_core::{FetchState, ImageBuffer, ImageError, Snapshot, WeatherResult};

pub fn card(snapshot: &Snapshot) -> String {
    let city = snapshot.query.as_deref().unwrap_or_default().trim();

    match &snapshot.weather {
        None => String::new(),
        Some(FetchState::Loading) => format!("Searching for {city}..."),
        Some(FetchState::Error(err)) => format!("Error: {err}"),
        Some(FetchState::Content(weather)) => weather_card(city, weather, snapshot.icon.as_ref()),
    }
}

fn weather_card(
    city: &str,
    weather: &WeatherResult,
    icon: Option<&FetchState<ImageBuffer, ImageError>>,
) -> String {
    let current = &weather.current;

    let mut lines = vec![
        format!("Current weather in {city}"),
        format!("  {}", weather.location.display_name()),
        String::new(),
        format!("  {}", current.condition),
    ];

    match icon {
        Some(FetchState::Content(image)) => {
            lines.push(format!("  [icon {}x{}]", image.width(), image.height()));
        }
        Some(FetchState::Error(err)) => lines.push(format!("  [icon unavailable: {err}]")),
        Some(FetchState::Loading) | None => {}
    }

    lines.push(format!("  Temperature in °C: {}", current.temperature));
    lines.push(format!("  Feels like: {}", current.feels_like));
    lines.push(format!(
        "  Humidity: {}%  Wind: {} km/h {}",
        weather.humidity_pct, weather.wind_kph, weather.wind_dir
    ));

    if let Some(localtime) = &weather.location.localtime {
        lines.push(format!("  Local time: {localtime}"));
    }

    lines.join("\n")
}

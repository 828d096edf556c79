//! Mock weather lookup used by the demo widget. No external service is
//! contacted; the same city always yields the same report.

use serde::Serialize;

const CONDITIONS: [&str; 5] = ["Sunny", "Partly cloudy", "Cloudy", "Light rain", "Windy"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature_c: i32,
    pub condition: String,
    pub humidity: u8,
}

#[derive(Debug, thiserror::Error)]
#[error("City name must not be empty")]
pub struct EmptyCity;

pub fn mock_weather(city: &str) -> Result<WeatherReport, EmptyCity> {
    let city = city.trim();
    if city.is_empty() {
        return Err(EmptyCity);
    }

    // FNV-1a over the lowercased name.
    let seed = city
        .to_lowercase()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });

    Ok(WeatherReport {
        city: city.to_string(),
        temperature_c: (seed % 41) as i32 - 5,
        condition: CONDITIONS[(seed >> 8) as usize % CONDITIONS.len()].to_string(),
        humidity: 20 + ((seed >> 16) % 71) as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_city_same_report() {
        let a = mock_weather("Lisbon").unwrap();
        let b = mock_weather("  lisbon ").unwrap();
        assert_eq!(a.temperature_c, b.temperature_c);
        assert_eq!(a.condition, b.condition);
        assert_eq!(a.humidity, b.humidity);
    }

    #[test]
    fn values_stay_in_range() {
        for city in ["Oslo", "Cairo", "Lima", "Tokyo", "Perth", "Quito"] {
            let r = mock_weather(city).unwrap();
            assert!((-5..=35).contains(&r.temperature_c));
            assert!((20..=90).contains(&r.humidity));
            assert!(CONDITIONS.contains(&r.condition.as_str()));
        }
    }

    #[test]
    fn empty_city_is_rejected() {
        assert!(mock_weather("   ").is_err());
    }
}

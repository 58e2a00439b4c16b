//! WMO weather codes as used by Open-Meteo.
//! See: https://open-meteo.com/en/docs#weathervariables

const LABELS: &[(i32, &str)] = &[
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Fog"),
    (48, "Depositing rime fog"),
    (51, "Light drizzle"),
    (53, "Moderate drizzle"),
    (55, "Dense drizzle"),
    (61, "Slight rain"),
    (63, "Moderate rain"),
    (65, "Heavy rain"),
    (71, "Slight snow fall"),
    (73, "Moderate snow fall"),
    (75, "Heavy snow fall"),
    (80, "Slight rain showers"),
    (81, "Moderate rain showers"),
    (82, "Violent rain showers"),
    (95, "Thunderstorm"),
    (96, "Thunderstorm with slight hail"),
    (99, "Thunderstorm with heavy hail"),
];

/// Label for a known code, `None` otherwise.
pub fn label(code: i32) -> Option<&'static str> {
    LABELS.iter().find(|(c, _)| *c == code).map(|(_, l)| *l)
}

/// Human-readable condition. Unknown codes come back as "Code <n>".
pub fn describe(code: i32) -> String {
    match label(code) {
        Some(l) => l.to_string(),
        None => format!("Code {code}"),
    }
}

/// Like [`describe`], for forecast slots where the API sent no code.
pub fn describe_opt(code: Option<i32>) -> String {
    code.map(describe).unwrap_or_else(|| "Unknown".to_string())
}

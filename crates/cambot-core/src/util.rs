use std::time::Duration;

use chrono::Local;

/// Caption for a delivered photo: the local capture timestamp.
pub fn caption_timestamp() -> String {
    Local::now().format("%Y-%m-%d (%a) %H:%M:%S").to_string()
}

/// Uptime rendered the way `/status` reports it.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / (60 * 60 * 24);
    let hours = (secs % (60 * 60 * 24)) / (60 * 60);

    format!("*{days}* day(s) *{hours}* hour(s)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_renders_days_and_hours() {
        assert_eq!(
            format_uptime(Duration::from_secs(0)),
            "*0* day(s) *0* hour(s)"
        );
        assert_eq!(
            format_uptime(Duration::from_secs(3 * 60 * 60)),
            "*0* day(s) *3* hour(s)"
        );
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 24 * 60 * 60 + 5 * 60 * 60 + 59)),
            "*2* day(s) *5* hour(s)"
        );
    }
}

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const GAME_LOG: &str = "game.log";

const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "Tibia - Graphical Multi-User-Dungeon";

const WEEKDAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Installs the global subscriber: stdout plus `<log_dir>/game.log`.
///
/// `RUST_LOG` takes precedence over `level`. Calling this again once a
/// subscriber is installed leaves the first one in place.
pub fn init(log_dir: &Path, level: &str) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;
    let path = log_dir.join(GAME_LOG);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("open log {} failed: {}", path.display(), err))?;
    if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
        write_header(&mut file, GAME_LOG, unix_timestamp())
            .map_err(|err| format!("header write failed: {}", err))?;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| format!("invalid log level {:?}: {}", level, err))?;
    let file_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(file));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
    if installed.is_ok() {
        tracing::info!(log = %path.display(), level, "logging started");
    }
    Ok(())
}

fn write_header(out: &mut impl Write, name: &str, now: i64) -> std::io::Result<()> {
    writeln!(out, "{HEADER_LINE}")?;
    writeln!(out, "{HEADER_TITLE}")?;
    writeln!(out, "{name} - gestartet {}", header_timestamp(now))
}

/// `Thu Jan  1 00:00:00 1970` style, UTC.
fn header_timestamp(ts: i64) -> String {
    let secs = ts.max(0);
    let days = secs / 86_400;
    let of_day = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{} {} {:>2} {:02}:{:02}:{:02} {}",
        WEEKDAYS[days.rem_euclid(7) as usize],
        MONTHS[(month as usize).saturating_sub(1).min(11)],
        day,
        of_day / 3_600,
        (of_day % 3_600) / 60,
        of_day % 60,
        year
    )
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = (yoe + era * 400 + i64::from(month <= 2)) as i32;
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_the_file_and_start_time() {
        let mut out = Vec::new();
        write_header(&mut out, GAME_LOG, 0).expect("written");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER_LINE);
        assert_eq!(lines[1], HEADER_TITLE);
        assert_eq!(lines[2], "game.log - gestartet Thu Jan  1 00:00:00 1970");
    }

    #[test]
    fn leap_day() {
        // 2024-02-29 12:30:05 UTC
        assert_eq!(header_timestamp(1_709_209_805), "Thu Feb 29 12:30:05 2024");
    }
}

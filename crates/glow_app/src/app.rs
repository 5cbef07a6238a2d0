use std::fmt::Write as _;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use glow_core::{
    calendar::{CalendarMonth, YearMonth, WEEKDAY_LABELS},
    date::DayKey,
    playback::CooperativeScheduler,
    record::{self, CheckInRecord, ImagePayload, ViewMode},
    service::{CheckInService, ProgressSnapshot},
    storage::JsonFileStorage,
    timeline::Frame,
    tip::StaticTip,
};
use tracing::{debug, info, warn};

const DEFAULT_DATA_FILE: &str = "glow_checkins.json";
const DEFAULT_STORAGE_LIMIT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppMode {
    Dashboard,
    Gallery,
    Timelapse,
}

impl AppMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Some(AppMode::Dashboard),
            "gallery" => Some(AppMode::Gallery),
            "timelapse" => Some(AppMode::Timelapse),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_file: PathBuf,
    pub(crate) storage_limit_bytes: usize,
    pub(crate) month: Option<YearMonth>,
    pub(crate) view_mode: ViewMode,
    pub(crate) mode: AppMode,
    pub(crate) tip: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("GLOW_DATA_FILE") {
            if !path.trim().is_empty() {
                config.data_file = PathBuf::from(path);
            }
        }
        if let Ok(limit) = std::env::var("GLOW_STORAGE_LIMIT_BYTES") {
            match limit.trim().parse::<usize>() {
                Ok(value) if value > 0 => config.storage_limit_bytes = value,
                _ => warn!(value = %limit, "ignoring invalid GLOW_STORAGE_LIMIT_BYTES"),
            }
        }
        if let Ok(month) = std::env::var("GLOW_MONTH") {
            match month.parse::<YearMonth>() {
                Ok(value) => config.month = Some(value),
                Err(err) => warn!(value = %month, %err, "ignoring invalid GLOW_MONTH"),
            }
        }
        if let Ok(mode) = std::env::var("GLOW_VIEW_MODE") {
            match ViewMode::parse(&mode) {
                Some(value) => config.view_mode = value,
                None => warn!(value = %mode, "ignoring invalid GLOW_VIEW_MODE"),
            }
        }
        if let Ok(mode) = std::env::var("GLOW_MODE") {
            match AppMode::parse(&mode) {
                Some(value) => config.mode = value,
                None => warn!(value = %mode, "ignoring invalid GLOW_MODE"),
            }
        }
        if let Ok(tip) = std::env::var("GLOW_TIP") {
            if !tip.trim().is_empty() {
                config.tip = Some(tip);
            }
        }
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            storage_limit_bytes: DEFAULT_STORAGE_LIMIT_BYTES,
            month: None,
            view_mode: ViewMode::Front,
            mode: AppMode::Dashboard,
            tip: None,
        }
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    info!(path = %config.data_file.display(), mode = ?config.mode, "starting Glow");
    let service = build_service(&config)?;
    let report = service.load_report();
    if let Some(err) = &report.unreadable {
        println!(
            "Could not read {} ({err}). Starting empty; the file is backed up before the next save.",
            config.data_file.display()
        );
    }
    for err in &report.rejected {
        println!("Skipped unreadable check-in: {err}");
    }

    match config.mode {
        AppMode::Dashboard => {
            let progress = service.progress(DayKey::today(), config.month, &Local);
            print!("{}", render_dashboard(&service.daily_tip(), &progress));
        }
        AppMode::Gallery => {
            print!("{}", render_gallery(&service.records(), config.view_mode, &Local));
        }
        AppMode::Timelapse => run_timelapse(&service, config.view_mode),
    }
    Ok(())
}

fn build_service(config: &AppConfig) -> Result<CheckInService> {
    let storage =
        JsonFileStorage::new(&config.data_file).with_limit(config.storage_limit_bytes);
    let mut builder = CheckInService::builder().with_storage(Box::new(storage));
    if let Some(tip) = &config.tip {
        builder = builder.with_tip_source(Box::new(StaticTip(tip.clone())));
    }
    builder.build().with_context(|| {
        format!(
            "failed to load check-ins from {}",
            config.data_file.display()
        )
    })
}

fn run_timelapse(service: &CheckInService, view_mode: ViewMode) {
    let mut playback = service.playback(view_mode, CooperativeScheduler::new());
    let Some(frame) = playback.cursor().frame() else {
        println!("No check-ins yet. Finish a routine to start your timelapse.");
        return;
    };
    println!("{}", render_frame(&frame, &Local));

    playback.play();
    while let Some((handle, delay)) = playback.scheduler().pending() {
        thread::sleep(delay);
        playback.scheduler_mut().take_due();
        if !playback.on_tick(handle) {
            continue;
        }
        if let Some(frame) = playback.cursor().frame() {
            println!("{}", render_frame(&frame, &Local));
        }
    }
    debug!(index = playback.cursor().index(), "timelapse finished");
    playback.close();
}

pub fn render_dashboard(tip: &str, progress: &ProgressSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tip: {tip}");
    let _ = writeln!(
        out,
        "Streak: {} day{}  (longest {}, {} check-ins)",
        progress.streak.count,
        if progress.streak.count == 1 { "" } else { "s" },
        progress.summary.longest,
        progress.total_check_ins
    );
    let _ = writeln!(
        out,
        "{}",
        if progress.streak.today_done {
            "Done for today, nice work!"
        } else {
            "No check-in yet today."
        }
    );
    out.push('\n');
    out.push_str(&render_calendar(&progress.calendar));
    out
}

fn render_calendar(calendar: &CalendarMonth) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", calendar.month);
    let header: Vec<String> = WEEKDAY_LABELS
        .iter()
        .map(|label| format!("{label:>4}"))
        .collect();
    let _ = writeln!(out, "{}", header.join(""));
    for week in calendar.weeks() {
        let row: String = week
            .iter()
            .map(|cell| match cell {
                None => "    ".to_string(),
                Some(cell) if cell.is_completed => format!("{:>4}", "✓"),
                Some(cell) if cell.is_today => format!("{:>4}", format!("[{}]", cell.day)),
                Some(cell) => format!("{:>4}", cell.day),
            })
            .collect();
        let _ = writeln!(out, "{}", row.trim_end());
    }
    out
}

/// Check-ins most recent first, one line per tile in the selected view.
pub fn render_gallery<Tz: TimeZone>(
    records: &[CheckInRecord],
    view_mode: ViewMode,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if records.is_empty() {
        return "No check-ins yet. Finish a routine to fill your gallery.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Gallery: {} check-in{} ({:?} view)",
        records.len(),
        if records.len() == 1 { "" } else { "s" },
        view_mode
    );
    for check_in in records {
        let tile = match record::image_for(check_in, view_mode) {
            Some(image) => describe_image(image),
            None => "No side view".to_string(),
        };
        let _ = writeln!(
            out,
            "{}  {:<10} {}",
            check_in.date().with_timezone(tz).format("%b %d, %Y"),
            check_in.routine_id(),
            tile
        );
    }
    out
}

pub fn render_frame<Tz: TimeZone>(frame: &Frame<'_>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let date = frame.date.with_timezone(tz).format("%b %d, %Y");
    let body = match frame.image {
        Some(image) => describe_image(image),
        None if frame.missing_side => "no side view for this date".to_string(),
        None => "no image available".to_string(),
    };
    format!("[{} / {}] {}  {}", frame.index + 1, frame.total, date, body)
}

fn describe_image(image: &ImagePayload) -> String {
    let raw = image.as_str();
    let preview: String = raw.chars().take(32).collect();
    if preview.len() < raw.len() {
        format!("{preview}… ({} bytes)", raw.len())
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use glow_core::{
        date::parse_instant,
        record::{CheckInId, CheckInImages, CheckInRecord},
        timeline::{Timeline, TimelineCursor},
    };
    use std::sync::Arc;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.data_file, PathBuf::from(DEFAULT_DATA_FILE));
        assert_eq!(config.storage_limit_bytes, DEFAULT_STORAGE_LIMIT_BYTES);
        assert_eq!(config.mode, AppMode::Dashboard);
        assert_eq!(config.view_mode, ViewMode::Front);
        assert_eq!(AppMode::parse(" Timelapse "), Some(AppMode::Timelapse));
        assert_eq!(AppMode::parse("gallery"), Some(AppMode::Gallery));
        assert_eq!(AppMode::parse("grid"), None);
    }

    #[test]
    fn dashboard_shows_streak_and_marks_days() {
        let service = CheckInService::builder().build().unwrap();
        let record = CheckInRecord::new(
            CheckInId::new("1"),
            parse_instant("2024-05-02T10:00:00Z").unwrap(),
            CheckInImages::FrontOnly(ImagePayload::new("data:front").unwrap()),
            None,
        );
        service.append(record).unwrap();
        let today = DayKey::from_ymd(2024, 5, 3).unwrap();
        let progress = service.progress(today, None, &Utc);

        let rendered = render_dashboard("Smile.", &progress);
        assert!(rendered.contains("Tip: Smile."));
        assert!(rendered.contains("Streak: 1 day "));
        assert!(rendered.contains("No check-in yet today."));
        assert!(rendered.contains("2024-05"));
        assert!(rendered.contains("✓"));
        assert!(rendered.contains("[3]"));
    }

    #[test]
    fn frame_rendering_calls_out_missing_side_view() {
        let record = CheckInRecord::new(
            CheckInId::new("1"),
            parse_instant("2024-05-02T10:00:00Z").unwrap(),
            CheckInImages::LegacyOnly(ImagePayload::new("data:legacy").unwrap()),
            None,
        );
        let cursor = TimelineCursor::new(Arc::new(Timeline::new(vec![record])), ViewMode::Side);
        let rendered = render_frame(&cursor.frame().unwrap(), &Utc);
        assert_eq!(rendered, "[1 / 1] May 02, 2024  no side view for this date");
    }

    #[test]
    fn gallery_lists_newest_first_with_side_placeholder() {
        let service = CheckInService::builder().build().unwrap();
        service
            .append(CheckInRecord::new(
                CheckInId::new("1"),
                parse_instant("2024-05-01T10:00:00Z").unwrap(),
                CheckInImages::LegacyOnly(ImagePayload::new("data:legacy").unwrap()),
                Some("zone"),
            ))
            .unwrap();
        service
            .append(CheckInRecord::new(
                CheckInId::new("2"),
                parse_instant("2024-05-02T10:00:00Z").unwrap(),
                CheckInImages::FrontAndSide {
                    front: ImagePayload::new("data:front").unwrap(),
                    side: ImagePayload::new("data:side").unwrap(),
                },
                None,
            ))
            .unwrap();

        let side = render_gallery(&service.records(), ViewMode::Side, &Utc);
        let lines: Vec<&str> = side.lines().collect();
        assert_eq!(lines[0], "Gallery: 2 check-ins (Side view)");
        assert_eq!(lines[1], "May 02, 2024  unknown    data:side");
        assert_eq!(lines[2], "May 01, 2024  zone       No side view");

        let front = render_gallery(&service.records(), ViewMode::Front, &Utc);
        assert!(front.contains("data:front"));
        assert!(front.contains("data:legacy"));
        assert!(!front.contains("No side view"));

        assert!(render_gallery(&[], ViewMode::Front, &Utc).starts_with("No check-ins yet."));
    }
}

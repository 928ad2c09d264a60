//! Command-line options.
//!
//! Example: `video-thumbnails --from-settings`

use clap::Parser;

use crate::logging::LogFormat;

#[derive(Debug, Default, Parser)]
#[command(name = "video-thumbnails", about = "Adds thumbnails from YouTube to videos")]
pub struct CliOptions {
    /// Update videos with the settings stored in the admin settings table
    #[arg(long = "from-settings", alias = "from_settings", env = "THUMBNAIL_FROM_SETTINGS")]
    pub from_settings: bool,

    /// Run on a cron schedule (six fields, seconds first) instead of once
    #[arg(long, value_name = "CRON")]
    pub schedule: Option<String>,

    /// SQLite database URL or file path
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_defaults_to_false() {
        let options = CliOptions::try_parse_from(["video-thumbnails"]).unwrap();
        assert!(!options.from_settings);
        assert!(options.schedule.is_none());
    }

    #[test]
    fn test_from_settings_both_spellings() {
        let dashed = CliOptions::try_parse_from(["video-thumbnails", "--from-settings"]).unwrap();
        assert!(dashed.from_settings);

        let underscored = CliOptions::try_parse_from(["video-thumbnails", "--from_settings"]).unwrap();
        assert!(underscored.from_settings);
    }

    #[test]
    fn test_schedule_and_log_format() {
        let options = CliOptions::try_parse_from([
            "video-thumbnails",
            "--schedule",
            "0 */15 * * * *",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        assert_eq!(options.schedule.as_deref(), Some("0 */15 * * * *"));
        assert_eq!(options.log_format, Some(LogFormat::Pretty));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(CliOptions::try_parse_from(["video-thumbnails", "--commit"]).is_err());
    }
}

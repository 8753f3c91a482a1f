mod daily;
mod ids;
mod level;
mod song;

pub use ids::{ParseIdError, SongId};

pub use daily::{DailyCalendar, DailyPlaylist, DateKey, DateKeyError};
pub use level::{LadderError, Level, LevelLadder};
pub use song::{ALL_CATEGORIES, Song, SongError, category_display_name, filter_by_category};

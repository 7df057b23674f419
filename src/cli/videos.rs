use std::path::Path;

use humansize::{file_size_opts as options, FileSize};
use prettytable::{cell, row, Table};

use timelapse_cam::video::{list_videos, VideoEntry};

pub async fn print_videos(video_dir: &Path) -> anyhow::Result<()> {
    let videos = list_videos(video_dir).await?;

    if videos.is_empty() {
        println!("no videos in {}", video_dir.display());
        return Ok(());
    }

    video_table(&videos).printstd();

    Ok(())
}

fn video_table(videos: &[VideoEntry]) -> Table {
    let mut table = Table::new();
    table.set_titles(row!["created", "size", "name"]);

    for video in videos.iter().rev() {
        let created: chrono::DateTime<chrono::Local> = video.modified.into();
        let created = created.format("%F %H:%M").to_string();
        let size = video
            .size
            .file_size(options::CONVENTIONAL)
            .unwrap_or_default();

        table.add_row(row![created, size, video.name]);
    }

    table
}

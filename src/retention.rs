//! Bounded-count retention shared by the snapshot store and the video library.

use std::{collections::VecDeque, io, path::Path};

/// Removes entries from the front of `items` until at most `max_keep`
/// remain, returning the removed entries oldest first. `None` keeps
/// everything.
pub fn drain_excess<T>(items: &mut VecDeque<T>, max_keep: Option<usize>) -> Vec<T> {
    let max_keep = match max_keep {
        Some(max_keep) => max_keep,
        None => return Vec::new(),
    };

    let excess = items.len().saturating_sub(max_keep);
    items.drain(..excess).collect()
}

/// Deletes a file that retention has given up on. A file that is already
/// gone counts as deleted.
pub async fn remove_expired(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("deleted {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("{} was already deleted", path.display());
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_oldest_until_at_max() {
        let mut items: VecDeque<_> = (0..10).collect();

        let removed = drain_excess(&mut items, Some(3));

        assert_eq!(removed, (0..7).collect::<Vec<_>>());
        assert_eq!(items, (7..10).collect::<VecDeque<_>>());
    }

    #[test]
    fn never_leaves_more_than_max() {
        for len in 0..8 {
            for max in 0..8 {
                let mut items: VecDeque<_> = (0..len).collect();
                drain_excess(&mut items, Some(max));
                assert_eq!(items.len(), len.min(max));
            }
        }
    }

    #[test]
    fn unbounded_keeps_everything() {
        let mut items: VecDeque<_> = (0..5).collect();

        assert!(drain_excess(&mut items, None).is_empty());
        assert_eq!(items.len(), 5);
    }

    #[tokio::test]
    async fn removing_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();

        remove_expired(&dir.path().join("gone.jpg")).await.unwrap();
    }
}

use super::{Storage, from_millis, to_millis};
use crate::error::Result;
use crate::model::Media;
use rusqlite::params;

impl Storage {
    /// Insert an attachment row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, for instance when the position
    /// is already taken or out of range.
    pub fn insert_media(&self, media: &Media) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO media
            (id, post_id, file_path, file_name, file_type, file_size, width, height, position, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                media.id,
                media.post_id,
                media.file_path,
                media.file_name,
                media.file_type,
                media.file_size,
                media.width,
                media.height,
                media.position,
                to_millis(media.created_at),
            ],
        )?;
        Ok(())
    }

    /// Attachments of a post in position order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn media_for_post(&self, post_id: &str) -> Result<Vec<Media>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, post_id, file_path, file_name, file_type, file_size,
                   width, height, position, created_at
            FROM media
            WHERE post_id = ?
            ORDER BY position
            ",
        )?;
        let media = stmt
            .query_map(params![post_id], |row| {
                Ok(Media {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    file_path: row.get(2)?,
                    file_name: row.get(3)?,
                    file_type: row.get(4)?,
                    file_size: row.get(5)?,
                    width: row.get(6)?,
                    height: row.get(7)?,
                    position: row.get(8)?,
                    created_at: from_millis(row.get(9)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use crate::ids;
    use crate::model::Media;
    use crate::storage::Storage;
    use crate::storage::tests::{create_test_post, create_test_user};

    fn media_row(post_id: &str, position: u8) -> Media {
        let id = ids::next_id();
        Media {
            id: id.to_string(),
            post_id: post_id.to_string(),
            file_path: format!("/media/{post_id}_{position}.png"),
            file_name: format!("{post_id}_{position}.png"),
            file_type: "image/png".into(),
            file_size: 42,
            width: Some(2),
            height: Some(2),
            position,
            created_at: ids::timestamp_of(id),
        }
    }

    #[test]
    fn test_media_ordered_by_position_and_cascaded() {
        let storage = Storage::open_memory().unwrap();
        let alice = create_test_user(&storage, "alice");
        let post = create_test_post(&storage, &alice, "pics");

        storage.insert_media(&media_row(&post.id, 1)).unwrap();
        storage.insert_media(&media_row(&post.id, 0)).unwrap();
        assert!(storage.insert_media(&media_row(&post.id, 1)).is_err());
        assert!(storage.insert_media(&media_row(&post.id, 4)).is_err());

        let media = storage.media_for_post(&post.id).unwrap();
        let positions: Vec<u8> = media.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 1]);

        storage.delete_post(&post.id, &alice.id).unwrap();
        assert!(storage.media_for_post(&post.id).unwrap().is_empty());
    }
}

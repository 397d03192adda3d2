//! Incremental gallery reveal.
//!
//! Image ids live in `[1, max_images]`. The cursor only moves forward and the
//! list only grows; a tile that failed to load is hidden, never removed.

use std::collections::BTreeSet;

use mp_api_types::GalleryImage;

pub const MAX_IMAGES: u32 = 7175;
pub const BATCH_SIZE: u32 = 60;

#[derive(Debug, Clone)]
pub struct GalleryPaginator {
    base: String,
    ext: String,
    max_images: u32,
    batch_size: u32,
    cursor: u32,
    images: Vec<GalleryImage>,
    failed: BTreeSet<u32>,
}

impl GalleryPaginator {
    pub fn new(base: impl Into<String>, ext: impl Into<String>, max_images: u32, batch_size: u32) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_owned(),
            ext: ext.into().trim_start_matches('.').to_owned(),
            // the cursor must be able to step one past the last id
            max_images: max_images.min(u32::MAX - 1),
            batch_size: batch_size.max(1),
            cursor: 1,
            images: Vec::new(),
            failed: BTreeSet::new(),
        }
    }

    /// Resumes from `cursor` instead of the first image.
    pub fn starting_at(mut self, cursor: u32) -> Self {
        self.cursor = cursor.max(1);
        self
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor > self.max_images
    }

    /// Appends the next batch and returns it.
    pub fn load_more(&mut self) -> &[GalleryImage] {
        let start = self.images.len();
        let mut added = 0;
        while added < self.batch_size && self.cursor <= self.max_images {
            self.images.push(GalleryImage {
                id: self.cursor,
                url: format!("{}/{}.{}", self.base, self.cursor, self.ext),
            });
            self.cursor += 1;
            added += 1;
        }
        &self.images[start..]
    }

    /// Viewport signal from the sentinel below the last tile.
    pub fn on_sentinel_visible(&mut self, visible: bool) -> usize {
        if !visible || self.is_exhausted() {
            return 0;
        }
        self.load_more().len()
    }

    pub fn mark_failed(&mut self, id: u32) {
        self.failed.insert(id);
    }

    pub fn visible(&self) -> impl Iterator<Item = &GalleryImage> {
        self.images.iter().filter(|image| !self.failed.contains(&image.id))
    }

    pub fn loaded(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator() -> GalleryPaginator {
        GalleryPaginator::new("https://img.example/", "png", MAX_IMAGES, BATCH_SIZE)
    }

    #[test]
    fn first_batch_starts_at_one() {
        let mut gallery = paginator();
        let batch = gallery.load_more();
        assert_eq!(batch.len(), 60);
        assert_eq!(batch[0].url, "https://img.example/1.png");
        assert_eq!(batch[59].id, 60);
        assert_eq!(gallery.cursor(), 61);
    }

    #[test]
    fn tail_batch_stops_at_the_last_image() {
        let mut gallery = paginator().starting_at(7170);

        let ids: Vec<u32> = gallery.load_more().iter().map(|image| image.id).collect();
        assert_eq!(ids, vec![7170, 7171, 7172, 7173, 7174, 7175]);
        assert_eq!(gallery.cursor(), 7176);
        assert!(gallery.is_exhausted());

        assert!(gallery.load_more().is_empty());
        assert_eq!(gallery.on_sentinel_visible(true), 0);
        assert_eq!(gallery.cursor(), 7176);
    }

    #[test]
    fn ids_stay_in_range_and_cursor_only_grows() {
        let mut gallery = GalleryPaginator::new("b", "jpg", 130, 60);
        let mut last_cursor = gallery.cursor();
        while !gallery.is_exhausted() {
            gallery.on_sentinel_visible(true);
            assert!(gallery.cursor() > last_cursor);
            last_cursor = gallery.cursor();
        }
        assert_eq!(gallery.loaded(), 130);
        assert!(gallery.visible().all(|image| (1..=130).contains(&image.id)));
    }

    #[test]
    fn hidden_sentinel_and_failed_tiles() {
        let mut gallery = paginator();
        assert_eq!(gallery.on_sentinel_visible(false), 0);
        assert_eq!(gallery.on_sentinel_visible(true), 60);

        gallery.mark_failed(2);
        assert_eq!(gallery.visible().count(), 59);
        assert!(gallery.visible().all(|image| image.id != 2));

        // a broken tile does not stop pagination
        assert_eq!(gallery.on_sentinel_visible(true), 60);
        assert_eq!(gallery.visible().count(), 119);
    }

    #[test]
    fn largest_collection_ends_without_overflow() {
        let mut gallery = GalleryPaginator::new("b", "png", u32::MAX, BATCH_SIZE).starting_at(u32::MAX - 3);

        let ids: Vec<u32> = gallery.load_more().iter().map(|image| image.id).collect();
        assert_eq!(ids, vec![u32::MAX - 3, u32::MAX - 2, u32::MAX - 1]);
        assert_eq!(gallery.cursor(), u32::MAX);
        assert!(gallery.is_exhausted());
        assert!(gallery.load_more().is_empty());
    }
}

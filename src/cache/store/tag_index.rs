//! Bidirectional tag index.
//!
//! Tracks which keys were written under which tags so a tag flush can find
//! every affected entry, and so removing an entry cleans up its tags.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::cache::identity::{Tag, TagSet};
use crate::cache::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store::tag_index";

/// Tracks tag -> keys and key -> tags mappings.
pub struct TagIndex {
    /// Maps tags to every key stored under them
    tag_to_keys: RwLock<HashMap<Tag, HashSet<String>>>,
    /// Maps keys to the tags they were stored under
    key_to_tags: RwLock<HashMap<String, TagSet>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Record `key` under `tags`, replacing whatever tags it carried before.
    pub fn register(&self, key: &str, tags: &TagSet) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        if let Some(previous) = k2t.remove(key) {
            detach(&mut t2k, key, &previous);
        }
        if tags.is_empty() {
            return;
        }
        for tag in tags {
            t2k.entry(tag.clone()).or_default().insert(key.to_string());
        }
        k2t.insert(key.to_string(), tags.clone());
    }

    /// Every key stored under any of `tags`.
    pub fn keys_for_tags(&self, tags: &TagSet) -> HashSet<String> {
        let t2k = rw_read(&self.tag_to_keys, SOURCE, "keys_for_tags");
        tags.iter()
            .filter_map(|tag| t2k.get(tag))
            .flat_map(|keys| keys.iter().cloned())
            .collect()
    }

    /// Tags a key was stored under.
    pub fn tags_for_key(&self, key: &str) -> TagSet {
        rw_read(&self.key_to_tags, SOURCE, "tags_for_key")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop `key` from every tag it was registered under.
    pub fn unregister(&self, key: &str) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            detach(&mut t2k, key, &tags);
        }
    }

    /// Remove every mapping of the given tags.
    ///
    /// Returns the keys that were registered under any of them. Those keys
    /// are dropped from the index entirely, including their other tags.
    pub fn take_tags(&self, tags: &TagSet) -> HashSet<String> {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "take_tags.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "take_tags.key_to_tags");

        let affected: HashSet<String> = tags
            .iter()
            .filter_map(|tag| t2k.remove(tag))
            .flatten()
            .collect();

        for key in &affected {
            if let Some(other_tags) = k2t.remove(key) {
                detach(&mut t2k, key, &other_tags);
            }
        }

        affected
    }

    pub fn clear(&self) {
        rw_write(&self.tag_to_keys, SOURCE, "clear.tag_to_keys").clear();
        rw_write(&self.key_to_tags, SOURCE, "clear.key_to_tags").clear();
    }

    /// Number of tags currently tracked.
    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    /// Number of tagged keys currently tracked.
    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn detach(t2k: &mut HashMap<Tag, HashSet<String>>, key: &str, tags: &TagSet) {
    for tag in tags {
        if let Some(keys) = t2k.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                t2k.remove(tag);
            }
        }
    }
}

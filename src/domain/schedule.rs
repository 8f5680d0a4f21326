// Deferred effects polled from the tick loop instead of timers.
// Entries are keyed by (entity, kind) so an effect is pending at most once.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Sphere(u64),
    Zone(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredKind {
    Respawn,
    FadeOut,
    SphereDamageEnd,
    EnemyBlinkEnd,
    BulletArm,
    BulletExpire,
}

pub type DeferredKey = (EntityKey, DeferredKind);

#[derive(Debug, Clone)]
struct Entry {
    key: DeferredKey,
    due: f64,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct DeferredQueue {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `key` at `due`. Returns false if the key is already pending.
    pub fn schedule(&mut self, key: DeferredKey, due: f64) -> bool {
        if self.is_scheduled(key) {
            return false;
        }
        self.entries.push(Entry {
            key,
            due,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        true
    }

    pub fn is_scheduled(&self, key: DeferredKey) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn cancel(&mut self, key: DeferredKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        self.entries.len() != before
    }

    /// Drops every pending effect owned by `entity`.
    pub fn cancel_entity(&mut self, entity: EntityKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.key.0 != entity);
        before - self.entries.len()
    }

    /// Removes and returns all entries due at `now`, earliest first.
    pub fn poll(&mut self, now: f64) -> Vec<DeferredKey> {
        let (mut due, pending): (Vec<Entry>, Vec<Entry>) =
            self.entries.drain(..).partition(|e| e.due <= now);
        self.entries = pending;

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|e| e.key).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

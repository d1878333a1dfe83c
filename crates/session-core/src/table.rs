//! The stream table: `StreamKey -> Stream`, guarded the same way the
//! transaction map and device registry are (many concurrent readers, a
//! single writer lock per entry via `DashMap`).

use dashmap::DashMap;

use crate::stream::{Stream, StreamKey};

pub struct StreamTable {
    streams: DashMap<StreamKey, Stream>,
}

impl StreamTable {
    pub fn new() -> Self {
        StreamTable { streams: DashMap::new() }
    }

    pub fn insert(&self, stream: Stream) {
        self.streams.insert(stream.key.clone(), stream);
    }

    pub fn get(&self, key: &StreamKey) -> Option<Stream> {
        self.streams.get(key).map(|entry| entry.clone())
    }

    pub fn remove(&self, key: &StreamKey) -> Option<Stream> {
        self.streams.remove(key).map(|(_, stream)| stream)
    }

    /// Mutates a single entry in place without ever holding the map's
    /// writer lock across an await point.
    pub fn update(&self, key: &StreamKey, f: impl FnOnce(&mut Stream)) {
        if let Some(mut entry) = self.streams.get_mut(key) {
            f(&mut entry);
        }
    }

    pub fn all(&self) -> Vec<Stream> {
        self.streams.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl Default for StreamTable {
    fn default() -> Self {
        StreamTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{PlayModeDto, StreamState};

    fn sample(device: &str) -> Stream {
        Stream {
            key: StreamKey { device_id: device.to_string(), channel_id: "ch1".to_string() },
            ssrc: 42,
            rtp_port: 30000,
            mode: PlayModeDto::Live,
            state: StreamState::Requested,
            created_at: 0,
            last_touched: 0,
            call_id: "call-1".to_string(),
        }
    }

    #[test]
    fn insert_get_remove_round_trip() {
        let table = StreamTable::new();
        let stream = sample("dev1");
        let key = stream.key.clone();
        table.insert(stream);
        assert!(table.get(&key).is_some());
        assert!(table.remove(&key).is_some());
        assert!(table.get(&key).is_none());
    }

    #[test]
    fn update_mutates_in_place() {
        let table = StreamTable::new();
        let stream = sample("dev1");
        let key = stream.key.clone();
        table.insert(stream);
        table.update(&key, |s| s.state = StreamState::Playing);
        assert_eq!(table.get(&key).unwrap().state, StreamState::Playing);
    }
}

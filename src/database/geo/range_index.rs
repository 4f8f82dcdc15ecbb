//! In-memory longest-prefix-match index over block records
//!
//! Overlapping blocks are flattened into sorted, disjoint segments at build
//! time. Each segment remembers the record that wins inside it:
//!
//! 1. the largest `prefix_length`
//! 2. then the greatest `network_start`
//! 3. then the record loaded first
//!
//! A lookup is then a single binary search over the segments of the key's
//! IP version.

use super::blocks::BlockRecord;
use super::IpVersion;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: u64,
    end: u64,
    record: u32,
}

/// Priority of a record among those covering a point, greatest wins
type Priority = (u8, u64, Reverse<u32>);

/// Flattened index over the records of one dataset
pub struct RangeIndex<T> {
    records: Vec<T>,
    v4: Vec<Segment>,
    v6: Vec<Segment>,
}

impl<T: BlockRecord> RangeIndex<T> {
    /// Build the index from records in load order
    pub fn build(records: Vec<T>) -> Self {
        let v4 = flatten(&records, IpVersion::V4);
        let v6 = flatten(&records, IpVersion::V6);
        Self { records, v4, v6 }
    }

    /// Most specific record covering the key, if any
    pub fn find(&self, version: IpVersion, key: u64) -> Option<&T> {
        let segments = match version {
            IpVersion::V4 => &self.v4,
            IpVersion::V6 => &self.v6,
        };

        let idx = segments.partition_point(|s| s.start <= key);
        if idx == 0 {
            return None;
        }
        let segment = &segments[idx - 1];
        if key > segment.end {
            return None;
        }
        self.records.get(segment.record as usize)
    }

    /// Number of records indexed
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of disjoint segments per version
    pub fn segment_counts(&self) -> (usize, usize) {
        (self.v4.len(), self.v6.len())
    }
}

/// Sweep the records of one version into disjoint winner segments
fn flatten<T: BlockRecord>(records: &[T], version: IpVersion) -> Vec<Segment> {
    // (position, is_start, priority); ends sit one past the last key, so u128
    let mut events: Vec<(u128, bool, Priority)> = records
        .par_iter()
        .enumerate()
        .filter(|(_, r)| r.range().ip_version == version)
        .filter(|(_, r)| r.range().network_start <= r.range().network_end)
        .flat_map_iter(|(idx, r)| {
            let range = r.range();
            let priority = (range.prefix_length, range.network_start, Reverse(idx as u32));
            [
                (range.network_start as u128, true, priority),
                (range.network_end as u128 + 1, false, priority),
            ]
        })
        .collect();

    events.par_sort_unstable_by_key(|(pos, _, _)| *pos);

    let mut active: BTreeSet<Priority> = BTreeSet::new();
    let mut segments: Vec<Segment> = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let pos = events[i].0;
        while i < events.len() && events[i].0 == pos {
            let (_, is_start, priority) = events[i];
            if is_start {
                active.insert(priority);
            } else {
                active.remove(&priority);
            }
            i += 1;
        }

        let Some(&(_, _, Reverse(record))) = active.last() else {
            continue;
        };
        // Active set is non-empty, so another event follows
        let next = match events.get(i) {
            Some(event) => event.0,
            None => break,
        };

        let start = pos as u64;
        let end = (next - 1) as u64;
        match segments.last_mut() {
            Some(last) if last.record == record && last.end as u128 + 1 == pos => {
                last.end = end;
            }
            _ => segments.push(Segment { start, end, record }),
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::geo::blocks::{AsnBlock, BlockRange};

    fn block(start: u64, end: u64, prefix_length: u8, version: IpVersion, asn: u32) -> AsnBlock {
        AsnBlock {
            range: BlockRange {
                network: format!("test-{}", asn),
                network_start: start,
                network_end: end,
                prefix_length,
                ip_version: version,
            },
            autonomous_system_number: Some(asn),
            autonomous_system_organization: None,
        }
    }

    fn asn_at(index: &RangeIndex<AsnBlock>, version: IpVersion, key: u64) -> Option<u32> {
        index
            .find(version, key)
            .and_then(|b| b.autonomous_system_number)
    }

    #[test]
    fn test_nested_blocks() {
        let index = RangeIndex::build(vec![
            block(0x0a00_0000, 0x0aff_ffff, 8, IpVersion::V4, 1),
            block(0x0a01_0000, 0x0a01_ffff, 16, IpVersion::V4, 2),
            block(0x0a01_0200, 0x0a01_02ff, 24, IpVersion::V4, 3),
        ]);

        assert_eq!(asn_at(&index, IpVersion::V4, 0x0a01_0203), Some(3));
        assert_eq!(asn_at(&index, IpVersion::V4, 0x0a01_0300), Some(2));
        assert_eq!(asn_at(&index, IpVersion::V4, 0x0a01_01ff), Some(2));
        assert_eq!(asn_at(&index, IpVersion::V4, 0x0a02_0000), Some(1));
        assert_eq!(asn_at(&index, IpVersion::V4, 0x0a00_0000), Some(1));
        assert_eq!(asn_at(&index, IpVersion::V4, 0x0aff_ffff), Some(1));
        assert_eq!(asn_at(&index, IpVersion::V4, 0x0b00_0000), None);
        assert_eq!(asn_at(&index, IpVersion::V4, 0x09ff_ffff), None);
    }

    #[test]
    fn test_tie_breaks() {
        // Equal prefix, different starts: greatest start wins
        let index = RangeIndex::build(vec![
            block(100, 300, 24, IpVersion::V4, 1),
            block(200, 400, 24, IpVersion::V4, 2),
        ]);
        assert_eq!(asn_at(&index, IpVersion::V4, 150), Some(1));
        assert_eq!(asn_at(&index, IpVersion::V4, 250), Some(2));
        assert_eq!(asn_at(&index, IpVersion::V4, 350), Some(2));

        // Identical ranges: first loaded wins
        let index = RangeIndex::build(vec![
            block(100, 200, 24, IpVersion::V4, 7),
            block(100, 200, 24, IpVersion::V4, 8),
        ]);
        assert_eq!(asn_at(&index, IpVersion::V4, 150), Some(7));
    }

    #[test]
    fn test_versions_are_separate() {
        let index = RangeIndex::build(vec![
            block(0, 1000, 8, IpVersion::V4, 4),
            block(500, 2000, 16, IpVersion::V6, 6),
        ]);
        assert_eq!(asn_at(&index, IpVersion::V4, 600), Some(4));
        assert_eq!(asn_at(&index, IpVersion::V6, 600), Some(6));
        assert_eq!(asn_at(&index, IpVersion::V6, 100), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_full_key_space_upper_bound() {
        let index = RangeIndex::build(vec![
            block(1 << 63, u64::MAX, 1, IpVersion::V6, 9),
            block(u64::MAX - 10, u64::MAX, 60, IpVersion::V6, 10),
        ]);
        assert_eq!(asn_at(&index, IpVersion::V6, u64::MAX), Some(10));
        assert_eq!(asn_at(&index, IpVersion::V6, u64::MAX - 11), Some(9));
        assert_eq!(asn_at(&index, IpVersion::V6, (1 << 63) - 1), None);
    }

    #[test]
    fn test_adjacent_segments_merge() {
        let index = RangeIndex::build(vec![
            block(0, 99, 24, IpVersion::V4, 1),
            block(50, 59, 28, IpVersion::V4, 2),
        ]);
        let (v4, v6) = index.segment_counts();
        assert_eq!(v4, 3);
        assert_eq!(v6, 0);

        let index = RangeIndex::build(vec![block(0, 99, 24, IpVersion::V4, 1)]);
        assert_eq!(index.segment_counts(), (1, 0));
        assert!(RangeIndex::<AsnBlock>::build(vec![]).is_empty());
    }
}

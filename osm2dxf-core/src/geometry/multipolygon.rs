//! Ring assembly for multipolygon relations.
//!
//! Member ways are joined end to end on shared node ids until each chain
//! returns to its starting node. A way may be traversed backwards.

use crate::osm::{OsmId, Way};

/// A chain of member ways that never returned to its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenRing {
    pub(crate) start: OsmId,
    pub(crate) end: OsmId,
}

/// Join `ways` into closed rings of node ids, each ending on its first id.
pub(crate) fn stitch_rings(ways: &[&Way]) -> Result<Vec<Vec<OsmId>>, OpenRing> {
    let mut pending: Vec<Vec<OsmId>> = ways
        .iter()
        .filter(|way| !way.node_refs.is_empty())
        .map(|way| way.node_refs.clone())
        .collect();
    pending.reverse();

    let mut rings = Vec::new();
    while let Some(mut ring) = pending.pop() {
        loop {
            let (Some(&start), Some(&end)) = (ring.first(), ring.last()) else {
                break;
            };
            if ring.len() > 2 && start == end {
                rings.push(ring);
                break;
            }
            let next = pending
                .iter()
                .rposition(|segment| segment.first() == Some(&end) || segment.last() == Some(&end));
            let Some(index) = next else {
                return Err(OpenRing { start, end });
            };
            let mut segment = pending.remove(index);
            if segment.first() != Some(&end) {
                segment.reverse();
            }
            ring.extend(segment.into_iter().skip(1));
        }
    }
    Ok(rings)
}

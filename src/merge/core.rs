use crate::aggregate::StationMap;

/// Fold `source` into `target`, consuming it. Keys and records move; no
/// key bytes are copied.
pub fn merge_into(target: &mut StationMap, source: StationMap) {
    for (key, record) in source {
        target.combine(key, record);
    }
}

/// Fold any number of local maps into one final map.
///
/// The largest map is adopted as the accumulator so the fewest entries are
/// rehashed. Since `Record::combine` is commutative and associative, the
/// result does not depend on the order of `maps`.
pub fn merge_maps<I>(maps: I) -> StationMap
where
    I: IntoIterator<Item = StationMap>,
{
    let mut maps: Vec<StationMap> = maps.into_iter().collect();
    let Some(largest) = (0..maps.len()).max_by_key(|&i| maps[i].len()) else {
        return StationMap::new();
    };
    let mut merged = maps.swap_remove(largest);
    for map in maps {
        merge_into(&mut merged, map);
    }
    merged
}

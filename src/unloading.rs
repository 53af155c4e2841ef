//! Unloading place selection and delivery-priority ordering of entrances.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{UnloadingPlace, UnloadingPlaceId, Venue, WorkplaceEntrance};

/// Where the walking leg from an unloading place should end.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkTarget {
    /// The destination itself (it is the entrance owning the place).
    Destination,
    /// The entrance nodes of every workplace entrance linked to the place.
    Entrances(Vec<i64>),
}

/// An unloading place chosen for planning.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedUnloadingPlace {
    pub place: UnloadingPlace,
    pub walk_to: WalkTarget,
}

/// Sort entrances by delivery priority, best first. Ties keep their order.
pub fn sort_by_delivery_priority(entrances: &mut [WorkplaceEntrance]) {
    entrances.sort_by_key(|entrance| std::cmp::Reverse(entrance.delivery_type.priority()));
}

/// All unloading places of a venue, each listed once, in entrance order.
///
/// A place referenced by several entrances is owned by the first one.
pub fn venue_unloading_places(venue: &Venue) -> Vec<UnloadingPlace> {
    let mut seen = Vec::new();
    let mut places = Vec::new();
    for entrance in &venue.entrances {
        for place in &entrance.unloading_places {
            if seen.contains(&place.id) {
                continue;
            }
            seen.push(place.id);
            places.push(place.clone());
        }
    }
    places
}

/// Entrance node ids of the workplace entrances referencing each place.
pub fn unloading_place_entrances(venue: &Venue) -> BTreeMap<UnloadingPlaceId, Vec<i64>> {
    let mut links: BTreeMap<UnloadingPlaceId, Vec<i64>> = BTreeMap::new();
    for entrance in &venue.entrances {
        for place in &entrance.unloading_places {
            let linked = links.entry(place.id).or_default();
            if !linked.contains(&entrance.osm_entrance_id) {
                linked.push(entrance.osm_entrance_id);
            }
        }
    }
    links
}

/// Decide which unloading places apply to a destination.
///
/// `explicit_entrance` is the entrance node the user routed to, or `None`
/// when the destination is the venue as a whole. Venue-wide places are only
/// considered in the latter case; `preference` narrows them to one.
pub fn select_unloading_places(
    venue: Option<&Venue>,
    explicit_entrance: Option<i64>,
    preference: Option<UnloadingPlaceId>,
) -> Vec<SelectedUnloadingPlace> {
    let Some(venue) = venue else {
        return Vec::new();
    };

    if let Some(entrance_id) = explicit_entrance {
        let Some(entrance) = venue.entrance_for(entrance_id) else {
            return Vec::new();
        };
        debug!(
            entrance = entrance_id,
            places = entrance.unloading_places.len(),
            "using entrance-specific unloading places"
        );
        return entrance
            .unloading_places
            .iter()
            .map(|place| SelectedUnloadingPlace {
                place: place.clone(),
                walk_to: WalkTarget::Destination,
            })
            .collect();
    }

    let mut places = venue_unloading_places(venue);
    if let Some(preferred) = preference {
        if let Some(index) = places.iter().position(|place| place.id == preferred) {
            places = vec![places.swap_remove(index)];
        }
    }

    let mut links = unloading_place_entrances(venue);
    places
        .into_iter()
        .map(|place| {
            let entrances = links.remove(&place.id).unwrap_or_default();
            SelectedUnloadingPlace {
                place,
                walk_to: WalkTarget::Entrances(entrances),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLng;
    use crate::model::{DeliveryType, ElementKind, PointOfInterest};

    fn place(id: i64) -> UnloadingPlace {
        UnloadingPlace {
            id,
            location: LatLng::new(60.17, 24.94),
            access_points: Vec::new(),
            osm_feature_id: None,
            description: None,
            image: None,
        }
    }

    fn entrance(id: i64, osm: i64, delivery: DeliveryType, places: Vec<UnloadingPlace>) -> WorkplaceEntrance {
        WorkplaceEntrance {
            id,
            osm_entrance_id: osm,
            delivery_type: delivery,
            delivery_types: Vec::new(),
            description: None,
            unloading_places: places,
            delivery_instructions: None,
            delivery_hours: None,
            image: None,
        }
    }

    fn venue(entrances: Vec<WorkplaceEntrance>) -> Venue {
        Venue {
            poi: PointOfInterest::new(ElementKind::Way, 100, LatLng::new(60.17, 24.94)),
            name: None,
            entrances,
            delivery_instructions: None,
            delivery_hours: None,
            profile_images: Vec::new(),
        }
    }

    #[test]
    fn test_priority_sort_is_stable() {
        let mut entrances = vec![
            entrance(1, 11, DeliveryType::Unset, vec![]),
            entrance(2, 12, DeliveryType::No, vec![]),
            entrance(3, 13, DeliveryType::Yes, vec![]),
            entrance(4, 14, DeliveryType::Main, vec![]),
            entrance(5, 15, DeliveryType::Yes, vec![]),
            entrance(6, 16, DeliveryType::Unset, vec![]),
        ];
        sort_by_delivery_priority(&mut entrances);
        let ids: Vec<i64> = entrances.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 3, 5, 1, 6, 2]);
    }

    #[test]
    fn test_flattening_does_not_duplicate_shared_places() {
        let v = venue(vec![
            entrance(1, 11, DeliveryType::Main, vec![place(7), place(8)]),
            entrance(2, 12, DeliveryType::Yes, vec![place(8)]),
        ]);
        let ids: Vec<i64> = venue_unloading_places(&v).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 8]);

        let links = unloading_place_entrances(&v);
        assert_eq!(links[&7], vec![11]);
        assert_eq!(links[&8], vec![11, 12]);
    }

    #[test]
    fn test_entrance_specific_places_win() {
        let v = venue(vec![
            entrance(1, 11, DeliveryType::Main, vec![place(7)]),
            entrance(2, 12, DeliveryType::Yes, vec![place(8)]),
        ]);
        let selected = select_unloading_places(Some(&v), Some(12), None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].place.id, 8);
        assert_eq!(selected[0].walk_to, WalkTarget::Destination);
    }

    #[test]
    fn test_entrance_without_places_selects_nothing() {
        let v = venue(vec![
            entrance(1, 11, DeliveryType::Main, vec![place(7)]),
            entrance(2, 12, DeliveryType::Yes, vec![]),
        ]);
        assert!(select_unloading_places(Some(&v), Some(12), None).is_empty());
    }

    #[test]
    fn test_venue_wide_uses_all_places() {
        let v = venue(vec![
            entrance(1, 11, DeliveryType::Main, vec![place(7)]),
            entrance(2, 12, DeliveryType::Yes, vec![place(8)]),
        ]);
        let selected = select_unloading_places(Some(&v), None, None);
        let ids: Vec<i64> = selected.iter().map(|s| s.place.id).collect();
        assert_eq!(ids, vec![7, 8]);
        assert_eq!(selected[1].walk_to, WalkTarget::Entrances(vec![12]));
    }

    #[test]
    fn test_preference_narrows_venue_wide_places() {
        let v = venue(vec![
            entrance(1, 11, DeliveryType::Main, vec![place(7)]),
            entrance(2, 12, DeliveryType::Yes, vec![place(8)]),
        ]);
        let selected = select_unloading_places(Some(&v), None, Some(8));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].place.id, 8);
    }

    #[test]
    fn test_unknown_preference_keeps_all() {
        let v = venue(vec![entrance(1, 11, DeliveryType::Main, vec![place(7), place(9)])]);
        assert_eq!(select_unloading_places(Some(&v), None, Some(404)).len(), 2);
    }

    #[test]
    fn test_no_venue_selects_nothing() {
        assert!(select_unloading_places(None, None, None).is_empty());
    }
}

//! Property tests: a subscriber that applies every delta ends up with the
//! stored items

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tempfile::TempDir;
use vmixlink_api::{notifier::diff, ChangeNotifier, ProfileService};
use vmixlink_cache::ResponseCache;
use vmixlink_store::{FileStore, Items, ProfileName, Scalar, ServerMessage};

fn arb_value() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<bool>().prop_map(Scalar::from),
        (-1000i64..1000).prop_map(Scalar::from),
        "[a-z]{0,6}".prop_map(Scalar::from),
    ]
}

fn arb_items() -> impl Strategy<Value = Items> {
    proptest::collection::vec(("[a-e]", arb_value()), 0..6)
        .prop_map(|pairs| pairs.into_iter().collect())
}

fn apply(view: &mut Items, changes: &Items) {
    for (key, value) in changes {
        if value.is_null() {
            view.remove(key);
        } else {
            view.insert(key.clone(), value.clone());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn prop_diff_of_identical_items_is_empty(items in arb_items()) {
        prop_assert!(diff(&items, &items).is_empty());
    }

    #[test]
    fn prop_diff_applied_to_previous_gives_current(previous in arb_items(), current in arb_items()) {
        let mut view = previous.clone();
        apply(&mut view, &diff(&previous, &current));
        prop_assert_eq!(view, current);
    }

    #[test]
    fn prop_subscriber_view_tracks_saves(versions in proptest::collection::vec(arb_items(), 1..6)) {
        tokio_test::block_on(async {
            let dir = TempDir::new().unwrap();
            let store = FileStore::open(dir.path()).await.unwrap();
            let cache = ResponseCache::new(Duration::from_secs(60)).unwrap();
            let service = Arc::new(ProfileService::new(store, cache, ChangeNotifier::new(64)));
            let mut updates = service.notifier().subscribe();
            let name = ProfileName::new("prop").unwrap();

            for items in &versions {
                service.save_profile(&name, items.clone()).await.unwrap();
            }

            let mut view = Items::new();
            while let Ok(ServerMessage::DataUpdate { changes, .. }) = updates.try_recv() {
                apply(&mut view, &changes);
            }
            prop_assert_eq!(&view, versions.last().unwrap());
            Ok(())
        })?;
    }
}

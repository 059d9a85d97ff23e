// Property-based tests for shop generation

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use common::catalog::Catalog;
use common::models::Egg;
use common::notifier::Announcement;
use common::shop::{derive_seed, draw, slot_start};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    // 2020-01-01 .. 2030-01-01
    (1_577_836_800i64..1_893_456_000i64)
        .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
}

fn arb_eggs() -> impl Strategy<Value = Vec<Egg>> {
    prop::collection::vec(0u32..100, 1..8).prop_map(|weights| {
        weights
            .into_iter()
            .enumerate()
            .map(|(i, w)| Egg::new(format!("Egg{}", i), w as f64))
            .collect()
    })
}

fn arb_slot_minutes() -> impl Strategy<Value = u32> {
    prop::sample::select(vec![1u32, 2, 3, 5, 10, 15, 30, 60])
}

/// **Property 1: Shops are stable within a slot**
///
/// *For any* secret and any two instants in the same slot, the seed and the
/// drawn shop are identical.
#[test]
fn property_same_slot_same_shop() {
    proptest!(|(
        secret in "[a-zA-Z0-9]{1,32}",
        now in arb_instant(),
        offset_secs in 0i64..300,
        eggs in arb_eggs(),
    )| {
        let slot = slot_start(now, 5);
        let later = slot + Duration::seconds(offset_secs);
        prop_assert_eq!(slot_start(later, 5), slot);

        let seed_a = derive_seed(&secret, slot_start(now, 5));
        let seed_b = derive_seed(&secret, slot_start(later, 5));
        prop_assert_eq!(seed_a, seed_b);

        let first = draw(&eggs, 5, &mut StdRng::seed_from_u64(seed_a as u64));
        let second = draw(&eggs, 5, &mut StdRng::seed_from_u64(seed_b as u64));
        prop_assert_eq!(first, second);
    });
}

/// **Property 2: Slot start alignment**
///
/// *For any* instant, the slot start is not after it, is less than one slot
/// before it, and falls on a whole minute divisible by the slot length.
#[test]
fn property_slot_start_alignment() {
    proptest!(|(now in arb_instant(), slot_minutes in arb_slot_minutes())| {
        let slot = slot_start(now, slot_minutes);
        prop_assert!(slot <= now);
        prop_assert!(now - slot < Duration::minutes(slot_minutes as i64));
        prop_assert_eq!(slot.second(), 0);
        prop_assert_eq!(slot.nanosecond(), 0);
        prop_assert_eq!(slot.minute() % slot_minutes, 0);
    });
}

/// **Property 3: Draws only contain catalog names**
///
/// *For any* catalog with at least one positive weight, a draw of size n
/// returns exactly n names, all of which have a positive weight.
#[test]
fn property_draw_names_come_from_weighted_catalog() {
    proptest!(|(eggs in arb_eggs(), n in 0usize..20, seed in any::<u64>())| {
        let positive: HashSet<&str> = eggs
            .iter()
            .filter(|e| e.chance > 0.0)
            .map(|e| e.name.as_str())
            .collect();
        let drawn = draw(&eggs, n, &mut StdRng::seed_from_u64(seed));

        if positive.is_empty() {
            prop_assert!(drawn.is_empty());
        } else {
            prop_assert_eq!(drawn.len(), n);
            for name in &drawn {
                prop_assert!(positive.contains(name.as_str()), "zero-weight egg drawn: {}", name);
            }
        }
    });
}

/// **Property 4: Different secrets give independent seeds**
///
/// *For any* slot, two distinct secrets almost never collide.
#[test]
fn property_secret_changes_seed() {
    proptest!(|(a in "[a-z]{8,16}", b in "[a-z]{8,16}", now in arb_instant())| {
        prop_assume!(a != b);
        let slot = slot_start(now, 5);
        prop_assert_ne!(derive_seed(&a, slot), derive_seed(&b, slot));
    });
}

/// **Property 5: Announcement mentions are unique**
///
/// *For any* drawn list, each role appears at most once and every drawn egg
/// gets exactly one line.
#[test]
fn property_announcement_mentions_deduplicated() {
    proptest!(|(picks in prop::collection::vec(0usize..4, 1..10))| {
        let catalog = Catalog::new(vec![
            Egg::new("Common", 50.0).with_emoji("1").with_role("100"),
            Egg::new("Rare", 30.0).with_emoji("2").with_role("200"),
            Egg::new("Epic", 15.0).with_emoji("3"),
            Egg::new("Legendary", 5.0).with_emoji("4").with_role("400"),
        ])
        .unwrap();
        let names: Vec<String> = picks
            .iter()
            .map(|&i| catalog.eggs()[i].name.clone())
            .collect();

        let announcement = Announcement::build("Headline", &names, &catalog, &Default::default());

        let unique: HashSet<&String> = announcement.role_ids.iter().collect();
        prop_assert_eq!(unique.len(), announcement.role_ids.len());
        prop_assert_eq!(announcement.content.matches(" Egg").count(), names.len());
        for id in &announcement.role_ids {
            let mention = format!("<@&{}>", id);
            prop_assert_eq!(announcement.content.matches(mention.as_str()).count(), 1);
        }
    });
}

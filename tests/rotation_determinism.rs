use questlog::rotation::weekly_rotation;

fn pool() -> Vec<String> {
    ["platforms", "tailored", "letters", "referral", "cities"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn same_week_and_pool_is_stable() {
    let pool = pool();
    let first = weekly_rotation("2025-03-10", &pool, 3);
    for _ in 0..10 {
        assert_eq!(weekly_rotation("2025-03-10", &pool, 3), first);
    }
}

#[test]
fn selection_is_a_subset_without_duplicates() {
    let pool = pool();
    let selected = weekly_rotation("2025-03-10", &pool, 3);
    assert_eq!(selected.len(), 3);
    for id in &selected {
        assert!(pool.contains(id));
    }
    let mut deduped = selected.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), selected.len());
}

#[test]
fn short_pool_yields_whole_pool() {
    let pool: Vec<String> = vec!["only".to_string(), "two".to_string()];
    let selected = weekly_rotation("2025-03-10", &pool, 3);
    assert_eq!(selected.len(), 2);
}

#[test]
fn different_weeks_eventually_rotate() {
    let pool = pool();
    let baseline = weekly_rotation("2025-03-10", &pool, 3);
    let mut saw_difference = false;
    for week in ["2025-03-17", "2025-03-24", "2025-03-31", "2025-04-07"] {
        if weekly_rotation(week, &pool, 3) != baseline {
            saw_difference = true;
        }
    }
    assert!(saw_difference, "rotation never changed across five weeks");
}

#[test]
fn pool_order_matters_to_the_seed() {
    // The seed hashes the pool in order, so catalogs must keep cyclable
    // definition order stable to keep a week's rotation stable.
    let ordered = pool();
    let mut reversed = pool();
    reversed.reverse();
    let a = weekly_rotation("2025-03-10", &ordered, 3);
    let b = weekly_rotation("2025-03-10", &reversed, 3);
    // Same members are eligible either way; selection may differ.
    for id in a.iter().chain(b.iter()) {
        assert!(ordered.contains(id));
    }
}

//! Demonstrates the ergonomic wrapper type and position-based navigation.
//!
//! Shows how to use the safe `RbTreeMap` wrapper, custom comparators, and
//! positions that survive edits to the rest of the map.

use allocated_rbtree::{FnComparator, Natural, RbTreeMap, Reverse};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Red-Black Tree Map Demo ===\n");
    map_demo()?;

    println!("\n=== Positions ===\n");
    position_demo()?;

    println!("\n=== Comparators ===\n");
    comparator_demo()?;

    Ok(())
}

fn map_demo() -> Result<(), Box<dyn std::error::Error>> {
    let mut map = RbTreeMap::new();

    // Insert some key-value pairs (no unsafe blocks needed!)
    map.insert(3, "three")?;
    map.insert(1, "one")?;
    map.insert(4, "four")?;
    let (_, inserted) = map.insert(1, "ONE")?; // Existing keys are left alone
    map.insert(5, "five")?;
    map.insert(9, "nine")?;
    map.insert(2, "two")?;

    println!("Inserted {} items (second insert of 1 inserted: {})", map.len(), inserted);

    if let Some(value) = map.get(&1) {
        println!("Key 1: {}", value);
    }

    println!("\nAll entries:");
    for (k, v) in &map {
        println!("  {} -> {}", k, v);
    }

    println!("\nKeys in 2..5:");
    for (k, v) in map.range(2..5) {
        println!("  {} -> {}", k, v);
    }

    if let Some((k, v)) = map.pop_first() {
        println!("\nRemoved first entry: {} -> {}", k, v);
    }

    let mut counts = RbTreeMap::<&str, u32>::new();
    for word in "the quick brown fox jumps over the lazy dog the end".split(' ') {
        *counts.get_or_insert_default(word)? += 1;
    }
    println!("\nWord counts: {:?}", counts);

    Ok(())
}

fn position_demo() -> Result<(), Box<dyn std::error::Error>> {
    let mut map: RbTreeMap<u32, u32> = (0..10).map(|i| (i * 10, i)).collect();

    let pos = map.lower_bound(&35);
    println!("lower_bound(35) -> {:?}", map.key_value_at(pos));

    // Erasing other elements keeps `pos` valid.
    map.erase_range(map.begin(), pos);
    map.remove(&90);
    println!("after erasing around it -> {:?}", map.key_value_at(pos));

    print!("walking backwards from the last element:");
    let mut cur = map.rbegin();
    while cur != map.rend() {
        if let Some((k, _)) = map.key_value_at(cur) {
            print!(" {}", k);
        }
        cur = map.prev(cur);
    }
    println!();

    map.erase(pos);
    println!("after erasing it -> {:?}", map.key_value_at(pos));

    Ok(())
}

fn comparator_demo() -> Result<(), Box<dyn std::error::Error>> {
    let mut descending = RbTreeMap::with_comparator(Reverse(Natural));
    descending.try_extend([(1, 'a'), (3, 'c'), (2, 'b')])?;
    println!("Reverse order: {:?}", descending);

    let case_insensitive = FnComparator(|a: &&str, b: &&str| {
        a.to_lowercase().cmp(&b.to_lowercase())
    });
    let mut names = RbTreeMap::with_comparator(case_insensitive);
    for name in ["bob", "Alice", "BOB", "carol", "alice"] {
        names.insert(name, name.len())?;
    }
    println!("Case-insensitive keys: {:?}", names.keys().collect::<Vec<_>>());

    Ok(())
}

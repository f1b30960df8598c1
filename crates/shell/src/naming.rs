//! Free-name selection for copies.

use std::collections::HashSet;

/// Picks a name for a copy of `name` that collides with nothing in
/// `taken`. The original name is reused when it is free at the
/// destination; otherwise the first free of `Copy of {name}`,
/// `Copy of {name} 2`, `Copy of {name} 3`, ... wins.
#[must_use]
pub fn copy_name<'a, I>(taken: I, name: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = taken.into_iter().collect();

    if !taken.contains(name) {
        return name.to_owned();
    }

    let first = format!("Copy of {name}");
    if !taken.contains(first.as_str()) {
        return first;
    }

    let mut counter = 2_u32;
    loop {
        let candidate = format!("Copy of {name} {counter}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        counter += 1;
    }
}

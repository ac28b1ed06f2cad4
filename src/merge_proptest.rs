//! Property-based tests for the merge engine and grouping backends.
//!
//! Releases are generated from small key and value alphabets so that
//! collisions (same field, same item `id`, same value) happen often.

#[cfg(test)]
mod proptest_tests {
    use crate::compiler::compile_all;
    use crate::config::{Backend, CompileOptions};
    use crate::merge::{merge, merge_versioned};
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (0i64..4).prop_map(Value::from),
            "[a-c]{1,2}".prop_map(Value::from),
        ]
    }

    fn object<S: Strategy<Value = Value>>(keys: &'static str, values: S) -> impl Strategy<Value = Value> {
        prop::collection::vec((keys, values), 0..4)
            .prop_map(|fields| Value::Object(fields.into_iter().collect()))
    }

    fn content() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                object("[a-d]", inner.clone()),
                prop::collection::vec(("[1-3]", object("[x-z]", inner.clone())), 1..4).prop_map(
                    |items| {
                        Value::Array(
                            items
                                .into_iter()
                                .map(|(id, mut item)| {
                                    if let Some(map) = item.as_object_mut() {
                                        map.insert("id".to_string(), Value::from(id));
                                    }
                                    item
                                })
                                .collect(),
                        )
                    }
                ),
                prop::collection::vec(scalar(), 0..3).prop_map(Value::Array),
            ]
        })
    }

    /// Attach release metadata to generated bodies.
    fn releases(ocid: &str, bodies: Vec<Value>) -> Vec<Value> {
        bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| {
                let mut release = Map::new();
                release.insert("ocid".to_string(), Value::from(ocid));
                release.insert("id".to_string(), Value::from(format!("r{}", i)));
                release.insert(
                    "date".to_string(),
                    Value::from(format!("2001-01-{:02}T00:00:00Z", i + 1)),
                );
                release.insert("tag".to_string(), json!(["update"]));
                if let Value::Object(body) = body {
                    release.extend(body);
                }
                Value::Object(release)
            })
            .collect()
    }

    fn release_bodies() -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(object("[a-e]", content()), 1..6)
    }

    #[derive(Debug, Clone)]
    enum Step {
        Key(String),
        Item(Value),
    }

    /// Follow `path` through a compiled release. Items are only found in
    /// arrays that merge by identity.
    fn lookup<'v>(value: &'v Value, path: &[Step]) -> Option<&'v Value> {
        path.iter().try_fold(value, |value, step| match step {
            Step::Key(key) => value.as_object()?.get(key),
            Step::Item(id) => {
                let items = value.as_array()?;
                if items.is_empty() || !items.iter().all(|item| item.get("id").is_some()) {
                    return None;
                }
                items.iter().find(|item| item.get("id") == Some(id))
            }
        })
    }

    /// Collect every leaf history of a versioned release with its path.
    fn leaf_histories<'v>(
        versioned: &'v Value,
        path: &mut Vec<Step>,
        out: &mut Vec<(Vec<Step>, &'v Vec<Value>)>,
    ) {
        match versioned {
            Value::Object(fields) => {
                for (key, value) in fields {
                    path.push(Step::Key(key.clone()));
                    leaf_histories(value, path, out);
                    path.pop();
                }
            }
            Value::Array(entries)
                if entries.first().is_some_and(|entry| entry.get("releaseID").is_some()) =>
            {
                out.push((path.clone(), entries));
            }
            Value::Array(items) => {
                for item in items {
                    path.push(Step::Item(item["id"].clone()));
                    for (key, value) in item.as_object().into_iter().flatten() {
                        if key != "id" {
                            path.push(Step::Key(key.clone()));
                            leaf_histories(value, path, out);
                            path.pop();
                        }
                    }
                    path.pop();
                }
            }
            _ => {}
        }
    }

    proptest! {
        /// Property: merging the compiled release on its own reproduces it
        #[test]
        fn remerging_compiled_release_is_idempotent(bodies in release_bodies()) {
            let compiled = merge("x", &releases("x", bodies));
            let again = merge("x", std::slice::from_ref(&compiled));
            prop_assert_eq!(again, compiled);
        }

        /// Property: a field set by any release stays in the compiled release,
        /// and a scalar keeps the value of the last release that set it
        #[test]
        fn fields_are_never_removed(bodies in release_bodies()) {
            let releases = releases("x", bodies);
            let compiled = merge("x", &releases);
            for release in &releases {
                for key in release.as_object().unwrap().keys() {
                    prop_assert!(compiled.get(key).is_some(), "lost field {}", key);
                }
            }
            for (key, value) in compiled.as_object().unwrap() {
                if ["tag", "id", "date", "ocid"].contains(&key.as_str()) {
                    continue;
                }
                let last = releases.iter().rev().find_map(|r| r.get(key)).unwrap();
                if !last.is_object() && !last.is_array() {
                    prop_assert_eq!(value, last);
                }
            }
        }

        /// Property: every leaf's history has one entry per change of the
        /// whole value at its path, counted from when the path last appeared,
        /// and its last entry is the compiled value
        #[test]
        fn history_length_counts_changes(bodies in release_bodies()) {
            let releases = releases("x", bodies);
            let compiled = merge("x", &releases);
            let versioned = merge_versioned("x", &releases);
            let prefixes: Vec<Value> = (1..=releases.len())
                .map(|n| merge("x", &releases[..n]))
                .collect();

            let mut leaves = Vec::new();
            leaf_histories(&versioned, &mut Vec::new(), &mut leaves);
            for (path, history) in leaves {
                let mut changes = 0;
                let mut current: Option<&Value> = None;
                for prefix in &prefixes {
                    match lookup(prefix, &path) {
                        None => {
                            changes = 0;
                            current = None;
                        }
                        Some(value) if current != Some(value) => {
                            changes += 1;
                            current = Some(value);
                        }
                        Some(_) => {}
                    }
                }
                prop_assert_eq!(history.len(), changes, "history of {:?}", path);
                prop_assert_eq!(Some(&history[changes - 1]["value"]), lookup(&compiled, &path));
            }
        }

        /// Property: the memory and disk backends produce byte-identical output
        #[test]
        fn backends_are_equivalent(
            packages in prop::collection::vec(
                prop::collection::vec(("[p-r]", object("[a-d]", content())), 0..4),
                1..4,
            ),
            versioned in any::<bool>(),
            package in any::<bool>(),
        ) {
            let items: Vec<Value> = packages
                .into_iter()
                .map(|releases| {
                    let releases: Vec<Value> = releases
                        .into_iter()
                        .enumerate()
                        .map(|(i, (ocid, body))| {
                            let mut release = json!({"ocid": ocid, "id": i.to_string()});
                            if let (Some(map), Value::Object(body)) = (release.as_object_mut(), body) {
                                map.extend(body);
                            }
                            release
                        })
                        .collect();
                    json!({"uri": "http://example.com/p.json", "releases": releases})
                })
                .collect();

            let memory = CompileOptions { versioned, package, ..Default::default() };
            let disk = CompileOptions { backend: Backend::Disk, ..memory.clone() };

            let from_memory = compile_all(items.iter().cloned().map(Ok), &memory).unwrap();
            let from_disk = compile_all(items.into_iter().map(Ok), &disk).unwrap();
            prop_assert_eq!(
                serde_json::to_string(&from_memory).unwrap(),
                serde_json::to_string(&from_disk).unwrap()
            );
        }
    }
}

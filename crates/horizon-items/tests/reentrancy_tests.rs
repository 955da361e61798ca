//! Tests for host callbacks that call back into the generator.

use std::sync::{Arc, Weak};

use horizon_items::generator::ContainerStore;
use horizon_items::prelude::*;
use parking_lot::Mutex;

type Generator = ItemContainerGenerator<&'static str>;

/// What a clear callback saw when it queried the generator.
#[derive(Debug, Clone, PartialEq)]
struct Observation {
    item: Option<&'static str>,
    index: Option<usize>,
    first_container: Option<ContainerId>,
    could_generate: bool,
}

/// Host that queries its generator from every clear callback and can push
/// an item into the collection the first time it clears one.
#[derive(Default)]
struct QueryingHost {
    generator: Mutex<Weak<Generator>>,
    items: Mutex<Option<Arc<ObservableCollection<&'static str>>>>,
    observations: Mutex<Vec<Observation>>,
}

impl QueryingHost {
    fn attach(&self, generator: &Arc<Generator>) {
        *self.generator.lock() = Arc::downgrade(generator);
    }
}

impl ContainerHost<&'static str> for QueryingHost {
    fn clear_container_for_item(&self, container: ContainerId, item: Option<&&'static str>) {
        let Some(generator) = self.generator.lock().upgrade() else {
            return;
        };
        let could_generate = generator
            .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
            .is_ok();
        self.observations.lock().push(Observation {
            item: item.copied(),
            index: generator.index_from_container(container),
            first_container: generator.container_from_index(0),
            could_generate,
        });

        let pending = self.items.lock().take();
        if let Some(items) = pending {
            items.push("late");
        }
    }
}

fn setup(items: &[&'static str]) -> (Arc<ObservableCollection<&'static str>>, Arc<QueryingHost>, Arc<Generator>) {
    let items = Arc::new(ObservableCollection::new(items.to_vec()));
    let host = Arc::new(QueryingHost::default());
    let generator = ItemContainerGenerator::new(ContainerStore::new(), host.clone(), items.clone());
    host.attach(&generator);
    (items, host, generator)
}

fn generate(generator: &Generator, count: usize) -> Vec<ContainerId> {
    generator
        .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
        .expect("Failed to start generation")
        .take(count)
        .map(|result| result.expect("Failed to generate").container)
        .collect()
}

#[test]
fn test_queries_during_remove_all_are_absorbed() {
    let (_items, host, generator) = setup(&["A", "B"]);
    generate(&generator, 2);

    generator.remove_all();
    let observations = host.observations.lock().clone();
    assert_eq!(observations.len(), 2);
    for observation in &observations {
        assert_eq!(observation.index, None);
        assert_eq!(observation.first_container, None);
        assert!(!observation.could_generate);
    }

    // The map is back online afterwards.
    assert_eq!(generate(&generator, 1).len(), 1);
    assert_eq!(generator.status(), GeneratorStatus::ContainersGenerated);
}

#[test]
fn test_queries_during_remove_see_the_updated_map() {
    let (_items, host, generator) = setup(&["A", "B", "C"]);
    let containers = generate(&generator, 3);

    generator
        .remove(GeneratorPosition::new(0, 0), 2)
        .expect("Failed to remove");
    let observations = host.observations.lock().clone();
    assert_eq!(
        observations,
        vec![
            Observation {
                item: Some("A"),
                index: None,
                first_container: None,
                could_generate: true,
            },
            Observation {
                item: Some("B"),
                index: None,
                first_container: None,
                could_generate: true,
            },
        ]
    );
    assert_eq!(generator.index_from_container(containers[2]), Some(2));
}

#[test]
fn test_collection_change_from_clear_callback() {
    let (items, host, generator) = setup(&["A", "B", "C"]);
    generate(&generator, 3);
    *host.items.lock() = Some(items.clone());

    generator
        .remove(GeneratorPosition::new(1, 0), 1)
        .expect("Failed to remove");
    assert_eq!(items.to_vec(), vec!["A", "B", "C", "late"]);
    assert_eq!(generator.item_count(), 4);
    assert_eq!(
        generator.chain_debug(),
        r#"[Realized{"A"}, Unrealized{1}, Realized{"C"}, Unrealized{1}]"#
    );
    generator.verify().expect("generator is consistent");
}

#[test]
fn test_collection_change_during_remove_all() {
    let (items, host, generator) = setup(&["A", "B"]);
    generate(&generator, 2);
    *host.items.lock() = Some(items.clone());

    generator.remove_all();
    assert_eq!(items.len(), 3);
    assert_eq!(generator.item_count(), 3);
    assert_eq!(generator.realized_count(), 0);
    generator.verify().expect("generator is consistent");
}

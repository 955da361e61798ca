//! Tests for items sources that misreport their changes or keep changing.

use std::sync::Arc;

use horizon_items::generator::{ContainerStore, DefaultContainerHost};
use horizon_items::prelude::*;
use parking_lot::Mutex;

type Generator = ItemContainerGenerator<&'static str>;

/// Items source whose contents and notifications are driven by hand.
#[derive(Default)]
struct ManualSource {
    items: Mutex<Vec<&'static str>>,
    changed: Signal<CollectionChange<&'static str>>,
}

impl ManualSource {
    fn new(items: &[&'static str]) -> Arc<Self> {
        let source = Arc::new(Self::default());
        *source.items.lock() = items.to_vec();
        source
    }

    /// Replaces the items without raising a notification.
    fn set_silently(&self, items: &[&'static str]) {
        *self.items.lock() = items.to_vec();
    }

    fn announce(&self, change: CollectionChange<&'static str>) {
        self.changed.emit(change);
    }
}

impl ItemsSource<&'static str> for ManualSource {
    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn get(&self, index: usize) -> Option<ViewItem<&'static str>> {
        self.items.lock().get(index).copied().map(ViewItem::Item)
    }

    fn collection_changed(&self) -> &Signal<CollectionChange<&'static str>> {
        &self.changed
    }
}

/// Host that inserts an item at the front of its collection every time the
/// generator asks it about an item.
#[derive(Default)]
struct ShiftingHost {
    items: Mutex<Option<Arc<ObservableCollection<&'static str>>>>,
}

impl ContainerHost<&'static str> for ShiftingHost {
    fn is_item_its_own_container(&self, _item: &&'static str) -> bool {
        let items = self.items.lock().clone();
        if let Some(items) = items {
            items.insert(0, "shift");
        }
        false
    }
}

fn generator_for(source: Arc<dyn ItemsSource<&'static str>>) -> Arc<Generator> {
    ItemContainerGenerator::new(ContainerStore::new(), Arc::new(DefaultContainerHost), source)
}

fn generate(generator: &Generator, count: usize) -> Vec<ContainerId> {
    generator
        .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
        .expect("Failed to start generation")
        .take(count)
        .map(|result| result.expect("Failed to generate").container)
        .collect()
}

fn record_actions(generator: &Generator) -> Arc<Mutex<Vec<ChangeAction>>> {
    let actions = Arc::new(Mutex::new(Vec::new()));
    let actions_clone = actions.clone();
    generator.items_changed.connect(move |event| {
        actions_clone.lock().push(event.action);
    });
    actions
}

#[test]
fn test_out_of_range_change_resyncs_the_map() {
    let source = ManualSource::new(&["A", "B", "C"]);
    let generator = generator_for(source.clone());
    generate(&generator, 3);
    let actions = record_actions(&generator);

    source.set_silently(&["A", "B", "C", "D"]);
    source.announce(CollectionChange::add(ViewItem::Item("D"), 9));

    assert_eq!(*actions.lock(), vec![ChangeAction::Reset]);
    assert_eq!(generator.item_count(), 4);
    assert_eq!(generator.realized_count(), 0);
    assert!(generator.store().is_empty());
    generator.verify().expect("generator is consistent after the resync");
    assert_eq!(generate(&generator, 4).len(), 4);
}

#[test]
fn test_remove_past_the_end_resyncs_the_map() {
    let source = ManualSource::new(&["A", "B"]);
    let generator = generator_for(source.clone());
    generate(&generator, 1);
    let actions = record_actions(&generator);

    source.set_silently(&["A"]);
    source.announce(CollectionChange::remove(ViewItem::Item("B"), 5));

    assert_eq!(*actions.lock(), vec![ChangeAction::Reset]);
    assert_eq!(generator.item_count(), 1);
    generator.verify().expect("generator is consistent after the resync");
}

#[test]
fn test_error_status_sticks_until_the_map_is_rebuilt() {
    let source = ManualSource::new(&["A", "B", "C"]);
    let generator = generator_for(source.clone());
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let statuses_clone = statuses.clone();
    generator.status_changed.connect(move |status| {
        statuses_clone.lock().push(*status);
    });

    source.set_silently(&["A"]);
    {
        let mut cursor = generator
            .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
            .expect("Failed to start generation");
        let first = cursor.generate_next(false).expect("first item is still there");
        assert!(first.is_some());
        assert_eq!(
            cursor.generate_next(false),
            Err(GeneratorError::MissingItem { index: 1 })
        );
    }
    assert_eq!(generator.status(), GeneratorStatus::Error);

    // Later passes run but leave the status alone.
    {
        let _cursor = generator
            .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
            .expect("Failed to start generation");
        assert_eq!(generator.status(), GeneratorStatus::Error);
    }
    let batch = generator.generate_batches();
    assert_eq!(generator.status(), GeneratorStatus::Error);
    drop(batch);
    assert_eq!(generator.status(), GeneratorStatus::Error);

    generator.remove_all();
    assert_eq!(generator.status(), GeneratorStatus::NotStarted);
    assert_eq!(generator.item_count(), 1);
    assert_eq!(generate(&generator, 1).len(), 1);
    assert_eq!(generator.status(), GeneratorStatus::ContainersGenerated);
    assert_eq!(
        *statuses.lock(),
        vec![
            GeneratorStatus::GeneratingContainers,
            GeneratorStatus::Error,
            GeneratorStatus::NotStarted,
            GeneratorStatus::GeneratingContainers,
            GeneratorStatus::ContainersGenerated,
        ]
    );
}

#[test]
fn test_source_changing_on_every_attempt_is_an_error() {
    let items = Arc::new(ObservableCollection::new(vec!["A", "B", "C"]));
    let host = Arc::new(ShiftingHost::default());
    let generator = ItemContainerGenerator::new(ContainerStore::new(), host.clone(), items.clone());
    *host.items.lock() = Some(items.clone());

    let mut cursor = generator
        .start_at(GeneratorPosition::start(), GeneratorDirection::Forward, false)
        .expect("Failed to start generation");
    let err = cursor
        .generate_next(false)
        .expect_err("generation gives up on a source that never settles");
    assert!(matches!(err, GeneratorError::SourceUnstable { attempts: 3, .. }));
    assert!(!err.is_invalid_operation());

    // Every attempt added an item; the map followed them all.
    *host.items.lock() = None;
    assert_eq!(items.len(), 6);
    assert_eq!(generator.item_count(), 6);
    assert_eq!(generator.realized_count(), 0);
    generator.verify().expect("generator is consistent");

    let next = cursor
        .generate_next(false)
        .expect("Failed to generate")
        .expect("cursor still points at an item");
    assert!(next.is_newly_realized);
    assert_eq!(
        generator.item_from_container(next.container),
        Some(ViewItem::Item("A"))
    );
}
